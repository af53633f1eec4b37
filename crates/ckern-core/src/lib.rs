//! ckern core: error taxonomy, evaluation settings, and shared traits.

pub mod error;
pub mod settings;
pub mod traits;

pub use error::{KernelError, Result};
pub use settings::EvalSettings;
pub use traits::{BoundingBox, Validate};
