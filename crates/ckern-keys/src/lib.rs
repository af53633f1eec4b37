//! ckern shape keys: absolute and relative key blending for meshes,
//! lattices and curves.

pub mod blend;
pub mod driver;
pub mod key;
pub mod select;
pub mod target;

pub use blend::{cp_key, do_key, do_rel_key, ElementMode, ElementRange, ShapeKeyBlender};
pub use driver::{KeyDriver, StoredValues, TimeCurve, VertexGroupSource};
pub use key::{Key, KeyBlock, KeyBlockId, KeyMode, KeyOwner};
pub use select::{select_keys, KeySelection};
pub use target::{apply_block, KeyTarget, MeshVerts};
