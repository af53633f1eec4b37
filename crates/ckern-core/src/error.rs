use thiserror::Error;

/// Every kernel error is recoverable: the failing operation leaves its
/// output untouched, so callers may treat any `Err` as "skip this frame".
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    #[error("Missing resource: {0}")]
    MissingResource(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),
}

impl KernelError {
    /// True for the "nothing to do" class of errors (no reference key,
    /// no knots, empty grid). These are expected on data that is mid-edit.
    pub fn is_missing_resource(&self) -> bool {
        matches!(self, KernelError::MissingResource(_))
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;
