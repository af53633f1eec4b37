use crate::error::Result;

/// Validate structural integrity of control data (point counts, orders, grid sizes).
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Compute an axis-aligned bounding box of the control data.
///
/// Returns `None` when there is nothing to bound.
pub trait BoundingBox {
    type Point;
    fn bounding_box(&self) -> Option<(Self::Point, Self::Point)>;
}
