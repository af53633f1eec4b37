use crate::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-Aligned Bounding Box in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb3 {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any point will grow.
    pub fn empty() -> Self {
        Self {
            min: Point3::splat(f64::INFINITY),
            max: Point3::splat(f64::NEG_INFINITY),
        }
    }

    pub fn from_points<I: IntoIterator<Item = Point3>>(points: I) -> Option<Self> {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include(p);
        }
        if aabb.is_empty() {
            None
        } else {
            Some(aabb)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain `p`.
    pub fn include(&mut self, p: Point3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn center(&self) -> Point3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vector3 {
        self.max - self.min
    }

    pub fn contains_point(&self, p: Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec3;

    #[test]
    fn test_bounds_of_deformed_vertices() {
        let verts = [dvec3(0.0, -2.0, 0.5), dvec3(4.0, 1.0, 0.5), dvec3(2.0, 0.0, -0.5)];
        let bounds = Aabb3::from_points(verts).unwrap();
        assert_eq!(bounds.min, dvec3(0.0, -2.0, -0.5));
        assert_eq!(bounds.max, dvec3(4.0, 1.0, 0.5));
        assert_eq!(bounds.center(), dvec3(2.0, -0.5, 0.0));
    }

    #[test]
    fn test_no_vertices_no_bounds() {
        assert!(Aabb3::from_points(Vec::new()).is_none());
        assert!(Aabb3::empty().is_empty());
    }

    #[test]
    fn test_flat_contour_has_zero_depth() {
        let mut bounds = Aabb3::empty();
        bounds.include(dvec3(-1.0, -1.0, 0.0));
        bounds.include(dvec3(1.0, 1.0, 0.0));
        assert_eq!(bounds.extents().z, 0.0);
        assert!(bounds.contains_point(dvec3(1.0, 0.0, 0.0)));
        assert!(!bounds.contains_point(dvec3(0.0, 0.0, 0.1)));

        let merged = bounds.merge(&Aabb3::new(dvec3(0.0, 0.0, 2.0), dvec3(0.5, 0.5, 3.0)));
        assert_eq!(merged.max.z, 3.0);
    }
}
