use crate::{DMat3, DMat4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Object-to-world matrix of a deformer or deformed object.
///
/// Only the coordinate-space setup of the deformers consumes these; the
/// scene layer that produces them is external.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub matrix: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        Self::from_mat4(DMat4::IDENTITY)
    }

    pub fn from_translation(t: Vector3) -> Self {
        Self::from_mat4(DMat4::from_translation(t))
    }

    pub fn from_scale(s: Vector3) -> Self {
        Self::from_mat4(DMat4::from_scale(s))
    }

    pub fn from_mat4(m: DMat4) -> Self {
        Self {
            matrix: m.to_cols_array(),
        }
    }

    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_cols_array(&self.matrix)
    }

    /// Upper-left 3x3 block (rotation and scale, no translation).
    pub fn to_mat3(&self) -> DMat3 {
        DMat3::from_mat4(self.to_mat4())
    }

    pub fn translation(&self) -> Vector3 {
        self.to_mat4().w_axis.truncate()
    }

    pub fn transform_point(&self, p: Point3) -> Point3 {
        self.to_mat4().transform_point3(p)
    }

    pub fn transform_vector(&self, v: Vector3) -> Vector3 {
        self.to_mat4().transform_vector3(v)
    }

    /// `self` applied first, then `other`.
    pub fn then(&self, other: &Transform) -> Transform {
        Self::from_mat4(other.to_mat4() * self.to_mat4())
    }

    /// Inverse, or `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Transform> {
        let m = self.to_mat4();
        if m.determinant().abs() < 1e-15 {
            None
        } else {
            Some(Self::from_mat4(m.inverse()))
        }
    }

    /// Inverse, falling back to identity for a singular matrix.
    pub fn inverse_or_identity(&self) -> Transform {
        self.inverse().unwrap_or_else(Self::identity)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
