pub mod aabb;
pub mod interp;
pub mod orient;
pub mod transform;

pub use glam::{DVec2, DVec3, DVec4, DMat3, DMat4, DQuat};
pub use aabb::Aabb3;
pub use interp::{blend4, four_point_derivative_weights, four_point_weights, Interpolation};
pub use orient::{safe_acos, tilt_quat, vector_to_quat, Axis, TrackAxis};
pub use transform::Transform;

pub type Point3 = DVec3;
pub type Vector3 = DVec3;
