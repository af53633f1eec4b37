//! Track-axis orientation: build a rotation that points one local axis along
//! a direction while keeping a second axis as close to "up" as possible.

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Coordinate axis used as the "up" reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Signed axis that is aligned with a tracked direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrackAxis {
    PosX = 0,
    PosY = 1,
    PosZ = 2,
    NegX = 3,
    NegY = 4,
    NegZ = 5,
}

impl TrackAxis {
    pub fn axis(self) -> Axis {
        match self {
            Self::PosX | Self::NegX => Axis::X,
            Self::PosY | Self::NegY => Axis::Y,
            Self::PosZ | Self::NegZ => Axis::Z,
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Self::NegX | Self::NegY | Self::NegZ)
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::PosX),
            1 => Some(Self::PosY),
            2 => Some(Self::PosZ),
            3 => Some(Self::NegX),
            4 => Some(Self::NegY),
            5 => Some(Self::NegZ),
            _ => None,
        }
    }
}

/// Rotation taking `track` onto `vec`, then rolled about `vec` so that `up`
/// points as far upward as it can.
///
/// Positive track axes align with `-vec`; callers that sample tangents
/// negate them first. A zero vector yields the identity.
pub fn vector_to_quat(vec: DVec3, track: TrackAxis, up: Axis) -> DQuat {
    let v = if track.is_negative() { vec } else { -vec };
    let axis = track.axis();

    let len = v.length();
    if len == 0.0 {
        return DQuat::IDENTITY;
    }

    // Rotation axis perpendicular to both the track axis and the vector.
    let (mut nor, co) = match axis {
        Axis::X => {
            let mut n = DVec3::new(0.0, -v.z, v.y);
            if v.y.abs() + v.z.abs() < 0.0001 {
                n.y = 1.0;
            }
            (n, v.x)
        }
        Axis::Y => {
            let mut n = DVec3::new(v.z, 0.0, -v.x);
            if v.x.abs() + v.z.abs() < 0.0001 {
                n.z = 1.0;
            }
            (n, v.y)
        }
        Axis::Z => {
            let mut n = DVec3::new(-v.y, v.x, 0.0);
            if v.x.abs() + v.y.abs() < 0.0001 {
                n.x = 1.0;
            }
            (n, v.z)
        }
    };
    nor = nor.normalize_or_zero();

    let angle = 0.5 * safe_acos(co / len);
    let (si, c) = angle.sin_cos();
    let q = DQuat::from_xyzw(nor.x * si, nor.y * si, nor.z * si, c);

    if axis == up {
        return q;
    }

    let fp = DMat3::from_quat(q).z_axis;
    let roll = match (axis, up) {
        (Axis::X, Axis::Y) => 0.5 * fp.z.atan2(fp.y),
        (Axis::X, _) => -0.5 * fp.y.atan2(fp.z),
        (Axis::Y, Axis::X) => -0.5 * fp.z.atan2(fp.x),
        (Axis::Y, _) => 0.5 * fp.x.atan2(fp.z),
        (Axis::Z, Axis::X) => 0.5 * (-fp.y).atan2(-fp.x),
        (Axis::Z, _) => -0.5 * (-fp.x).atan2(-fp.y),
    };

    let (si, c) = roll.sin_cos();
    let si = si / len;
    let q2 = DQuat::from_xyzw(v.x * si, v.y * si, v.z * si, c);
    q2 * q
}

/// `acos` with the argument clamped to `[-1, 1]`.
pub fn safe_acos(x: f64) -> f64 {
    if x <= -1.0 {
        std::f64::consts::PI
    } else if x >= 1.0 {
        0.0
    } else {
        x.acos()
    }
}

/// Rotation by `angle` about the unit axis `dir`.
pub fn tilt_quat(dir: DVec3, angle: f64) -> DQuat {
    let (s, c) = (0.5 * angle).sin_cos();
    DQuat::from_xyzw(s * dir.x, s * dir.y, s * dir.z, c)
}
