//! Four-point interpolation weights shared by key blending, lattice
//! deformation, tilt interpolation and path lookup.
//!
//! All bases weight the samples `(p0, p1, p2, p3)` for a local parameter
//! `d` in `[0, 1]` measured between `p1` and `p2`.

use serde::{Deserialize, Serialize};

/// Tension of the cardinal spline basis.
pub const CARDINAL_TENSION: f64 = 0.71;

/// Truncated 1/6 used by the uniform cubic B-spline basis.
const SIXTH: f64 = 0.1666;
/// Truncated 2/3 used by the uniform cubic B-spline basis.
const TWO_THIRDS: f64 = 0.6666;

/// Interpolation basis, with stable on-disk discriminants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Interpolation {
    Linear = 0,
    Cardinal = 1,
    #[default]
    BSpline = 2,
}

impl Interpolation {
    pub fn as_raw(self) -> u8 {
        self as u8
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Linear),
            1 => Some(Self::Cardinal),
            2 => Some(Self::BSpline),
            _ => None,
        }
    }

    /// Whether the basis interpolates its middle samples (`p1` at `d = 0`).
    pub fn passes_through_points(self) -> bool {
        !matches!(self, Self::BSpline)
    }
}

/// Weights for `(p0, p1, p2, p3)` at parameter `d`.
pub fn four_point_weights(d: f64, kind: Interpolation) -> [f64; 4] {
    match kind {
        Interpolation::Linear => [0.0, 1.0 - d, d, 0.0],
        Interpolation::Cardinal => {
            let d2 = d * d;
            let d3 = d2 * d;
            let fc = CARDINAL_TENSION;
            [
                -fc * d3 + 2.0 * fc * d2 - fc * d,
                (2.0 - fc) * d3 + (fc - 3.0) * d2 + 1.0,
                (fc - 2.0) * d3 + (3.0 - 2.0 * fc) * d2 + fc * d,
                fc * d3 - fc * d2,
            ]
        }
        Interpolation::BSpline => {
            let d2 = d * d;
            let d3 = d2 * d;
            [
                -SIXTH * d3 + 0.5 * d2 - 0.5 * d + SIXTH,
                0.5 * d3 - d2 + TWO_THIRDS,
                -0.5 * d3 + 0.5 * d2 + 0.5 * d + SIXTH,
                SIXTH * d3,
            ]
        }
    }
}

/// Derivative of [`four_point_weights`] with respect to `d`.
pub fn four_point_derivative_weights(d: f64, kind: Interpolation) -> [f64; 4] {
    match kind {
        Interpolation::Linear => [0.0, -1.0, 1.0, 0.0],
        Interpolation::Cardinal => {
            let d2 = d * d;
            let fc = CARDINAL_TENSION;
            [
                -3.0 * fc * d2 + 4.0 * fc * d - fc,
                3.0 * (2.0 - fc) * d2 + 2.0 * (fc - 3.0) * d,
                3.0 * (fc - 2.0) * d2 + 2.0 * (3.0 - 2.0 * fc) * d + fc,
                3.0 * fc * d2 - 2.0 * fc * d,
            ]
        }
        Interpolation::BSpline => {
            let d2 = d * d;
            [
                -SIXTH * 3.0 * d2 + d - 0.5,
                1.5 * d2 - 2.0 * d,
                -1.5 * d2 + d + 0.5,
                SIXTH * 3.0 * d2,
            ]
        }
    }
}

/// Apply four weights to four scalar samples.
#[inline]
pub fn blend4(w: &[f64; 4], v: [f64; 4]) -> f64 {
    w[0] * v[0] + w[1] * v[1] + w[2] * v[2] + w[3] * v[3]
}
