//! Knot vector generation for NURBS curves and surfaces.

use serde::{Deserialize, Serialize};

/// Knot spacing rule for a non-cyclic axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KnotStyle {
    /// `0, 1, 2, ...`
    #[default]
    Uniform = 0,
    /// Open-uniform: the first and last `order` knots repeat so the curve
    /// touches its end points.
    Endpoint = 1,
    /// Knots repeat in groups of `order - 1` so the curve behaves like a
    /// chain of Bezier segments.
    Bezier = 2,
}

impl KnotStyle {
    pub fn as_raw(self) -> u8 {
        self as u8
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Uniform),
            1 => Some(Self::Endpoint),
            2 => Some(Self::Bezier),
            _ => None,
        }
    }
}

/// Non-decreasing knot sequence of one parametric axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnotVector {
    knots: Vec<f64>,
}

/// Number of knots for `points` control points of the given order.
///
/// Cyclic axes carry `order - 1` extra knots that repeat the head spacing.
pub fn knot_count(points: usize, order: usize, cyclic: bool) -> usize {
    if cyclic {
        points + 2 * order - 1
    } else {
        points + order
    }
}

/// Whether `points` control points of `order` can carry a knot vector.
pub fn is_valid_axis(points: usize, order: usize, cyclic: bool, style: KnotStyle) -> bool {
    if points <= 1 || order == 0 {
        return false;
    }
    if cyclic {
        return true;
    }
    if points < order {
        return false;
    }
    if style == KnotStyle::Bezier {
        // Bezier-style groups need a whole number of segments.
        return match order {
            3 => true,
            4 => points >= 5,
            _ => false,
        };
    }
    true
}

impl KnotVector {
    /// Generate the knots for an axis, or an empty vector when the axis
    /// cannot form a curve.
    pub fn build(points: usize, order: usize, cyclic: bool, style: KnotStyle) -> Self {
        if !is_valid_axis(points, order, cyclic, style) {
            tracing::debug!(points, order, cyclic, "no knots for degenerate axis");
            return Self::default();
        }

        let mut knots = vec![0.0; knot_count(points, order, cyclic)];
        if cyclic {
            calc_knots(&mut knots, points, order, KnotStyle::Uniform);
            make_cyclic_knots(&mut knots, points, order);
        } else {
            calc_knots(&mut knots, points, order, style);
        }
        Self { knots }
    }

    pub fn from_vec(knots: Vec<f64>) -> Self {
        Self { knots }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.knots
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// Parameter range `[start, end]` swept by tessellation.
    pub fn domain(&self, points: usize, order: usize, cyclic: bool) -> Option<(f64, f64)> {
        let end_index = if cyclic { points + order - 1 } else { points };
        let start = *self.knots.get(order.checked_sub(1)?)?;
        let end = *self.knots.get(end_index)?;
        Some((start, end))
    }

    /// Reverse the knot spacing, keeping the first knot in place.
    pub fn mirror(&mut self) {
        let Some(&first) = self.knots.first() else {
            return;
        };
        let mut gaps: Vec<f64> = self.knots.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        gaps.reverse();

        let mut acc = first;
        self.knots[0] = acc;
        for (k, gap) in self.knots[1..].iter_mut().zip(gaps) {
            acc += gap;
            *k = acc;
        }
    }
}

fn calc_knots(knots: &mut [f64], points: usize, order: usize, style: KnotStyle) {
    let total = points + order;
    match style {
        KnotStyle::Uniform => {
            for (a, k) in knots.iter_mut().take(total).enumerate() {
                *k = a as f64;
            }
        }
        KnotStyle::Endpoint => {
            let mut k = 0.0;
            for a in 1..=total {
                knots[a - 1] = k;
                if a >= order && a <= points {
                    k += 1.0;
                }
            }
        }
        KnotStyle::Bezier => match order {
            4 => {
                let mut k = 0.34;
                for knot in knots.iter_mut().take(total) {
                    *knot = f64::floor(k);
                    k += 1.0 / 3.0;
                }
            }
            3 => {
                let mut k = 0.6;
                for (a, knot) in knots.iter_mut().take(total).enumerate() {
                    if a >= order && a <= points {
                        k += 0.5;
                    }
                    *knot = f64::floor(k);
                }
            }
            _ => tracing::warn!(order, "Bezier knot style needs order 3 or 4"),
        },
    }
}

/// Extend a uniform fill past `points + order` so evaluation can wrap around.
fn make_cyclic_knots(knots: &mut [f64], points: usize, order: usize) {
    if order == 0 {
        return;
    }
    let order2 = order - 1;

    // A tail made of identical knots gets its last entry bumped first.
    if order > 2 {
        let b = points + order2;
        if (1..order2).all(|a| knots[b] == knots[b - a]) {
            knots[points + order - 2] += 1.0;
        }
    }

    let mut b = order;
    for a in (points + order2)..(points + order + order2) {
        knots[a] = knots[a - 1] + (knots[b] - knots[b - 1]);
        b -= 1;
    }
}
