//! B-spline basis functions by iterative Cox-de Boor recursion.

/// Basis function values for one parameter, reusing its scratch buffer
/// between calls.
#[derive(Debug, Clone, Default)]
pub struct BasisEvaluator {
    weights: Vec<f64>,
}

impl BasisEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate all basis functions of `order` at `t`.
    ///
    /// `points` is the number of control points seen by the knot vector
    /// (cyclic callers pass `points + order - 1`). `t` is clamped into
    /// `[knots[0], knots[points + order - 1]]`. Returns the inclusive index
    /// range of non-zero weights, or `None` when no weight is non-zero or
    /// the knot vector is too short.
    ///
    /// # Arguments
    /// * `t` - Parameter value
    /// * `order` - Spline order (degree + 1)
    /// * `points` - Control point count seen by `knots`
    /// * `knots` - At least `points + order` knots
    pub fn evaluate(
        &mut self,
        t: f64,
        order: usize,
        points: usize,
        knots: &[f64],
    ) -> Option<(usize, usize)> {
        self.weights.clear();
        if order == 0 || points == 0 {
            return None;
        }
        let last = order + points - 1;
        if knots.len() <= last {
            return None;
        }
        self.weights.resize(last + 1, 0.0);
        let basis = &mut self.weights;

        let t = if t < knots[0] {
            knots[0]
        } else if t > knots[last] {
            knots[last]
        } else {
            t
        };

        // Order 1: indicator of the first non-empty span containing t.
        let span = (0..last).find(|&i| knots[i] != knots[i + 1] && t >= knots[i] && t <= knots[i + 1])?;
        basis[span] = 1.0;

        let i1 = span.saturating_sub(order - 1);
        let mut i2 = span;

        for j in 2..=order {
            if i2 + j > last {
                i2 = last - j;
            }
            for i in i1..=i2 {
                // Zero lower-order terms are skipped, so empty spans never divide.
                let d = if basis[i] != 0.0 {
                    (t - knots[i]) * basis[i] / (knots[i + j - 1] - knots[i])
                } else {
                    0.0
                };
                let e = if basis[i + 1] != 0.0 {
                    (knots[i + j] - t) * basis[i + 1] / (knots[i + j] - knots[i + 1])
                } else {
                    0.0
                };
                basis[i] = d + e;
            }
        }

        if i1 > i2 {
            return None;
        }
        let start = (i1..=i2).find(|&i| basis[i] > 0.0)?;
        let end = (start..=i2).rev().find(|&i| basis[i] > 0.0)?;
        Some((start, end))
    }

    /// Weight of control point `i` from the last evaluation.
    #[inline]
    pub fn weight(&self, i: usize) -> f64 {
        self.weights.get(i).copied().unwrap_or(0.0)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}
