//! Lattice free-form deformation.
//!
//! A lattice is a `u x v x w` grid of control points over the canonical
//! box. Deforming a point blends the displacement of the 4x4x4 grid
//! neighbourhood around it, weighted per axis by a four-point basis.

use ckern_core::{BoundingBox, KernelError, Result, Validate};
use ckern_math::{four_point_weights, Aabb3, DVec3, Interpolation, Transform};
use ckern_spline::BPoint;
use serde::{Deserialize, Serialize};

/// Origin and spacing of `res` grid points along one axis.
///
/// Grid mode spaces points one unit apart around the origin; otherwise they
/// span `[-1, 1]`. A single point sits at the origin.
pub fn calc_lat_fudu(grid_mode: bool, res: usize) -> (f64, f64) {
    if res <= 1 {
        (0.0, 0.0)
    } else if grid_mode {
        (-0.5 * (res - 1) as f64, 1.0)
    } else {
        (-1.0, 2.0 / (res - 1) as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub pnts_u: usize,
    pub pnts_v: usize,
    pub pnts_w: usize,
    pub type_u: Interpolation,
    pub type_v: Interpolation,
    pub type_w: Interpolation,
    pub fu: f64,
    pub fv: f64,
    pub fw: f64,
    pub du: f64,
    pub dv: f64,
    pub dw: f64,
    /// Control points, `u` fastest, then `v`, then `w`.
    pub points: Vec<BPoint>,
    pub grid_mode: bool,
}

impl Default for Lattice {
    fn default() -> Self {
        Self::new(2, 2, 2)
    }
}

impl Lattice {
    /// Undeformed lattice with B-spline interpolation on every axis.
    pub fn new(pnts_u: usize, pnts_v: usize, pnts_w: usize) -> Self {
        let mut lattice = Self {
            pnts_u: 0,
            pnts_v: 0,
            pnts_w: 0,
            type_u: Interpolation::BSpline,
            type_v: Interpolation::BSpline,
            type_w: Interpolation::BSpline,
            fu: 0.0,
            fv: 0.0,
            fw: 0.0,
            du: 0.0,
            dv: 0.0,
            dw: 0.0,
            points: Vec::new(),
            grid_mode: false,
        };
        lattice.resize(pnts_u, pnts_v, pnts_w);
        lattice
    }

    pub fn with_interpolation(mut self, u: Interpolation, v: Interpolation, w: Interpolation) -> Self {
        self.type_u = u;
        self.type_v = v;
        self.type_w = w;
        self
    }

    /// Change the grid resolution, resetting every point to its rest position.
    /// Counts are clamped to at least one.
    pub fn resize(&mut self, pnts_u: usize, pnts_v: usize, pnts_w: usize) {
        self.pnts_u = pnts_u.max(1);
        self.pnts_v = pnts_v.max(1);
        self.pnts_w = pnts_w.max(1);
        (self.fu, self.du) = calc_lat_fudu(self.grid_mode, self.pnts_u);
        (self.fv, self.dv) = calc_lat_fudu(self.grid_mode, self.pnts_v);
        (self.fw, self.dw) = calc_lat_fudu(self.grid_mode, self.pnts_w);

        self.points = (0..self.len())
            .map(|i| BPoint::new(self.rest_position(i)))
            .collect();
    }

    /// Switch between unit grid spacing and the `[-1, 1]` box, then reset.
    pub fn set_grid_mode(&mut self, grid_mode: bool) {
        self.grid_mode = grid_mode;
        self.resize(self.pnts_u, self.pnts_v, self.pnts_w);
    }

    pub fn len(&self) -> usize {
        self.pnts_u * self.pnts_v * self.pnts_w
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, u: usize, v: usize, w: usize) -> usize {
        (w * self.pnts_v + v) * self.pnts_u + u
    }

    /// Undeformed position of control point `index`.
    pub fn rest_position(&self, index: usize) -> DVec3 {
        let u = index % self.pnts_u;
        let v = (index / self.pnts_u) % self.pnts_v;
        let w = index / (self.pnts_u * self.pnts_v);
        DVec3::new(
            self.fu + u as f64 * self.du,
            self.fv + v as f64 * self.dv,
            self.fw + w as f64 * self.dw,
        )
    }

    pub fn point_mut(&mut self, u: usize, v: usize, w: usize) -> Option<&mut BPoint> {
        if u >= self.pnts_u || v >= self.pnts_v || w >= self.pnts_w {
            return None;
        }
        let i = self.index(u, v, w);
        self.points.get_mut(i)
    }
}

impl Validate for Lattice {
    fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(KernelError::MissingResource("lattice has no grid points".into()));
        }
        if self.points.len() != self.len() {
            return Err(KernelError::InvalidOperation(format!(
                "{}x{}x{} lattice holds {} points",
                self.pnts_u,
                self.pnts_v,
                self.pnts_w,
                self.points.len()
            )));
        }
        Ok(())
    }
}

impl BoundingBox for Lattice {
    type Point = DVec3;

    fn bounding_box(&self) -> Option<(DVec3, DVec3)> {
        let aabb = Aabb3::from_points(self.points.iter().map(BPoint::position))?;
        Some((aabb.min, aabb.max))
    }
}

/// Per-axis weights and base cell index of a lattice coordinate.
struct AxisSample {
    weights: [f64; 4],
    base: i64,
}

impl AxisSample {
    fn new(coord: f64, origin: f64, step: f64, count: usize, kind: Interpolation) -> Self {
        if count > 1 && step != 0.0 {
            let u = (coord - origin) / step;
            let base = u.floor();
            Self {
                weights: four_point_weights(u - base, kind),
                base: base as i64,
            }
        } else {
            Self {
                weights: [0.0, 1.0, 0.0, 0.0],
                base: 0,
            }
        }
    }

    /// Neighbour `k` of the four, clamped to the grid.
    fn index(&self, k: usize, count: usize) -> usize {
        (self.base + k as i64 - 1).clamp(0, count as i64 - 1) as usize
    }
}

/// An active lattice deformation.
///
/// Holds the displacement of every control point from its rest position,
/// already rotated into the target's space. Consumed by [`LatticeDeform::end`].
#[derive(Debug, Clone)]
pub struct LatticeDeform {
    pnts: [usize; 3],
    types: [Interpolation; 3],
    origin: DVec3,
    step: DVec3,
    offsets: Vec<DVec3>,
    /// Target space to lattice space.
    latmat: Transform,
}

impl LatticeDeform {
    /// Start deforming with `lattice`.
    ///
    /// With a `target_matrix` points are taken from the target's space into
    /// the lattice's; without one they are assumed to be in world space.
    /// `deformed` replaces the control point positions, for lattices that
    /// were themselves deformed (shape keys, modifiers).
    pub fn begin(
        lattice: &Lattice,
        lattice_matrix: &Transform,
        target_matrix: Option<&Transform>,
        deformed: Option<&[DVec3]>,
    ) -> Result<Self> {
        lattice.validate()?;
        if let Some(cos) = deformed {
            if cos.len() != lattice.len() {
                return Err(KernelError::OutOfRange(format!(
                    "{} deformed positions for {} lattice points",
                    cos.len(),
                    lattice.len()
                )));
            }
        }

        let lattice_inv = lattice_matrix.inverse_or_identity();
        let latmat = match target_matrix {
            Some(target) => target.then(&lattice_inv),
            None => lattice_inv,
        };
        let back = latmat.inverse_or_identity();

        let offsets = (0..lattice.len())
            .map(|i| {
                let co = match deformed {
                    Some(cos) => cos[i],
                    None => lattice.points[i].position(),
                };
                back.transform_vector(co - lattice.rest_position(i))
            })
            .collect();

        tracing::debug!(
            u = lattice.pnts_u,
            v = lattice.pnts_v,
            w = lattice.pnts_w,
            "lattice deform started"
        );
        Ok(Self {
            pnts: [lattice.pnts_u, lattice.pnts_v, lattice.pnts_w],
            types: [lattice.type_u, lattice.type_v, lattice.type_w],
            origin: DVec3::new(lattice.fu, lattice.fv, lattice.fw),
            step: DVec3::new(lattice.du, lattice.dv, lattice.dw),
            offsets,
            latmat,
        })
    }

    /// Displace `co` (target space) by the lattice, scaled by `weight`.
    pub fn deform(&self, co: DVec3, weight: f64) -> DVec3 {
        let vec = self.latmat.transform_point(co);
        let [nu, nv, nw] = self.pnts;
        let su = AxisSample::new(vec.x, self.origin.x, self.step.x, nu, self.types[0]);
        let sv = AxisSample::new(vec.y, self.origin.y, self.step.y, nv, self.types[1]);
        let sw = AxisSample::new(vec.z, self.origin.z, self.step.z, nw, self.types[2]);

        let mut out = co;
        for (kw, &ww) in sw.weights.iter().enumerate() {
            if ww == 0.0 {
                continue;
            }
            let iw = sw.index(kw, nw) * nu * nv;
            for (kv, &wv) in sv.weights.iter().enumerate() {
                let wv = ww * wv;
                if wv == 0.0 {
                    continue;
                }
                let iv = iw + sv.index(kv, nv) * nu;
                for (ku, &wu) in su.weights.iter().enumerate() {
                    let f = weight * wv * wu;
                    if f != 0.0 {
                        out += f * self.offsets[iv + su.index(ku, nu)];
                    }
                }
            }
        }
        out
    }

    /// Deform every vertex, with optional per-vertex weights.
    pub fn deform_verts(&self, verts: &mut [DVec3], weights: Option<&[f64]>) {
        for (i, co) in verts.iter_mut().enumerate() {
            let weight = weights.and_then(|w| w.get(i).copied()).unwrap_or(1.0);
            *co = self.deform(*co, weight);
        }
    }

    pub fn end(self) {}
}

/// Deform `verts` by `lattice`, leaving them untouched when the lattice is unusable.
pub fn lattice_deform_verts_or_skip(
    lattice: &Lattice,
    lattice_matrix: &Transform,
    target_matrix: Option<&Transform>,
    verts: &mut [DVec3],
) {
    match LatticeDeform::begin(lattice, lattice_matrix, target_matrix, None) {
        Ok(deform) => {
            deform.deform_verts(verts, None);
            deform.end();
        }
        Err(err) => tracing::debug!(%err, "skipping lattice deform"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_fudu() {
        assert_eq!(calc_lat_fudu(false, 1), (0.0, 0.0));
        assert_eq!(calc_lat_fudu(false, 3), (-1.0, 1.0));
        assert_eq!(calc_lat_fudu(true, 4), (-1.5, 1.0));
    }

    #[test]
    fn test_new_lattice_spans_unit_box() {
        let lt = Lattice::new(2, 3, 1);
        assert_eq!(lt.points.len(), 6);
        assert_eq!(lt.points[0].position(), DVec3::new(-1.0, -1.0, 0.0));
        assert_eq!(lt.points[5].position(), DVec3::new(1.0, 1.0, 0.0));
        assert_eq!(lt.bounding_box(), Some((DVec3::new(-1.0, -1.0, 0.0), DVec3::new(1.0, 1.0, 0.0))));
    }

    #[test]
    fn test_rest_lattice_is_identity() {
        let lt = Lattice::new(4, 4, 4);
        let deform = LatticeDeform::begin(&lt, &Transform::identity(), None, None).unwrap();
        let co = DVec3::new(0.3, -0.2, 0.7);
        let out = deform.deform(co, 1.0);
        assert_abs_diff_eq!(out.x, co.x, epsilon = 1e-12);
        assert_abs_diff_eq!(out.y, co.y, epsilon = 1e-12);
        assert_abs_diff_eq!(out.z, co.z, epsilon = 1e-12);
    }

    #[test]
    fn test_uniform_shift_moves_points() {
        let mut lt = Lattice::new(2, 2, 2).with_interpolation(
            Interpolation::Linear,
            Interpolation::Linear,
            Interpolation::Linear,
        );
        for p in lt.points.iter_mut() {
            p.vec.x += 0.5;
        }
        let deform = LatticeDeform::begin(&lt, &Transform::identity(), None, None).unwrap();
        let out = deform.deform(DVec3::new(0.2, 0.1, -0.3), 1.0);
        assert_abs_diff_eq!(out.x, 0.7, epsilon = 1e-12);

        let half = deform.deform(DVec3::new(0.2, 0.1, -0.3), 0.5);
        assert_abs_diff_eq!(half.x, 0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_single_point_axes_use_identity_weight() {
        let mut lt = Lattice::new(2, 1, 1).with_interpolation(
            Interpolation::Linear,
            Interpolation::Linear,
            Interpolation::Linear,
        );
        lt.points[1].vec.y = 1.0;
        let deform = LatticeDeform::begin(&lt, &Transform::identity(), None, None).unwrap();
        let out = deform.deform(DVec3::new(1.0, 0.0, 5.0), 1.0);
        assert_abs_diff_eq!(out.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.z, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mismatched_deformed_positions() {
        let lt = Lattice::new(2, 2, 2);
        let cos = [DVec3::ZERO; 3];
        let err = LatticeDeform::begin(&lt, &Transform::identity(), None, Some(&cos)).unwrap_err();
        assert!(matches!(err, KernelError::OutOfRange(_)));
    }

    #[test]
    fn test_empty_lattice_skips() {
        let mut lt = Lattice::new(2, 2, 2);
        lt.points.clear();
        let mut verts = [DVec3::ONE];
        lattice_deform_verts_or_skip(&lt, &Transform::identity(), None, &mut verts);
        assert_eq!(verts[0], DVec3::ONE);
    }
}
