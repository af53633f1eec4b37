//! Curve path deformation: bend a target along the first contour of a curve.

use ckern_core::{EvalSettings, KernelError, Result};
use ckern_math::{tilt_quat, vector_to_quat, Aabb3, Axis, DVec3, TrackAxis, Transform};
use ckern_spline::{build_bevel_lists, Curve, CurvePath};

/// An active curve deformation.
#[derive(Debug, Clone)]
pub struct CurveDeform {
    path: CurvePath,
    /// Curve space to target space.
    object_space: Transform,
    /// Target space to curve space.
    curve_space: Transform,
    /// Target origin in curve space; zero in stretch mode.
    dloc: DVec3,
    stretch: bool,
    /// Bounds of the points being deformed, in curve space.
    bounds: Aabb3,
}

impl CurveDeform {
    /// Start deforming a target along `curve`.
    ///
    /// Uses the curve's cached bevel lists when present and builds them
    /// otherwise. Fails with `MissingResource` when the curve has no
    /// usable contour.
    pub fn begin(
        curve: &Curve,
        curve_matrix: &Transform,
        target_matrix: &Transform,
        settings: &EvalSettings,
    ) -> Result<Self> {
        let built;
        let bevel = if curve.bevel.is_empty() {
            built = build_bevel_lists(curve, None, settings);
            &built
        } else {
            &curve.bevel
        };
        let path = CurvePath::build(bevel, curve.nurbs.first())
            .ok_or_else(|| KernelError::MissingResource("curve has no path to deform along".into()))?;

        let object_space = curve_matrix.then(&target_matrix.inverse_or_identity());
        let curve_space = object_space.inverse_or_identity();
        let dloc = if curve.stretch {
            DVec3::ZERO
        } else {
            curve_matrix
                .inverse_or_identity()
                .transform_point(target_matrix.translation())
        };

        tracing::debug!(
            samples = path.len(),
            length = path.total_distance,
            "curve deform started"
        );
        Ok(Self {
            path,
            object_space,
            curve_space,
            dloc,
            stretch: curve.stretch,
            bounds: Aabb3::new(DVec3::ZERO, DVec3::ZERO),
        })
    }

    pub fn path(&self) -> &CurvePath {
        &self.path
    }

    /// Path parameter of curve-space coordinate `co` along `axis`.
    fn path_factor(&self, co: DVec3, axis: TrackAxis) -> f64 {
        let i = axis.axis().index();
        let (lo, hi) = (self.bounds.min[i], self.bounds.max[i]);
        let c = co[i];

        if self.stretch {
            let extent = hi - lo;
            if extent == 0.0 {
                return 0.0;
            }
            if axis.is_negative() {
                (hi - c) / extent
            } else {
                (c - lo) / extent
            }
        } else {
            let total = self.path.total_distance;
            if axis.is_negative() {
                self.dloc[i] / total - (c - hi) / total
            } else {
                self.dloc[i] / total + (c - lo) / total
            }
        }
    }

    /// Map a curve-space point onto the path, using the bounds of the last
    /// [`Self::deform_verts`] call. The tracked coordinate selects the path
    /// position; the other two are rotated into the path frame.
    pub fn deform_point(&self, co: DVec3, axis: TrackAxis) -> Option<DVec3> {
        let fac = self.path_factor(co, axis);
        let sample = self.path.where_on_path_extended(fac)?;

        let up = if axis.axis() == Axis::Z { Axis::Y } else { Axis::Z };
        let mut quat = vector_to_quat(sample.direction, axis, up);
        if sample.tilt != 0.0 {
            let dir = sample.direction.normalize_or_zero();
            quat = tilt_quat(dir, -sample.tilt) * quat;
        }

        let mut cent = co;
        cent[axis.axis().index()] = 0.0;
        Some(quat * cent + sample.position)
    }

    /// Deform target-space `verts` in place.
    pub fn deform_verts(&mut self, verts: &mut [DVec3], axis: TrackAxis) {
        for co in verts.iter_mut() {
            *co = self.curve_space.transform_point(*co);
        }
        match Aabb3::from_points(verts.iter().copied()) {
            Some(bounds) => self.bounds = bounds,
            None => return,
        }
        for co in verts.iter_mut() {
            if let Some(moved) = self.deform_point(*co, axis) {
                *co = moved;
            }
            *co = self.object_space.transform_point(*co);
        }
    }

    pub fn end(self) {}
}

/// Deform `verts` along `curve`, leaving them untouched when the curve has no path.
pub fn curve_deform_verts_or_skip(
    curve: &Curve,
    curve_matrix: &Transform,
    target_matrix: &Transform,
    verts: &mut [DVec3],
    axis: TrackAxis,
    settings: &EvalSettings,
) {
    match CurveDeform::begin(curve, curve_matrix, target_matrix, settings) {
        Ok(mut deform) => {
            deform.deform_verts(verts, axis);
            deform.end();
        }
        Err(err) => tracing::debug!(%err, "skipping curve deform"),
    }
}
