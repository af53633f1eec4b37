//! Arc-length lookup table along the first contour of a curve, used to map
//! a normalized parameter to a position, tangent and tilt.

use ckern_math::{
    blend4, four_point_derivative_weights, four_point_weights, DVec3, DVec4, Interpolation,
};

use crate::bevel::BevList;
use crate::nurb::{Nurb, NurbKind};

/// Equal-distance samples of a contour, xyz in `xyz` and tilt in `w`.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePath {
    pub points: Vec<DVec4>,
    pub total_distance: f64,
    pub cyclic: bool,
    /// Kind of the nurb the path came from; selects the interpolation basis.
    pub kind: NurbKind,
}

/// A point on a [`CurvePath`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub position: DVec3,
    /// Negated tangent, not normalized.
    pub direction: DVec3,
    pub tilt: f64,
}

impl CurvePath {
    /// Resample the first bevel list at equal arc length.
    ///
    /// The sample count is the list's own point count, raised to the first
    /// nurb's `resolution_u * segments` when that is larger. Returns `None`
    /// for missing, single-point or zero-length contours.
    pub fn build(bevel: &[BevList], first_nurb: Option<&Nurb>) -> Option<Self> {
        let bl = bevel.first()?;
        let nr = bl.points.len();
        if nr < 2 {
            tracing::debug!("no contour to build a path from");
            return None;
        }
        let cyclic = bl.poly != -1;
        let tot = if cyclic { nr } else { nr - 1 };

        let mut len = tot + 1;
        if let Some(nurb) = first_nurb {
            len = len.max(nurb.resolution_u * nurb.segments_u());
        }

        let mut dist = Vec::with_capacity(tot + 1);
        dist.push(0.0);
        for a in 0..tot {
            let next = if a + 1 == nr { 0 } else { a + 1 };
            let step = bl.points[next].vec.distance(bl.points[a].vec);
            dist.push(dist[a] + step);
        }
        let total_distance = dist[tot];
        if total_distance <= 0.0 {
            return None;
        }

        let last = nr - 1;
        let wrap = |i: usize| {
            if i <= last {
                i
            } else if cyclic {
                0
            } else {
                last
            }
        };

        let spacing = total_distance / (len - 1) as f64;
        let mut fi = 1;
        let mut bi = 0;
        let mut points = Vec::with_capacity(len);

        for a in 0..len {
            let d = a as f64 * spacing;
            while d >= dist[fi] && fi < tot {
                fi += 1;
                bi = (bi + 1).min(last);
            }
            let bn = wrap(bi + 1);

            let seg = dist[fi] - dist[fi - 1];
            let f1 = if seg > 0.0 { (dist[fi] - d) / seg } else { 1.0 };
            let f2 = 1.0 - f1;

            let p = &bl.points[bi];
            let q = &bl.points[bn];
            let pos = f1 * p.vec + f2 * q.vec;
            points.push(pos.extend(f1 * p.tilt + f2 * q.tilt));
        }

        Some(Self {
            points,
            total_distance,
            cyclic,
            kind: first_nurb.map(Nurb::kind).unwrap_or(NurbKind::Poly),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn interval(&self, p: i64) -> usize {
        let max = (self.points.len() - 1 - self.cyclic as usize) as i64;
        let clamped = if self.cyclic {
            p.rem_euclid(max + 1)
        } else {
            p.clamp(0, max)
        };
        clamped as usize
    }

    /// Position, tangent and tilt at `ctime` in `[0, 1]`.
    ///
    /// Poly and Bezier paths interpolate linearly; NURBS paths use a
    /// B-spline blend, or a cardinal one next to clamped ends.
    pub fn where_on_path(&self, ctime: f64) -> Option<PathSample> {
        if self.points.len() < 2 {
            return None;
        }
        let ctime = ctime * (self.points.len() - 1) as f64;
        let s1 = ctime.floor();
        let fac = s1 + 1.0 - ctime;
        let s1 = s1 as i64;

        let i0 = self.interval(s1 - 1);
        let i1 = self.interval(s1);
        let i2 = self.interval(i1 as i64 + 1);
        let i3 = self.interval(i1 as i64 + 2);
        let (p0, p1, p2, p3) = (
            self.points[i0],
            self.points[i1],
            self.points[i2],
            self.points[i3],
        );

        let dw = four_point_derivative_weights(1.0 - fac, Interpolation::BSpline);
        let direction = -DVec3::new(
            blend4(&dw, [p0.x, p1.x, p2.x, p3.x]),
            blend4(&dw, [p0.y, p1.y, p2.y, p3.y]),
            blend4(&dw, [p0.z, p1.z, p2.z, p3.z]),
        );

        let basis = match self.kind {
            NurbKind::Poly | NurbKind::Bezier => Interpolation::Linear,
            NurbKind::Nurbs if i0 == i1 || i2 == i3 => Interpolation::Cardinal,
            NurbKind::Nurbs => Interpolation::BSpline,
        };
        let w = four_point_weights(1.0 - fac, basis);
        let blended = DVec4::new(
            blend4(&w, [p0.x, p1.x, p2.x, p3.x]),
            blend4(&w, [p0.y, p1.y, p2.y, p3.y]),
            blend4(&w, [p0.z, p1.z, p2.z, p3.z]),
            blend4(&w, [p0.w, p1.w, p2.w, p3.w]),
        );

        Some(PathSample {
            position: blended.truncate(),
            direction,
            tilt: blended.w,
        })
    }

    /// Like [`Self::where_on_path`], but an open path continues straight
    /// along its end segments for parameters outside `[0, 1]`.
    pub fn where_on_path_extended(&self, ctime: f64) -> Option<PathSample> {
        if self.cyclic || (0.0..=1.0).contains(&ctime) {
            return self.where_on_path(ctime);
        }
        let mut sample = self.where_on_path(ctime.clamp(0.0, 1.0))?;
        let n = self.points.len();
        let len = n as f64;
        let offset = if ctime < 0.0 {
            (self.points[1] - self.points[0]).truncate() * (ctime * len)
        } else {
            (self.points[n - 1] - self.points[n - 2]).truncate() * ((ctime - 1.0) * len)
        };
        sample.position += offset;
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bevel::BevPoint;
    use approx::assert_abs_diff_eq;

    fn straight(n: usize) -> Vec<BevList> {
        vec![BevList {
            points: (0..n)
                .map(|i| BevPoint::new(DVec3::new(i as f64, 0.0, 0.0), i as f64))
                .collect(),
            poly: -1,
            hole: false,
            has_vector_segment: false,
        }]
    }

    #[test]
    fn test_samples_are_equally_spaced() {
        let mut lists = straight(3);
        lists[0].points[2].vec.x = 4.0;
        let path = CurvePath::build(&lists, None).unwrap();
        assert_eq!(path.len(), 3);
        assert_abs_diff_eq!(path.total_distance, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(path.points[1].x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_resolution_raises_sample_count() {
        let nurb = Nurb::poly(
            (0..4).map(|i| crate::nurb::BPoint::new(DVec3::new(i as f64, 0.0, 0.0))).collect(),
            false,
        );
        let path = CurvePath::build(&straight(4), Some(&nurb)).unwrap();
        assert_eq!(path.len(), nurb.resolution_u * 3);
    }

    #[test]
    fn test_linear_lookup_on_straight_path() {
        let path = CurvePath::build(&straight(5), None).unwrap();
        let s = path.where_on_path(0.5).unwrap();
        assert_abs_diff_eq!(s.position.x, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.tilt, 2.0, epsilon = 1e-9);
        // Directions point against the direction of travel.
        assert!(s.direction.x < 0.0);
    }

    #[test]
    fn test_extrapolates_past_the_end() {
        let path = CurvePath::build(&straight(5), None).unwrap();
        let end = path.where_on_path_extended(1.0).unwrap();
        let past = path.where_on_path_extended(1.1).unwrap();
        assert!(past.position.x > end.position.x);
        let before = path.where_on_path_extended(-0.1).unwrap();
        assert!(before.position.x < 0.0);
    }

    #[test]
    fn test_degenerate_contours_have_no_path() {
        assert!(CurvePath::build(&[], None).is_none());
        assert!(CurvePath::build(&straight(1), None).is_none());
        let mut flat = straight(3);
        for p in flat[0].points.iter_mut() {
            p.vec = DVec3::ONE;
        }
        assert!(CurvePath::build(&flat, None).is_none());
    }
}
