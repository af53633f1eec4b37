//! 2D segment intersection and contour containment in the xy plane.

use ckern_math::{DVec2, DVec3};

use super::BevList;

/// Outcome of intersecting two segments' supporting lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionKind {
    /// Parallel or collinear lines.
    Collinear,
    /// Lines cross outside at least one segment.
    None,
    /// Segments meet at an end point of either.
    Touching,
    /// Segments cross strictly inside both.
    Crossing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentIntersection {
    pub kind: IntersectionKind,
    /// Parameter along the first segment.
    pub lambda: f64,
    /// Parameter along the second segment.
    pub mu: f64,
    pub point: DVec2,
}

/// Intersect segments `v1 -> v2` and `v3 -> v4` in the xy plane.
pub fn segment_intersection(v1: DVec2, v2: DVec2, v3: DVec2, v4: DVec2) -> SegmentIntersection {
    let deler = (v1.x - v2.x) * (v3.y - v4.y) - (v3.x - v4.x) * (v1.y - v2.y);
    if deler == 0.0 {
        return SegmentIntersection {
            kind: IntersectionKind::Collinear,
            lambda: 0.0,
            mu: 0.0,
            point: v1,
        };
    }

    let lambda = -((v1.y - v3.y) * (v3.x - v4.x) - (v1.x - v3.x) * (v3.y - v4.y)) / deler;

    let mu = if v3.y - v4.y == 0.0 {
        -(lambda * (v2.x - v1.x) + v1.x - v3.x) / (v3.x - v4.x)
    } else {
        -(lambda * (v2.y - v1.y) + v1.y - v3.y) / (v3.y - v4.y)
    };
    let point = v1 + lambda * (v2 - v1);

    let inside = |t: f64| (0.0..=1.0).contains(&t);
    let kind = if inside(lambda) && inside(mu) {
        if lambda == 0.0 || lambda == 1.0 || mu == 0.0 || mu == 1.0 {
            IntersectionKind::Touching
        } else {
            IntersectionKind::Crossing
        }
    } else {
        IntersectionKind::None
    };

    SegmentIntersection {
        kind,
        lambda,
        mu,
        point,
    }
}

/// Whether `candidate` lies inside the closed contour `container`.
///
/// A horizontal line through the candidate's first point is crossed with
/// every non-horizontal edge of the container; the candidate is inside when
/// the crossings on both sides of that point are odd. An edge hit exactly at
/// its start vertex is not counted, so shared vertices count once.
pub fn bevel_inside(container: &BevList, candidate: &BevList) -> bool {
    let Some(first) = candidate.points.first() else {
        return false;
    };
    let h1 = first.vec.truncate();
    let h2 = h1 + DVec2::new(1000.0, 0.0);

    let pts = &container.points;
    let Some(last) = pts.last() else {
        return false;
    };

    let mut left = 0usize;
    let mut right = 0usize;
    let mut prev: DVec3 = last.vec;
    for bp in pts {
        let cur = bp.vec;
        let (min, max) = if cur.y < prev.y {
            (cur.y, prev.y)
        } else {
            (prev.y, cur.y)
        };
        if min != max && min <= h1.y && max >= h1.y {
            let hit = segment_intersection(prev.truncate(), cur.truncate(), h1, h2);
            if hit.kind != IntersectionKind::Collinear && hit.lambda != 0.0 {
                if hit.point.x < h1.x {
                    left += 1;
                } else {
                    right += 1;
                }
            }
        }
        prev = cur;
    }

    left % 2 == 1 && right % 2 == 1
}
