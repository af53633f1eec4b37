//! Bevel lists: the tessellated, oriented contours of a curve object.
//!
//! A pass runs in five phases over every nurb:
//! 1. tessellate into raw points,
//! 2. weld consecutive duplicates into a fresh list,
//! 3. number closed contours and classify holes by containment,
//! 4. fix the winding of flat contours to match their hole role,
//! 5. compute per-point orientation frames.

mod frame;
mod intersect;

pub use frame::calc_bevel_sin_cos;
pub use intersect::{bevel_inside, segment_intersection, IntersectionKind, SegmentIntersection};

use ckern_core::EvalSettings;
use ckern_math::{DMat3, DVec3};

use crate::edit::EditSession;
use crate::nurb::{Curve, Nurb};
use crate::tessellate::tessellate_curve;

/// One point of a bevel contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BevPoint {
    pub vec: DVec3,
    pub tilt: f64,
    /// Scaled bisector of the turn at this point.
    pub sina: f64,
    pub cosa: f64,
    /// Orientation of 3D curves; identity for flat ones.
    pub mat: DMat3,
    /// Sharp corner from a poly vertex or free/vector Bezier handle.
    pub corner: bool,
    /// Marked for removal by the weld phase.
    pub duplicate: bool,
}

impl BevPoint {
    pub fn new(vec: DVec3, tilt: f64) -> Self {
        Self {
            vec,
            tilt,
            sina: 0.0,
            cosa: 0.0,
            mat: DMat3::IDENTITY,
            corner: false,
            duplicate: false,
        }
    }
}

/// Oriented contour of one nurb.
#[derive(Debug, Clone, PartialEq)]
pub struct BevList {
    pub points: Vec<BevPoint>,
    /// `-1` for open contours, otherwise the 1-based id of the closed polygon.
    pub poly: i32,
    pub hole: bool,
    /// Some Bezier segment collapsed to a single point.
    pub has_vector_segment: bool,
}

impl Default for BevList {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            poly: -1,
            hole: false,
            has_vector_segment: false,
        }
    }
}

impl BevList {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.poly >= 0
    }

    /// Twice the signed xy area; positive for counter-clockwise contours.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let a = self.points[i].vec;
                let b = self.points[(i + 1) % n].vec;
                a.x * b.y - b.x * a.y
            })
            .sum()
    }
}

/// Build one bevel list per nurb.
///
/// When an edit session is active its nurbs are read instead of the
/// curve's. Invalid nurbs give an empty list so lists stay aligned with
/// nurbs.
pub fn build_bevel_lists(
    curve: &Curve,
    edit: Option<&EditSession>,
    settings: &EvalSettings,
) -> Vec<BevList> {
    let nurbs = edit.map(EditSession::nurbs).unwrap_or(curve.nurbs.as_slice());

    let mut lists: Vec<BevList> = nurbs
        .iter()
        .map(|nurb| {
            let raw = emit_raw(nurb, curve.resolution_for(nurb, settings.rendering), settings);
            weld_duplicates(raw, settings)
        })
        .collect();

    classify_holes(&mut lists, curve.is_3d);

    for bl in lists.iter_mut() {
        frame::compute_frames(bl, curve.is_3d);
    }

    tracing::trace!(
        lists = lists.len(),
        points = lists.iter().map(BevList::len).sum::<usize>(),
        "built bevel lists"
    );
    lists
}

impl Curve {
    /// Replace `self.bevel` with a fresh pass.
    pub fn rebuild_bevel(&mut self, edit: Option<&EditSession>, settings: &EvalSettings) {
        self.bevel = build_bevel_lists(self, edit, settings);
    }
}

fn emit_raw(nurb: &Nurb, resolution: usize, settings: &EvalSettings) -> BevList {
    let tess = tessellate_curve(nurb, resolution, settings);
    if tess.samples.is_empty() {
        return BevList::default();
    }
    BevList {
        points: tess
            .samples
            .iter()
            .map(|s| BevPoint {
                corner: s.corner,
                ..BevPoint::new(s.position, s.tilt)
            })
            .collect(),
        poly: if nurb.cyclic_u { 0 } else { -1 },
        hole: false,
        has_vector_segment: tess.has_vector_segment,
    }
}

/// Mark points that coincide with their successor, then copy the survivors
/// into a new list.
fn weld_duplicates(mut bl: BevList, settings: &EvalSettings) -> BevList {
    let n = bl.points.len();
    if n < 2 {
        return bl;
    }

    let mut marked = 0;
    let closing = bl.is_closed().then_some((n - 1, 0));
    for (a, b) in closing.into_iter().chain((1..n).map(|i| (i - 1, i))) {
        if a == b {
            continue;
        }
        let (pa, pb) = (bl.points[a].vec, bl.points[b].vec);
        if settings.welds(pa.to_array(), pb.to_array()) && !bl.points[a].duplicate {
            bl.points[a].duplicate = true;
            marked += 1;
        }
    }
    if marked == 0 {
        return bl;
    }
    if marked == n {
        // Everything collapsed onto one spot; keep a single point.
        bl.points[n - 1].duplicate = false;
    }

    let points: Vec<BevPoint> = bl.points.iter().filter(|p| !p.duplicate).copied().collect();
    tracing::trace!(welded = n - points.len(), "welded duplicate bevel points");
    BevList { points, ..bl }
}

struct SortEntry {
    list: usize,
    left: f64,
    /// Turning direction at the leftmost point.
    dir: bool,
}

/// Number closed contours, classify holes, and fix flat windings.
fn classify_holes(lists: &mut [BevList], is_3d: bool) {
    let mut poly = 0;
    for bl in lists.iter_mut() {
        if !bl.points.is_empty() && bl.poly >= 0 {
            poly += 1;
            bl.poly = poly;
            bl.hole = false;
        }
    }
    if poly == 0 {
        return;
    }

    let mut sorted: Vec<SortEntry> = lists
        .iter()
        .enumerate()
        .filter(|(_, bl)| bl.poly > 0)
        .map(|(list, bl)| {
            let (left, dir) = leftmost_turn(bl);
            SortEntry { list, left, dir }
        })
        .collect();
    sorted.sort_by(|a, b| a.left.total_cmp(&b.left));

    for a in 1..sorted.len() {
        for b in (0..a).rev() {
            let container = &lists[sorted[b].list];
            let candidate = &lists[sorted[a].list];
            if bevel_inside(container, candidate) {
                let hole = !container.hole;
                lists[sorted[a].list].hole = hole;
                break;
            }
        }
    }

    if !is_3d {
        for entry in &sorted {
            let bl = &mut lists[entry.list];
            if bl.hole == entry.dir {
                bl.points.reverse();
            }
        }
    }
}

/// Minimum x of a contour and whether it turns positively at its leftmost
/// point (lowest y among ties).
fn leftmost_turn(bl: &BevList) -> (f64, bool) {
    let pts = &bl.points;
    let n = pts.len();
    let mut i1 = 0;
    for (i, p) in pts.iter().enumerate() {
        let best = pts[i1].vec;
        if p.vec.x < best.x || (p.vec.x == best.x && p.vec.y < best.y) {
            i1 = i;
        }
    }
    let p0 = pts[(i1 + n - 1) % n].vec;
    let p1 = pts[i1].vec;
    let p2 = pts[(i1 + 1) % n].vec;

    let inp = (p1.x - p0.x) * (p0.y - p2.y) + (p0.y - p1.y) * (p0.x - p2.x);
    (p1.x, inp > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nurb::BPoint;

    fn square(cx: f64, cy: f64, half: f64, ccw: bool) -> Nurb {
        let mut pts: Vec<BPoint> = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
            .iter()
            .map(|&(x, y)| BPoint::new(DVec3::new(cx + x * half, cy + y * half, 0.0)))
            .collect();
        if !ccw {
            pts.reverse();
        }
        Nurb::poly(pts, true)
    }

    #[test]
    fn test_invalid_nurb_keeps_empty_slot() {
        let lonely = Nurb::poly(vec![BPoint::new(DVec3::ZERO)], false);
        let curve = Curve::new(vec![lonely, square(0.0, 0.0, 1.0, true)]);
        let lists = build_bevel_lists(&curve, None, &EvalSettings::default());
        assert_eq!(lists.len(), 2);
        assert!(lists[0].is_empty());
        assert_eq!(lists[1].len(), 4);
        assert_eq!(lists[1].poly, 1);
    }

    #[test]
    fn test_weld_removes_repeated_points() {
        let pts = vec![
            BPoint::new(DVec3::ZERO),
            BPoint::new(DVec3::new(1.0, 0.0, 0.0)),
            BPoint::new(DVec3::new(1.0, 0.0, 5e-6)),
            BPoint::new(DVec3::new(2.0, 1.0, 0.0)),
        ];
        let curve = Curve::new(vec![Nurb::poly(pts, false)]);
        let lists = build_bevel_lists(&curve, None, &EvalSettings::default());
        assert_eq!(lists[0].len(), 3);
        assert!(lists[0].points.iter().all(|p| !p.duplicate));
    }

    #[test]
    fn test_open_contour_stays_unnumbered() {
        let pts = vec![
            BPoint::new(DVec3::ZERO),
            BPoint::new(DVec3::new(1.0, 1.0, 0.0)),
            BPoint::new(DVec3::new(2.0, 0.0, 0.0)),
        ];
        let curve = Curve::new(vec![Nurb::poly(pts, false)]);
        let lists = build_bevel_lists(&curve, None, &EvalSettings::default());
        assert_eq!(lists[0].poly, -1);
        // Ends copy the frame of their inner neighbour.
        assert_eq!(lists[0].points[0].sina, lists[0].points[1].sina);
        assert_eq!(lists[0].points[2].cosa, lists[0].points[1].cosa);
    }

    #[test]
    fn test_rebuild_replaces_previous_pass() {
        let mut curve = Curve::new(vec![square(0.0, 0.0, 1.0, true)]);
        curve.rebuild_bevel(None, &EvalSettings::default());
        curve.rebuild_bevel(None, &EvalSettings::default());
        assert_eq!(curve.bevel.len(), 1);
        assert_eq!(curve.bevel[0].poly, 1);
    }

    #[test]
    fn test_edit_session_overrides_curve_nurbs() {
        let curve = Curve::new(vec![square(0.0, 0.0, 1.0, true)]);
        let mut session = EditSession::begin(&curve);
        session.nurbs_mut().push(square(5.0, 0.0, 1.0, true));
        let lists = build_bevel_lists(&curve, Some(&session), &EvalSettings::default());
        assert_eq!(lists.len(), 2);
    }
}
