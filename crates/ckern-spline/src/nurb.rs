//! Curve and surface control data: Bezier triples, weighted points, and the
//! `Nurb` container that tags which of the three curve kinds it holds.

use ckern_core::traits::{BoundingBox, Validate};
use ckern_core::{KernelError, Result};
use ckern_math::{Aabb3, DVec3, DVec4, Interpolation};
use serde::{Deserialize, Serialize};

use crate::bevel::BevList;
use crate::knot::{self, KnotStyle, KnotVector};

/// Default samples per segment for new curves.
pub const DEFAULT_RESOLUTION: usize = 12;
/// Default order for new NURBS curves (cubic).
pub const DEFAULT_ORDER: usize = 4;

/// Handle behaviour of one side of a [`BezTriple`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HandleType {
    Free = 0,
    #[default]
    Auto = 1,
    Vector = 2,
    Align = 3,
}

impl HandleType {
    pub fn as_raw(self) -> u8 {
        self as u8
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Free),
            1 => Some(Self::Auto),
            2 => Some(Self::Vector),
            3 => Some(Self::Align),
            _ => None,
        }
    }
}

/// Bezier control triple: left handle, anchor, right handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezTriple {
    pub vec: [DVec3; 3],
    /// Roll around the tangent, radians.
    pub tilt: f64,
    pub h1: HandleType,
    pub h2: HandleType,
    /// Selection of left handle, anchor, right handle.
    pub select: [bool; 3],
}

impl BezTriple {
    /// Triple with both handles collapsed onto `anchor` and set to `Auto`.
    pub fn new(anchor: DVec3) -> Self {
        Self {
            vec: [anchor; 3],
            tilt: 0.0,
            h1: HandleType::Auto,
            h2: HandleType::Auto,
            select: [false; 3],
        }
    }

    pub fn with_handles(left: DVec3, anchor: DVec3, right: DVec3) -> Self {
        Self {
            vec: [left, anchor, right],
            tilt: 0.0,
            h1: HandleType::Free,
            h2: HandleType::Free,
            select: [false; 3],
        }
    }

    pub fn with_types(mut self, h1: HandleType, h2: HandleType) -> Self {
        self.h1 = h1;
        self.h2 = h2;
        self
    }

    pub fn left(&self) -> DVec3 {
        self.vec[0]
    }

    pub fn anchor(&self) -> DVec3 {
        self.vec[1]
    }

    pub fn right(&self) -> DVec3 {
        self.vec[2]
    }

    pub fn is_selected(&self) -> bool {
        self.select.iter().any(|&s| s)
    }

    /// Selection as a 3-bit mask (left = 1, anchor = 2, right = 4).
    pub(crate) fn select_mask(&self) -> u8 {
        (self.select[0] as u8) | (self.select[1] as u8) << 1 | (self.select[2] as u8) << 2
    }

    /// Mirror the triple for a reversed curve direction.
    fn flip(&mut self) {
        self.vec.swap(0, 2);
        std::mem::swap(&mut self.h1, &mut self.h2);
        self.select.swap(0, 2);
        self.tilt = -self.tilt;
    }
}

/// Homogeneous control point: xyz plus rational weight in `w`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BPoint {
    pub vec: DVec4,
    pub tilt: f64,
    pub select: bool,
}

impl BPoint {
    pub fn new(pos: DVec3) -> Self {
        Self::weighted(pos, 1.0)
    }

    pub fn weighted(pos: DVec3, weight: f64) -> Self {
        Self {
            vec: pos.extend(weight),
            tilt: 0.0,
            select: false,
        }
    }

    pub fn position(&self) -> DVec3 {
        self.vec.truncate()
    }

    pub fn weight(&self) -> f64 {
        self.vec.w
    }
}

/// The control data of a [`Nurb`], one variant per curve kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlPoints {
    /// Straight segments between points.
    Poly(Vec<BPoint>),
    /// Cubic Bezier segments between triples.
    Bezier(Vec<BezTriple>),
    /// Rational B-spline, possibly a `points_u x points_v` surface grid.
    Nurbs(Vec<BPoint>),
}

/// Discriminant of [`ControlPoints`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NurbKind {
    Poly,
    Bezier,
    Nurbs,
}

impl ControlPoints {
    pub fn kind(&self) -> NurbKind {
        match self {
            Self::Poly(_) => NurbKind::Poly,
            Self::Bezier(_) => NurbKind::Bezier,
            Self::Nurbs(_) => NurbKind::Nurbs,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Poly(p) | Self::Nurbs(p) => p.len(),
            Self::Bezier(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Weighted points of a poly or NURBS nurb.
    pub fn bpoints(&self) -> Option<&[BPoint]> {
        match self {
            Self::Poly(p) | Self::Nurbs(p) => Some(p),
            Self::Bezier(_) => None,
        }
    }

    pub fn bpoints_mut(&mut self) -> Option<&mut Vec<BPoint>> {
        match self {
            Self::Poly(p) | Self::Nurbs(p) => Some(p),
            Self::Bezier(_) => None,
        }
    }

    pub fn bezier(&self) -> Option<&[BezTriple]> {
        match self {
            Self::Bezier(b) => Some(b),
            _ => None,
        }
    }

    pub fn bezier_mut(&mut self) -> Option<&mut Vec<BezTriple>> {
        match self {
            Self::Bezier(b) => Some(b),
            _ => None,
        }
    }
}

/// One curve (or surface) of a [`Curve`] object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nurb {
    pub control: ControlPoints,
    pub points_u: usize,
    pub points_v: usize,
    pub order_u: usize,
    pub order_v: usize,
    pub cyclic_u: bool,
    pub cyclic_v: bool,
    pub knot_style_u: KnotStyle,
    pub knot_style_v: KnotStyle,
    pub resolution_u: usize,
    pub resolution_v: usize,
    pub tilt_interp: Interpolation,
    pub knots_u: Option<KnotVector>,
    pub knots_v: Option<KnotVector>,
}

impl Nurb {
    fn with_control(control: ControlPoints, points_u: usize, points_v: usize) -> Self {
        Self {
            control,
            points_u,
            points_v,
            order_u: DEFAULT_ORDER,
            order_v: DEFAULT_ORDER,
            cyclic_u: false,
            cyclic_v: false,
            knot_style_u: KnotStyle::Uniform,
            knot_style_v: KnotStyle::Uniform,
            resolution_u: DEFAULT_RESOLUTION,
            resolution_v: DEFAULT_RESOLUTION,
            tilt_interp: Interpolation::default(),
            knots_u: None,
            knots_v: None,
        }
    }

    pub fn poly(points: Vec<BPoint>, cyclic: bool) -> Self {
        let n = points.len();
        let mut nurb = Self::with_control(ControlPoints::Poly(points), n, 1);
        nurb.cyclic_u = cyclic;
        nurb.order_u = 1;
        nurb.order_v = 1;
        nurb
    }

    pub fn bezier(triples: Vec<BezTriple>, cyclic: bool) -> Self {
        let n = triples.len();
        let mut nurb = Self::with_control(ControlPoints::Bezier(triples), n, 1);
        nurb.cyclic_u = cyclic;
        nurb.order_v = 1;
        nurb
    }

    /// NURBS curve with freshly generated knots.
    pub fn nurbs_curve(points: Vec<BPoint>, order: usize, cyclic: bool, style: KnotStyle) -> Self {
        let n = points.len();
        let mut nurb = Self::with_control(ControlPoints::Nurbs(points), n, 1);
        nurb.order_u = order;
        nurb.order_v = 1;
        nurb.cyclic_u = cyclic;
        nurb.knot_style_u = style;
        nurb.make_knots();
        nurb
    }

    /// NURBS surface over a `points_u x points_v` grid stored u-fastest.
    pub fn nurbs_surface(
        points: Vec<BPoint>,
        points_u: usize,
        points_v: usize,
        order_u: usize,
        order_v: usize,
    ) -> Result<Self> {
        if points.len() != points_u * points_v {
            return Err(KernelError::InvalidOperation(format!(
                "surface grid {}x{} needs {} points, got {}",
                points_u,
                points_v,
                points_u * points_v,
                points.len()
            )));
        }
        let mut nurb = Self::with_control(ControlPoints::Nurbs(points), points_u, points_v);
        nurb.order_u = order_u;
        nurb.order_v = order_v;
        nurb.make_knots();
        Ok(nurb)
    }

    pub fn kind(&self) -> NurbKind {
        self.control.kind()
    }

    pub fn is_surface(&self) -> bool {
        self.kind() == NurbKind::Nurbs && self.points_v > 1
    }

    /// Segments along u: one per point when cyclic, otherwise one fewer.
    pub fn segments_u(&self) -> usize {
        if self.cyclic_u {
            self.points_u
        } else {
            self.points_u.saturating_sub(1)
        }
    }

    pub fn is_valid_u(&self) -> bool {
        match self.kind() {
            NurbKind::Nurbs => {
                knot::is_valid_axis(self.points_u, self.order_u, self.cyclic_u, self.knot_style_u)
            }
            _ => self.points_u > 1,
        }
    }

    pub fn is_valid_v(&self) -> bool {
        if !self.is_surface() {
            return true;
        }
        knot::is_valid_axis(self.points_v, self.order_v, self.cyclic_v, self.knot_style_v)
    }

    /// Regenerate the knot vectors of a NURBS nurb; a no-op for other kinds.
    pub fn make_knots(&mut self) {
        if self.kind() != NurbKind::Nurbs {
            return;
        }
        self.knots_u = non_empty(KnotVector::build(
            self.points_u,
            self.order_u,
            self.cyclic_u,
            self.knot_style_u,
        ));
        self.knots_v = if self.points_v > 1 {
            non_empty(KnotVector::build(
                self.points_v,
                self.order_v,
                self.cyclic_v,
                self.knot_style_v,
            ))
        } else {
            None
        };
    }

    /// Length of the u knot vector for the current point count and order.
    pub fn knots_u_len(&self) -> usize {
        knot::knot_count(self.points_u, self.order_u, self.cyclic_u)
    }

    /// True when any control weight differs from 1 (rational evaluation).
    pub fn is_rational(&self) -> bool {
        self.control
            .bpoints()
            .map(|pts| pts.iter().any(|p| p.weight() != 1.0))
            .unwrap_or(false)
    }

    /// Reverse the u direction: point order, handle sides and knot spacing.
    pub fn switch_direction(&mut self) {
        match &mut self.control {
            ControlPoints::Bezier(triples) => {
                triples.reverse();
                for bezt in triples.iter_mut() {
                    bezt.flip();
                }
            }
            ControlPoints::Poly(points) | ControlPoints::Nurbs(points) => {
                let (pu, pv) = (self.points_u.max(1), self.points_v.max(1));
                if points.len() == pu * pv {
                    for row in points.chunks_mut(pu) {
                        row.reverse();
                    }
                } else {
                    points.reverse();
                }
                if let Some(knots) = self.knots_u.as_mut() {
                    knots.mirror();
                }
            }
        }
    }
}

fn non_empty(knots: KnotVector) -> Option<KnotVector> {
    if knots.is_empty() {
        None
    } else {
        Some(knots)
    }
}

impl Validate for Nurb {
    fn validate(&self) -> Result<()> {
        let expected = self.points_u * self.points_v.max(1);
        if self.control.len() != expected {
            return Err(KernelError::InvalidOperation(format!(
                "nurb declares {} control points but holds {}",
                expected,
                self.control.len()
            )));
        }
        if !self.is_valid_u() {
            return Err(KernelError::Degenerate(format!(
                "{} points with order {} cannot form a curve",
                self.points_u, self.order_u
            )));
        }
        if !self.is_valid_v() {
            return Err(KernelError::Degenerate(format!(
                "{} v points with order {} cannot form a surface",
                self.points_v, self.order_v
            )));
        }
        if let Some(knots) = &self.knots_u {
            if knots.len() != self.knots_u_len() {
                return Err(KernelError::InvalidOperation(format!(
                    "u knot vector has {} entries, expected {}",
                    knots.len(),
                    self.knots_u_len()
                )));
            }
        }
        Ok(())
    }
}

impl BoundingBox for Nurb {
    type Point = DVec3;

    fn bounding_box(&self) -> Option<(DVec3, DVec3)> {
        let aabb = match &self.control {
            ControlPoints::Bezier(triples) => {
                Aabb3::from_points(triples.iter().flat_map(|b| b.vec.iter().copied()))
            }
            ControlPoints::Poly(points) | ControlPoints::Nurbs(points) => {
                Aabb3::from_points(points.iter().map(BPoint::position))
            }
        }?;
        Some((aabb.min, aabb.max))
    }
}

/// A curve object: a list of nurbs plus the derived bevel lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub nurbs: Vec<Nurb>,
    pub is_3d: bool,
    /// Curve deformation maps the target's full extent onto the whole path.
    pub stretch: bool,
    /// Resolution used when rendering; 0 keeps each nurb's own.
    pub render_resolution: usize,
    /// Output of the last bevel pass, one list per nurb.
    #[serde(skip)]
    pub bevel: Vec<BevList>,
}

impl Curve {
    pub fn new(nurbs: Vec<Nurb>) -> Self {
        Self {
            nurbs,
            ..Self::default()
        }
    }

    pub fn with_3d(mut self, is_3d: bool) -> Self {
        self.is_3d = is_3d;
        self
    }

    /// Resolution along u for `nurb` under the given render flag.
    pub fn resolution_for(&self, nurb: &Nurb, rendering: bool) -> usize {
        if rendering && self.render_resolution != 0 {
            self.render_resolution
        } else {
            nurb.resolution_u
        }
    }
}

impl BoundingBox for Curve {
    type Point = DVec3;

    fn bounding_box(&self) -> Option<(DVec3, DVec3)> {
        self.nurbs
            .iter()
            .filter_map(|n| n.bounding_box())
            .map(|(min, max)| Aabb3::new(min, max))
            .reduce(|a, b| a.merge(&b))
            .map(|b| (b.min, b.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_bpoints() -> Vec<BPoint> {
        [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| BPoint::new(DVec3::new(x, y, 0.0)))
            .collect()
    }

    #[test]
    fn test_nurbs_curve_gets_knots() {
        let nurb = Nurb::nurbs_curve(square_bpoints(), 3, false, KnotStyle::Endpoint);
        let knots = nurb.knots_u.as_ref().unwrap();
        assert_eq!(knots.len(), 7);
        assert!(nurb.validate().is_ok());
    }

    #[test]
    fn test_order_above_point_count_is_invalid() {
        let nurb = Nurb::nurbs_curve(square_bpoints(), 5, false, KnotStyle::Uniform);
        assert!(nurb.knots_u.is_none());
        assert!(matches!(nurb.validate(), Err(KernelError::Degenerate(_))));
    }

    #[test]
    fn test_surface_grid_size_checked() {
        assert!(Nurb::nurbs_surface(square_bpoints(), 3, 2, 2, 2).is_err());
        let s = Nurb::nurbs_surface(square_bpoints(), 2, 2, 2, 2).unwrap();
        assert!(s.is_surface());
        assert_eq!(s.knots_v.as_ref().map(|k| k.len()), Some(4));
    }

    #[test]
    fn test_switch_direction_bezier_swaps_handles() {
        let a = BezTriple::with_handles(DVec3::new(-1.0, 0.0, 0.0), DVec3::ZERO, DVec3::X)
            .with_types(HandleType::Vector, HandleType::Free);
        let b = BezTriple::new(DVec3::new(3.0, 0.0, 0.0));
        let mut nurb = Nurb::bezier(vec![a, b], false);
        nurb.switch_direction();

        let triples = nurb.control.bezier().unwrap();
        assert_eq!(triples[1].anchor(), DVec3::ZERO);
        assert_eq!(triples[1].left(), DVec3::X);
        assert_eq!(triples[1].h1, HandleType::Free);
        assert_eq!(triples[1].h2, HandleType::Vector);
    }

    #[test]
    fn test_switch_direction_mirrors_knot_spacing() {
        let pts: Vec<BPoint> = (0..5).map(|i| BPoint::new(DVec3::new(i as f64, 0.0, 0.0))).collect();
        let mut nurb = Nurb::nurbs_curve(pts, 3, false, KnotStyle::Endpoint);
        let before = nurb.knots_u.clone().unwrap();
        nurb.switch_direction();
        let after = nurb.knots_u.clone().unwrap();
        let n = before.len();
        for i in 0..n {
            let d_before = before.as_slice()[n - 1] - before.as_slice()[n - 1 - i];
            assert!((after.as_slice()[i] - after.as_slice()[0] - d_before).abs() < 1e-12);
        }
        let first = nurb.control.bpoints().unwrap()[0].position();
        assert_eq!(first, DVec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_curve_bounding_box_spans_nurbs() {
        let a = Nurb::poly(square_bpoints(), true);
        let b = Nurb::poly(vec![BPoint::new(DVec3::new(-2.0, 5.0, 1.0)), BPoint::new(DVec3::ZERO)], false);
        let curve = Curve::new(vec![a, b]);
        let (min, max) = curve.bounding_box().unwrap();
        assert_eq!(min, DVec3::new(-2.0, 0.0, 0.0));
        assert_eq!(max, DVec3::new(1.0, 5.0, 1.0));
    }

    #[test]
    fn test_handle_type_raw_values() {
        assert_eq!(HandleType::Vector.as_raw(), 2);
        assert_eq!(HandleType::from_raw(3), Some(HandleType::Align));
        assert_eq!(HandleType::from_raw(9), None);
    }
}
