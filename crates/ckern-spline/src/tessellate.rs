//! Dense sampling of poly, Bezier and NURBS control data.

use ckern_core::EvalSettings;
use ckern_math::{blend4, four_point_weights, DVec3};

use crate::basis::BasisEvaluator;
use crate::nurb::{BPoint, BezTriple, ControlPoints, HandleType, Nurb};

/// One tessellated curve point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    pub position: DVec3,
    pub tilt: f64,
    /// Sharp point: a poly vertex or the start of a Bezier segment with a
    /// free or vector handle.
    pub corner: bool,
}

impl CurveSample {
    fn new(position: DVec3, tilt: f64) -> Self {
        Self {
            position,
            tilt,
            corner: false,
        }
    }
}

/// Samples of one curve-kind nurb.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tessellation {
    pub samples: Vec<CurveSample>,
    /// At least one Bezier segment collapsed to its start anchor.
    pub has_vector_segment: bool,
}

/// Samples of a NURBS surface, `u_count x v_count`, v varying fastest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceGrid {
    pub u_count: usize,
    pub v_count: usize,
    pub points: Vec<DVec3>,
}

impl SurfaceGrid {
    pub fn get(&self, u: usize, v: usize) -> Option<DVec3> {
        if u >= self.u_count || v >= self.v_count {
            return None;
        }
        self.points.get(u * self.v_count + v).copied()
    }
}

/// Evaluate a cubic polynomial in Bezier form at `it + 1` evenly spaced
/// parameters with forward differences.
///
/// # Arguments
/// * `q0`, `q3` - End values
/// * `q1`, `q2` - Inner control values
/// * `it` - Number of steps
pub fn forward_diff_bezier(q0: f64, q1: f64, q2: f64, q3: f64, it: usize) -> Vec<f64> {
    let f = it.max(1) as f64;
    let rt0 = q0;
    let rt1 = 3.0 * (q1 - q0) / f;
    let f2 = f * f;
    let rt2 = 3.0 * (q0 - 2.0 * q1 + q2) / f2;
    let f3 = f2 * f;
    let rt3 = (q3 - q0 + 3.0 * (q1 - q2)) / f3;

    let mut p = rt0;
    let mut d1 = rt1 + rt2 + rt3;
    let mut d2 = 2.0 * rt2 + 6.0 * rt3;
    let d3 = 6.0 * rt3;

    let mut out = Vec::with_capacity(it + 1);
    for _ in 0..=it {
        out.push(p);
        p += d1;
        d1 += d2;
        d2 += d3;
    }
    out
}

/// `resolution + 1` points of the cubic between two Bezier anchors.
pub fn bezier_segment(prev: &BezTriple, next: &BezTriple, resolution: usize) -> Vec<DVec3> {
    let axis = |j: usize| {
        forward_diff_bezier(
            prev.vec[1][j],
            prev.vec[2][j],
            next.vec[0][j],
            next.vec[1][j],
            resolution,
        )
    };
    let (xs, ys, zs) = (axis(0), axis(1), axis(2));
    xs.into_iter()
        .zip(ys)
        .zip(zs)
        .map(|((x, y), z)| DVec3::new(x, y, z))
        .collect()
}

/// Tilt along the Bezier segment ending at `index`, `resolution` samples
/// starting at the previous anchor.
///
/// The previous anchor is `index - 1`, or the last one when `index` is 0
/// on a cyclic nurb. Outer neighbours wrap when cyclic and clamp otherwise.
pub fn bezier_segment_tilt(nurb: &Nurb, index: usize, resolution: usize) -> Vec<f64> {
    let Some(triples) = nurb.control.bezier() else {
        return Vec::new();
    };
    let n = triples.len();
    if n == 0 || index >= n {
        return Vec::new();
    }
    let last = n - 1;
    let cyclic = nurb.cyclic_u;

    let prev = if index == 0 { last } else { index - 1 };
    let pprev = match prev {
        0 if cyclic => last,
        0 => 0,
        p => p - 1,
    };
    let next = match index {
        i if i == last && cyclic => 0,
        i if i == last => last,
        i => i + 1,
    };

    let tilts = [
        triples[pprev].tilt,
        triples[prev].tilt,
        triples[index].tilt,
        triples[next].tilt,
    ];
    let step = 1.0 / resolution.max(1) as f64;
    (0..resolution)
        .map(|a| blend4(&four_point_weights(a as f64 * step, nurb.tilt_interp), tilts))
        .collect()
}

fn is_sharp(h: HandleType) -> bool {
    matches!(h, HandleType::Free | HandleType::Vector)
}

/// Tessellate a curve-kind nurb at `resolution` samples per segment.
///
/// Surfaces and invalid nurbs yield an empty tessellation.
pub fn tessellate_curve(nurb: &Nurb, resolution: usize, settings: &EvalSettings) -> Tessellation {
    if !nurb.is_valid_u() || nurb.is_surface() {
        return Tessellation::default();
    }
    match &nurb.control {
        ControlPoints::Poly(points) => Tessellation {
            samples: points
                .iter()
                .map(|bp| CurveSample {
                    corner: true,
                    ..CurveSample::new(bp.position(), bp.tilt)
                })
                .collect(),
            has_vector_segment: false,
        },
        ControlPoints::Bezier(triples) => tessellate_bezier(nurb, triples, resolution, settings),
        ControlPoints::Nurbs(_) => Tessellation {
            samples: tessellate_nurbs_curve(nurb, resolution),
            has_vector_segment: false,
        },
    }
}

fn tessellate_bezier(
    nurb: &Nurb,
    triples: &[BezTriple],
    resolution: usize,
    settings: &EvalSettings,
) -> Tessellation {
    let n = triples.len();
    if n < 2 {
        return Tessellation::default();
    }
    let cyclic = nurb.cyclic_u;
    let resolution = resolution.max(1);
    let mut out = Tessellation {
        samples: Vec::with_capacity(resolution * (n + cyclic as usize - 1) + 1),
        has_vector_segment: false,
    };

    // Cyclic curves start with the closing segment from the last anchor.
    let indices: Vec<(usize, usize)> = if cyclic {
        (0..n).map(|i| (if i == 0 { n - 1 } else { i - 1 }, i)).collect()
    } else {
        (1..n).map(|i| (i - 1, i)).collect()
    };

    for (p, c) in indices {
        let prev = &triples[p];
        let cur = &triples[c];

        if settings.collapse_vector_segments
            && prev.h2 == HandleType::Vector
            && cur.h1 == HandleType::Vector
        {
            out.samples.push(CurveSample {
                corner: true,
                ..CurveSample::new(prev.anchor(), prev.tilt)
            });
            out.has_vector_segment = true;
            continue;
        }

        let points = bezier_segment(prev, cur, resolution);
        let tilts = bezier_segment_tilt(nurb, c, resolution);
        let corner = is_sharp(prev.h1) || is_sharp(prev.h2);
        for (k, (pos, tilt)) in points.into_iter().zip(tilts).enumerate() {
            out.samples.push(CurveSample {
                corner: k == 0 && corner,
                ..CurveSample::new(pos, tilt)
            });
        }
    }

    if !cyclic {
        let end = &triples[n - 1];
        out.samples.push(CurveSample::new(end.anchor(), end.tilt));
    }
    out
}

/// Control point of a cyclic-wrapped index.
fn wrapped(points: &[BPoint], i: usize) -> &BPoint {
    &points[i % points.len()]
}

/// `resolution * segments` samples of a NURBS curve, xyz plus tilt.
///
/// Basis weights are divided by their sum only when some control weight
/// differs from 1.
pub fn tessellate_nurbs_curve(nurb: &Nurb, resolution: usize) -> Vec<CurveSample> {
    let (Some(points), Some(knots)) = (nurb.control.bpoints(), nurb.knots_u.as_ref()) else {
        tracing::debug!("NURBS curve without knots, nothing to tessellate");
        return Vec::new();
    };
    let pnts = nurb.points_u;
    let order = nurb.order_u;
    if pnts <= 1 || points.len() < pnts {
        return Vec::new();
    }
    let cyclic = nurb.cyclic_u;
    let Some((ustart, uend)) = knots.domain(pnts, order, cyclic) else {
        return Vec::new();
    };

    let total = resolution * nurb.segments_u();
    if total == 0 {
        return Vec::new();
    }
    let divisions = (total - 1 + cyclic as usize).max(1);
    let ustep = (uend - ustart) / divisions as f64;
    let seen = if cyclic { pnts + order - 1 } else { pnts };
    let rational = nurb.is_rational();

    let mut basis = BasisEvaluator::new();
    let mut sum = Vec::with_capacity(order);
    let mut out = Vec::with_capacity(total);
    let mut u = ustart;

    for _ in 0..total {
        let Some((istart, iend)) = basis.evaluate(u, order, seen, knots.as_slice()) else {
            out.push(CurveSample::new(DVec3::ZERO, 0.0));
            u += ustep;
            continue;
        };

        sum.clear();
        let mut sumdiv = 0.0;
        for i in istart..=iend {
            let w = basis.weight(i) * wrapped(points, i).weight();
            sum.push(w);
            sumdiv += w;
        }
        if rational && sumdiv != 0.0 {
            for w in sum.iter_mut() {
                *w /= sumdiv;
            }
        }

        let mut position = DVec3::ZERO;
        let mut tilt = 0.0;
        for (i, w) in (istart..=iend).zip(sum.iter()) {
            let bp = wrapped(points, i);
            position += *w * bp.position();
            tilt += *w * bp.tilt;
        }
        out.push(CurveSample::new(position, tilt));
        u += ustep;
    }
    out
}

/// Parameter samples and per-sample basis support along one surface axis.
fn axis_samples(
    knots: &[f64],
    pnts: usize,
    order: usize,
    cyclic: bool,
    count: usize,
    domain: (f64, f64),
) -> Vec<Option<(usize, usize, Vec<f64>)>> {
    let divisions = (count - 1 + cyclic as usize).max(1);
    let step = (domain.1 - domain.0) / divisions as f64;
    let seen = if cyclic { pnts + order - 1 } else { pnts };
    let mut basis = BasisEvaluator::new();
    (0..count)
        .map(|k| {
            let t = domain.0 + k as f64 * step;
            basis
                .evaluate(t, order, seen, knots)
                .map(|(s, e)| (s, e, (s..=e).map(|i| basis.weight(i)).collect()))
        })
        .collect()
}

/// `resolution_u x resolution_v` samples of a NURBS surface.
pub fn tessellate_nurbs_surface(nurb: &Nurb) -> Option<SurfaceGrid> {
    let points = nurb.control.bpoints()?;
    let ku = nurb.knots_u.as_ref()?;
    let kv = nurb.knots_v.as_ref()?;
    let (pu, pv) = (nurb.points_u, nurb.points_v);
    if !nurb.is_surface() || points.len() != pu * pv {
        return None;
    }
    let (ru, rv) = (nurb.resolution_u, nurb.resolution_v);
    if ru == 0 || rv == 0 {
        return None;
    }

    let du = ku.domain(pu, nurb.order_u, nurb.cyclic_u)?;
    let dv = kv.domain(pv, nurb.order_v, nurb.cyclic_v)?;
    let us = axis_samples(ku.as_slice(), pu, nurb.order_u, nurb.cyclic_u, ru, du);
    let vs = axis_samples(kv.as_slice(), pv, nurb.order_v, nurb.cyclic_v, rv, dv);
    let rational = nurb.is_rational();

    let mut grid = SurfaceGrid {
        u_count: ru,
        v_count: rv,
        points: Vec::with_capacity(ru * rv),
    };
    let mut sum = Vec::new();

    for u in &us {
        for v in &vs {
            let (Some((is, ie, bu)), Some((js, je, bv))) = (u, v) else {
                grid.points.push(DVec3::ZERO);
                continue;
            };

            sum.clear();
            let mut sumdiv = 0.0;
            for (j, wv) in (*js..=*je).zip(bv) {
                for (i, wu) in (*is..=*ie).zip(bu) {
                    let bp = &points[(j % pv) * pu + i % pu];
                    let w = wu * wv * bp.weight();
                    sum.push((bp.position(), w));
                    sumdiv += w;
                }
            }
            let norm = if rational && sumdiv != 0.0 { sumdiv } else { 1.0 };
            grid.points
                .push(sum.iter().fold(DVec3::ZERO, |acc, (p, w)| acc + *p * (*w / norm)));
        }
    }
    Some(grid)
}
