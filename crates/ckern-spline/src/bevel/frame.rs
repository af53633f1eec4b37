//! Per-point orientation of bevel contours.

use ckern_math::{safe_acos, tilt_quat, vector_to_quat, Axis, DMat3, DVec3, TrackAxis};

use super::BevList;

/// Half-angle turn between the incoming edge `(x1, y1)` and the outgoing
/// edge `(x2, y2)`, returned as `(sina, cosa)`.
///
/// The result points along the bisector and is scaled by `1 / sin(half
/// angle)`, so extruded profiles keep their width across corners. Straight
/// and fully reversed edges fall back to a unit bisector.
pub fn calc_bevel_sin_cos(x1: f64, y1: f64, x2: f64, y2: f64) -> (f64, f64) {
    let mut t01 = (x1 * x1 + y1 * y1).sqrt();
    let mut t02 = (x2 * x2 + y2 * y2).sqrt();
    if t01 == 0.0 {
        t01 = 1.0;
    }
    if t02 == 0.0 {
        t02 = 1.0;
    }

    let (x1, y1) = (x1 / t01, y1 / t01);
    let (x2, y2) = (x2 / t02, y2 / t02);

    let dot = x1 * x2 + y1 * y2;
    let half = if dot.abs() >= 1.0 {
        0.5 * std::f64::consts::PI
    } else {
        0.5 * safe_acos(dot)
    };
    let mut s = half.sin();
    if s == 0.0 {
        s = 1.0;
    }

    let (mut x3, mut y3) = (x1 - x2, y1 - y2);
    if x3 == 0.0 && y3 == 0.0 {
        x3 = y1;
        y3 = -x1;
    } else {
        let len = (x3 * x3 + y3 * y3).sqrt();
        x3 /= len;
        y3 /= len;
    }

    (-y3 / s, x3 / s)
}

/// Rotation frame of a 3D curve point: `-Z` along `dir`, `Y` up, rolled by `tilt`.
fn frame_3d(dir: DVec3, tilt: f64) -> DMat3 {
    let quat = vector_to_quat(dir, TrackAxis::NegZ, Axis::Y);
    let axis = dir.normalize_or_zero();
    if axis == DVec3::ZERO {
        return DMat3::from_quat(quat);
    }
    DMat3::from_quat(tilt_quat(axis, tilt) * quat)
}

/// Fill `sina`, `cosa` and, for 3D curves, `mat` of every point.
pub(crate) fn compute_frames(bl: &mut BevList, is_3d: bool) {
    let n = bl.points.len();
    let pts = &mut bl.points;

    match n {
        0 | 1 => {}
        2 => {
            let d = pts[1].vec - pts[0].vec;
            let (sina, cosa) = calc_bevel_sin_cos(d.x, d.y, -d.x, -d.y);
            for p in pts.iter_mut() {
                p.sina = sina;
                p.cosa = cosa;
            }
            if is_3d {
                let mat = frame_3d(d, pts[1].tilt);
                pts[0].mat = mat;
                pts[1].mat = mat;
            }
        }
        _ => {
            for cur in 0..n {
                let prev = pts[(cur + n - 1) % n].vec;
                let next = pts[(cur + 1) % n].vec;
                let here = pts[cur].vec;
                let (sina, cosa) = calc_bevel_sin_cos(
                    here.x - prev.x,
                    here.y - prev.y,
                    next.x - here.x,
                    next.y - here.y,
                );
                pts[cur].sina = sina;
                pts[cur].cosa = cosa;
                if is_3d {
                    pts[cur].mat = frame_3d(next - prev, pts[cur].tilt);
                }
            }

            // Open ends have no wrap-around neighbour: reuse the inner frame.
            if bl.poly < 0 {
                let (first, last) = (0, n - 1);
                for (end, inner) in [(first, first + 1), (last, last - 1)] {
                    let src = pts[inner];
                    pts[end].sina = src.sina;
                    pts[end].cosa = src.cosa;
                    pts[end].mat = src.mat;
                }
            }
        }
    }
}
