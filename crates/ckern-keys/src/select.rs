//! Choosing the blocks that bracket a key time.

use ckern_math::{four_point_weights, Interpolation};

use crate::key::{Key, KeyBlockId};

/// Result of [`select_keys`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeySelection {
    /// The time sits on one block; copy it.
    Copy(KeyBlockId),
    /// Blend four blocks with the given weights.
    Blend {
        keys: [KeyBlockId; 4],
        weights: [f64; 4],
    },
}

/// Find the blocks around `time` and their blend weights.
///
/// Times are clamped to the first and last block positions, or wrapped into
/// that span for cyclic keys. Missing neighbours at either end repeat the
/// nearest block. A time on or outside an interpolating pair of blocks
/// degrades to a copy. Returns `None` for a key without blocks.
pub fn select_keys(time: f64, key: &Key) -> Option<KeySelection> {
    let ids = &key.order;
    let n = ids.len();
    let pos = |i: usize| key.blocks[ids[i]].pos;
    let interp = |i: usize| key.blocks[ids[i]].interp;

    if n == 0 {
        return None;
    }
    let first = pos(0);
    if n == 1 {
        return Some(KeySelection::Copy(ids[0]));
    }
    let last = pos(n - 1);
    let dpos = last - first;
    let cyclic = key.cyclic && dpos > 0.0;

    let mut fac = if cyclic {
        first + (time - first).rem_euclid(dpos)
    } else {
        time.clamp(first, last)
    };

    let mut k = [0usize; 4];
    let mut t = [first; 4];
    let mut ofs = 0.0;

    if cyclic {
        k[0] = n - 1;
        k[2] = 1;
        k[3] = if n > 2 { 2 } else { 0 };
        t[0] = pos(k[0]);
        t[1] += dpos;
        t[2] = pos(k[2]) + dpos;
        t[3] = pos(k[3]) + dpos;
        fac += dpos;
        ofs = dpos;
        if k[3] == k[1] {
            t[3] += dpos;
            ofs = 2.0 * dpos;
        }
        if fac < t[1] {
            fac += dpos;
        }
    } else {
        k[2] = 1;
        t[2] = pos(1);
        k[3] = if n > 2 { 2 } else { 1 };
        t[3] = pos(k[3]);
    }
    let mut cursor = k[3];

    // Every step moves at least one block forward; a full lap and a half
    // always reaches a wrapped time.
    for _ in 0..(2 * n + 4) {
        if t[2] >= fac {
            break;
        }
        if cursor + 1 == n {
            if cyclic {
                cursor = 0;
                ofs += dpos;
            } else if t[2] == t[3] {
                break;
            }
        } else {
            cursor += 1;
        }
        k = [k[1], k[2], k[3], cursor];
        t = [t[1], t[2], t[3], pos(cursor) + ofs];
    }

    let bspline = interp(k[1]) == Interpolation::BSpline || interp(k[2]) == Interpolation::BSpline;

    if !cyclic {
        if !bspline {
            if fac <= t[1] {
                return Some(KeySelection::Copy(ids[k[1]]));
            }
            if fac >= t[2] {
                return Some(KeySelection::Copy(ids[k[2]]));
            }
        } else if fac > t[2] {
            fac = t[2];
            k[3] = k[2];
        }
    }

    let span = t[2] - t[1];
    let d = if span == 0.0 {
        if !bspline {
            return Some(KeySelection::Copy(ids[k[2]]));
        }
        0.0
    } else {
        (fac - t[1]) / span
    };

    let mut weights = four_point_weights(d, interp(k[1]));
    if interp(k[1]) != interp(k[2]) {
        let other = four_point_weights(d, interp(k[2]));
        for (w, o) in weights.iter_mut().zip(other) {
            *w = (1.0 - d) * *w + d * o;
        }
    }

    Some(KeySelection::Blend {
        keys: k.map(|i| ids[i]),
        weights,
    })
}
