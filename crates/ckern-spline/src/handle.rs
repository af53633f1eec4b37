//! Bezier handle placement from handle types and neighbouring anchors.

use ckern_math::DVec3;
use serde::{Deserialize, Serialize};

use crate::nurb::{BezTriple, HandleType, Nurb};

/// Auto handle length relative to the summed unit chords.
const AUTO_HANDLE_SCALE: f64 = 2.5614;
/// Neither chord may exceed this multiple of the other for auto handles.
const CHORD_RATIO_LIMIT: f64 = 5.0;

/// Distance measure used for chords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum HandleMode {
    /// Euclidean chord lengths.
    #[default]
    Spatial = 0,
    /// Chord lengths measured along x only, for time-value curves.
    Timeline = 1,
    /// Like `Timeline`, and auto handles stay horizontal at local extrema.
    TimelineHorizontal = 2,
}

/// Handle-type edit applied to the selected sides of every triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleCode {
    Auto,
    Vector,
    /// Make selected handles free if any of them is constrained, otherwise align them.
    ToggleAlign,
    SetAlign,
    ClearAlign,
}

/// Recompute the handles of `bezt` from its neighbours' anchors.
///
/// A missing neighbour is mirrored through the anchor from the other one.
/// A triple with two free handles, or with no neighbours at all, is left
/// untouched.
pub fn calc_handle(
    bezt: &mut BezTriple,
    prev: Option<&BezTriple>,
    next: Option<&BezTriple>,
    mode: HandleMode,
) {
    if bezt.h1 == HandleType::Free && bezt.h2 == HandleType::Free {
        return;
    }

    let p2 = bezt.vec[1];
    let (p1, p3) = match (prev, next) {
        (Some(a), Some(b)) => (a.vec[1], b.vec[1]),
        (Some(a), None) => (a.vec[1], 2.0 * p2 - a.vec[1]),
        (None, Some(b)) => (2.0 * p2 - b.vec[1], b.vec[1]),
        (None, None) => return,
    };

    let d = p2 - p1;
    let d1 = p3 - p2;
    let chord = |v: DVec3| match mode {
        HandleMode::Spatial => v.length(),
        HandleMode::Timeline | HandleMode::TimelineHorizontal => v.x,
    };
    let mut len1 = chord(d);
    let mut len2 = chord(d1);
    if len1 == 0.0 {
        len1 = 1.0;
    }
    if len2 == 0.0 {
        len2 = 1.0;
    }

    if bezt.h1 == HandleType::Auto || bezt.h2 == HandleType::Auto {
        let v = d1 / len2 + d / len1;
        let len = AUTO_HANDLE_SCALE * v.length();
        if len != 0.0 {
            let mut left_violate = false;
            let mut right_violate = false;

            if len1 > CHORD_RATIO_LIMIT * len2 {
                len1 = CHORD_RATIO_LIMIT * len2;
            }
            if len2 > CHORD_RATIO_LIMIT * len1 {
                len2 = CHORD_RATIO_LIMIT * len1;
            }

            let horizontal = match (mode, prev, next) {
                (HandleMode::TimelineHorizontal, Some(a), Some(b)) => Some((a.vec[1].y, b.vec[1].y)),
                _ => None,
            };

            if bezt.h1 == HandleType::Auto {
                bezt.vec[0] = p2 - v * (len1 / len);
                if let Some((prev_y, next_y)) = horizontal {
                    let (ydiff1, ydiff2) = (prev_y - p2.y, next_y - p2.y);
                    if (ydiff1 <= 0.0 && ydiff2 <= 0.0) || (ydiff1 >= 0.0 && ydiff2 >= 0.0) {
                        bezt.vec[0].y = p2.y;
                    } else if (ydiff1 <= 0.0 && prev_y > bezt.vec[0].y)
                        || (ydiff1 > 0.0 && prev_y < bezt.vec[0].y)
                    {
                        // Handles must not overshoot the neighbouring key.
                        bezt.vec[0].y = prev_y;
                        left_violate = true;
                    }
                }
            }
            if bezt.h2 == HandleType::Auto {
                bezt.vec[2] = p2 + v * (len2 / len);
                if let Some((prev_y, next_y)) = horizontal {
                    let (ydiff1, ydiff2) = (prev_y - p2.y, next_y - p2.y);
                    if (ydiff1 <= 0.0 && ydiff2 <= 0.0) || (ydiff1 >= 0.0 && ydiff2 >= 0.0) {
                        bezt.vec[2].y = p2.y;
                    } else if (ydiff1 <= 0.0 && next_y < bezt.vec[2].y)
                        || (ydiff1 > 0.0 && next_y > bezt.vec[2].y)
                    {
                        bezt.vec[2].y = next_y;
                        right_violate = true;
                    }
                }
            }

            if left_violate || right_violate {
                let h1 = bezt.vec[0] - p2;
                let h2 = p2 - bezt.vec[2];
                let (l1, l2) = (h1.length(), h2.length());
                let (h1, h2) = (h1.normalize_or_zero(), h2.normalize_or_zero());
                let dot = h1.dot(h2);
                if left_violate {
                    bezt.vec[2] = p2 - h1 * (dot * l2);
                } else {
                    bezt.vec[0] = p2 + h2 * (dot * l1);
                }
            }
        }
    }

    if bezt.h1 == HandleType::Vector {
        bezt.vec[0] = p2 - d / 3.0;
    }
    if bezt.h2 == HandleType::Vector {
        bezt.vec[2] = p2 + d1 / 3.0;
    }

    align_handles(bezt);
}

/// Point aligned handles away from the opposite handle, keeping their length.
///
/// When the left handle is selected the right side is aligned first.
fn align_handles(bezt: &mut BezTriple) {
    let p2 = bezt.vec[1];
    let mut len1 = p2.distance(bezt.vec[0]);
    let mut len2 = p2.distance(bezt.vec[2]);
    if len1 == 0.0 {
        len1 = 1.0;
    }
    if len2 == 0.0 {
        len2 = 1.0;
    }

    let align_right = |b: &mut BezTriple| {
        if b.h2 == HandleType::Align {
            b.vec[2] = p2 + (len2 / len1) * (p2 - b.vec[0]);
        }
    };
    let align_left = |b: &mut BezTriple| {
        if b.h1 == HandleType::Align {
            b.vec[0] = p2 + (len1 / len2) * (p2 - b.vec[2]);
        }
    };

    if bezt.select[0] {
        align_right(bezt);
        align_left(bezt);
    } else {
        align_left(bezt);
        align_right(bezt);
    }
}

/// Recompute every handle of a Bezier nurb, wrapping neighbours when cyclic.
pub fn calc_handles(nurb: &mut Nurb) {
    let cyclic = nurb.cyclic_u;
    let Some(triples) = nurb.control.bezier_mut() else {
        return;
    };
    let n = triples.len();
    if n < 2 {
        return;
    }

    for i in 0..n {
        let prev = match i {
            0 if cyclic => Some(triples[n - 1]),
            0 => None,
            _ => Some(triples[i - 1]),
        };
        let next = match i {
            _ if i == n - 1 && cyclic => Some(triples[0]),
            _ if i == n - 1 => None,
            _ => Some(triples[i + 1]),
        };
        calc_handle(&mut triples[i], prev.as_ref(), next.as_ref(), HandleMode::Spatial);
    }
}

/// Fix handle types after a selection-based edit, then recompute handles.
///
/// Partially selected triples turn auto handles into aligned ones, and
/// vector handles on the selected half into free ones.
pub fn test_handles(nurb: &mut Nurb) {
    let Some(triples) = nurb.control.bezier_mut() else {
        return;
    };
    for bezt in triples.iter_mut() {
        let flag = bezt.select_mask();
        if flag == 0 || flag == 7 {
            continue;
        }
        if bezt.h1 == HandleType::Auto {
            bezt.h1 = HandleType::Align;
        }
        if bezt.h2 == HandleType::Auto {
            bezt.h2 = HandleType::Align;
        }
        if bezt.h1 == HandleType::Vector && flag < 4 {
            bezt.h1 = HandleType::Free;
        }
        if bezt.h2 == HandleType::Vector && flag > 3 {
            bezt.h2 = HandleType::Free;
        }
    }
    calc_handles(nurb);
}

/// Change the handle type of every selected handle side.
pub fn set_handles(nurb: &mut Nurb, code: HandleCode) {
    let Some(triples) = nurb.control.bezier_mut() else {
        return;
    };

    match code {
        HandleCode::Auto | HandleCode::Vector => {
            let ty = if code == HandleCode::Auto {
                HandleType::Auto
            } else {
                HandleType::Vector
            };
            for bezt in triples.iter_mut() {
                if !(bezt.select[0] || bezt.select[2]) {
                    continue;
                }
                if bezt.select[0] {
                    bezt.h1 = ty;
                }
                if bezt.select[2] {
                    bezt.h2 = ty;
                }
                if bezt.h1 != bezt.h2 {
                    if matches!(bezt.h1, HandleType::Align | HandleType::Auto) {
                        bezt.h1 = HandleType::Free;
                    }
                    if matches!(bezt.h2, HandleType::Align | HandleType::Auto) {
                        bezt.h2 = HandleType::Free;
                    }
                }
            }
            calc_handles(nurb);
        }
        HandleCode::ToggleAlign | HandleCode::SetAlign | HandleCode::ClearAlign => {
            let ty = match code {
                HandleCode::SetAlign => HandleType::Align,
                HandleCode::ClearAlign => HandleType::Free,
                _ => {
                    let constrained = triples.iter().any(|b| {
                        (b.select[0] && b.h1 != HandleType::Free)
                            || (b.select[2] && b.h2 != HandleType::Free)
                    });
                    if constrained {
                        HandleType::Free
                    } else {
                        HandleType::Align
                    }
                }
            };
            for bezt in triples.iter_mut() {
                if bezt.select[0] {
                    bezt.h1 = ty;
                }
                if bezt.select[2] {
                    bezt.h2 = ty;
                }
            }
            test_handles(nurb);
        }
    }
}
