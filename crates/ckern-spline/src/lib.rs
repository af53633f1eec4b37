//! ckern splines: curve control data, knot vectors, basis evaluation,
//! tessellation, Bezier handles, bevel lists and arc-length paths.

pub mod basis;
pub mod bevel;
pub mod edit;
pub mod handle;
pub mod knot;
pub mod nurb;
pub mod path;
pub mod tessellate;

pub use basis::BasisEvaluator;
pub use bevel::{build_bevel_lists, BevList, BevPoint};
pub use edit::EditSession;
pub use handle::{calc_handle, calc_handles, set_handles, test_handles, HandleCode, HandleMode};
pub use knot::{KnotStyle, KnotVector};
pub use nurb::{BPoint, BezTriple, ControlPoints, Curve, HandleType, Nurb, NurbKind};
pub use path::{CurvePath, PathSample};
pub use tessellate::{
    forward_diff_bezier, tessellate_curve, tessellate_nurbs_curve, tessellate_nurbs_surface,
    CurveSample, SurfaceGrid, Tessellation,
};
