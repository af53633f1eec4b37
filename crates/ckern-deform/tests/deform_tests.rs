use approx::assert_abs_diff_eq;
use ckern_core::{BoundingBox, EvalSettings, Validate};
use ckern_deform::{CurveDeform, Lattice, LatticeDeform};
use ckern_math::{DVec3, Interpolation, TrackAxis, Transform};
use ckern_spline::{BPoint, BezTriple, Curve, Nurb};

#[test]
fn test_lattice_deform_in_target_space() {
    // Target sits 10 units along x; the lattice sits at the origin, scaled by 2.
    let target = Transform::from_translation(DVec3::new(10.0, 0.0, 0.0));
    let lattice_matrix = Transform::from_scale(DVec3::splat(2.0));

    let mut lt = Lattice::new(3, 3, 3).with_interpolation(
        Interpolation::Linear,
        Interpolation::Linear,
        Interpolation::Linear,
    );
    lt.validate().unwrap();
    for p in lt.points.iter_mut() {
        p.vec.z += 0.25;
    }

    let deform = LatticeDeform::begin(&lt, &lattice_matrix, Some(&target), None).unwrap();
    // Target (-11.5, 0, 0) is world (-1.5, 0, 0) and lattice (-0.75, 0, 0).
    let out = deform.deform(DVec3::new(-11.5, 0.0, 0.0), 1.0);
    // A lattice-space shift of 0.25 is 0.5 in target space.
    assert_abs_diff_eq!(out.z, 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(out.x, -11.5, epsilon = 1e-9);
    deform.end();
}

#[test]
fn test_deformed_positions_override_points() {
    let lt = Lattice::new(2, 2, 2).with_interpolation(
        Interpolation::Linear,
        Interpolation::Linear,
        Interpolation::Linear,
    );
    let shifted: Vec<DVec3> = (0..lt.len())
        .map(|i| lt.rest_position(i) + DVec3::new(0.0, 1.0, 0.0))
        .collect();
    let deform = LatticeDeform::begin(&lt, &Transform::identity(), None, Some(&shifted)).unwrap();

    let mut verts = vec![DVec3::ZERO, DVec3::new(0.5, 0.5, 0.5)];
    deform.deform_verts(&mut verts, Some(&[1.0, 0.0]));
    assert_abs_diff_eq!(verts[0].y, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(verts[1].y, 0.5, epsilon = 1e-12);
}

#[test]
fn test_grid_mode_uses_unit_spacing() {
    let mut lt = Lattice::new(4, 2, 1);
    lt.set_grid_mode(true);
    let (min, max) = lt.bounding_box().unwrap();
    assert_eq!(min, DVec3::new(-1.5, -0.5, 0.0));
    assert_eq!(max, DVec3::new(1.5, 0.5, 0.0));
}

#[test]
fn test_curve_deform_bends_around_corner() {
    // An L-shaped path: along +x for 2 units, then along +y for 2 units.
    let pts = vec![
        BPoint::new(DVec3::ZERO),
        BPoint::new(DVec3::new(2.0, 0.0, 0.0)),
        BPoint::new(DVec3::new(2.0, 2.0, 0.0)),
    ];
    let mut curve = Curve::new(vec![Nurb::poly(pts, false)]);
    curve.stretch = true;

    let mut deform = CurveDeform::begin(
        &curve,
        &Transform::identity(),
        &Transform::identity(),
        &EvalSettings::default(),
    )
    .unwrap();
    assert_abs_diff_eq!(deform.path().total_distance, 4.0, epsilon = 1e-12);

    let mut verts = vec![DVec3::ZERO, DVec3::new(5.0, 0.0, 0.0), DVec3::new(10.0, 0.0, 0.0)];
    deform.deform_verts(&mut verts, TrackAxis::PosX);
    assert_abs_diff_eq!(verts[0].x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(verts[2].x, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(verts[2].y, 2.0, epsilon = 1e-9);
}

#[test]
fn test_open_path_extrapolates_past_its_end() {
    let triples = vec![
        BezTriple::with_handles(DVec3::new(-1.0, 0.0, 0.0), DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)),
        BezTriple::with_handles(DVec3::new(2.0, 0.0, 0.0), DVec3::new(3.0, 0.0, 0.0), DVec3::new(4.0, 0.0, 0.0)),
    ];
    let mut curve = Curve::new(vec![Nurb::bezier(triples, false)]);
    curve.rebuild_bevel(None, &EvalSettings::default());

    let mut deform = CurveDeform::begin(
        &curve,
        &Transform::identity(),
        &Transform::identity(),
        &EvalSettings::default(),
    )
    .unwrap();
    let mut verts = vec![DVec3::ZERO, DVec3::new(5.0, 0.0, 0.0)];
    deform.deform_verts(&mut verts, TrackAxis::PosX);
    assert!(verts[1].x > 3.0);
}
