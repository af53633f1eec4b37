use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use ckern_core::EvalSettings;
use ckern_deform::Lattice;
use ckern_keys::{
    apply_block, select_keys, Key, KeyBlock, KeyMode, KeyOwner, KeySelection, KeyTarget, MeshVerts,
    ShapeKeyBlender, TimeCurve,
};
use ckern_math::DVec3;
use ckern_spline::{BPoint, BezTriple, Curve, Nurb};

fn mesh(points: &[[f64; 3]]) -> MeshVerts {
    MeshVerts::new(points.iter().map(|p| DVec3::from_array(*p)).collect())
}

fn relative_key(basis: &MeshVerts) -> Key {
    let mut key = Key::new(KeyOwner::Mesh, KeyMode::Relative);
    key.add_block(KeyBlock::from_target("Basis", 0.0, basis));
    key
}

#[test]
fn test_relative_zero_weights_reproduce_reference() {
    let basis = mesh(&[[0.1, 0.2, 0.3], [1.5, -2.0, 0.25], [3.0, 4.0, 5.0]]);
    let mut key = relative_key(&basis);

    let mut moved = basis.clone();
    for p in moved.positions.iter_mut() {
        *p += DVec3::new(10.0, 20.0, 30.0);
    }
    key.add_block(KeyBlock::from_target("Moved", 0.1, &moved));
    key.add_block(KeyBlock::from_target("Half", 0.2, &moved).with_value(0.0));

    let mut live = mesh(&[[9.0; 3]; 3]);
    ShapeKeyBlender::new(&key).apply(0.0, &mut live).unwrap();
    assert_eq!(live, basis);
}

#[test]
fn test_relative_sums_weighted_offsets() {
    let basis = mesh(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
    let mut key = relative_key(&basis);
    key.add_block(KeyBlock::from_target("Up", 0.1, &mesh(&[[0.0, 1.0, 0.0], [1.0, 1.0, 0.0]])).with_value(0.5));
    let mut muted = KeyBlock::from_target("Muted", 0.2, &mesh(&[[5.0; 3]; 2])).with_value(1.0);
    muted.mute = true;
    key.add_block(muted);
    let mut grouped = KeyBlock::from_target("Out", 0.3, &mesh(&[[0.0, 0.0, 2.0], [1.0, 0.0, 2.0]])).with_value(1.0);
    grouped.vertex_group = Some("tip".into());
    key.add_block(grouped);

    let mut groups = HashMap::new();
    groups.insert("tip".to_string(), vec![0.0, 0.5]);

    let mut live = basis.clone();
    ShapeKeyBlender::new(&key)
        .with_vertex_groups(&groups)
        .apply(0.0, &mut live)
        .unwrap();
    assert_eq!(live.positions[0], DVec3::new(0.0, 0.5, 0.0));
    assert_eq!(live.positions[1], DVec3::new(1.0, 0.5, 1.0));
}

#[test]
fn test_relative_block_uses_its_own_base() {
    let basis = mesh(&[[0.0; 3]]);
    let mut key = relative_key(&basis);
    let raised = key.add_block(KeyBlock::from_target("Raised", 0.1, &mesh(&[[0.0, 0.0, 1.0]])));
    let mut tilted = KeyBlock::from_target("Tilted", 0.2, &mesh(&[[1.0, 0.0, 1.0]])).with_value(1.0);
    tilted.relative_to = Some(raised);
    key.add_block(tilted);

    let mut live = basis.clone();
    ShapeKeyBlender::new(&key).apply(0.0, &mut live).unwrap();
    assert_eq!(live.positions[0], DVec3::new(1.0, 0.0, 0.0));
}

#[test]
fn test_double_sized_blocks_fit_live_vertices() {
    let live_count = 5;
    let stored: Vec<f64> = (0..2 * live_count * 3).map(|i| i as f64).collect();

    let mut key = Key::new(KeyOwner::Mesh, KeyMode::Absolute);
    key.add_block(KeyBlock::new("Basis", 0.0, stored.clone(), 2 * live_count));
    key.add_block(KeyBlock::new("End", 1.0, stored.iter().map(|v| v * 2.0).collect(), 2 * live_count));

    let mut live = MeshVerts::new(vec![DVec3::ZERO; live_count]);
    let halfway = TimeCurve(|_: f64| 0.5);
    let blender = ShapeKeyBlender::new(&key).with_driver(&halfway);
    blender.apply(0.0, &mut live).unwrap();

    assert_eq!(live.positions.len(), live_count);
    for (i, p) in live.positions.iter().enumerate() {
        // Live vertex i reads stored element 2i, blended halfway to double.
        let base = (2 * i * 3) as f64;
        assert_abs_diff_eq!(p.x, 1.5 * base, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, 1.5 * (base + 2.0), epsilon = 1e-12);
    }

    let mut relative = key.clone();
    relative.mode = KeyMode::Relative;
    let mut live = MeshVerts::new(vec![DVec3::ZERO; live_count]);
    ShapeKeyBlender::new(&relative).apply(0.0, &mut live).unwrap();
    assert_abs_diff_eq!(live.positions[4].x, 24.0, epsilon = 1e-12);
}

#[test]
fn test_absolute_uses_default_time_ramp() {
    let mut key = Key::new(KeyOwner::Mesh, KeyMode::Absolute);
    key.add_block(KeyBlock::from_target("Basis", 0.0, &mesh(&[[0.0; 3]])));
    key.add_block(KeyBlock::from_target("Top", 1.0, &mesh(&[[0.0, 0.0, 4.0]])));

    let mut live = mesh(&[[0.0; 3]]);
    ShapeKeyBlender::new(&key).apply(25.0, &mut live).unwrap();
    assert_abs_diff_eq!(live.positions[0].z, 1.0, epsilon = 1e-12);
}

#[test]
fn test_slurph_delays_later_vertices() {
    let zeros = mesh(&[[0.0; 3]; 4]);
    let ones = mesh(&[[1.0; 3]; 4]);
    let mut key = Key::new(KeyOwner::Mesh, KeyMode::Absolute);
    key.add_block(KeyBlock::from_target("Basis", 0.0, &zeros));
    key.add_block(KeyBlock::from_target("Target", 1.0, &ones));
    key.slurph = -40;

    let mut live = zeros.clone();
    ShapeKeyBlender::new(&key).apply(50.0, &mut live).unwrap();
    // Vertex a is evaluated at frame 50 - 10a.
    let x: Vec<f64> = live.positions.iter().map(|p| p.x).collect();
    for (a, v) in x.iter().enumerate() {
        assert_abs_diff_eq!(*v, (50.0 - 10.0 * a as f64) / 100.0, epsilon = 1e-12);
    }
}

#[test]
fn test_slurph_subsampling_chunks_large_meshes() {
    let n = 200;
    let zeros = MeshVerts::new(vec![DVec3::ZERO; n]);
    let ones = MeshVerts::new(vec![DVec3::ONE; n]);
    let mut key = Key::new(KeyOwner::Mesh, KeyMode::Absolute);
    key.add_block(KeyBlock::from_target("Basis", 0.0, &zeros));
    key.add_block(KeyBlock::from_target("Target", 1.0, &ones));
    key.slurph = 50;

    let mut live = zeros.clone();
    ShapeKeyBlender::new(&key).apply(10.0, &mut live).unwrap();
    // Chunks of four vertices share one time.
    assert_eq!(live.positions[0], live.positions[3]);
    assert_ne!(live.positions[3], live.positions[4]);

    let exact = EvalSettings {
        slurph_subsample: false,
        ..EvalSettings::default()
    };
    let mut live = zeros.clone();
    ShapeKeyBlender::new(&key).with_settings(&exact).apply(10.0, &mut live).unwrap();
    assert_ne!(live.positions[0], live.positions[1]);
}

#[test]
fn test_missing_reference_leaves_target() {
    let key = Key::new(KeyOwner::Mesh, KeyMode::Relative);
    let mut live = mesh(&[[1.0, 2.0, 3.0]]);
    let err = ShapeKeyBlender::new(&key).apply(0.0, &mut live).unwrap_err();
    assert!(err.is_missing_resource());
    ShapeKeyBlender::new(&key).apply_or_skip(0.0, &mut live);
    assert_eq!(live.positions[0], DVec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_owner_mismatch_is_rejected() {
    let lattice = Lattice::new(2, 2, 2);
    let mut key = Key::new(KeyOwner::Lattice, KeyMode::Absolute);
    key.add_block(KeyBlock::from_target("Basis", 0.0, &lattice));

    let mut live = mesh(&[[0.0; 3]; 8]);
    assert!(ShapeKeyBlender::new(&key).apply(0.0, &mut live).is_err());

    let mut lt = lattice.clone();
    lt.points[0].vec.x = 7.0;
    ShapeKeyBlender::new(&key).apply(0.0, &mut lt).unwrap();
    assert_eq!(lt, lattice);
}

#[test]
fn test_curve_keys_blend_handles_and_tilt() {
    let mut a = BezTriple::new(DVec3::ZERO);
    a.vec = [DVec3::new(-1.0, 0.0, 0.0), DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)];
    let rest = Curve::new(vec![
        Nurb::bezier(vec![a, BezTriple::new(DVec3::new(3.0, 0.0, 0.0))], false),
        Nurb::poly(vec![BPoint::new(DVec3::ZERO), BPoint::new(DVec3::Y)], false),
    ]);
    let mut bent = rest.clone();
    if let Some(triples) = bent.nurbs[0].control.bezier_mut() {
        triples[0].vec[2].y = 2.0;
        triples[0].tilt = 1.0;
    }
    if let Some(points) = bent.nurbs[1].control.bpoints_mut() {
        points[1].vec.w = 3.0;
    }

    let mut key = Key::new(KeyOwner::Curve, KeyMode::Absolute);
    key.add_block(KeyBlock::from_target("Basis", 0.0, &rest));
    key.add_block(KeyBlock::from_target("Bent", 1.0, &bent));
    assert_eq!(key.block(key.order[1]).unwrap().totelem, rest.element_count());

    let mut live = rest.clone();
    ShapeKeyBlender::new(&key)
        .with_driver(&TimeCurve(|_: f64| 0.5))
        .apply(0.0, &mut live)
        .unwrap();
    let t = live.nurbs[0].control.bezier().unwrap()[0];
    assert_abs_diff_eq!(t.vec[2].y, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(t.tilt, 0.5, epsilon = 1e-12);
    let w = live.nurbs[1].control.bpoints().unwrap()[1].weight();
    assert_abs_diff_eq!(w, 2.0, epsilon = 1e-12);

    apply_block(key.block(key.order[1]).unwrap(), &mut live);
    assert_eq!(live.nurbs, bent.nurbs);
}

#[test]
fn test_selection_on_block_copies() {
    let mut key = Key::new(KeyOwner::Mesh, KeyMode::Absolute);
    let basis = key.add_block(KeyBlock::from_target("Basis", 0.0, &mesh(&[[0.0; 3]])));
    key.add_block(KeyBlock::from_target("Top", 1.0, &mesh(&[[1.0; 3]])));
    assert_eq!(select_keys(0.0, &key), Some(KeySelection::Copy(basis)));
}
