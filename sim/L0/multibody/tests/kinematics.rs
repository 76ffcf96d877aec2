//! Finite-difference and dual-number checks of the reference tree kinematics.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use approx::assert_relative_eq;
use nalgebra::{DVector, Point3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_multibody::{JointKind, KinematicModel, KinematicTree};
use sim_types::{Dual, FrameId, Pose};

// ============================================================================
// Fixtures
// ============================================================================

/// Branched mechanism mixing every joint kind and non-trivial offsets.
///
/// ```text
/// world ─ slide_x ─ shoulder ─ elbow ─ tool (fixed)
///                 └ hip ─ knee_slide
/// ```
fn branched_tree() -> (KinematicTree, FrameId, FrameId) {
    let mut tree = KinematicTree::new();
    let base = tree
        .add_body(
            "slide_x",
            FrameId::WORLD,
            JointKind::prismatic(Vector3::x()),
            Pose::from_xyz(0.0, 0.0, 1.0),
        )
        .unwrap();
    let shoulder = tree
        .add_body(
            "shoulder",
            base,
            JointKind::revolute(Vector3::new(0.0, 1.0, 1.0)),
            Pose::from_position_rotation(
                Point3::new(0.1, 0.2, 0.0),
                UnitQuaternion::from_euler_angles(0.3, -0.1, 0.2),
            ),
        )
        .unwrap();
    let elbow = tree
        .add_body(
            "elbow",
            shoulder,
            JointKind::revolute(Vector3::z()),
            Pose::from_xyz(0.8, 0.0, 0.0),
        )
        .unwrap();
    let tool = tree
        .add_body(
            "tool",
            elbow,
            JointKind::Fixed,
            Pose::from_position_rotation(
                Point3::new(0.5, 0.1, 0.0),
                UnitQuaternion::from_euler_angles(0.0, 0.5, 0.0),
            ),
        )
        .unwrap();
    let hip = tree
        .add_body(
            "hip",
            base,
            JointKind::revolute(Vector3::x()),
            Pose::from_xyz(0.0, -0.3, 0.0),
        )
        .unwrap();
    tree.add_body(
        "knee_slide",
        hip,
        JointKind::prismatic(Vector3::new(0.2, 0.0, -1.0)),
        Pose::from_xyz(0.0, 0.0, -0.4),
    )
    .unwrap();
    (tree, tool, hip)
}

fn random_vector(rng: &mut StdRng, n: usize, scale: f64) -> DVector<f64> {
    DVector::from_fn(n, |_, _| rng.gen_range(-scale..scale))
}

// ============================================================================
// Finite differences
// ============================================================================

#[test]
fn test_point_jacobian_matches_finite_difference() {
    let (tree, tool, _) = branched_tree();
    let nv = tree.num_dofs();
    let mut rng = StdRng::seed_from_u64(7);
    let point = Vector3::new(0.2, -0.1, 0.3);
    let h = 1e-6;

    for _ in 0..10 {
        let q = random_vector(&mut rng, nv, 1.5);
        let v = random_vector(&mut rng, nv, 2.0);

        let ctx = tree.create_context(q.clone(), v.clone()).unwrap();
        let jac =
            tree.calc_jacobian_translational_velocity(&ctx, tool, &point, FrameId::WORLD, FrameId::WORLD);

        let q_plus = tree.integrate_positions(&q, &v, h);
        let q_minus = tree.integrate_positions(&q, &v, -h);
        let ctx_plus = tree.create_context(q_plus, v.clone()).unwrap();
        let ctx_minus = tree.create_context(q_minus, v.clone()).unwrap();
        let p_plus = tree.calc_point_position(&ctx_plus, tool, &point, FrameId::WORLD);
        let p_minus = tree.calc_point_position(&ctx_minus, tool, &point, FrameId::WORLD);

        let fd = (p_plus - p_minus) / (2.0 * h);
        assert_relative_eq!(jac * &v, fd, epsilon = 1e-7);
    }
}

#[test]
fn test_bias_acceleration_matches_finite_difference() {
    let (tree, tool, hip) = branched_tree();
    let nv = tree.num_dofs();
    let mut rng = StdRng::seed_from_u64(11);
    let point = Vector3::new(-0.3, 0.4, 0.1);
    let h = 1e-6;

    for frame in [tool, hip] {
        for _ in 0..10 {
            let q = random_vector(&mut rng, nv, 1.5);
            let v = random_vector(&mut rng, nv, 2.0);

            let ctx = tree.create_context(q.clone(), v.clone()).unwrap();
            let bias = tree.calc_bias_translational_acceleration(&ctx, frame, &point, FrameId::WORLD);

            let jv = |q: DVector<f64>| {
                let c = tree.create_context(q, v.clone()).unwrap();
                tree.calc_jacobian_translational_velocity(&c, frame, &point, FrameId::WORLD, FrameId::WORLD)
                    * &v
            };
            let fd = (jv(tree.integrate_positions(&q, &v, h))
                - jv(tree.integrate_positions(&q, &v, -h)))
                / (2.0 * h);

            assert_relative_eq!(bias, fd, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_relative_jacobian_matches_motion_in_measuring_frame() {
    let (tree, tool, hip) = branched_tree();
    let nv = tree.num_dofs();
    let mut rng = StdRng::seed_from_u64(3);
    let point = Vector3::new(0.1, 0.1, 0.1);
    let h = 1e-6;

    let q = random_vector(&mut rng, nv, 1.0);
    let v = random_vector(&mut rng, nv, 1.0);
    let ctx = tree.create_context(q.clone(), v.clone()).unwrap();
    let jac = tree.calc_jacobian_translational_velocity(&ctx, tool, &point, hip, hip);

    let position_in_hip = |q: DVector<f64>| {
        let c = tree.create_context(q, v.clone()).unwrap();
        tree.calc_point_position(&c, tool, &point, hip)
    };
    let fd = (position_in_hip(tree.integrate_positions(&q, &v, h))
        - position_in_hip(tree.integrate_positions(&q, &v, -h)))
        / (2.0 * h);

    assert_relative_eq!(jac * &v, fd, epsilon = 1e-7);
}

// ============================================================================
// Dual numbers
// ============================================================================

#[test]
fn test_dual_positions_carry_exact_velocity() {
    let (tree, tool, _) = branched_tree();
    let nv = tree.num_dofs();
    let mut rng = StdRng::seed_from_u64(5);
    let q = random_vector(&mut rng, nv, 1.0);
    let v = random_vector(&mut rng, nv, 1.0);
    let point = Vector3::new(0.3, 0.0, -0.2);

    let ctx = tree.create_context(q.clone(), v.clone()).unwrap();
    let expected_velocity =
        tree.calc_jacobian_translational_velocity(&ctx, tool, &point, FrameId::WORLD, FrameId::WORLD)
            * &v;
    let expected_bias = tree.calc_bias_translational_acceleration(&ctx, tool, &point, FrameId::WORLD);

    // Seed q with its time derivative v.
    let q_dual = DVector::from_fn(nv, |i, _| Dual::new(q[i], v[i]));
    let v_dual = v.map(Dual::constant);
    let dual_ctx = tree.create_context(q_dual, v_dual.clone()).unwrap();
    let point_dual = point.map(Dual::constant);

    let p = tree.calc_point_position(&dual_ctx, tool, &point_dual, FrameId::WORLD);
    for k in 0..3 {
        assert_relative_eq!(p[k].eps, expected_velocity[k], epsilon = 1e-12);
    }

    let jv = tree.calc_jacobian_translational_velocity(
        &dual_ctx,
        tool,
        &point_dual,
        FrameId::WORLD,
        FrameId::WORLD,
    ) * &v_dual;
    for k in 0..3 {
        assert_relative_eq!(jv[k].re, expected_velocity[k], epsilon = 1e-12);
        assert_relative_eq!(jv[k].eps, expected_bias[k], epsilon = 1e-12);
    }
}
