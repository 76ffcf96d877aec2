//! Point-to-point distance constraint.
//!
//! Constrains the Euclidean distance between point A (fixed in frame A) and
//! point B (fixed in frame B) to a target value:
//!
//! ```text
//! φ(q) = ‖p_A − p_B‖ − d
//! ```
//!
//! # Frames
//!
//! The residual and Jacobian are evaluated in frame B. Only relative
//! kinematics enter them, so any common frame gives the same numbers. The
//! bias term is evaluated in the world frame: it adds the bias accelerations
//! of both points, which only compose in an inertial frame.
//!
//! # Coincident points
//!
//! The Jacobian and bias term divide by `‖p_A − p_B‖`. When the points
//! coincide the result is non-finite; it is returned as is.

use std::marker::PhantomData;

use nalgebra::{DMatrix, DVector, Vector3};
use sim_multibody::KinematicModel;
use sim_types::{FrameId, Real, Result, SimError, norm, norm_squared};
use tracing::warn;

use crate::evaluator::{ActiveRows, KinematicEvaluator};

/// Distance between two points on (possibly) different frames.
///
/// # Example
///
/// ```
/// use sim_kinematic::{DistanceEvaluator, KinematicEvaluator};
/// use sim_multibody::{JointKind, KinematicModel, KinematicTree};
/// use sim_types::{FrameId, Pose};
/// use nalgebra::{DVector, Vector3};
///
/// let mut tree = KinematicTree::new();
/// let slider = tree
///     .add_body("slider", FrameId::WORLD, JointKind::prismatic(Vector3::x()), Pose::identity())
///     .unwrap();
///
/// // Keep the slider origin 0.5 away from the world origin.
/// let distance = DistanceEvaluator::<f64, _>::new(
///     &tree,
///     Vector3::zeros(),
///     slider,
///     Vector3::zeros(),
///     FrameId::WORLD,
///     0.5,
/// )
/// .unwrap();
///
/// let ctx = tree
///     .create_context(DVector::from_vec(vec![1.0]), DVector::from_vec(vec![0.0]))
///     .unwrap();
/// assert!((distance.eval_residual(&ctx)[0] - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct DistanceEvaluator<'a, T: Real, M: KinematicModel<T>> {
    model: &'a M,
    name: String,
    point_a: Vector3<f64>,
    frame_a: FrameId,
    point_b: Vector3<f64>,
    frame_b: FrameId,
    distance: f64,
    rows: ActiveRows,
    _scalar: PhantomData<fn() -> T>,
}

impl<'a, T: Real, M: KinematicModel<T>> DistanceEvaluator<'a, T, M> {
    /// Create a distance constraint between `point_a` on `frame_a` and
    /// `point_b` on `frame_b`.
    ///
    /// # Errors
    ///
    /// Returns an error if either frame is not part of `model` or `distance`
    /// is not finite.
    pub fn new(
        model: &'a M,
        point_a: Vector3<f64>,
        frame_a: FrameId,
        point_b: Vector3<f64>,
        frame_b: FrameId,
        distance: f64,
    ) -> Result<Self> {
        for frame in [frame_a, frame_b] {
            if !model.has_frame(frame) {
                return Err(SimError::FrameNotFound(frame));
            }
        }
        if !distance.is_finite() {
            return Err(SimError::invalid_config(format!(
                "target distance must be finite, got {distance}"
            )));
        }
        if !point_a.iter().chain(point_b.iter()).all(|x| x.is_finite()) {
            return Err(SimError::invalid_config("distance points must be finite"));
        }
        if distance < 0.0 {
            warn!(
                distance,
                %frame_a,
                %frame_b,
                "negative target distance can never be satisfied"
            );
        }

        Ok(Self {
            model,
            name: String::from("distance"),
            point_a,
            frame_a,
            point_b,
            frame_b,
            distance,
            rows: ActiveRows::all(1),
            _scalar: PhantomData,
        })
    }

    /// Set the evaluator name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Select active rows (`[0]` or `[]`).
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidActiveRows`] for indices other than `0`.
    pub fn with_active_rows(mut self, indices: impl Into<Vec<usize>>) -> Result<Self> {
        self.rows = ActiveRows::new(1, indices)?;
        Ok(self)
    }

    /// Point A in frame A coordinates.
    #[must_use]
    pub fn point_a(&self) -> &Vector3<f64> {
        &self.point_a
    }

    /// Frame A.
    #[must_use]
    pub fn frame_a(&self) -> FrameId {
        self.frame_a
    }

    /// Point B in frame B coordinates.
    #[must_use]
    pub fn point_b(&self) -> &Vector3<f64> {
        &self.point_b
    }

    /// Frame B.
    #[must_use]
    pub fn frame_b(&self) -> FrameId {
        self.frame_b
    }

    /// Target distance.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Position of A relative to B, expressed in frame B.
    fn relative_position_in_b(&self, context: &M::Context) -> Vector3<T> {
        let pt_a = self.point_a.map(T::from_f64);
        let pt_a_b = self
            .model
            .calc_point_position(context, self.frame_a, &pt_a, self.frame_b);
        pt_a_b - self.point_b.map(T::from_f64)
    }
}

impl<T: Real, M: KinematicModel<T>> KinematicEvaluator<T, M> for DistanceEvaluator<'_, T, M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &M {
        self.model
    }

    fn active_rows(&self) -> &ActiveRows {
        &self.rows
    }

    fn eval_residual(&self, context: &M::Context) -> DVector<T> {
        let rel_pos = self.relative_position_in_b(context);
        DVector::from_element(1, norm(&rel_pos) - T::from_f64(self.distance))
    }

    /// `(p_A − p_B)ᵀ · J_A / ‖p_A − p_B‖`, all in frame B.
    ///
    /// `J_A` is measured in frame B, so it already equals `J_A − J_B` in that
    /// frame.
    fn eval_jacobian(&self, context: &M::Context) -> DMatrix<T> {
        let rel_pos = self.relative_position_in_b(context);
        let j_a = self.model.calc_jacobian_translational_velocity(
            context,
            self.frame_a,
            &self.point_a.map(T::from_f64),
            self.frame_b,
            self.frame_b,
        );

        let row = (rel_pos.transpose() * j_a) / norm(&rel_pos);
        DMatrix::from_iterator(1, row.len(), row.iter().copied())
    }

    /// Chain rule on `J·v = Δᵀ·J_rel·v / φ`, in the world frame:
    ///
    /// ```text
    /// J̇v = ‖J_rel·v‖² / φ + Δᵀ(a_A − a_B) / φ − φ̇ · Δᵀ·J_rel·v / φ²
    /// ```
    ///
    /// with `Δ = p_A − p_B`, `φ = ‖Δ‖`, `φ̇ = Δᵀ·J_rel·v / φ`.
    fn eval_jacobian_dot_times_v(&self, context: &M::Context) -> DVector<T> {
        let model = self.model;
        let world = model.world_frame();
        let pt_a = self.point_a.map(T::from_f64);
        let pt_b = self.point_b.map(T::from_f64);

        let pt_a_world = model.calc_point_position(context, self.frame_a, &pt_a, world);
        let pt_b_world = model.calc_point_position(context, self.frame_b, &pt_b, world);
        let rel_pos = pt_a_world - pt_b_world;

        let j_a =
            model.calc_jacobian_translational_velocity(context, self.frame_a, &pt_a, world, world);
        let j_b =
            model.calc_jacobian_translational_velocity(context, self.frame_b, &pt_b, world, world);
        let j_rel = j_a - j_b;

        let a_a = model.calc_bias_translational_acceleration(context, self.frame_a, &pt_a, world);
        let a_b = model.calc_bias_translational_acceleration(context, self.frame_b, &pt_b, world);
        let j_rel_dot_times_v = a_a - a_b;

        let phi = norm(&rel_pos);
        let v = model.velocities(context);

        // (J_A - J_B) * v is used three times
        let j_rel_v: Vector3<T> = j_rel * v;
        let rel_dot_j_rel_v = rel_pos.dot(&j_rel_v);

        // Matches eval_jacobian(context) * v
        let phidot = rel_dot_j_rel_v / phi;

        let j_dot_times_v = norm_squared(&j_rel_v) / phi + rel_pos.dot(&j_rel_dot_times_v) / phi
            - phidot * rel_dot_j_rel_v / (phi * phi);
        DVector::from_element(1, j_dot_times_v)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sim_multibody::{JointKind, KinematicTree};
    use sim_types::Pose;

    /// Two free points, each translating along x, y and z through prismatic
    /// joints. Frames stay parallel to the world.
    fn two_point_masses() -> (KinematicTree, FrameId, FrameId) {
        let mut tree = KinematicTree::new();
        let mut point_mass = |prefix: &str| {
            let mut parent = FrameId::WORLD;
            let axes = [("x", Vector3::x()), ("y", Vector3::y()), ("z", Vector3::z())];
            for (axis_name, axis) in axes {
                parent = tree
                    .add_body(
                        format!("{prefix}_{axis_name}"),
                        parent,
                        JointKind::prismatic(axis),
                        Pose::identity(),
                    )
                    .unwrap();
            }
            parent
        };
        let a = point_mass("a");
        let b = point_mass("b");
        (tree, a, b)
    }

    fn origin_distance<'a>(
        tree: &'a KinematicTree,
        a: FrameId,
        b: FrameId,
        distance: f64,
    ) -> DistanceEvaluator<'a, f64, KinematicTree> {
        DistanceEvaluator::new(tree, Vector3::zeros(), a, Vector3::zeros(), b, distance).unwrap()
    }

    fn state(positions: [f64; 6], velocities: [f64; 6]) -> (DVector<f64>, DVector<f64>) {
        (
            DVector::from_row_slice(&positions),
            DVector::from_row_slice(&velocities),
        )
    }

    #[test]
    fn test_residual_at_known_separation() {
        let (tree, a, b) = two_point_masses();
        let eval = origin_distance(&tree, a, b, 0.5);

        let (q, v) = state([0.0, 0.0, 0.0, 3.0, 4.0, 0.0], [0.0; 6]);
        let ctx = tree.create_context(q, v).unwrap();
        assert_relative_eq!(eval.eval_residual(&ctx)[0], 4.5, epsilon = 1e-12);
    }

    #[test]
    fn test_point_offsets_are_in_local_frames() {
        // Point A = origin of frame A, point B = (1, 0, 0) in frame B.
        let (tree, a, b) = two_point_masses();
        let eval = DistanceEvaluator::<f64, _>::new(
            &tree,
            Vector3::zeros(),
            a,
            Vector3::new(1.0, 0.0, 0.0),
            b,
            0.5,
        )
        .unwrap();

        let (q, v) = state([0.0; 6], [0.0; 6]);
        let ctx = tree.create_context(q, v).unwrap();
        assert_relative_eq!(eval.eval_residual(&ctx)[0], 0.5, epsilon = 1e-12);

        // Move frame B by -0.5 along x: point B sits at (0.5, 0, 0).
        let (q, v) = state([0.0, 0.0, 0.0, -0.5, 0.0, 0.0], [0.0; 6]);
        let ctx = tree.create_context(q, v).unwrap();
        assert_relative_eq!(eval.eval_residual(&ctx)[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_jacobian_is_unit_direction() {
        let (tree, a, b) = two_point_masses();
        let eval = origin_distance(&tree, a, b, 1.0);

        // A at (3, 4, 0), B at origin: direction (0.6, 0.8, 0).
        let (q, v) = state([3.0, 4.0, 0.0, 0.0, 0.0, 0.0], [0.0; 6]);
        let ctx = tree.create_context(q, v).unwrap();
        let jac = eval.eval_jacobian(&ctx);

        assert_eq!(jac.shape(), (1, 6));
        let expected = DMatrix::from_row_slice(1, 6, &[0.6, 0.8, 0.0, -0.6, -0.8, 0.0]);
        assert_relative_eq!(jac, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_bias_for_points_passing_each_other() {
        // A at (0, 1, 0) moving with velocity (1, 0, 0); B fixed at origin.
        // φ = sqrt(t² + 1) around t = 0 → φ̈ = 1.
        let (tree, a, b) = two_point_masses();
        let eval = origin_distance(&tree, a, b, 0.0);

        let (q, v) = state([0.0, 1.0, 0.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let ctx = tree.create_context(q, v).unwrap();
        assert_relative_eq!(eval.eval_jacobian_dot_times_v(&ctx)[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bias_of_approaching_points_is_zero() {
        // Motion along the separation line: φ is linear in t, so φ̈ = 0.
        let (tree, a, b) = two_point_masses();
        let eval = origin_distance(&tree, a, b, 0.0);

        let (q, v) = state([2.0, 0.0, 0.0, 0.0, 0.0, 0.0], [-1.0, 0.0, 0.0, 0.5, 0.0, 0.0]);
        let ctx = tree.create_context(q, v).unwrap();
        assert_relative_eq!(eval.eval_jacobian_dot_times_v(&ctx)[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_points_propagate_non_finite() {
        let (tree, a, b) = two_point_masses();
        let eval = origin_distance(&tree, a, b, 0.2);

        let (q, v) = state([0.0; 6], [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let ctx = tree.create_context(q, v).unwrap();

        assert_relative_eq!(eval.eval_residual(&ctx)[0], -0.2);
        assert!(eval.eval_jacobian(&ctx).iter().any(|x| !x.is_finite()));
        assert!(!eval.eval_jacobian_dot_times_v(&ctx)[0].is_finite());
    }

    #[test]
    #[should_panic(expected = "context was created for a different kinematic tree")]
    fn test_context_of_identically_shaped_tree_rejected() {
        let (tree, a, b) = two_point_masses();
        let (twin, _, _) = two_point_masses();
        let eval = origin_distance(&tree, a, b, 0.5);

        let (q, v) = state([1.0, 0.0, 0.0, 0.0, 0.0, 0.0], [0.0; 6]);
        let ctx = twin.create_context(q, v).unwrap();
        let _ = eval.eval_residual(&ctx);
    }

    #[test]
    fn test_constructor_validates_inputs() {
        let (tree, a, _) = two_point_masses();

        let err = DistanceEvaluator::<f64, _>::new(
            &tree,
            Vector3::zeros(),
            a,
            Vector3::zeros(),
            FrameId::new(99),
            1.0,
        )
        .unwrap_err();
        assert_eq!(err, SimError::FrameNotFound(FrameId::new(99)));

        let err = DistanceEvaluator::<f64, _>::new(
            &tree,
            Vector3::zeros(),
            a,
            Vector3::zeros(),
            FrameId::WORLD,
            f64::INFINITY,
        )
        .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_accessors_and_builders() {
        let (tree, a, b) = two_point_masses();
        let eval = DistanceEvaluator::<f64, _>::new(
            &tree,
            Vector3::new(0.1, 0.0, 0.0),
            a,
            Vector3::new(0.0, 0.2, 0.0),
            b,
            0.7,
        )
        .unwrap()
        .with_name("left_rod")
        .with_active_rows(Vec::new())
        .unwrap();

        assert_eq!(eval.name(), "left_rod");
        assert_eq!(eval.length(), 1);
        assert_eq!(eval.num_active(), 0);
        assert_eq!(eval.frame_a(), a);
        assert_eq!(eval.frame_b(), b);
        assert_eq!(eval.point_a().x, 0.1);
        assert_eq!(eval.point_b().y, 0.2);
        assert_eq!(eval.distance(), 0.7);
    }
}
