//! Pin a body point to a world position.
//!
//! This is the contact-point constraint: the rows are the components of
//! `p_world − target` along the columns of a fixed view rotation `R`. With `R`
//! chosen so its third column is the ground normal, row 2 is the normal gap
//! and rows 0 and 1 are tangential slip. A frictionless contact keeps only
//! row 2 active.

use std::marker::PhantomData;

use nalgebra::{DMatrix, DVector, Matrix3, UnitQuaternion, Vector3};
use sim_multibody::KinematicModel;
use sim_types::{FrameId, Real, Result, SimError};

use crate::evaluator::{ActiveRows, KinematicEvaluator};

/// Three-row constraint `Rᵀ(p_world − target) = 0`.
#[derive(Debug, Clone)]
pub struct WorldPointEvaluator<'a, T: Real, M: KinematicModel<T>> {
    model: &'a M,
    name: String,
    point: Vector3<f64>,
    frame: FrameId,
    target: Vector3<f64>,
    view: UnitQuaternion<f64>,
    rows: ActiveRows,
    _scalar: PhantomData<fn() -> T>,
}

impl<'a, T: Real, M: KinematicModel<T>> WorldPointEvaluator<'a, T, M> {
    /// Constrain `point` (fixed in `frame`) to the world origin.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::FrameNotFound`] if `frame` is not part of `model`.
    pub fn new(model: &'a M, point: Vector3<f64>, frame: FrameId) -> Result<Self> {
        if !model.has_frame(frame) {
            return Err(SimError::FrameNotFound(frame));
        }
        if !point.iter().all(|x| x.is_finite()) {
            return Err(SimError::invalid_config("contact point must be finite"));
        }
        Ok(Self {
            model,
            name: String::from("world_point"),
            point,
            frame,
            target: Vector3::zeros(),
            view: UnitQuaternion::identity(),
            rows: ActiveRows::all(3),
            _scalar: PhantomData,
        })
    }

    /// Set the evaluator name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the world position the point is pinned to.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for a non-finite target.
    pub fn with_target(mut self, target: Vector3<f64>) -> Result<Self> {
        if !target.iter().all(|x| x.is_finite()) {
            return Err(SimError::invalid_config("world point target must be finite"));
        }
        self.target = target;
        Ok(self)
    }

    /// Express the rows along the columns of `view` instead of the world axes.
    #[must_use]
    pub fn with_view(mut self, view: UnitQuaternion<f64>) -> Self {
        self.view = view;
        self
    }

    /// Select active rows among `0..3`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidActiveRows`] for out-of-range or unsorted
    /// indices.
    pub fn with_active_rows(mut self, indices: impl Into<Vec<usize>>) -> Result<Self> {
        self.rows = ActiveRows::new(3, indices)?;
        Ok(self)
    }

    /// Contact point in frame coordinates.
    #[must_use]
    pub fn point(&self) -> &Vector3<f64> {
        &self.point
    }

    /// Frame the point is fixed in.
    #[must_use]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Target world position.
    #[must_use]
    pub fn target(&self) -> &Vector3<f64> {
        &self.target
    }

    /// View rotation.
    #[must_use]
    pub fn view(&self) -> &UnitQuaternion<f64> {
        &self.view
    }

    fn view_transpose(&self) -> Matrix3<T> {
        self.view.to_rotation_matrix().matrix().transpose().map(T::from_f64)
    }
}

impl<T: Real, M: KinematicModel<T>> KinematicEvaluator<T, M> for WorldPointEvaluator<'_, T, M> {
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
        let world = self.model.world_frame();
        let p = self
            .model
            .calc_point_position(context, self.frame, &self.point.map(T::from_f64), world);
        let r = self.view_transpose() * (p - self.target.map(T::from_f64));
        DVector::from_iterator(3, r.iter().copied())
    }

    fn eval_jacobian(&self, context: &M::Context) -> DMatrix<T> {
        let world = self.model.world_frame();
        let jac = self.model.calc_jacobian_translational_velocity(
            context,
            self.frame,
            &self.point.map(T::from_f64),
            world,
            world,
        );
        let rotated = self.view_transpose() * jac;
        DMatrix::from_column_slice(3, rotated.ncols(), rotated.as_slice())
    }

    fn eval_jacobian_dot_times_v(&self, context: &M::Context) -> DVector<T> {
        let world = self.model.world_frame();
        let bias = self.model.calc_bias_translational_acceleration(
            context,
            self.frame,
            &self.point.map(T::from_f64),
            world,
        );
        let r = self.view_transpose() * bias;
        DVector::from_iterator(3, r.iter().copied())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sim_multibody::{JointKind, KinematicTree};
    use sim_types::Pose;

    /// Unit pendulum hinged at (0, 0, 1) swinging about y.
    fn pendulum() -> (KinematicTree, FrameId) {
        let mut tree = KinematicTree::new();
        let link = tree
            .add_body(
                "link",
                FrameId::WORLD,
                JointKind::revolute(Vector3::y()),
                Pose::from_xyz(0.0, 0.0, 1.0),
            )
            .unwrap();
        (tree, link)
    }

    fn context(tree: &KinematicTree, angle: f64, rate: f64) -> sim_multibody::TreeContext<f64> {
        tree.create_context(DVector::from_vec(vec![angle]), DVector::from_vec(vec![rate]))
            .unwrap()
    }

    #[test]
    fn test_residual_is_offset_from_target() {
        let (tree, link) = pendulum();
        let eval = WorldPointEvaluator::<f64, _>::new(&tree, Vector3::new(0.0, 0.0, -1.0), link)
            .unwrap()
            .with_target(Vector3::new(0.0, 0.0, 0.5))
            .unwrap();

        let ctx = context(&tree, 0.0, 0.0);
        let r = eval.eval_residual(&ctx);
        assert_relative_eq!(r, DVector::from_vec(vec![0.0, 0.0, -0.5]), epsilon = 1e-12);
    }

    #[test]
    fn test_view_rotation_reorders_rows() {
        let (tree, link) = pendulum();
        // Quarter turn about x: the view's z column is the world -y axis.
        let view = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_2);
        let eval = WorldPointEvaluator::<f64, _>::new(&tree, Vector3::zeros(), link)
            .unwrap()
            .with_view(view);

        let ctx = context(&tree, 0.0, 0.0);
        // Hinge at world (0, 0, 1) → view coordinates (0, 1, 0).
        assert_relative_eq!(
            eval.eval_residual(&ctx),
            DVector::from_vec(vec![0.0, 1.0, 0.0]),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_bob_jacobian_and_centripetal_bias() {
        let (tree, link) = pendulum();
        let eval = WorldPointEvaluator::<f64, _>::new(&tree, Vector3::new(0.0, 0.0, -1.0), link)
            .unwrap();

        // Hanging straight down, spinning at 2 rad/s about y.
        let ctx = context(&tree, 0.0, 2.0);
        let jac = eval.eval_jacobian(&ctx);
        assert_eq!(jac.shape(), (3, 1));
        // ω × r with ω = ŷ, r = −ẑ gives −x̂.
        assert_relative_eq!(jac[(0, 0)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(jac[(2, 0)], 0.0, epsilon = 1e-12);

        // Centripetal ω²r pointing back up at the hinge.
        let bias = eval.eval_jacobian_dot_times_v(&ctx);
        assert_relative_eq!(bias, DVector::from_vec(vec![0.0, 0.0, 4.0]), epsilon = 1e-12);
    }

    #[test]
    fn test_normal_row_only() {
        let (tree, link) = pendulum();
        let eval = WorldPointEvaluator::<f64, _>::new(&tree, Vector3::new(0.0, 0.0, -1.0), link)
            .unwrap()
            .with_name("foot")
            .with_active_rows(vec![2])
            .unwrap();

        let ctx = context(&tree, 0.3, 1.0);
        assert_eq!(eval.name(), "foot");
        assert_eq!(eval.length(), 3);
        assert_eq!(eval.num_active(), 1);

        let full = eval.eval_residual(&ctx);
        let active = eval.eval_active_residual(&ctx);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0], full[2]);
        assert_eq!(eval.eval_active_jacobian(&ctx).shape(), (1, 1));
    }

    #[test]
    fn test_constructor_errors() {
        let (tree, _) = pendulum();
        let missing = FrameId::new(5);
        assert_eq!(
            WorldPointEvaluator::<f64, _>::new(&tree, Vector3::zeros(), missing).unwrap_err(),
            SimError::FrameNotFound(missing)
        );

        let eval = WorldPointEvaluator::<f64, _>::new(&tree, Vector3::zeros(), FrameId::WORLD)
            .unwrap();
        assert!(eval.clone().with_target(Vector3::new(f64::NAN, 0.0, 0.0)).is_err());
        assert!(eval.with_active_rows(vec![0, 3]).is_err());
    }
}
