//! The kinematic queries constraint evaluators consume.
//!
//! [`KinematicModel`] is the boundary to the rigid-body engine. Evaluators
//! hold a shared reference to a model and call these methods with a
//! caller-supplied context; the model is never mutated through this trait.
//!
//! # Frames
//!
//! Every query names the frame a point is attached to and the frame the result
//! is expressed in. Jacobians additionally name the frame the velocity is
//! *measured* in: the translational velocity of a point measured in frame `M`
//! is its world velocity minus the velocity of the `M`-fixed point that
//! currently coincides with it.

use nalgebra::{DVector, Matrix3xX, Vector3};
use sim_types::{FrameId, Real, Result};

/// Kinematic queries over a mechanism with generalized positions `q` and
/// generalized velocities `v`.
///
/// Implementations must be pure: for a given context every query returns the
/// same value on every call.
///
/// # Panics
///
/// Query methods panic if a frame is not part of the model or the context was
/// created for a different model. Both are integration bugs; frames are
/// validated when evaluators are constructed.
pub trait KinematicModel<T: Real> {
    /// State snapshot (positions, velocities and anything derived from them).
    type Context;

    /// Number of generalized positions `nq`.
    fn num_positions(&self) -> usize;

    /// Number of generalized velocities `nv` (Jacobian column count).
    fn num_velocities(&self) -> usize;

    /// The inertial world frame.
    fn world_frame(&self) -> FrameId;

    /// Whether `frame` belongs to this model.
    fn has_frame(&self, frame: FrameId) -> bool;

    /// Build a context from generalized positions and velocities.
    ///
    /// Fails with [`SimError::DimensionMismatch`](sim_types::SimError) when the
    /// vectors do not match `nq`/`nv`.
    fn create_context(&self, positions: DVector<T>, velocities: DVector<T>)
    -> Result<Self::Context>;

    /// Advance positions by `velocities · dt` on the configuration manifold.
    fn integrate_positions(
        &self,
        positions: &DVector<T>,
        velocities: &DVector<T>,
        dt: T,
    ) -> DVector<T>;

    /// Generalized velocity stored in the context.
    fn velocities<'c>(&self, context: &'c Self::Context) -> &'c DVector<T>;

    /// Position of `point` (fixed in `frame`) expressed in `expressed_in`.
    fn calc_point_position(
        &self,
        context: &Self::Context,
        frame: FrameId,
        point: &Vector3<T>,
        expressed_in: FrameId,
    ) -> Vector3<T>;

    /// 3×nv Jacobian mapping `v` to the translational velocity of `point`
    /// (fixed in `frame`), measured in `measured_in` and expressed in
    /// `expressed_in`.
    fn calc_jacobian_translational_velocity(
        &self,
        context: &Self::Context,
        frame: FrameId,
        point: &Vector3<T>,
        measured_in: FrameId,
        expressed_in: FrameId,
    ) -> Matrix3xX<T>;

    /// Translational acceleration of `point` (fixed in `frame`) measured in
    /// the world frame at the context's velocity and zero generalized
    /// acceleration, expressed in `expressed_in`. This is `J̇·v` for the
    /// world-frame point Jacobian.
    fn calc_bias_translational_acceleration(
        &self,
        context: &Self::Context,
        frame: FrameId,
        point: &Vector3<T>,
        expressed_in: FrameId,
    ) -> Vector3<T>;
}
