//! Reference kinematic tree.
//!
//! A minimal articulated mechanism: frames attached to earlier frames through
//! fixed, revolute or prismatic joints. It implements [`KinematicModel`] for
//! every [`Real`] scalar, so evaluators can be exercised on `f64` and on dual
//! numbers alike.
//!
//! # Example
//!
//! ```
//! use sim_multibody::{JointKind, KinematicModel, KinematicTree};
//! use sim_types::{FrameId, Pose};
//! use nalgebra::{DVector, Vector3};
//!
//! let mut tree = KinematicTree::new();
//! let upper = tree
//!     .add_body("upper", FrameId::WORLD, JointKind::revolute(Vector3::y()), Pose::identity())
//!     .unwrap();
//! let lower = tree
//!     .add_body("lower", upper, JointKind::revolute(Vector3::y()), Pose::from_xyz(0.0, 0.0, -1.0))
//!     .unwrap();
//!
//! let ctx = tree
//!     .create_context(DVector::from_vec(vec![0.0, 0.0]), DVector::from_vec(vec![1.0, 0.0]))
//!     .unwrap();
//! let foot = tree.calc_point_position(&ctx, lower, &Vector3::new(0.0, 0.0, -1.0), FrameId::WORLD);
//! assert!((foot - Vector3::new(0.0, 0.0, -2.0)).norm() < 1e-12);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{DVector, Matrix3xX, Vector3};
use sim_types::{FrameId, Pose, Real, Result, SimError};
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::context::TreeContext;
use crate::joint::JointKind;
use crate::model::KinematicModel;

/// Name of frame 0.
pub const WORLD_FRAME_NAME: &str = "world";

/// A frame of the tree together with the joint that moves it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Body {
    name: String,
    parent: FrameId,
    joint: JointKind,
    /// Offset of the joint frame in the parent frame, applied before the joint.
    offset: Pose,
    /// Index of this joint's coordinate in `q` and `v`.
    dof: Option<usize>,
}

impl Body {
    /// Frame name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent frame.
    #[must_use]
    pub fn parent(&self) -> FrameId {
        self.parent
    }

    /// Joint connecting this frame to its parent.
    #[must_use]
    pub fn joint(&self) -> &JointKind {
        &self.joint
    }

    /// Fixed offset from the parent frame to the joint frame.
    #[must_use]
    pub fn offset(&self) -> &Pose {
        &self.offset
    }

    /// Coordinate index of the joint, `None` for fixed joints.
    #[must_use]
    pub fn dof(&self) -> Option<usize> {
        self.dof
    }
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Tree of frames rooted at the world.
///
/// Frame `0` is the world; body `i` is frame `i + 1`. Parents always precede
/// children, so a single forward sweep computes all frame kinematics.
///
/// Every tree carries a process-unique revision, renewed by each
/// [`add_body`](Self::add_body). Contexts remember the revision they were
/// computed for, and queries reject contexts from any other tree (or from an
/// earlier shape of this one). Clones share the revision until one of them
/// changes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KinematicTree {
    bodies: Vec<Body>,
    num_dofs: usize,
    #[cfg_attr(feature = "serde", serde(skip, default = "next_revision"))]
    revision: u64,
}

impl Default for KinematicTree {
    fn default() -> Self {
        Self {
            bodies: Vec::new(),
            num_dofs: 0,
            revision: next_revision(),
        }
    }
}

/// Structural equality; the revision is ignored.
impl PartialEq for KinematicTree {
    fn eq(&self, other: &Self) -> bool {
        self.num_dofs == other.num_dofs && self.bodies == other.bodies
    }
}

impl KinematicTree {
    /// Create a tree containing only the world frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of the current tree shape, stamped into every context.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Attach a new frame to `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent does not exist, the name is already
    /// taken, or the joint axis is zero or not finite.
    pub fn add_body(
        &mut self,
        name: impl Into<String>,
        parent: FrameId,
        joint: JointKind,
        offset: Pose,
    ) -> Result<FrameId> {
        let name = name.into();
        if !self.contains(parent) {
            return Err(SimError::FrameNotFound(parent));
        }
        if name == WORLD_FRAME_NAME || self.bodies.iter().any(|b| b.name == name) {
            return Err(SimError::DuplicateFrameName { name });
        }
        let Some(joint) = joint.normalized() else {
            return Err(SimError::InvalidAxis { name });
        };
        if !offset.is_finite() {
            return Err(SimError::invalid_config(format!(
                "offset of frame {name} is not finite"
            )));
        }

        let dof = (joint.dof() > 0).then_some(self.num_dofs);
        self.num_dofs += joint.dof();

        let id = FrameId::new(self.bodies.len() + 1);
        debug!(frame = %id, name = %name, parent = %parent, ?dof, "added body");

        self.bodies.push(Body {
            name,
            parent,
            joint,
            offset,
            dof,
        });
        self.revision = next_revision();
        Ok(id)
    }

    /// Number of frames, including the world.
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.bodies.len() + 1
    }

    /// Number of degrees of freedom (`nq == nv`).
    #[must_use]
    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    /// Bodies in topological order (frame `i + 1` is `bodies()[i]`).
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Body attached at `frame` (`None` for the world or unknown frames).
    #[must_use]
    pub fn body(&self, frame: FrameId) -> Option<&Body> {
        frame
            .index()
            .checked_sub(1)
            .and_then(|i| self.bodies.get(i))
    }

    /// Whether `frame` exists.
    #[must_use]
    pub fn contains(&self, frame: FrameId) -> bool {
        frame.index() < self.num_frames()
    }

    /// Look up a frame by name.
    pub fn frame_by_name(&self, name: &str) -> Result<FrameId> {
        if name == WORLD_FRAME_NAME {
            return Ok(FrameId::WORLD);
        }
        self.bodies
            .iter()
            .position(|b| b.name == name)
            .map(|i| FrameId::new(i + 1))
            .ok_or_else(|| SimError::frame_name_not_found(name))
    }

    /// Name of `frame`.
    #[must_use]
    pub fn frame_name(&self, frame: FrameId) -> Option<&str> {
        if frame.is_world() {
            Some(WORLD_FRAME_NAME)
        } else {
            self.body(frame).map(Body::name)
        }
    }

    fn check_frame(&self, frame: FrameId) {
        assert!(
            self.contains(frame),
            "{frame} is not part of this kinematic tree ({} frames)",
            self.num_frames()
        );
    }

    fn check_context<T: Real>(&self, context: &TreeContext<T>) {
        assert_eq!(
            context.tree_revision(),
            self.revision,
            "context was created for a different kinematic tree"
        );
    }

    /// World-frame 3×nv Jacobian of the point at world position `point`,
    /// rigidly attached to `frame`.
    ///
    /// Walks the chain from `frame` to the root; each joint on the path adds
    /// one column:
    ///
    /// | Joint     | Column        |
    /// |-----------|---------------|
    /// | Revolute  | `axis × r`    |
    /// | Prismatic | `axis`        |
    ///
    /// where `r = point − joint origin`.
    fn world_point_jacobian<T: Real>(
        &self,
        context: &TreeContext<T>,
        frame: FrameId,
        point: &Vector3<T>,
    ) -> Matrix3xX<T> {
        let mut jac = Matrix3xX::zeros(self.num_dofs);

        let mut current = frame;
        while let Some(body) = self.body(current) {
            if let Some(dof) = body.dof {
                let kin = context.frame_unchecked(current);
                let column = match body.joint {
                    JointKind::Revolute { .. } => kin.axis.cross(&(point - kin.origin)),
                    JointKind::Prismatic { .. } => kin.axis,
                    JointKind::Fixed => Vector3::zeros(),
                };
                jac.set_column(dof, &column);
            }
            current = body.parent;
        }

        jac
    }

    /// Re-express a world vector in `frame` coordinates.
    fn to_frame<T: Real>(
        context: &TreeContext<T>,
        frame: FrameId,
        world: Vector3<T>,
    ) -> Vector3<T> {
        if frame.is_world() {
            world
        } else {
            context.frame_unchecked(frame).rotation.transpose() * world
        }
    }
}

impl<T: Real> KinematicModel<T> for KinematicTree {
    type Context = TreeContext<T>;

    fn num_positions(&self) -> usize {
        self.num_dofs
    }

    fn num_velocities(&self) -> usize {
        self.num_dofs
    }

    fn world_frame(&self) -> FrameId {
        FrameId::WORLD
    }

    fn has_frame(&self, frame: FrameId) -> bool {
        self.contains(frame)
    }

    fn create_context(
        &self,
        positions: DVector<T>,
        velocities: DVector<T>,
    ) -> Result<TreeContext<T>> {
        if positions.len() != self.num_dofs {
            return Err(SimError::dimension_mismatch(
                "positions",
                self.num_dofs,
                positions.len(),
            ));
        }
        if velocities.len() != self.num_dofs {
            return Err(SimError::dimension_mismatch(
                "velocities",
                self.num_dofs,
                velocities.len(),
            ));
        }
        trace!(nq = self.num_dofs, frames = self.num_frames(), "creating context");
        Ok(TreeContext::compute(self, positions, velocities))
    }

    fn integrate_positions(
        &self,
        positions: &DVector<T>,
        velocities: &DVector<T>,
        dt: T,
    ) -> DVector<T> {
        positions + velocities * dt
    }

    fn velocities<'c>(&self, context: &'c TreeContext<T>) -> &'c DVector<T> {
        context.velocities()
    }

    fn calc_point_position(
        &self,
        context: &TreeContext<T>,
        frame: FrameId,
        point: &Vector3<T>,
        expressed_in: FrameId,
    ) -> Vector3<T> {
        self.check_context(context);
        self.check_frame(frame);
        self.check_frame(expressed_in);

        let world = context.frame_unchecked(frame).point_position(point);
        let target = context.frame_unchecked(expressed_in);
        Self::to_frame(context, expressed_in, world - target.origin)
    }

    fn calc_jacobian_translational_velocity(
        &self,
        context: &TreeContext<T>,
        frame: FrameId,
        point: &Vector3<T>,
        measured_in: FrameId,
        expressed_in: FrameId,
    ) -> Matrix3xX<T> {
        self.check_context(context);
        self.check_frame(frame);
        self.check_frame(measured_in);
        self.check_frame(expressed_in);

        let world_point = context.frame_unchecked(frame).point_position(point);
        let mut jac = self.world_point_jacobian(context, frame, &world_point);
        if !measured_in.is_world() {
            jac -= self.world_point_jacobian(context, measured_in, &world_point);
        }

        if expressed_in.is_world() {
            jac
        } else {
            context.frame_unchecked(expressed_in).rotation.transpose() * jac
        }
    }

    fn calc_bias_translational_acceleration(
        &self,
        context: &TreeContext<T>,
        frame: FrameId,
        point: &Vector3<T>,
        expressed_in: FrameId,
    ) -> Vector3<T> {
        self.check_context(context);
        self.check_frame(frame);
        self.check_frame(expressed_in);

        let kin = context.frame_unchecked(frame);
        let world_point = kin.point_position(point);
        Self::to_frame(
            context,
            expressed_in,
            kin.point_bias_acceleration(&world_point),
        )
    }
}
