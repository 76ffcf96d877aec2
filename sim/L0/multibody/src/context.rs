//! State snapshots and the forward kinematics pass.
//!
//! A [`TreeContext`] is computed once per `(q, v)` and then read by every
//! query. All quantities are world-frame:
//!
//! | Field              | Meaning                                         |
//! |--------------------|-------------------------------------------------|
//! | `rotation`         | frame axes in world coordinates                 |
//! | `origin`           | frame origin                                    |
//! | `angular_velocity` | ω of the frame                                  |
//! | `origin_velocity`  | velocity of the frame origin                    |
//! | `angular_bias`     | ω̇ at zero generalized acceleration              |
//! | `origin_bias`      | acceleration of the origin at zero v̇            |
//! | `axis`             | joint axis (zero for fixed joints)              |

use nalgebra::{DVector, Matrix3, Vector3};
use sim_types::{FrameId, Real};

use crate::joint::{JointKind, axis_angle_rotation};
use crate::tree::KinematicTree;

/// World-frame kinematics of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameKinematics<T: Real> {
    /// Frame orientation (columns are the frame axes in world coordinates).
    pub rotation: Matrix3<T>,
    /// Frame origin in world coordinates.
    pub origin: Vector3<T>,
    /// Angular velocity.
    pub angular_velocity: Vector3<T>,
    /// Linear velocity of the origin.
    pub origin_velocity: Vector3<T>,
    /// Angular acceleration with `v̇ = 0`.
    pub angular_bias: Vector3<T>,
    /// Linear acceleration of the origin with `v̇ = 0`.
    pub origin_bias: Vector3<T>,
    /// Joint axis in world coordinates (zero for fixed joints and the world).
    pub axis: Vector3<T>,
}

impl<T: Real> FrameKinematics<T> {
    fn world() -> Self {
        Self {
            rotation: Matrix3::identity(),
            origin: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            origin_velocity: Vector3::zeros(),
            angular_bias: Vector3::zeros(),
            origin_bias: Vector3::zeros(),
            axis: Vector3::zeros(),
        }
    }

    /// World position of a point given in frame coordinates.
    #[must_use]
    pub fn point_position(&self, local: &Vector3<T>) -> Vector3<T> {
        self.origin + self.rotation * local
    }

    /// World velocity of a point rigidly attached to this frame at world
    /// position `point`.
    #[must_use]
    pub fn point_velocity(&self, point: &Vector3<T>) -> Vector3<T> {
        self.origin_velocity + self.angular_velocity.cross(&(point - self.origin))
    }

    /// World acceleration (at `v̇ = 0`) of a point rigidly attached to this
    /// frame at world position `point`.
    #[must_use]
    pub fn point_bias_acceleration(&self, point: &Vector3<T>) -> Vector3<T> {
        let r = point - self.origin;
        let w = &self.angular_velocity;
        self.origin_bias + self.angular_bias.cross(&r) + w.cross(&w.cross(&r))
    }
}

/// Snapshot of a [`KinematicTree`] at one `(q, v)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeContext<T: Real> {
    tree_revision: u64,
    positions: DVector<T>,
    velocities: DVector<T>,
    frames: Vec<FrameKinematics<T>>,
}

impl<T: Real> TreeContext<T> {
    /// Revision of the tree this context was computed for.
    #[must_use]
    pub fn tree_revision(&self) -> u64 {
        self.tree_revision
    }

    /// Generalized positions.
    #[must_use]
    pub fn positions(&self) -> &DVector<T> {
        &self.positions
    }

    /// Generalized velocities.
    #[must_use]
    pub fn velocities(&self) -> &DVector<T> {
        &self.velocities
    }

    /// Kinematics of `frame`, if it exists.
    #[must_use]
    pub fn frame(&self, frame: FrameId) -> Option<&FrameKinematics<T>> {
        self.frames.get(frame.index())
    }

    /// Number of frames (including the world).
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn frame_unchecked(&self, frame: FrameId) -> &FrameKinematics<T> {
        &self.frames[frame.index()]
    }

    /// Run the forward pass. Dimensions have already been validated.
    pub(crate) fn compute(
        tree: &KinematicTree,
        positions: DVector<T>,
        velocities: DVector<T>,
    ) -> Self {
        let mut frames: Vec<FrameKinematics<T>> = Vec::with_capacity(tree.num_frames());
        frames.push(FrameKinematics::world());

        for body in tree.bodies() {
            let parent = &frames[body.parent().index()];
            let offset_rotation = body.offset().rotation_matrix().map(T::from_f64);
            let offset_translation = body.offset().translation().map(T::from_f64);

            let joint_rotation = parent.rotation * offset_rotation;
            let joint_origin = parent.origin + parent.rotation * offset_translation;
            let w_parent = parent.angular_velocity;

            let (q, qd) = body
                .dof()
                .map_or((T::zero(), T::zero()), |d| (positions[d], velocities[d]));

            let mut kin = FrameKinematics {
                rotation: joint_rotation,
                origin: joint_origin,
                angular_velocity: w_parent,
                origin_velocity: Vector3::zeros(),
                angular_bias: parent.angular_bias,
                origin_bias: Vector3::zeros(),
                axis: Vector3::zeros(),
            };

            // Relative linear velocity of the origin with respect to the
            // parent frame (nonzero only for prismatic joints).
            let mut slide_velocity = Vector3::zeros();

            match body.joint() {
                JointKind::Fixed => {}
                JointKind::Revolute { axis } => {
                    let local_axis = axis.map(T::from_f64);
                    let axis_world = joint_rotation * local_axis;
                    kin.rotation = joint_rotation * axis_angle_rotation(&local_axis, q);
                    kin.angular_velocity = w_parent + axis_world * qd;
                    kin.angular_bias = parent.angular_bias + w_parent.cross(&axis_world) * qd;
                    kin.axis = axis_world;
                }
                JointKind::Prismatic { axis } => {
                    let axis_world = joint_rotation * axis.map(T::from_f64);
                    kin.origin = joint_origin + axis_world * q;
                    slide_velocity = axis_world * qd;
                    kin.axis = axis_world;
                }
            }

            let r = kin.origin - parent.origin;
            kin.origin_velocity = parent.point_velocity(&kin.origin) + slide_velocity;
            kin.origin_bias = parent.origin_bias
                + parent.angular_bias.cross(&r)
                + w_parent.cross(&w_parent.cross(&r))
                + w_parent.cross(&slide_velocity) * T::from_f64(2.0);

            frames.push(kin);
        }

        Self {
            tree_revision: tree.revision(),
            positions,
            velocities,
            frames,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sim_types::Pose;

    #[test]
    fn test_world_frame_is_at_rest() {
        let tree = KinematicTree::new();
        let ctx = TreeContext::<f64>::compute(&tree, DVector::zeros(0), DVector::zeros(0));
        let world = ctx.frame(FrameId::WORLD).unwrap();

        assert_eq!(ctx.num_frames(), 1);
        assert_eq!(world.rotation, Matrix3::identity());
        assert_eq!(world.origin, Vector3::zeros());
    }

    #[test]
    fn test_spinning_link_centripetal_acceleration() {
        // Link of length 2 hinged at the world origin about z.
        let mut tree = KinematicTree::new();
        let arm = tree
            .add_body(
                "arm",
                FrameId::WORLD,
                JointKind::revolute(Vector3::z()),
                Pose::identity(),
            )
            .unwrap();

        let w = 3.0;
        let ctx = TreeContext::compute(
            &tree,
            DVector::from_vec(vec![0.0]),
            DVector::from_vec(vec![w]),
        );
        let frame = ctx.frame(arm).unwrap();
        let tip = frame.point_position(&Vector3::new(2.0, 0.0, 0.0));

        assert_relative_eq!(tip, Vector3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(frame.point_velocity(&tip), Vector3::new(0.0, 2.0 * w, 0.0));
        // a = -ω² r
        assert_relative_eq!(
            frame.point_bias_acceleration(&tip),
            Vector3::new(-w * w * 2.0, 0.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_slider_on_spinning_base_has_coriolis_term() {
        // Base spins about z, slider moves along the base x axis.
        let mut tree = KinematicTree::new();
        let base = tree
            .add_body(
                "base",
                FrameId::WORLD,
                JointKind::revolute(Vector3::z()),
                Pose::identity(),
            )
            .unwrap();
        let slider = tree
            .add_body(
                "slider",
                base,
                JointKind::prismatic(Vector3::x()),
                Pose::identity(),
            )
            .unwrap();

        let (w, s, sd) = (2.0, 0.5, 1.5);
        let ctx = TreeContext::compute(
            &tree,
            DVector::from_vec(vec![0.0, s]),
            DVector::from_vec(vec![w, sd]),
        );
        let frame = ctx.frame(slider).unwrap();

        assert_relative_eq!(frame.origin, Vector3::new(s, 0.0, 0.0));
        assert_relative_eq!(frame.origin_velocity, Vector3::new(sd, w * s, 0.0));
        // centripetal -ω² s x̂ plus Coriolis 2 ω × ṡ x̂ = 2 ω ṡ ŷ
        assert_relative_eq!(
            frame.origin_bias,
            Vector3::new(-w * w * s, 2.0 * w * sd, 0.0),
            epsilon = 1e-12
        );
    }
}
