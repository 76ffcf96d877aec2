//! Kinematic model interface and a reference kinematic tree.
//!
//! Constraint evaluators need four things from a rigid-body engine: point
//! positions, translational point Jacobians, translational bias
//! accelerations, and the current generalized velocity. This crate defines
//! that boundary as the [`KinematicModel`] trait and ships
//! [`KinematicTree`], a small tree of fixed/revolute/prismatic joints that
//! implements it for any [`Real`](sim_types::Real) scalar.
//!
//! # Contexts
//!
//! Models are immutable while evaluators borrow them. Everything that depends
//! on the state lives in a context built by
//! [`KinematicModel::create_context`]; each thread evaluating constraints
//! supplies its own context.
//!
//! ```
//! use sim_multibody::{JointKind, KinematicModel, KinematicTree};
//! use sim_types::{FrameId, Pose};
//! use nalgebra::{DVector, Vector3};
//!
//! let mut tree = KinematicTree::new();
//! let slider = tree
//!     .add_body("slider", FrameId::WORLD, JointKind::prismatic(Vector3::x()), Pose::identity())
//!     .unwrap();
//!
//! let ctx = tree
//!     .create_context(DVector::from_vec(vec![0.25]), DVector::from_vec(vec![2.0]))
//!     .unwrap();
//! let jac = tree.calc_jacobian_translational_velocity(
//!     &ctx,
//!     slider,
//!     &Vector3::<f64>::zeros(),
//!     FrameId::WORLD,
//!     FrameId::WORLD,
//! );
//! assert_eq!(jac.ncols(), 1);
//! assert_eq!(jac[(0, 0)], 1.0);
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.

#![doc(html_root_url = "https://docs.rs/sim-multibody/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod context;
mod joint;
mod model;
mod tree;

pub use context::{FrameKinematics, TreeContext};
pub use joint::JointKind;
pub use model::KinematicModel;
pub use tree::{Body, KinematicTree, WORLD_FRAME_NAME};

// Re-export types that appear in the model interface
pub use sim_types::{FrameId, Pose};
