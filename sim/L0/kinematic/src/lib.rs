//! Differentiable kinematic constraint evaluators.
//!
//! A kinematic evaluator describes a holonomic constraint `φ(q) = 0` over a
//! [`KinematicModel`](sim_multibody::KinematicModel) and supplies the three
//! quantities a trajectory optimizer or constrained dynamics solver needs:
//!
//! - the residual `φ(q)`;
//! - the velocity Jacobian `J` with `φ̇ = J·v`;
//! - the bias term `J̇·v` with `φ̈ = J·v̇ + J̇·v`.
//!
//! # Evaluators
//!
//! - [`DistanceEvaluator`] - distance between two points on two frames
//! - [`WorldPointEvaluator`] - a body point pinned to a world position
//!   (contact points)
//!
//! Several evaluators are stacked with [`KinematicEvaluatorSet`], which keeps
//! insertion order as row order and lets members be switched on and off.
//!
//! # Scalars
//!
//! Everything is generic over [`Real`](sim_types::Real). Evaluating with
//! [`Dual`](sim_types::Dual) positions seeded with `v` gives exact time
//! derivatives, which is how the analytical Jacobians are cross-checked in
//! the tests. [`check_derivatives`] does the same with finite differences.
//!
//! # Example
//!
//! ```
//! use sim_kinematic::{DistanceEvaluator, KinematicEvaluator};
//! use sim_multibody::{JointKind, KinematicModel, KinematicTree};
//! use sim_types::{FrameId, Pose};
//! use nalgebra::{DVector, Vector3};
//!
//! // A unit pendulum whose bob should stay 1.5 away from (1, 0, 0).
//! let mut tree = KinematicTree::new();
//! let link = tree
//!     .add_body("link", FrameId::WORLD, JointKind::revolute(Vector3::y()), Pose::identity())
//!     .unwrap();
//! let rod = DistanceEvaluator::<f64, _>::new(
//!     &tree,
//!     Vector3::new(0.0, 0.0, -1.0),
//!     link,
//!     Vector3::new(1.0, 0.0, 0.0),
//!     FrameId::WORLD,
//!     1.5,
//! )
//! .unwrap();
//!
//! let ctx = tree
//!     .create_context(DVector::from_vec(vec![0.0]), DVector::from_vec(vec![1.0]))
//!     .unwrap();
//! let residual = rod.eval_residual(&ctx);
//! let jacobian = rod.eval_jacobian(&ctx);
//! assert!((residual[0] - (2.0_f64.sqrt() - 1.5)).abs() < 1e-12);
//! assert_eq!(jacobian.shape(), (1, 1));
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.

#![doc(html_root_url = "https://docs.rs/sim-kinematic/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::suboptimal_flops)]

mod check;
mod distance;
mod evaluator;
mod set;
mod world_point;

pub use check::{DerivativeCheck, check_derivatives, check_set_derivatives};
pub use distance::DistanceEvaluator;
pub use evaluator::{ActiveRows, KinematicEvaluator};
pub use set::{BoxedEvaluator, KinematicEvaluatorSet};
pub use world_point::WorldPointEvaluator;

// Re-export types that appear in evaluator constructors
pub use sim_types::{DerivativeCheckConfig, FrameId, SimError};
