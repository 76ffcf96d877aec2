//! Core types for kinematic constraint evaluation.
//!
//! This crate provides the foundational types shared by the kinematic model
//! and the constraint evaluators:
//!
//! - [`Real`] - Scalar abstraction over `f64` and forward-mode [`Dual`] numbers
//! - [`FrameId`] - Reference frame identifiers (frame 0 is the world)
//! - [`Pose`] - Fixed rigid offsets between frames
//! - [`DerivativeCheckConfig`] - Finite-difference validation settings
//! - [`SimError`] - Construction-time errors
//!
//! # Design Philosophy
//!
//! These types are **pure data**. Kinematics live in `sim-multibody`, the
//! constraint evaluators in `sim-kinematic`.
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//!
//! - Trajectory optimizers
//! - Hardware control code
//! - Analysis tools
//!
//! # Coordinate System
//!
//! Consistent with the CortenForge ecosystem:
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use sim_types::{Dual, Real, norm};
//! use nalgebra::Vector3;
//!
//! // The same code runs on f64 and on dual numbers.
//! fn length<T: Real>(v: &Vector3<T>) -> T {
//!     norm(v)
//! }
//!
//! assert_eq!(length(&Vector3::new(3.0, 4.0, 0.0)), 5.0);
//!
//! let t = Dual::variable(3.0);
//! let v = Vector3::new(t, Dual::constant(4.0), Dual::constant(0.0));
//! assert!((length(&v).eps - 0.6).abs() < 1e-12);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod config;
mod dual;
mod error;
mod frame;
mod scalar;

pub use config::DerivativeCheckConfig;
pub use dual::Dual;
pub use error::SimError;
pub use frame::{FrameId, Pose};
pub use scalar::{Real, norm, norm_squared};

// Re-export math types for convenience
pub use nalgebra::{DMatrix, DVector, Matrix3, Point3, UnitQuaternion, Vector3};

/// Result type for model and constraint construction.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn squared_distance<T: Real>(a: &Vector3<T>, b: &Vector3<T>) -> T {
        norm_squared(&(a - b))
    }

    #[test]
    fn test_generic_code_on_both_scalars() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(1.0, 0.0, 0.0);
        assert_eq!(squared_distance(&a, &b), 13.0);

        let a = a.map(Dual::constant);
        let b = Vector3::new(Dual::variable(1.0), Dual::constant(0.0), Dual::constant(0.0));
        let d = squared_distance(&a, &b);
        assert_eq!(d.re, 13.0);
        // d/db_x of (a_x - b_x)² = -2 (a_x - b_x) = 0
        assert_eq!(d.eps, 0.0);
    }
}
