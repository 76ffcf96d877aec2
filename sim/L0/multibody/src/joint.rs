//! Joint kinds connecting a frame to its parent.

use nalgebra::{Matrix3, Vector3};
use sim_types::Real;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a frame moves relative to its parent.
///
/// Every joint contributes one generalized position and one generalized
/// velocity per degree of freedom, so `nq == nv` for trees built from these
/// kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointKind {
    /// Rigid attachment (0 DOF).
    Fixed,
    /// Rotation about an axis through the frame origin (1 DOF).
    Revolute {
        /// Rotation axis in the joint frame (unit vector).
        axis: Vector3<f64>,
    },
    /// Translation along an axis (1 DOF).
    Prismatic {
        /// Slide axis in the joint frame (unit vector).
        axis: Vector3<f64>,
    },
}

impl JointKind {
    /// Revolute joint about `axis`.
    #[must_use]
    pub fn revolute(axis: Vector3<f64>) -> Self {
        Self::Revolute { axis }
    }

    /// Prismatic joint along `axis`.
    #[must_use]
    pub fn prismatic(axis: Vector3<f64>) -> Self {
        Self::Prismatic { axis }
    }

    /// Number of degrees of freedom.
    #[must_use]
    pub fn dof(&self) -> usize {
        match self {
            Self::Fixed => 0,
            Self::Revolute { .. } | Self::Prismatic { .. } => 1,
        }
    }

    /// Joint axis, if the joint has one.
    #[must_use]
    pub fn axis(&self) -> Option<&Vector3<f64>> {
        match self {
            Self::Fixed => None,
            Self::Revolute { axis } | Self::Prismatic { axis } => Some(axis),
        }
    }

    /// Same joint with a unit-length axis, or `None` if the axis is zero or
    /// not finite.
    pub(crate) fn normalized(self) -> Option<Self> {
        let unit = |axis: Vector3<f64>| {
            let n = axis.norm();
            (n.is_finite() && n > 1e-12).then(|| axis / n)
        };
        match self {
            Self::Fixed => Some(Self::Fixed),
            Self::Revolute { axis } => unit(axis).map(Self::revolute),
            Self::Prismatic { axis } => unit(axis).map(Self::prismatic),
        }
    }
}

/// Rotation by `angle` about the unit vector `axis` (Rodrigues' formula).
///
/// ```text
/// R = cos θ · I + sin θ · [a]× + (1 − cos θ) · a aᵀ
/// ```
pub(crate) fn axis_angle_rotation<T: Real>(axis: &Vector3<T>, angle: T) -> Matrix3<T> {
    let (s, c) = (angle.sin(), angle.cos());
    let one_minus_c = T::one() - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);
    let zero = T::zero();

    let skew = Matrix3::new(zero, -z, y, z, zero, -x, -y, x, zero);
    Matrix3::identity() * c + skew * s + (axis * axis.transpose()) * one_minus_c
}
