//! Numeric scalar abstraction.
//!
//! Kinematic evaluators are written once against [`Real`] and run both on
//! plain `f64` and on forward-mode [`Dual`](crate::Dual) numbers. The trait
//! only asks for what the kinematics actually use: field arithmetic, square
//! root, and the two trigonometric functions needed to build joint rotations.
//!
//! Any `Real` satisfies nalgebra's `Scalar + ClosedAdd + ClosedMul` family
//! through blanket impls, so dense matrix products, `dot` and `cross` work on
//! `DMatrix<T>`/`Vector3<T>` without further bounds.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::{One, Zero};

/// Scalar type usable by the kinematic pipeline.
pub trait Real:
    nalgebra::Scalar
    + Copy
    + Debug
    + PartialOrd
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
{
    /// Lift a constant into this scalar type.
    fn from_f64(value: f64) -> Self;

    /// Square root.
    #[must_use]
    fn sqrt(self) -> Self;

    /// Sine.
    #[must_use]
    fn sin(self) -> Self;

    /// Cosine.
    #[must_use]
    fn cos(self) -> Self;

    /// Whether every component of the scalar is finite.
    fn is_finite(self) -> bool;
}

impl Real for f64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn sqrt(self) -> Self {
        Self::sqrt(self)
    }

    #[inline]
    fn sin(self) -> Self {
        Self::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        Self::cos(self)
    }

    #[inline]
    fn is_finite(self) -> bool {
        Self::is_finite(self)
    }
}

/// Euclidean norm of a vector over any [`Real`].
///
/// nalgebra's `norm()` needs `ComplexField`, which dual numbers do not
/// implement, so the kinematics go through this helper instead.
#[must_use]
pub fn norm<T, R, C, S>(v: &nalgebra::Matrix<T, R, C, S>) -> T
where
    T: Real,
    R: nalgebra::Dim,
    C: nalgebra::Dim,
    S: nalgebra::Storage<T, R, C>,
{
    v.dot(v).sqrt()
}

/// Squared Euclidean norm of a vector over any [`Real`].
#[must_use]
pub fn norm_squared<T, R, C, S>(v: &nalgebra::Matrix<T, R, C, S>) -> T
where
    T: Real,
    R: nalgebra::Dim,
    C: nalgebra::Dim,
    S: nalgebra::Storage<T, R, C>,
{
    v.dot(v)
}
