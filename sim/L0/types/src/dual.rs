//! Forward-mode dual numbers.
//!
//! A [`Dual`] carries a value and one directional derivative. Seeding the
//! generalized positions with `Dual::new(q_i, v_i)` makes every downstream
//! kinematic quantity carry its time derivative along the motion `q̇ = v`,
//! which is how optimizers obtain exact gradients of constraint functions.
//!
//! ```
//! use sim_types::{Dual, Real};
//!
//! // d/dx (x² + 1) at x = 3
//! let x = Dual::variable(3.0);
//! let y = x * x + Dual::constant(1.0);
//! assert_eq!(y.re, 10.0);
//! assert_eq!(y.eps, 6.0);
//! ```

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::{One, Zero};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Real;

/// Dual number `re + eps·ε` with `ε² = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dual {
    /// Primal value.
    pub re: f64,
    /// Directional derivative.
    pub eps: f64,
}

impl Dual {
    /// Create a dual number from value and derivative.
    #[must_use]
    pub const fn new(re: f64, eps: f64) -> Self {
        Self { re, eps }
    }

    /// A constant (zero derivative).
    #[must_use]
    pub const fn constant(re: f64) -> Self {
        Self { re, eps: 0.0 }
    }

    /// An independent variable (unit derivative).
    #[must_use]
    pub const fn variable(re: f64) -> Self {
        Self { re, eps: 1.0 }
    }
}

impl PartialOrd for Dual {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.re.partial_cmp(&other.re)
    }
}

impl Add for Dual {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.eps + rhs.eps)
    }
}

impl Sub for Dual {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.eps - rhs.eps)
    }
}

impl Mul for Dual {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re,
            self.re.mul_add(rhs.eps, self.eps * rhs.re),
        )
    }
}

impl Div for Dual {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.re;
        Self::new(
            self.re * inv,
            (self.eps * rhs.re - self.re * rhs.eps) * inv * inv,
        )
    }
}

impl Neg for Dual {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.re, -self.eps)
    }
}

impl AddAssign for Dual {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Dual {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Dual {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl DivAssign for Dual {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Zero for Dual {
    fn zero() -> Self {
        Self::constant(0.0)
    }

    fn is_zero(&self) -> bool {
        self.re == 0.0 && self.eps == 0.0
    }
}

impl One for Dual {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl From<f64> for Dual {
    fn from(re: f64) -> Self {
        Self::constant(re)
    }
}

impl Real for Dual {
    #[inline]
    fn from_f64(value: f64) -> Self {
        Self::constant(value)
    }

    #[inline]
    fn sqrt(self) -> Self {
        let s = self.re.sqrt();
        Self::new(s, self.eps / (2.0 * s))
    }

    #[inline]
    fn sin(self) -> Self {
        Self::new(self.re.sin(), self.eps * self.re.cos())
    }

    #[inline]
    fn cos(self) -> Self {
        Self::new(self.re.cos(), -self.eps * self.re.sin())
    }

    #[inline]
    fn is_finite(self) -> bool {
        self.re.is_finite() && self.eps.is_finite()
    }
}
