//! Configuration for derivative validation.
//!
//! Analytical Jacobians and bias terms are checked against central finite
//! differences. The truncation error of a central difference with step `h`
//! is `O(h²)`, while round-off grows like `ε/h`; the defaults sit near the
//! minimum of the sum for unit-scale mechanisms.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Settings for finite-difference derivative checks.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DerivativeCheckConfig {
    /// Time step used to advance positions along the velocity (seconds).
    pub step: f64,
    /// Largest accepted absolute error (infinity norm).
    pub tolerance: f64,
}

impl Default for DerivativeCheckConfig {
    fn default() -> Self {
        Self {
            step: 1e-5,
            tolerance: 1e-6,
        }
    }
}

impl DerivativeCheckConfig {
    /// Create a config with the given step and tolerance.
    #[must_use]
    pub const fn new(step: f64, tolerance: f64) -> Self {
        Self { step, tolerance }
    }

    /// Tighter tolerance for well-conditioned, unit-scale mechanisms.
    #[must_use]
    pub fn tight() -> Self {
        Self {
            step: 1e-5,
            tolerance: 1e-8,
        }
    }

    /// Looser tolerance for large or fast mechanisms.
    #[must_use]
    pub fn loose() -> Self {
        Self {
            step: 1e-4,
            tolerance: 1e-4,
        }
    }

    /// Set the finite-difference step.
    #[must_use]
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Set the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(crate::SimError::invalid_config(format!(
                "finite-difference step must be positive and finite, got {}",
                self.step
            )));
        }

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(crate::SimError::invalid_config(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }

        Ok(())
    }
}
