//! Finite-difference validation of analytical derivatives.
//!
//! Both checks move the state along the current velocity with central
//! differences of step `h`:
//!
//! ```text
//! jacobian_error = ‖(r(q + h·v) − r(q − h·v)) / 2h − J(q)·v‖∞
//! bias_error     = ‖(J(q + h·v)·v − J(q − h·v)·v) / 2h − J̇v(q)‖∞
//! ```
//!
//! Truncation error is `O(h²)`, so the tolerance must leave room for it.

use nalgebra::{DMatrix, DVector};
use sim_multibody::KinematicModel;
use sim_types::{DerivativeCheckConfig, Result};
use tracing::warn;

use crate::evaluator::KinematicEvaluator;
use crate::set::KinematicEvaluatorSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of a derivative check.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DerivativeCheck {
    /// Max-norm gap between `J·v` and the finite-difference residual rate.
    pub jacobian_error: f64,
    /// Max-norm gap between `J̇·v` and the finite-difference rate of `J·v`.
    pub bias_error: f64,
    /// Tolerance both errors are compared against.
    pub tolerance: f64,
}

impl DerivativeCheck {
    /// Largest of the two errors. NaN if either is NaN.
    #[must_use]
    pub fn max_error(&self) -> f64 {
        if self.jacobian_error.is_nan() || self.bias_error.is_nan() {
            f64::NAN
        } else {
            self.jacobian_error.max(self.bias_error)
        }
    }

    /// Whether both errors are within tolerance. A NaN error never passes.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.max_error() <= self.tolerance
    }
}

/// Check one evaluator's Jacobian and bias term at the state `(q, v)`.
///
/// # Errors
///
/// Returns an error if `config` is invalid or the state does not match the
/// evaluator's model.
pub fn check_derivatives<M, E>(
    evaluator: &E,
    positions: &DVector<f64>,
    velocities: &DVector<f64>,
    config: &DerivativeCheckConfig,
) -> Result<DerivativeCheck>
where
    M: KinematicModel<f64>,
    E: KinematicEvaluator<f64, M> + ?Sized,
{
    let report = central_difference_check(
        evaluator.model(),
        positions,
        velocities,
        config,
        |c| evaluator.eval_residual(c),
        |c| evaluator.eval_jacobian(c),
        |c| evaluator.eval_jacobian_dot_times_v(c),
    )?;
    if !report.passed() {
        warn!(
            evaluator = evaluator.name(),
            jacobian_error = report.jacobian_error,
            bias_error = report.bias_error,
            tolerance = report.tolerance,
            "derivative check failed"
        );
    }
    Ok(report)
}

/// Check the stacked full rows of every enabled evaluator in `set`.
///
/// # Errors
///
/// Returns an error if `config` is invalid or the state does not match the
/// set's model.
pub fn check_set_derivatives<M>(
    set: &KinematicEvaluatorSet<'_, f64, M>,
    positions: &DVector<f64>,
    velocities: &DVector<f64>,
    config: &DerivativeCheckConfig,
) -> Result<DerivativeCheck>
where
    M: KinematicModel<f64>,
{
    let report = central_difference_check(
        set.model(),
        positions,
        velocities,
        config,
        |c| set.eval_residual(c),
        |c| set.eval_jacobian(c),
        |c| set.eval_jacobian_dot_times_v(c),
    )?;
    if !report.passed() {
        warn!(
            evaluators = set.len(),
            rows = set.count_full(),
            jacobian_error = report.jacobian_error,
            bias_error = report.bias_error,
            tolerance = report.tolerance,
            "derivative check failed"
        );
    }
    Ok(report)
}

fn central_difference_check<M, R, J, B>(
    model: &M,
    positions: &DVector<f64>,
    velocities: &DVector<f64>,
    config: &DerivativeCheckConfig,
    residual: R,
    jacobian: J,
    bias: B,
) -> Result<DerivativeCheck>
where
    M: KinematicModel<f64>,
    R: Fn(&M::Context) -> DVector<f64>,
    J: Fn(&M::Context) -> DMatrix<f64>,
    B: Fn(&M::Context) -> DVector<f64>,
{
    config.validate()?;
    let h = config.step;

    let context = model.create_context(positions.clone(), velocities.clone())?;
    let plus = model.create_context(
        model.integrate_positions(positions, velocities, h),
        velocities.clone(),
    )?;
    let minus = model.create_context(
        model.integrate_positions(positions, velocities, -h),
        velocities.clone(),
    )?;

    let fd_rate = (residual(&plus) - residual(&minus)) / (2.0 * h);
    let jacobian_error = max_abs(&(fd_rate - jacobian(&context) * velocities));

    let fd_bias = (jacobian(&plus) * velocities - jacobian(&minus) * velocities) / (2.0 * h);
    let bias_error = max_abs(&(fd_bias - bias(&context)));

    Ok(DerivativeCheck {
        jacobian_error,
        bias_error,
        tolerance: config.tolerance,
    })
}

/// Infinity norm that keeps NaN instead of skipping it.
fn max_abs(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| {
        if acc.is_nan() || x.is_nan() {
            f64::NAN
        } else {
            acc.max(x.abs())
        }
    })
}
