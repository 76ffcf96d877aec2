//! The evaluator contract and per-row activation masks.

use nalgebra::{DMatrix, DVector};
use sim_multibody::KinematicModel;
use sim_types::{Real, Result, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A holonomic constraint `φ(q) = 0` with its first and second derivatives.
///
/// Implementations compute everything from the supplied context. They hold no
/// pose-dependent state, so evaluating twice with the same context yields
/// identical results.
///
/// # Derivatives
///
/// - [`eval_jacobian`](Self::eval_jacobian) is taken with respect to the
///   generalized *velocity*: `φ̇ = J·v`.
/// - [`eval_jacobian_dot_times_v`](Self::eval_jacobian_dot_times_v) is the
///   part of `φ̈` that does not depend on `v̇`: `φ̈ = J·v̇ + J̇·v`.
///
/// # Active rows
///
/// The `eval_active_*` methods return only the rows selected by
/// [`active_rows`](Self::active_rows). The full methods always return all
/// [`length`](Self::length) rows.
pub trait KinematicEvaluator<T: Real, M: KinematicModel<T>> {
    /// Human-readable name (for logs and error messages).
    fn name(&self) -> &str;

    /// The model this evaluator reads.
    fn model(&self) -> &M;

    /// Which rows are active.
    fn active_rows(&self) -> &ActiveRows;

    /// Constraint residual, `length` rows. Zero exactly when satisfied.
    fn eval_residual(&self, context: &M::Context) -> DVector<T>;

    /// `length × nv` Jacobian of the residual with respect to `v`.
    fn eval_jacobian(&self, context: &M::Context) -> DMatrix<T>;

    /// Bias term `J̇·v`, `length` rows.
    fn eval_jacobian_dot_times_v(&self, context: &M::Context) -> DVector<T>;

    /// Number of rows this evaluator contributes.
    fn length(&self) -> usize {
        self.active_rows().length()
    }

    /// Number of active rows.
    fn num_active(&self) -> usize {
        self.active_rows().count()
    }

    /// Residual restricted to the active rows.
    fn eval_active_residual(&self, context: &M::Context) -> DVector<T> {
        self.active_rows().select_vector(self.eval_residual(context))
    }

    /// Jacobian restricted to the active rows.
    fn eval_active_jacobian(&self, context: &M::Context) -> DMatrix<T> {
        self.active_rows().select_matrix(self.eval_jacobian(context))
    }

    /// Bias term restricted to the active rows.
    fn eval_active_jacobian_dot_times_v(&self, context: &M::Context) -> DVector<T> {
        self.active_rows()
            .select_vector(self.eval_jacobian_dot_times_v(context))
    }
}

/// Subset of an evaluator's rows that participate in active evaluation.
///
/// Indices are strictly increasing, so active rows keep their relative order.
///
/// ```
/// use sim_kinematic::ActiveRows;
///
/// // Keep only the normal row of a 3-row contact constraint.
/// let rows = ActiveRows::new(3, vec![2]).unwrap();
/// assert!(rows.is_active(2));
/// assert!(!rows.is_active(0));
/// assert_eq!(rows.count(), 1);
///
/// assert!(ActiveRows::new(3, vec![1, 1]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActiveRows {
    length: usize,
    indices: Vec<usize>,
}

impl ActiveRows {
    /// All `length` rows active.
    #[must_use]
    pub fn all(length: usize) -> Self {
        Self {
            length,
            indices: (0..length).collect(),
        }
    }

    /// The given rows active.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidActiveRows`] if an index is out of range or
    /// the indices are not strictly increasing.
    pub fn new(length: usize, indices: impl Into<Vec<usize>>) -> Result<Self> {
        let indices = indices.into();
        let in_range = indices.iter().all(|&i| i < length);
        let increasing = indices.windows(2).all(|w| w[0] < w[1]);
        if !in_range || !increasing {
            return Err(SimError::InvalidActiveRows { indices, length });
        }
        Ok(Self { length, indices })
    }

    /// Total number of rows.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of active rows.
    #[must_use]
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    /// Active row indices, ascending.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Whether `row` is active.
    #[must_use]
    pub fn is_active(&self, row: usize) -> bool {
        self.indices.binary_search(&row).is_ok()
    }

    /// Whether every row is active.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.indices.len() == self.length
    }

    /// Keep the active entries of a full-length vector.
    #[must_use]
    pub fn select_vector<T: Real>(&self, full: DVector<T>) -> DVector<T> {
        debug_assert_eq!(full.len(), self.length);
        if self.is_full() {
            full
        } else {
            full.select_rows(self.indices.iter())
        }
    }

    /// Keep the active rows of a full-height matrix.
    #[must_use]
    pub fn select_matrix<T: Real>(&self, full: DMatrix<T>) -> DMatrix<T> {
        debug_assert_eq!(full.nrows(), self.length);
        if self.is_full() {
            full
        } else {
            full.select_rows(self.indices.iter())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rows() {
        let rows = ActiveRows::all(3);
        assert!(rows.is_full());
        assert_eq!(rows.indices(), &[0, 1, 2]);
        assert_eq!(rows.length(), 3);
    }

    #[test]
    fn test_invalid_rows_rejected() {
        assert!(ActiveRows::new(3, vec![3]).is_err());
        assert!(ActiveRows::new(3, vec![2, 0]).is_err());
        let err = ActiveRows::new(2, vec![0, 0]).unwrap_err();
        assert_eq!(
            err,
            SimError::InvalidActiveRows {
                indices: vec![0, 0],
                length: 2
            }
        );
    }

    #[test]
    fn test_empty_selection() {
        let rows = ActiveRows::new(3, Vec::new()).unwrap();
        assert_eq!(rows.count(), 0);
        assert!(!rows.is_full());
        let v = rows.select_vector(DVector::from_vec(vec![1.0, 2.0, 3.0]));
        assert_eq!(v.len(), 0);
    }

    #[test]
    fn test_select_keeps_order() {
        let rows = ActiveRows::new(4, vec![1, 3]).unwrap();

        let v = rows.select_vector(DVector::from_vec(vec![10.0, 11.0, 12.0, 13.0]));
        assert_eq!(v, DVector::from_vec(vec![11.0, 13.0]));

        let m = DMatrix::from_row_slice(4, 2, &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5]);
        let selected = rows.select_matrix(m);
        assert_eq!(selected, DMatrix::from_row_slice(2, 2, &[1.0, 1.5, 3.0, 3.5]));
    }
}
