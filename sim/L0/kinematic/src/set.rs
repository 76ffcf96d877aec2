//! Stacking several evaluators into one constraint system.
//!
//! A [`KinematicEvaluatorSet`] concatenates the outputs of its members in
//! insertion order. Each member can be switched off (contact scheduling) and
//! contributes no rows while disabled; its slot is kept so that re-enabling
//! restores the previous layout.
//!
//! Two row layouts exist side by side:
//!
//! - **full**: every row of every enabled member (`eval_residual`, ...);
//! - **active**: only the active rows of every enabled member
//!   (`eval_active_residual`, ...).

use std::ops::Range;

use nalgebra::{DMatrix, DVector};
use sim_multibody::KinematicModel;
use sim_types::{Real, Result, SimError};
use tracing::debug;

use crate::evaluator::KinematicEvaluator;

/// Boxed evaluator stored in a set.
pub type BoxedEvaluator<'a, T, M> = Box<dyn KinematicEvaluator<T, M> + Send + Sync + 'a>;

struct Member<'a, T: Real, M: KinematicModel<T>> {
    evaluator: BoxedEvaluator<'a, T, M>,
    enabled: bool,
}

/// Ordered collection of evaluators sharing one model.
///
/// # Example
///
/// ```
/// use sim_kinematic::{DistanceEvaluator, KinematicEvaluatorSet, WorldPointEvaluator};
/// use sim_multibody::{JointKind, KinematicModel, KinematicTree};
/// use sim_types::{FrameId, Pose};
/// use nalgebra::{DVector, Vector3};
///
/// let mut tree = KinematicTree::new();
/// let slider = tree
///     .add_body("slider", FrameId::WORLD, JointKind::prismatic(Vector3::x()), Pose::identity())
///     .unwrap();
///
/// let mut set = KinematicEvaluatorSet::<f64, _>::new(&tree);
/// let rod = set
///     .add_evaluator(
///         DistanceEvaluator::new(&tree, Vector3::zeros(), slider, Vector3::zeros(), FrameId::WORLD, 1.0)
///             .unwrap(),
///     )
///     .unwrap();
/// let foot = set
///     .add_evaluator(WorldPointEvaluator::new(&tree, Vector3::zeros(), slider).unwrap())
///     .unwrap();
///
/// assert_eq!(set.count_full(), 4);
/// assert_eq!(set.full_rows(foot).unwrap(), Some(1..4));
///
/// set.set_enabled(rod, false).unwrap();
/// assert_eq!(set.full_rows(foot).unwrap(), Some(0..3));
///
/// let ctx = tree
///     .create_context(DVector::from_vec(vec![2.0]), DVector::from_vec(vec![0.0]))
///     .unwrap();
/// assert_eq!(set.eval_residual(&ctx).len(), 3);
/// ```
pub struct KinematicEvaluatorSet<'a, T: Real, M: KinematicModel<T>> {
    model: &'a M,
    members: Vec<Member<'a, T, M>>,
}

impl<'a, T: Real, M: KinematicModel<T>> KinematicEvaluatorSet<'a, T, M> {
    /// Create an empty set over `model`.
    #[must_use]
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            members: Vec::new(),
        }
    }

    /// The shared model.
    #[must_use]
    pub fn model(&self) -> &'a M {
        self.model
    }

    /// Append an evaluator (enabled) and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ModelMismatch`] if the evaluator was built on a
    /// different model instance.
    pub fn add_evaluator<E>(&mut self, evaluator: E) -> Result<usize>
    where
        E: KinematicEvaluator<T, M> + Send + Sync + 'a,
    {
        self.add_boxed_evaluator(Box::new(evaluator))
    }

    /// Append an already boxed evaluator (enabled) and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ModelMismatch`] if the evaluator was built on a
    /// different model instance.
    pub fn add_boxed_evaluator(&mut self, evaluator: BoxedEvaluator<'a, T, M>) -> Result<usize> {
        if !std::ptr::eq(evaluator.model(), self.model) {
            return Err(SimError::ModelMismatch {
                name: evaluator.name().to_string(),
            });
        }

        let index = self.members.len();
        debug!(
            index,
            name = evaluator.name(),
            rows = evaluator.length(),
            "added kinematic evaluator"
        );
        self.members.push(Member {
            evaluator,
            enabled: true,
        });
        Ok(index)
    }

    /// Number of evaluators, enabled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set has no evaluators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The evaluator at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EvaluatorNotFound`] for an unknown index.
    pub fn evaluator(
        &self,
        index: usize,
    ) -> Result<&(dyn KinematicEvaluator<T, M> + Send + Sync + 'a)> {
        self.member(index).map(|m| m.evaluator.as_ref())
    }

    /// Switch an evaluator on or off.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EvaluatorNotFound`] for an unknown index.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<()> {
        let len = self.members.len();
        let member = self
            .members
            .get_mut(index)
            .ok_or(SimError::EvaluatorNotFound { index, len })?;
        if member.enabled != enabled {
            debug!(
                index,
                name = member.evaluator.name(),
                enabled,
                "kinematic evaluator toggled"
            );
        }
        member.enabled = enabled;
        Ok(())
    }

    /// Whether the evaluator at `index` is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EvaluatorNotFound`] for an unknown index.
    pub fn is_enabled(&self, index: usize) -> Result<bool> {
        self.member(index).map(|m| m.enabled)
    }

    /// Total rows of the enabled evaluators.
    #[must_use]
    pub fn count_full(&self) -> usize {
        self.enabled().map(|e| e.length()).sum()
    }

    /// Total active rows of the enabled evaluators.
    #[must_use]
    pub fn count_active(&self) -> usize {
        self.enabled().map(|e| e.num_active()).sum()
    }

    /// First full row of the evaluator at `index`.
    ///
    /// For a disabled evaluator this is where its rows would start once
    /// re-enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EvaluatorNotFound`] for an unknown index.
    pub fn full_start(&self, index: usize) -> Result<usize> {
        self.member(index)?;
        Ok(self.members[..index]
            .iter()
            .filter(|m| m.enabled)
            .map(|m| m.evaluator.length())
            .sum())
    }

    /// First active row of the evaluator at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EvaluatorNotFound`] for an unknown index.
    pub fn active_start(&self, index: usize) -> Result<usize> {
        self.member(index)?;
        Ok(self.members[..index]
            .iter()
            .filter(|m| m.enabled)
            .map(|m| m.evaluator.num_active())
            .sum())
    }

    /// Rows of the evaluator at `index` in the full layout, `None` while it
    /// is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EvaluatorNotFound`] for an unknown index.
    pub fn full_rows(&self, index: usize) -> Result<Option<Range<usize>>> {
        let start = self.full_start(index)?;
        let member = &self.members[index];
        Ok(member
            .enabled
            .then_some(start..start + member.evaluator.length()))
    }

    /// Rows of the evaluator at `index` in the active layout, `None` while it
    /// is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EvaluatorNotFound`] for an unknown index.
    pub fn active_rows(&self, index: usize) -> Result<Option<Range<usize>>> {
        let start = self.active_start(index)?;
        let member = &self.members[index];
        Ok(member
            .enabled
            .then_some(start..start + member.evaluator.num_active()))
    }

    /// Stacked residual of the enabled evaluators.
    #[must_use]
    pub fn eval_residual(&self, context: &M::Context) -> DVector<T> {
        self.stack_vectors(self.count_full(), |e| e.eval_residual(context))
    }

    /// Stacked `count_full × nv` Jacobian.
    #[must_use]
    pub fn eval_jacobian(&self, context: &M::Context) -> DMatrix<T> {
        self.stack_matrices(self.count_full(), |e| e.eval_jacobian(context))
    }

    /// Stacked bias term `J̇·v`.
    #[must_use]
    pub fn eval_jacobian_dot_times_v(&self, context: &M::Context) -> DVector<T> {
        self.stack_vectors(self.count_full(), |e| e.eval_jacobian_dot_times_v(context))
    }

    /// Stacked active residual rows.
    #[must_use]
    pub fn eval_active_residual(&self, context: &M::Context) -> DVector<T> {
        self.stack_vectors(self.count_active(), |e| e.eval_active_residual(context))
    }

    /// Stacked active Jacobian rows, `count_active × nv`.
    #[must_use]
    pub fn eval_active_jacobian(&self, context: &M::Context) -> DMatrix<T> {
        self.stack_matrices(self.count_active(), |e| e.eval_active_jacobian(context))
    }

    /// Stacked active bias rows.
    #[must_use]
    pub fn eval_active_jacobian_dot_times_v(&self, context: &M::Context) -> DVector<T> {
        self.stack_vectors(self.count_active(), |e| {
            e.eval_active_jacobian_dot_times_v(context)
        })
    }

    fn member(&self, index: usize) -> Result<&Member<'a, T, M>> {
        self.members.get(index).ok_or(SimError::EvaluatorNotFound {
            index,
            len: self.members.len(),
        })
    }

    fn enabled(
        &self,
    ) -> impl Iterator<Item = &(dyn KinematicEvaluator<T, M> + Send + Sync + 'a)> {
        self.members
            .iter()
            .filter(|m| m.enabled)
            .map(|m| m.evaluator.as_ref())
    }

    fn stack_vectors<F>(&self, rows: usize, eval: F) -> DVector<T>
    where
        F: Fn(&(dyn KinematicEvaluator<T, M> + Send + Sync + 'a)) -> DVector<T>,
    {
        let mut stacked = DVector::zeros(rows);
        let mut row = 0;
        for evaluator in self.enabled() {
            let block = eval(evaluator);
            stacked.rows_mut(row, block.len()).copy_from(&block);
            row += block.len();
        }
        debug_assert_eq!(row, rows);
        stacked
    }

    fn stack_matrices<F>(&self, rows: usize, eval: F) -> DMatrix<T>
    where
        F: Fn(&(dyn KinematicEvaluator<T, M> + Send + Sync + 'a)) -> DMatrix<T>,
    {
        let mut stacked = DMatrix::zeros(rows, self.model.num_velocities());
        let mut row = 0;
        for evaluator in self.enabled() {
            let block = eval(evaluator);
            stacked.rows_mut(row, block.nrows()).copy_from(&block);
            row += block.nrows();
        }
        debug_assert_eq!(row, rows);
        stacked
    }
}

impl<T: Real, M: KinematicModel<T>> std::fmt::Debug for KinematicEvaluatorSet<'_, T, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KinematicEvaluatorSet")
            .field(
                "members",
                &self
                    .members
                    .iter()
                    .map(|m| (m.evaluator.name(), m.enabled))
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
