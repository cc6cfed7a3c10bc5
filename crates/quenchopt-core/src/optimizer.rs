//! Optimization results and stopping criteria.
//!
//! # Run Lifecycle
//!
//! A run starts in [`RunStatus::Running`] and ends in exactly one of three
//! terminal states:
//!
//! - **Converged**: the stopping criterion holds (by default `rms < tol`)
//! - **Exhausted**: the iteration budget ran out first
//! - **Failed**: step-size control failed too many times
//!
//! All three are reported through the same [`OptimizationResult`]; only
//! `Converged` sets `success`.

use crate::types::{DVector, Scalar};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// State of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunStatus {
    /// Iterations are still being performed
    Running,
    /// The stopping criterion is satisfied
    Converged,
    /// Maximum iteration count reached without convergence
    Exhausted,
    /// Step-size control failed too often; the run was abandoned
    Failed,
}

impl RunStatus {
    /// Returns `true` for the three terminal states.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Converged => "converged",
            Self::Exhausted => "maximum iterations reached",
            Self::Failed => "step-size control failed",
        };
        f.write_str(name)
    }
}

/// Summary of a finished (or suspended) optimization run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizationResult<T>
where
    T: Scalar,
{
    /// True if the stopping criterion was satisfied
    pub success: bool,

    /// Run state at the time the result was taken
    pub status: RunStatus,

    /// Final configuration
    pub position: DVector<T>,

    /// Energy at `position`
    pub energy: T,

    /// Gradient at `position`
    pub gradient: DVector<T>,

    /// Root-mean-square gradient at `position`
    pub rms: T,

    /// Number of iterations performed
    pub iterations: usize,

    /// Number of potential evaluations, including the initial one
    pub function_evaluations: usize,

    /// Final diagonal inverse-Hessian scale
    pub h0: T,

    /// Diagnostic messages, in the order they were produced
    pub messages: Vec<String>,
}

impl<T: Scalar> OptimizationResult<T> {
    /// Returns `true` if the run ended because the stopping criterion held.
    pub fn converged(&self) -> bool {
        self.status == RunStatus::Converged
    }
}

/// Values handed to an alternate stopping criterion.
#[derive(Debug, Clone, Copy)]
pub struct StopContext<'a, T: Scalar> {
    /// Current energy
    pub energy: T,
    /// Current gradient
    pub gradient: &'a DVector<T>,
    /// Configured tolerance
    pub tolerance: T,
    /// Current configuration
    pub position: &'a DVector<T>,
    /// Current rms gradient
    pub rms: T,
}

/// Caller-supplied predicate replacing the default `rms < tolerance` test.
pub type StopPredicate<T> = Arc<dyn Fn(&StopContext<'_, T>) -> bool + Send + Sync>;

/// The convergence test used by an optimizer.
#[derive(Clone)]
pub enum StoppingCriterion<T: Scalar> {
    /// Converged when the rms gradient is below the tolerance
    RmsGradient,
    /// Converged when the predicate returns `true`
    Custom(StopPredicate<T>),
}

impl<T: Scalar> Default for StoppingCriterion<T> {
    fn default() -> Self {
        Self::RmsGradient
    }
}

impl<T: Scalar> Debug for StoppingCriterion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RmsGradient => f.write_str("RmsGradient"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Wraps a predicate.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&StopContext<'_, T>) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// Evaluates the criterion.
    pub fn is_satisfied(&self, context: &StopContext<'_, T>) -> bool {
        match self {
            Self::RmsGradient => context.rms < context.tolerance,
            Self::Custom(predicate) => predicate(context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(g: &'a DVector<f64>, x: &'a DVector<f64>, rms: f64) -> StopContext<'a, f64> {
        StopContext {
            energy: -1.0,
            gradient: g,
            tolerance: 1e-3,
            position: x,
            rms,
        }
    }

    #[test]
    fn test_default_criterion_uses_rms() {
        let g = DVector::zeros(2);
        let x = DVector::zeros(2);
        let criterion = StoppingCriterion::<f64>::default();

        assert!(criterion.is_satisfied(&context(&g, &x, 1e-4)));
        assert!(!criterion.is_satisfied(&context(&g, &x, 1e-3)));
    }

    #[test]
    fn test_custom_criterion_overrides_default() {
        let g = DVector::zeros(2);
        let x = DVector::zeros(2);
        let criterion = StoppingCriterion::custom(|c: &StopContext<'_, f64>| c.energy < -0.5);

        // Satisfied even though rms is large.
        assert!(criterion.is_satisfied(&context(&g, &x, 10.0)));
        assert_eq!(format!("{criterion:?}"), "Custom(..)");
    }

    #[test]
    fn test_run_status() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert_eq!(RunStatus::Exhausted.to_string(), "maximum iterations reached");
    }
}
