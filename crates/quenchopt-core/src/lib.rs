//! Core traits and types for energy minimization.
//!
//! This crate provides the vocabulary shared by the optimizers: the potential
//! (energy/gradient oracle) interface, error types, injected logging,
//! progress callbacks, and the result of a run.
//!
//! # Modules
//!
//! - [`callback`]: Progress callbacks invoked after each iteration
//! - [`error`]: Error types for potentials and optimizers
//! - [`logging`]: Injected logger interface and implementations
//! - [`optimizer`]: Run status, results and stopping criteria
//! - [`potential`]: Energy/gradient oracle interface
//! - [`types`]: Scalar trait, vector alias and numeric helpers

pub mod callback;
pub mod error;
pub mod logging;
pub mod optimizer;
pub mod potential;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_potentials;

// Re-export commonly used items at the crate root
pub use error::{OptimizerError, PotentialError, PotentialResult, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use quenchopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::callback::{
        BoxedCallback, FnCallback, ProgressCallback, StepEvent, TrajectoryRecorder,
    };
    pub use crate::error::{OptimizerError, PotentialError, PotentialResult, Result};
    pub use crate::logging::{
        Level, Logger, MemoryLogger, NoOpLogger, SharedLogger, TracingLogger,
    };
    pub use crate::optimizer::{
        OptimizationResult, RunStatus, StopContext, StopPredicate, StoppingCriterion,
    };
    pub use crate::potential::{
        CountingPotential, EvaluatedPoint, GradientChecker, Potential, PotentialFn,
    };
    pub use crate::types::{rms, DVector, Scalar};
}
