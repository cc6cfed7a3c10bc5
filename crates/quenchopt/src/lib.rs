//! # QuenchOpt
//!
//! L-BFGS minimization of energy functions, as used to quench atomic
//! configurations onto the nearest local minimum of a potential-energy
//! surface.
//!
//! The optimizer only sees a flat vector of coordinates and a
//! [`Potential`] returning the energy and gradient there; what the
//! coordinates represent is up to the caller.
//!
//! ## Quick Start
//!
//! ```rust
//! use quenchopt::prelude::*;
//!
//! let potential = PotentialFn::new(|x: &DVector<f64>| Ok((x.norm_squared(), x * 2.0)));
//! let config = LbfgsConfig::new().with_max_step(0.5).with_tolerance(1e-6);
//!
//! let result = minimize(&potential, DVector::from_vec(vec![1.0, 1.0, 1.0]), config)?;
//!
//! assert!(result.success);
//! assert!(result.position.norm() < 1e-5);
//! # Ok::<(), OptimizerError>(())
//! ```
//!
//! ## Crate Layout
//!
//! - [`quenchopt_core`]: potentials, errors, logging, callbacks and results
//! - [`quenchopt_optim`]: the L-BFGS engine
//!
//! ## Logging
//!
//! Diagnostics go to the logger in the configuration, which discards them by
//! default. [`TracingLogger`](quenchopt_core::logging::TracingLogger) forwards them to
//! `tracing` under the `quenchopt` target.

pub use nalgebra;
pub use quenchopt_core;
pub use quenchopt_optim;

pub use quenchopt_core::{
    optimizer::OptimizationResult,
    potential::Potential,
    types::{DVector, Scalar},
    OptimizerError, PotentialError, Result,
};
pub use quenchopt_optim::{Lbfgs, LbfgsConfig};

/// Minimizes `potential` from `x0` with L-BFGS.
///
/// Equivalent to building an [`Lbfgs`] and calling [`Lbfgs::run`].
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the initial evaluation
/// fails, or the potential returns a gradient of the wrong dimension. A run
/// abandoned by step-size control is reported through the result, with
/// `success == false`.
pub fn minimize<T, P>(
    potential: &P,
    x0: DVector<T>,
    config: LbfgsConfig<T>,
) -> Result<OptimizationResult<T>>
where
    T: Scalar,
    P: Potential<T> + ?Sized,
{
    Lbfgs::new(potential, x0, config)?.run()
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::minimize;
    pub use quenchopt_core::prelude::*;
    pub use quenchopt_optim::{
        Lbfgs, LbfgsConfig, MemorySnapshot, StepController, StepOutcome,
    };
}
