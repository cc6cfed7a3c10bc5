//! Step-size control by bounded-energy-rise backtracking.
//!
//! The controller takes the raw L-BFGS direction and turns it into a move:
//!
//! 1. An uphill direction (`<g, d> > 0`) is inverted.
//! 2. A step longer than `max_step` is scaled down to `max_step`.
//! 3. The candidate `x0 + f d` is evaluated. If the energy rose by more than
//!    `max_energy_rise` (absolute, or relative to `|E_new|`), `f` is divided
//!    by `backtrack_factor` and the candidate is tried again.
//! 4. After `max_backtracks` rejected reductions the search is abandoned:
//!    the failure counter is incremented, the curvature history is cleared
//!    and the run stays where it was. Once the counter exceeds
//!    `max_failures` the controller reports a fatal
//!    [`OptimizerError::LineSearchFailed`].
//!
//! No Wolfe conditions are checked. The rule only guarantees that accepted
//! steps never raise the energy by more than the configured bound.

use crate::{lbfgs::LbfgsConfig, memory::MemoryBuffer, state::OptimizerState};
use num_traits::Float;
use quenchopt_core::{
    error::{OptimizerError, PotentialError, Result},
    logging::SharedLogger,
    potential::{EvaluatedPoint, Potential},
    types::{DVector, Scalar},
};

/// Result of one step-size control pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome<T: Scalar> {
    /// A step was taken.
    Accepted {
        /// Length of the step actually taken (`f * |d|`)
        step_size: T,
        /// Number of reductions before the step was accepted
        backtracks: usize,
    },
    /// Backtracking was exhausted; the history was cleared and the position
    /// left unchanged.
    Recovered {
        /// Consecutive failures so far
        failures: usize,
    },
}

impl<T: Scalar> StepOutcome<T> {
    /// Effective step size, zero for a recovery.
    pub fn step_size(&self) -> T {
        match self {
            Self::Accepted { step_size, .. } => *step_size,
            Self::Recovered { .. } => T::zero(),
        }
    }

    /// Returns `true` if the position moved.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Backtracking step controller.
#[derive(Debug, Clone)]
pub struct StepController<T: Scalar> {
    /// Upper bound on the length of a step
    pub max_step: T,
    /// Largest energy increase accepted
    pub max_energy_rise: T,
    /// Measure the energy change relative to `|E_new|`
    pub relative_energy: bool,
    /// Reductions attempted before a search is abandoned
    pub max_backtracks: usize,
    /// Divisor applied to the step on each reduction
    pub backtrack_factor: T,
    /// Failures tolerated before the run is abandoned
    pub max_failures: usize,
    /// Stand-in for an exactly zero energy in relative mode
    pub zero_energy_guard: T,
    /// Log every rejected candidate
    pub debug: bool,
    logger: SharedLogger,
}

impl<T: Scalar> StepController<T> {
    /// Builds a controller from the optimizer configuration.
    pub fn from_config(config: &LbfgsConfig<T>) -> Self {
        Self {
            max_step: config.max_step,
            max_energy_rise: config.max_energy_rise,
            relative_energy: config.relative_energy,
            max_backtracks: config.max_backtracks,
            backtrack_factor: config.backtrack_factor,
            max_failures: config.max_failures,
            zero_energy_guard: config.zero_energy_guard,
            debug: config.debug,
            logger: config.logger.clone(),
        }
    }

    /// Energy change from `e0` to `e`, in the configured mode.
    pub fn energy_change(&self, e0: T, e: T) -> T {
        if self.relative_energy {
            let denominator = if e == T::zero() {
                self.zero_energy_guard
            } else {
                <T as Float>::abs(e)
            };
            (e - e0) / denominator
        } else {
            e - e0
        }
    }

    /// Takes a step from the current point of `state` along `direction`.
    ///
    /// On acceptance the new point replaces the current one and the failure
    /// counter is cleared. On exhaustion `memory` is reset and `state` keeps
    /// its point.
    ///
    /// # Errors
    ///
    /// - [`OptimizerError::LineSearchFailed`] once the failure counter exceeds
    ///   `max_failures`.
    /// - [`OptimizerError::Potential`] if the potential returns a gradient of
    ///   the wrong dimension. Other potential errors reject the candidate.
    pub fn adjust<P>(
        &self,
        potential: &P,
        memory: &mut MemoryBuffer<T>,
        state: &mut OptimizerState<T>,
        mut direction: DVector<T>,
    ) -> Result<StepOutcome<T>>
    where
        P: Potential<T> + ?Sized,
    {
        if state.gradient().dot(&direction) > T::zero() {
            direction.neg_mut();
        }

        let step_norm = direction.norm();
        let mut f = T::one();
        if step_norm > self.max_step {
            f = self.max_step / step_norm;
        }

        let energy0 = state.energy();

        for backtracks in 0..=self.max_backtracks {
            let candidate = state.position() + &direction * f;
            state.function_calls += 1;

            let evaluated = EvaluatedPoint::evaluate(potential, candidate)
                .and_then(|point| point.ensure_finite().map(|()| point));
            match evaluated {
                Ok(point) if self.energy_change(energy0, point.energy) <= self.max_energy_rise => {
                    state.failures = 0;
                    state.set_point(point);
                    return Ok(StepOutcome::Accepted {
                        step_size: f * step_norm,
                        backtracks,
                    });
                }
                Ok(point) => {
                    if self.debug {
                        self.logger.info(&format!(
                            "energy increased, trying a smaller step {} {} {} {}",
                            point.energy,
                            energy0,
                            f * step_norm,
                            backtracks
                        ));
                    }
                }
                Err(err @ PotentialError::DimensionMismatch { .. }) => return Err(err.into()),
                Err(err) => {
                    self.logger
                        .warn(&format!("rejecting step of size {}: {err}", f * step_norm));
                }
            }

            f = f / self.backtrack_factor;
        }

        state.failures += 1;
        if state.failures > self.max_failures {
            return Err(OptimizerError::line_search_failed(
                state.failures,
                state.iteration,
            ));
        }

        self.logger.warn(&format!(
            "having trouble finding a good step size. {} {}",
            f * step_norm,
            step_norm
        ));
        memory.reset();

        Ok(StepOutcome::Recovered {
            failures: state.failures,
        })
    }
}

impl<T: Scalar> Default for StepController<T> {
    fn default() -> Self {
        Self::from_config(&LbfgsConfig::default())
    }
}
