//! L-BFGS energy minimizer.
//!
//! L-BFGS (Limited-memory Broyden-Fletcher-Goldfarb-Shanno) approximates the
//! inverse Hessian from the last `M` position and gradient differences and
//! uses it to propose a quasi-Newton step at every iteration.
//!
//! # Algorithm Overview
//!
//! Each iteration:
//! 1. Records the current point in the curvature history and computes the
//!    direction `d = -H g` by the two-loop recursion ([`crate::two_loop`])
//! 2. Hands `d` to the step controller ([`crate::step_control`]), which
//!    inverts uphill directions, clamps the length to `max_step` and
//!    backtracks until the energy rises by at most `max_energy_rise`
//! 3. Updates the rms gradient, logs progress and notifies callbacks
//!
//! The run stops when the stopping criterion holds (by default
//! `rms < tolerance`), after `max_iterations` iterations, or when step-size
//! control has failed more than `max_failures` times in a row.
//!
//! Instead of a line search satisfying the Wolfe conditions, steps are only
//! required not to raise the energy by more than a small bound. This is the
//! variant commonly used to quench atomic configurations, where energy
//! evaluations dominate the cost and a slightly uphill step is harmless.
//!
//! # Example
//!
//! ```
//! use quenchopt_core::{potential::PotentialFn, types::DVector};
//! use quenchopt_optim::{Lbfgs, LbfgsConfig};
//!
//! let potential = PotentialFn::new(|x: &DVector<f64>| Ok((x.norm_squared(), x * 2.0)));
//! let config = LbfgsConfig::new().with_max_step(0.5);
//!
//! let mut lbfgs = Lbfgs::new(&potential, DVector::from_vec(vec![1.0, 1.0, 1.0]), config)?;
//! let result = lbfgs.run()?;
//!
//! assert!(result.success);
//! assert!(result.position.norm() < 1e-5);
//! # Ok::<(), quenchopt_core::OptimizerError>(())
//! ```
//!
//! # References
//!
//! - Liu & Nocedal, "On the limited memory BFGS method for large scale
//!   optimization", Math. Programming 45 (1989)
//! - Nocedal & Wright, "Numerical Optimization" (2006)

use crate::{
    memory::{MemoryBuffer, MemorySnapshot},
    state::OptimizerState,
    step_control::{StepController, StepOutcome},
    two_loop::search_direction,
};
use num_traits::Float;
use quenchopt_core::{
    callback::{BoxedCallback, FnCallback, ProgressCallback, StepEvent},
    error::{OptimizerError, Result},
    logging::{self, SharedLogger},
    optimizer::{OptimizationResult, RunStatus, StopContext, StoppingCriterion},
    potential::{EvaluatedPoint, Potential},
    types::{DVector, Scalar},
};
use std::fmt::{self, Debug};

/// Configuration for the L-BFGS minimizer.
#[derive(Debug, Clone)]
pub struct LbfgsConfig<T: Scalar> {
    /// Maximum length of a single step
    pub max_step: T,
    /// Largest energy rise accepted for a step
    pub max_energy_rise: T,
    /// Interpret `max_energy_rise` relative to `|E_new|`
    pub relative_energy: bool,
    /// Number of curvature pairs kept (`M`)
    pub memory_size: usize,
    /// Initial inverse-Hessian diagonal
    pub initial_h0: T,
    /// Iteration budget
    pub max_iterations: usize,
    /// Convergence threshold on the rms gradient
    pub tolerance: T,
    /// Log a progress line every this many iterations
    pub print_interval: Option<usize>,
    /// Log every rejected candidate step
    pub debug: bool,
    /// Step reductions tried before step-size control gives up
    pub max_backtracks: usize,
    /// Consecutive step-size control failures tolerated
    pub max_failures: usize,
    /// Divisor applied to the step on each reduction
    pub backtrack_factor: T,
    /// Stand-in for an exactly zero energy in relative mode
    pub zero_energy_guard: T,
    /// Convergence test
    pub stop_criterion: StoppingCriterion<T>,
    /// Diagnostics sink
    pub logger: SharedLogger,
}

impl<T: Scalar> Default for LbfgsConfig<T> {
    fn default() -> Self {
        Self {
            max_step: <T as Scalar>::from_f64(0.1),
            max_energy_rise: <T as Scalar>::from_f64(1e-4),
            relative_energy: false,
            memory_size: 4,
            initial_h0: T::one(),
            max_iterations: 10000,
            tolerance: T::DEFAULT_TOLERANCE,
            print_interval: None,
            debug: false,
            max_backtracks: 10,
            max_failures: 10,
            backtrack_factor: <T as Scalar>::from_f64(10.0),
            zero_energy_guard: T::ZERO_ENERGY_GUARD,
            stop_criterion: StoppingCriterion::RmsGradient,
            logger: logging::no_op(),
        }
    }
}

impl<T: Scalar> LbfgsConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum step length.
    pub fn with_max_step(mut self, max_step: T) -> Self {
        self.max_step = max_step;
        self
    }

    /// Sets the largest accepted energy rise.
    pub fn with_max_energy_rise(mut self, rise: T) -> Self {
        self.max_energy_rise = rise;
        self
    }

    /// Measures the energy rise relative to the new energy.
    pub fn with_relative_energy(mut self, relative: bool) -> Self {
        self.relative_energy = relative;
        self
    }

    /// Sets the number of curvature pairs kept.
    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory_size = size;
        self
    }

    /// Sets the initial inverse-Hessian diagonal.
    pub fn with_initial_h0(mut self, h0: T) -> Self {
        self.initial_h0 = h0;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the rms-gradient tolerance.
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Logs a progress line every `interval` iterations.
    pub fn with_print_interval(mut self, interval: usize) -> Self {
        self.print_interval = Some(interval);
        self
    }

    /// Enables logging of rejected steps.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the number of step reductions per search.
    pub fn with_max_backtracks(mut self, max_backtracks: usize) -> Self {
        self.max_backtracks = max_backtracks;
        self
    }

    /// Sets the number of step-size control failures tolerated.
    pub fn with_max_failures(mut self, max_failures: usize) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// Sets the step reduction divisor.
    pub fn with_backtrack_factor(mut self, factor: T) -> Self {
        self.backtrack_factor = factor;
        self
    }

    /// Sets the zero-energy substitute used in relative mode.
    pub fn with_zero_energy_guard(mut self, guard: T) -> Self {
        self.zero_energy_guard = guard;
        self
    }

    /// Replaces the rms-gradient test by `predicate`.
    pub fn with_stop_criterion<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&StopContext<'_, T>) -> bool + Send + Sync + 'static,
    {
        self.stop_criterion = StoppingCriterion::custom(predicate);
        self
    }

    /// Sets the logger.
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_step > T::zero()) || !<T as Float>::is_finite(self.max_step) {
            return Err(OptimizerError::invalid_configuration(
                "Maximum step must be positive and finite",
                "max_step",
                self.max_step.to_string(),
            ));
        }

        if <T as Float>::is_nan(self.max_energy_rise) {
            return Err(OptimizerError::invalid_configuration(
                "Maximum energy rise must be a number",
                "max_energy_rise",
                self.max_energy_rise.to_string(),
            ));
        }

        if self.memory_size == 0 {
            return Err(OptimizerError::invalid_configuration(
                "Memory size must be at least 1",
                "memory_size",
                "0",
            ));
        }

        if !(self.tolerance >= T::zero()) {
            return Err(OptimizerError::invalid_configuration(
                "Tolerance must be non-negative",
                "tolerance",
                self.tolerance.to_string(),
            ));
        }

        if self.print_interval == Some(0) {
            return Err(OptimizerError::invalid_configuration(
                "Print interval must be positive",
                "print_interval",
                "0",
            ));
        }

        if !(self.backtrack_factor > T::one()) || !<T as Float>::is_finite(self.backtrack_factor) {
            return Err(OptimizerError::invalid_configuration(
                "Backtracking factor must be finite and greater than 1",
                "backtrack_factor",
                self.backtrack_factor.to_string(),
            ));
        }

        if !(self.zero_energy_guard > T::zero()) {
            return Err(OptimizerError::invalid_configuration(
                "Zero-energy guard must be positive",
                "zero_energy_guard",
                self.zero_energy_guard.to_string(),
            ));
        }

        Ok(())
    }
}

/// L-BFGS minimizer bound to a potential.
///
/// The optimizer owns the whole state of one run: the current point, the
/// curvature history and the counters. Runs can be driven to completion
/// with [`Lbfgs::run`] or one iteration at a time with [`Lbfgs::step`], and
/// suspended and resumed through [`Lbfgs::state`] / [`Lbfgs::set_state`].
pub struct Lbfgs<'a, T, P>
where
    T: Scalar,
    P: Potential<T> + ?Sized,
{
    potential: &'a P,
    config: LbfgsConfig<T>,
    memory: MemoryBuffer<T>,
    controller: StepController<T>,
    state: OptimizerState<T>,
    status: RunStatus,
    messages: Vec<String>,
    callbacks: Vec<BoxedCallback<'a, T>>,
    last_step_size: T,
}

impl<'a, T, P> Lbfgs<'a, T, P>
where
    T: Scalar,
    P: Potential<T> + ?Sized,
{
    /// Creates a minimizer starting at `x0`.
    ///
    /// Evaluates the potential once at `x0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or the initial
    /// evaluation fails or yields a non-finite energy or gradient.
    pub fn new(potential: &'a P, x0: DVector<T>, config: LbfgsConfig<T>) -> Result<Self> {
        config.validate()?;
        let start = EvaluatedPoint::evaluate(potential, x0)?;
        start.ensure_finite()?;
        Ok(Self::from_point(potential, start, config))
    }

    /// Creates a minimizer from a point whose energy and gradient are
    /// already known, without evaluating the potential.
    ///
    /// The function-call counter still starts at one.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the gradient does
    /// not match `x0` in dimension, or the energy or gradient is not finite.
    pub fn with_initial_evaluation(
        potential: &'a P,
        x0: DVector<T>,
        energy: T,
        gradient: DVector<T>,
        config: LbfgsConfig<T>,
    ) -> Result<Self> {
        config.validate()?;
        if gradient.len() != x0.len() {
            return Err(OptimizerError::dimension_mismatch(x0.len(), gradient.len()));
        }
        let start = EvaluatedPoint::new(x0, energy, gradient);
        start.ensure_finite()?;
        Ok(Self::from_point(potential, start, config))
    }

    fn from_point(potential: &'a P, start: EvaluatedPoint<T>, config: LbfgsConfig<T>) -> Self {
        let mut h0 = config.initial_h0;
        if !(h0 >= T::MIN_H0) {
            config.logger.warn(&format!(
                "initial guess for inverse Hessian diagonal is negative or too small {h0}, resetting it to 1"
            ));
            h0 = T::one();
        }

        let memory = MemoryBuffer::new(config.memory_size, &start.position, &start.gradient, h0);
        let controller = StepController::from_config(&config);

        Self {
            potential,
            memory,
            controller,
            state: OptimizerState::new(start, 1),
            status: RunStatus::Running,
            messages: Vec::new(),
            callbacks: Vec::new(),
            last_step_size: T::zero(),
            config,
        }
    }

    /// Registers a closure called after every iteration.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&StepEvent<'_, T>) + 'a,
    {
        self.add_callback(callback);
        self
    }

    /// Registers a closure called after every iteration.
    pub fn add_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&StepEvent<'_, T>) + 'a,
    {
        self.callbacks.push(Box::new(FnCallback(callback)));
    }

    /// Registers a callback called after every iteration.
    pub fn with_progress_callback<C>(mut self, callback: C) -> Self
    where
        C: ProgressCallback<T> + 'a,
    {
        self.add_progress_callback(callback);
        self
    }

    /// Registers a callback called after every iteration.
    pub fn add_progress_callback<C>(&mut self, callback: C)
    where
        C: ProgressCallback<T> + 'a,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Performs one iteration.
    ///
    /// Callbacks are notified after the step, including a no-progress
    /// recovery step.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::LineSearchFailed`] when step-size control
    /// has failed too often, or a potential error that cannot be treated as
    /// a rejected step. Either way the run is marked [`RunStatus::Failed`]
    /// and the current point is left at the last accepted step.
    pub fn step(&mut self) -> Result<StepOutcome<T>> {
        let direction = search_direction(
            &mut self.memory,
            self.state.position(),
            self.state.gradient(),
            &*self.config.logger,
        );

        let outcome = match self.controller.adjust(
            self.potential,
            &mut self.memory,
            &mut self.state,
            direction,
        ) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.record_failure(&err);
                return Err(err);
            }
        };
        self.last_step_size = outcome.step_size();

        if let Some(interval) = self.config.print_interval {
            if self.state.iteration % interval == 0 {
                self.config.logger.info(&format!(
                    "lbfgs: {} E {} rms {} funcalls {} stepsize {}",
                    self.state.iteration,
                    self.state.energy(),
                    self.state.rms(),
                    self.state.function_calls,
                    self.last_step_size
                ));
            }
        }

        let event = StepEvent {
            iteration: self.state.iteration,
            position: self.state.position(),
            energy: self.state.energy(),
            rms: self.state.rms(),
            step_size: self.last_step_size,
            function_calls: self.state.function_calls,
        };
        for callback in &mut self.callbacks {
            callback.on_step(&event);
        }

        self.state.iteration += 1;
        Ok(outcome)
    }

    fn record_failure(&mut self, err: &OptimizerError) {
        self.status = RunStatus::Failed;
        let logger = &self.config.logger;
        logger.error("problem with step-size control, ending quench");
        logger.error(&format!(
            "    on failure: iteration {} energy {} rms {} function calls {}",
            self.state.iteration,
            self.state.energy(),
            self.state.rms(),
            self.state.function_calls
        ));
        self.messages.push(format!("problem with step-size control: {err}"));
    }

    /// Iterates until convergence, exhaustion of the iteration budget, or
    /// failure of step-size control.
    ///
    /// A step-size control failure is not an error: it yields a result with
    /// `success == false` and status [`RunStatus::Failed`]. A run that has
    /// already failed is not resumed; its result is returned as is.
    ///
    /// # Errors
    ///
    /// Propagates potential errors that cannot be treated as rejected steps.
    pub fn run(&mut self) -> Result<OptimizationResult<T>> {
        if self.status == RunStatus::Failed {
            return Ok(self.result());
        }
        self.status = RunStatus::Running;
        loop {
            if self.stop_criterion_satisfied() {
                self.status = RunStatus::Converged;
                break;
            }
            if self.state.iteration >= self.config.max_iterations {
                self.status = RunStatus::Exhausted;
                break;
            }

            match self.step() {
                Ok(_) => {}
                Err(err) if err.is_line_search_failure() => break,
                Err(err) => return Err(err),
            }
        }

        Ok(self.result())
    }

    /// Returns `true` if the active stopping criterion holds at the current
    /// point.
    pub fn stop_criterion_satisfied(&self) -> bool {
        let context = StopContext {
            energy: self.state.energy(),
            gradient: self.state.gradient(),
            tolerance: self.config.tolerance,
            position: self.state.position(),
            rms: self.state.rms(),
        };
        self.config.stop_criterion.is_satisfied(&context)
    }

    /// Alias of [`Lbfgs::stop_criterion_satisfied`].
    pub fn is_converged(&self) -> bool {
        self.stop_criterion_satisfied()
    }

    /// Summary of the run so far.
    ///
    /// `success` is recomputed from the stopping criterion, so the result
    /// can be taken at any point of a run.
    pub fn result(&self) -> OptimizationResult<T> {
        let point = self.state.point();
        OptimizationResult {
            success: self.stop_criterion_satisfied(),
            status: self.status,
            position: point.position.clone(),
            energy: point.energy,
            gradient: point.gradient.clone(),
            rms: self.state.rms(),
            iterations: self.state.iteration,
            function_evaluations: self.state.function_calls,
            h0: self.memory.h0(),
            messages: self.messages.clone(),
        }
    }

    /// Copy of the curvature history, sufficient to resume the run.
    pub fn state(&self) -> MemorySnapshot<T> {
        self.memory.snapshot()
    }

    /// Replaces the curvature history.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::DimensionMismatch`] if the snapshot was taken
    /// with another memory size or dimension; the history is then unchanged.
    pub fn set_state(&mut self, snapshot: MemorySnapshot<T>) -> Result<()> {
        self.memory.restore(snapshot)
    }

    /// Current configuration.
    pub fn position(&self) -> &DVector<T> {
        self.state.position()
    }

    /// Energy at the current configuration.
    pub fn energy(&self) -> T {
        self.state.energy()
    }

    /// Gradient at the current configuration.
    pub fn gradient(&self) -> &DVector<T> {
        self.state.gradient()
    }

    /// Rms gradient at the current configuration.
    pub fn rms(&self) -> T {
        self.state.rms()
    }

    /// Completed iterations.
    pub fn iteration(&self) -> usize {
        self.state.iteration
    }

    /// Potential evaluations so far.
    pub fn function_calls(&self) -> usize {
        self.state.function_calls
    }

    /// Consecutive step-size control failures.
    pub fn failures(&self) -> usize {
        self.state.failures
    }

    /// Current inverse-Hessian diagonal.
    pub fn h0(&self) -> T {
        self.memory.h0()
    }

    /// Run status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Diagnostic messages so far.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Length of the most recent step, zero after a recovery.
    pub fn last_step_size(&self) -> T {
        self.last_step_size
    }

    /// The configuration in use.
    pub fn config(&self) -> &LbfgsConfig<T> {
        &self.config
    }

    /// The curvature history.
    pub fn memory(&self) -> &MemoryBuffer<T> {
        &self.memory
    }
}

impl<T, P> Debug for Lbfgs<'_, T, P>
where
    T: Scalar,
    P: Potential<T> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lbfgs")
            .field("config", &self.config)
            .field("memory", &self.memory)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("messages", &self.messages)
            .field("callbacks", &self.callbacks.len())
            .field("last_step_size", &self.last_step_size)
            .finish_non_exhaustive()
    }
}
