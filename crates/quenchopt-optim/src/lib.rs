//! QuenchOpt Optimization - L-BFGS minimization of energy functions.
//!
//! This crate implements limited-memory BFGS with the step-size control used
//! for quenching atomic configurations: steps are clamped to a maximum
//! length and shrunk until the energy rises by at most a small bound.
//!
//! # Components
//!
//! - [`memory`]: ring buffer of curvature pairs and the `H0` scale
//! - [`two_loop`]: the two-loop recursion producing search directions
//! - [`step_control`]: bounded-energy-rise backtracking with failure recovery
//! - [`lbfgs`]: configuration and the iteration driver
//!
//! # Examples
//!
//! ```rust
//! use quenchopt_core::{potential::PotentialFn, types::DVector};
//! use quenchopt_optim::{Lbfgs, LbfgsConfig};
//!
//! let potential = PotentialFn::new(|x: &DVector<f64>| Ok((x.norm_squared(), x * 2.0)));
//!
//! let config = LbfgsConfig::new()
//!     .with_max_step(0.5)
//!     .with_tolerance(1e-8)
//!     .with_memory_size(6);
//!
//! let mut lbfgs = Lbfgs::new(&potential, DVector::from_element(10, 1.0), config).unwrap();
//! let result = lbfgs.run().unwrap();
//! assert!(result.success);
//! ```

pub mod lbfgs;
pub mod memory;
pub mod state;
pub mod step_control;
pub mod two_loop;

// Re-export main types for convenience
pub use lbfgs::{Lbfgs, LbfgsConfig};
pub use memory::{MemoryBuffer, MemorySnapshot};
pub use state::OptimizerState;
pub use step_control::{StepController, StepOutcome};
pub use two_loop::{search_direction, two_loop_recursion};
