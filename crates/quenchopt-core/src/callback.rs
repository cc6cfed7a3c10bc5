//! Progress callbacks for optimization runs.
//!
//! Callbacks observe a run without being able to change it: after every
//! iteration the optimizer hands each registered callback a read-only
//! [`StepEvent`], synchronously and in registration order.

use crate::types::{DVector, Scalar};

/// Information passed to callbacks after each iteration.
#[derive(Debug, Clone, Copy)]
pub struct StepEvent<'a, T: Scalar> {
    /// Index of the iteration that just finished (starting at 0)
    pub iteration: usize,
    /// Current configuration
    pub position: &'a DVector<T>,
    /// Energy at `position`
    pub energy: T,
    /// Root-mean-square gradient at `position`
    pub rms: T,
    /// Length of the step taken (zero for a no-progress recovery iteration)
    pub step_size: T,
    /// Oracle evaluations so far
    pub function_calls: usize,
}

/// Trait for progress callbacks.
///
/// Closures are adapted with [`FnCallback`]; a `&mut` reference to a callback
/// is itself a callback, so the caller can keep ownership of stateful
/// observers such as [`TrajectoryRecorder`].
pub trait ProgressCallback<T: Scalar> {
    /// Called once after every iteration.
    fn on_step(&mut self, event: &StepEvent<'_, T>);
}

/// Adapts an `FnMut(&StepEvent<T>)` closure into a [`ProgressCallback`].
pub struct FnCallback<F>(pub F);

impl<T, F> ProgressCallback<T> for FnCallback<F>
where
    T: Scalar,
    F: FnMut(&StepEvent<'_, T>),
{
    fn on_step(&mut self, event: &StepEvent<'_, T>) {
        (self.0)(event);
    }
}

impl<T: Scalar, C: ProgressCallback<T> + ?Sized> ProgressCallback<T> for &mut C {
    fn on_step(&mut self, event: &StepEvent<'_, T>) {
        (**self).on_step(event);
    }
}

/// Boxed callback as stored by optimizers.
pub type BoxedCallback<'a, T> = Box<dyn ProgressCallback<T> + 'a>;

/// A callback that keeps a copy of every visited configuration.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryRecorder<T: Scalar> {
    /// Visited configurations, one per iteration
    pub positions: Vec<DVector<T>>,
    /// Energies, one per iteration
    pub energies: Vec<T>,
}

impl<T: Scalar> TrajectoryRecorder<T> {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            energies: Vec::new(),
        }
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }
}

impl<T: Scalar> ProgressCallback<T> for TrajectoryRecorder<T> {
    fn on_step(&mut self, event: &StepEvent<'_, T>) {
        self.positions.push(event.position.clone());
        self.energies.push(event.energy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(position: &DVector<f64>, iteration: usize) -> StepEvent<'_, f64> {
        StepEvent {
            iteration,
            position,
            energy: position.norm_squared(),
            rms: 0.0,
            step_size: 0.1,
            function_calls: iteration + 2,
        }
    }

    #[test]
    fn test_closure_callback() {
        let mut seen = Vec::new();
        {
            let mut cb = FnCallback(|e: &StepEvent<'_, f64>| seen.push(e.iteration));
            let x = DVector::from_vec(vec![1.0]);
            cb.on_step(&event(&x, 0));
            cb.on_step(&event(&x, 1));
        }
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn test_trajectory_recorder() {
        let mut recorder = TrajectoryRecorder::new();
        assert!(recorder.is_empty());

        let x = DVector::from_vec(vec![1.0, 2.0]);
        {
            let mut boxed: BoxedCallback<'_, f64> = Box::new(&mut recorder);
            boxed.on_step(&event(&x, 0));
        }

        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.energies[0], 5.0);
        assert_eq!(recorder.positions[0], x);
    }
}
