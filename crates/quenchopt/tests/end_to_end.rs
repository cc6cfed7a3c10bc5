//! End-to-end quenches through the public API.

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use quenchopt::prelude::*;
use quenchopt_core::test_potentials::{Rosenbrock, SumOfSquares, WeightedQuadratic};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

#[test]
fn test_sum_of_squares_quench() {
    let config = LbfgsConfig::new()
        .with_tolerance(1e-6)
        .with_max_step(0.5)
        .with_max_energy_rise(1e-4)
        .with_memory_size(4);

    let result = minimize(&SumOfSquares, DVector::from_vec(vec![1.0, 1.0, 1.0]), config).unwrap();

    assert!(result.success);
    assert_eq!(result.status, RunStatus::Converged);
    assert!(result.position.norm() < 1e-5);
    assert!(result.iterations < 200);
    assert_relative_eq!(result.rms, rms(&result.gradient));
}

#[test]
fn test_ill_conditioned_quadratic() {
    let weights = DVector::from_vec(vec![1.0, 10.0, 100.0, 1000.0]);
    let potential = WeightedQuadratic::new(weights);
    let config = LbfgsConfig::new().with_max_step(0.2).with_tolerance(1e-8);

    let result = minimize(&potential, DVector::from_element(4, 1.0), config).unwrap();

    assert!(result.success);
    assert!(result.energy < 1e-12);
    assert!(result.h0 > 0.0);
}

#[test]
fn test_rosenbrock_from_random_starts() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..5 {
        let x0 = DVector::from_fn(6, |_, _| rng.gen_range(-1.0..1.0));
        let config = LbfgsConfig::new().with_max_step(0.5).with_tolerance(1e-6);
        let result = minimize(&Rosenbrock, x0, config).unwrap();

        // Either the global minimum or the local one near x_0 = -1.
        assert!(result.success, "status {}", result.status);
        assert!(result.rms < 1e-6);
    }
}

#[test]
fn test_single_precision_quench() {
    let config = LbfgsConfig::<f32>::new().with_max_step(0.5);
    let result = minimize(&SumOfSquares, DVector::from_vec(vec![1.0f32, -2.0, 0.5]), config).unwrap();

    assert!(result.success);
    assert!(result.position.norm() < 1e-3);
}

#[test]
fn test_tracing_logger_can_be_injected() {
    let config = LbfgsConfig::new()
        .with_max_step(0.5)
        .with_print_interval(1)
        .with_logger(Arc::new(TracingLogger));

    let result = minimize(&SumOfSquares, DVector::from_element(2, 1.0), config).unwrap();
    assert!(result.success);
}

#[test]
fn test_counting_potential_matches_reported_evaluations() {
    let potential = CountingPotential::new(Rosenbrock);
    let config = LbfgsConfig::new().with_max_step(0.5);

    let result = minimize(&potential, DVector::from_vec(vec![-1.2, 1.0]), config).unwrap();

    assert!(result.success);
    assert_eq!(potential.calls(), result.function_evaluations);
    assert!(result.function_evaluations > result.iterations);
}

#[test]
fn test_gradient_check_before_quench() {
    let potential = PotentialFn::new(|x: &DVector<f64>| {
        let e = x.iter().map(|v| v.powi(4)).sum::<f64>();
        Ok((e, x.map(|v| 4.0 * v.powi(3))))
    });
    let x0 = DVector::from_vec(vec![0.5, -0.7]);

    let (ok, error) = GradientChecker::check_gradient(&potential, &x0, 1e-6).unwrap();
    assert!(ok, "finite-difference error {error}");

    let config = LbfgsConfig::new().with_tolerance(1e-4);
    let result = minimize(&potential, x0, config).unwrap();
    assert!(result.success);
}
