use mads_driver::{Error, RunOptions, Session, StopReason, optimize, run};

use crate::common::{in_bounds, sum_of_coords, temp_path};

fn cache_option(path: &std::path::Path) -> String {
    format!("CACHE_FILE {}", path.display())
}

#[test]
fn optimize_respects_the_evaluation_budget() {
    let cache = temp_path();
    let cache_line = cache_option(&cache);
    let result = optimize(
        &sum_of_coords,
        Some(&[0.0, 0.0, 0.0]),
        &[-1.0; 3],
        &[1.0; 3],
        &[cache_line.as_str(), "MAX_BB_EVAL 20", "SEED 42"],
    )
    .unwrap();

    assert!(result.nb_evals <= 20);
    // The initial point seeds the incumbent; it can only improve from there.
    let f_best = result.f_best.unwrap();
    assert!(f_best <= 0.0, "f_best = {f_best}");
    assert!(in_bounds(&result.x_best.unwrap()));
    assert_eq!(result.h_best, Some(0.0));

    std::fs::remove_file(&cache).ok();
}

#[test]
fn optimize_stops_at_the_iteration_ceiling() {
    let cache = temp_path();
    let cache_line = cache_option(&cache);
    let result = optimize(
        &sum_of_coords,
        None,
        &[-1.0; 3],
        &[1.0; 3],
        &[cache_line.as_str(), "MAX_ITERATIONS 3", "SEED 7"],
    )
    .unwrap();

    assert!(result.nb_iters <= 3);
    if result.nb_iters == 3 {
        assert_eq!(result.stop_reason, StopReason::IterationLimit);
    }

    std::fs::remove_file(&cache).ok();
}

#[test]
fn optimize_stops_once_the_frame_collapses_below_the_minimum() {
    let cache = temp_path();
    // Any frame is below such a generous minimum, so the very first
    // merged FRAME_SIZE ends the loop.
    let cache_line = cache_option(&cache);
    let result = optimize(
        &sum_of_coords,
        None,
        &[-1.0; 3],
        &[1.0; 3],
        &[cache_line.as_str(), "MIN_FRAME_SIZE 100.0", "SEED 7"],
    )
    .unwrap();

    assert_eq!(result.stop_reason, StopReason::MinFrameSize);
    assert_eq!(result.nb_iters, 1);

    std::fs::remove_file(&cache).ok();
}

#[test]
fn failed_evaluations_spend_budget_without_a_best_point() {
    let cache = temp_path();
    let always_fails = |_: &[f64]| Err::<Vec<f64>, _>("blackbox crashed");

    let cache_line = cache_option(&cache);
    let result = optimize(
        &always_fails,
        None,
        &[-1.0; 3],
        &[1.0; 3],
        &[cache_line.as_str(), "MAX_BB_EVAL 20", "SEED 11"],
    )
    .unwrap();

    assert_eq!(result.stop_reason, StopReason::BudgetExhausted);
    assert_eq!(result.nb_evals, 20);
    assert!(result.x_best.is_none());
    assert!(result.f_best.is_none());

    std::fs::remove_file(&cache).ok();
}

#[test]
fn run_drives_a_hand_built_session() {
    let cache = temp_path();
    let mut session = Session::builder()
        .dimension(3)
        .lower_bound(vec![-1.0; 3])
        .upper_bound(vec![1.0; 3])
        .cache_file(&cache)
        .seed(42)
        .build()
        .unwrap();

    let options = RunOptions {
        max_bb_eval: 30,
        ..RunOptions::default()
    };
    let result = run(&mut session, &sum_of_coords, &options).unwrap();

    assert!(result.nb_evals <= 30);
    assert!(result.nb_iters >= 1);
    assert!(in_bounds(&result.x_best.unwrap()));
    assert!((-3.0..=3.0).contains(&result.f_best.unwrap()));
    assert!(!session.is_bootstrap());

    std::fs::remove_file(&cache).ok();
}

#[test]
fn optimize_rejects_a_misshapen_initial_point() {
    let cache = temp_path();
    let cache_line = cache_option(&cache);
    let err = optimize(
        &sum_of_coords,
        Some(&[0.0, 0.0]),
        &[-1.0; 3],
        &[1.0; 3],
        &[cache_line.as_str()],
    )
    .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, got: 2, .. }));
    std::fs::remove_file(&cache).ok();
}

#[test]
fn run_options_read_from_config_lines() {
    let config = mads_driver::ConfigSet::parse([
        "MAX_BB_EVAL 50",
        "MIN_FRAME_SIZE 1e-3",
        "BB_MAX_BLOCK_SIZE 0",
    ])
    .unwrap();
    let options = RunOptions::from_config(&config).unwrap();
    assert_eq!(options.max_bb_eval, 50);
    assert_eq!(options.min_frame_size, 1e-3);
    assert_eq!(options.max_iterations, RunOptions::default().max_iterations);
    // A zero block size is clamped to one.
    assert_eq!(options.block_size, 1);
}
