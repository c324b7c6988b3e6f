//! Full optimization run — let the driver own the loop.
//!
//! Hand `optimize` the blackbox, an initial point, bounds and option
//! lines; it drives suggest/observe rounds until a stop condition fires
//! and reports the best point found.
//!
//! Run with: `cargo run --example full_run`

use mads_driver::prelude::*;

fn main() -> mads_driver::Result<()> {
    let cache = std::env::temp_dir().join("full_run_cache.jsonl");

    // Rosenbrock in two dimensions, minimized at (1, 1).
    let rosenbrock = |x: &[f64]| {
        let (a, b) = (x[0], x[1]);
        Ok::<_, Error>(vec![(1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2)])
    };

    let cache_line = format!("CACHE_FILE {}", cache.display());
    let result = optimize(
        &rosenbrock,
        Some(&[-1.0, 1.5]),
        &[-2.0, -2.0],
        &[2.0, 2.0],
        &[
            cache_line.as_str(),
            "MAX_BB_EVAL 200",
            "MIN_FRAME_SIZE 1e-7",
            "SEED 42",
        ],
    )?;

    println!("Stopped: {}", result.stop_reason);
    println!(
        "Evaluations: {} over {} rounds",
        result.nb_evals, result.nb_iters,
    );
    if let (Some(x), Some(f)) = (&result.x_best, result.f_best) {
        println!("Best: f({x:.4?}) = {f:.8}");
    }

    std::fs::remove_file(&cache).ok();
    Ok(())
}
