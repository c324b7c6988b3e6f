//! Suggest-and-observe loop — decouple candidate generation from evaluation.
//!
//! Ask the session for a batch of candidate points, evaluate them however
//! you like (workers, external processes), then report the results back.
//! The session keeps the search state evolving between calls.
//!
//! Run with: `cargo run --example loop_suggest_observe`

use mads_driver::prelude::*;

/// A shifted sphere: minimized at (0.3, -0.2, 0.5).
fn blackbox(x: &[f64]) -> Result<Vec<f64>> {
    let center = [0.3, -0.2, 0.5];
    Ok(vec![
        x.iter()
            .zip(center)
            .map(|(xi, c)| (xi - c).powi(2))
            .sum(),
    ])
}

fn main() -> mads_driver::Result<()> {
    let cache = std::env::temp_dir().join("loop_suggest_observe_cache.jsonl");

    let mut session = Session::builder()
        .dimension(3)
        .lower_bound(vec![-1.0; 3])
        .upper_bound(vec![1.0; 3])
        .cache_file(&cache)
        .seed(42)
        .build()?;

    for round in 1..=15 {
        let points = session.suggest(4)?;
        if points.is_empty() {
            println!("Round {round}: nothing left to suggest, stopping");
            break;
        }

        // Evaluate the batch (could be fanned out to workers).
        let mut results = Vec::with_capacity(points.len());
        for point in &points {
            results.push(blackbox(point)?);
        }
        session.observe(&points, &results)?;

        let best = results
            .iter()
            .filter_map(|r| r.first())
            .fold(f64::INFINITY, |a, &b| a.min(b));
        println!(
            "Round {round}: observed {} points, batch best f = {best:.6}",
            points.len(),
        );
    }

    let history = EvalCache::open(&cache)?;
    if let Some(best) = history.best() {
        println!(
            "Best: f({:.3?}) = {:.6} after {} evaluations",
            best.point,
            best.objective().unwrap_or(f64::NAN),
            history.len(),
        );
    }

    std::fs::remove_file(&cache).ok();
    Ok(())
}
