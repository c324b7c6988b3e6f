//! Shared fixtures for the session test suite.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mads_driver::{ConfigSet, Engine, Error, RngState, Session};

pub fn temp_path() -> std::path::PathBuf {
    use std::sync::atomic::AtomicU64;
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut path = std::env::temp_dir();
    path.push(format!(
        "mads_session_test_{}_{}.jsonl",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    path
}

/// A seeded session over `[-1, 1]^3` with a single objective output.
pub fn bounded_session(cache: &Path) -> Session {
    Session::builder()
        .dimension(3)
        .lower_bound(vec![-1.0; 3])
        .upper_bound(vec![1.0; 3])
        .cache_file(cache)
        .seed(42)
        .build()
        .unwrap()
}

pub fn in_bounds(point: &[f64]) -> bool {
    point.len() == 3 && point.iter().all(|&x| (-1.0..=1.0).contains(&x))
}

/// The test blackbox: `f(x) = sum(x_i)`, minimized at the lower corner.
pub fn sum_of_coords(x: &[f64]) -> Result<Vec<f64>, Error> {
    Ok(vec![x.iter().sum()])
}

/// An engine that never proposes anything, for resampling-ceiling tests.
pub struct EmptyEngine {
    pub asks: Arc<AtomicUsize>,
}

impl Engine for EmptyEngine {
    fn ask(&mut self, _config: &ConfigSet) -> mads_driver::Result<Vec<Vec<f64>>> {
        self.asks.fetch_add(1, Ordering::Relaxed);
        Ok(Vec::new())
    }

    fn tell(
        &mut self,
        _config: &ConfigSet,
        _points: &[Vec<f64>],
        _results: &[Vec<f64>],
        _cache_path: &Path,
    ) -> mads_driver::Result<ConfigSet> {
        Ok(ConfigSet::new())
    }

    fn capture_rng(&self) -> RngState {
        RngState::from_raw(0)
    }

    fn restore_rng(&mut self, _state: &RngState) {}
}
