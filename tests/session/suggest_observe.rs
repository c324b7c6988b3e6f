use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mads_driver::cache::{CacheEntry, EvalCache};
use mads_driver::{Error, Session};

use crate::common::{EmptyEngine, bounded_session, in_bounds, sum_of_coords, temp_path};

fn evaluate(points: &[Vec<f64>]) -> Vec<Vec<f64>> {
    points
        .iter()
        .map(|x| sum_of_coords(x).unwrap())
        .collect()
}

#[test]
fn suggest_returns_points_within_bounds() {
    let cache = temp_path();
    let mut session = bounded_session(&cache);

    let points = session.suggest(4).unwrap();
    assert!(!points.is_empty());
    assert!(points.len() <= 4);
    for point in &points {
        assert!(in_bounds(point), "out of bounds: {point:?}");
    }

    std::fs::remove_file(&cache).ok();
}

#[test]
fn suggest_zero_is_an_error() {
    let cache = temp_path();
    let mut session = bounded_session(&cache);
    assert!(matches!(
        session.suggest(0),
        Err(Error::InvalidSuggestCount)
    ));
    std::fs::remove_file(&cache).ok();
}

#[test]
fn bootstrap_flips_after_first_observe_only() {
    let cache = temp_path();
    let mut session = bounded_session(&cache);
    assert!(session.is_bootstrap());

    // A failed observe must not flip the flag.
    assert!(session.observe(&[vec![0.0; 3]], &[]).is_err());
    assert!(session.is_bootstrap());

    let points = session.suggest(4).unwrap();
    session.observe(&points, &evaluate(&points)).unwrap();
    assert!(!session.is_bootstrap());

    // And it never flips back.
    let points = session.suggest(4).unwrap();
    session.observe(&points, &evaluate(&points)).unwrap();
    assert!(!session.is_bootstrap());

    std::fs::remove_file(&cache).ok();
}

#[test]
fn observe_merges_engine_updates_into_running_config() {
    let cache = temp_path();
    let mut session = bounded_session(&cache);
    assert!(!session.running_config().contains_key("FRAME_SIZE"));

    let points = session.suggest(4).unwrap();
    session.observe(&points, &evaluate(&points)).unwrap();

    let running = session.running_config();
    assert!(running.contains_key("FRAME_SIZE"));
    assert!(running.contains_key("MESH_SIZE"));
    assert_eq!(running.get("MEGA_SEARCH_POLL"), Some("yes"));

    // The cache recorded the whole batch.
    assert_eq!(EvalCache::open(&cache).unwrap().len(), points.len());

    std::fs::remove_file(&cache).ok();
}

#[test]
fn rejected_observe_leaves_the_session_untouched() {
    let cache = temp_path();
    let mut session = bounded_session(&cache);
    let points = session.suggest(4).unwrap();
    let before: Vec<String> = session
        .running_config()
        .lines()
        .map(String::from)
        .collect();

    // Mismatched lengths.
    assert!(matches!(
        session.observe(&points, &[vec![0.0]]),
        Err(Error::LengthMismatch { .. })
    ));
    // A short point.
    assert!(matches!(
        session.observe(&[vec![0.0; 2]], &[vec![0.0]]),
        Err(Error::DimensionMismatch { expected: 3, got: 2, index: 0 })
    ));
    // A result with the wrong output arity.
    assert!(matches!(
        session.observe(&[vec![0.0; 3]], &[vec![0.0, 1.0]]),
        Err(Error::OutputArityMismatch { expected: 1, got: 2, index: 0 })
    ));

    let after: Vec<String> = session
        .running_config()
        .lines()
        .map(String::from)
        .collect();
    assert_eq!(before, after);
    assert!(session.is_bootstrap());
    assert!(EvalCache::open(&cache).unwrap().is_empty());

    std::fs::remove_file(&cache).ok();
}

#[test]
fn pending_tracks_unobserved_points() {
    let cache = temp_path();
    let mut session = bounded_session(&cache);
    assert!(session.pending().is_empty());

    let points = session.suggest(4).unwrap();
    assert_eq!(session.pending(), points.as_slice());

    session.observe(&points, &evaluate(&points)).unwrap();
    assert!(session.pending().is_empty());

    std::fs::remove_file(&cache).ok();
}

#[test]
fn empty_engine_exhausts_the_resample_ceiling() {
    let cache = temp_path();
    let asks = Arc::new(AtomicUsize::new(0));
    let mut session = Session::builder()
        .dimension(3)
        .cache_file(&cache)
        .engine(EmptyEngine { asks: Arc::clone(&asks) })
        .resample_attempts(3)
        .build()
        .unwrap();

    // An empty batch after the ceiling is a valid outcome, not an error.
    let points = session.suggest(4).unwrap();
    assert!(points.is_empty());
    // One initial ask plus three bootstrap re-asks.
    assert_eq!(asks.load(Ordering::Relaxed), 4);

    std::fs::remove_file(&cache).ok();
}

#[test]
fn seeded_cache_drives_the_first_rounds() {
    let seed = temp_path();
    let cache = temp_path();
    let history = EvalCache::create(&seed).unwrap();
    history
        .append(&[CacheEntry::new(vec![0.5, 0.0, 0.5], vec![-1.0])])
        .unwrap();

    let mut session = Session::builder()
        .dimension(3)
        .lower_bound(vec![-1.0; 3])
        .upper_bound(vec![1.0; 3])
        .cache_file(&cache)
        .seed_cache(&seed)
        .seed(7)
        .build()
        .unwrap();

    let points = session.suggest(4).unwrap();
    assert!(!points.is_empty());
    for point in &points {
        assert!(in_bounds(point), "out of bounds: {point:?}");
    }
    session.observe(&points, &evaluate(&points)).unwrap();
    assert!(session.running_config().contains_key("FRAME_SIZE"));

    // The session appended to its copy; the seeded entry is still first.
    let entries = EvalCache::open(&cache).unwrap().entries();
    assert_eq!(entries[0].point, vec![0.5, 0.0, 0.5]);
    assert_eq!(entries.len(), 1 + points.len());

    std::fs::remove_file(&seed).ok();
    std::fs::remove_file(&cache).ok();
}

#[test]
fn debug_output_reports_session_shape() {
    let cache = temp_path();
    let session = bounded_session(&cache);

    let rendered = format!("{session:?}");
    assert!(rendered.contains("dimension: 3"), "got: {rendered}");
    assert!(rendered.contains("use_bootstrap: true"), "got: {rendered}");

    std::fs::remove_file(&cache).ok();
}

#[test]
fn builder_rejects_inconsistent_bounds() {
    let err = Session::builder()
        .dimension(3)
        .lower_bound(vec![0.0; 2])
        .upper_bound(vec![1.0; 3])
        .cache_file(temp_path())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, got: 2, .. }));

    let err = Session::builder()
        .dimension(2)
        .lower_bound(vec![1.0, 0.0])
        .upper_bound(vec![0.0, 1.0])
        .cache_file(temp_path())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidBounds { .. }));

    let err = Session::builder()
        .lower_bound(vec![0.0])
        .upper_bound(vec![1.0])
        .cache_file(temp_path())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::MissingDimension));
}
