//! Bundled frame-adaptive direct-search engine.

use std::path::Path;

use crate::cache::{CacheEntry, EvalCache, compare_entries};
use crate::config::ConfigSet;
use crate::engine::{Engine, RngState};
use crate::error::{Error, Result};

/// Problem geometry extracted from a configuration set.
struct Problem {
    dim: usize,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Problem {
    fn from_config(config: &ConfigSet) -> Result<Self> {
        let dim = config
            .usize_value("DIMENSION")?
            .ok_or_else(|| Error::Engine("configuration declares no DIMENSION".to_string()))?;
        if dim == 0 {
            return Err(Error::Engine("DIMENSION must be positive".to_string()));
        }
        let lower = config
            .vector("LOWER_BOUND", dim)?
            .unwrap_or_else(|| vec![f64::NEG_INFINITY; dim]);
        let upper = config
            .vector("UPPER_BOUND", dim)?
            .unwrap_or_else(|| vec![f64::INFINITY; dim]);
        for (&low, &high) in lower.iter().zip(&upper) {
            if low > high {
                return Err(Error::InvalidBounds { low, high });
            }
        }
        Ok(Self { dim, lower, upper })
    }

    fn clip(&self, point: &mut [f64]) {
        for ((x, &low), &high) in point.iter_mut().zip(&self.lower).zip(&self.upper) {
            *x = x.clamp(low, high);
        }
    }

    /// Default frame size: a tenth of the bound span, or 1 where unbounded.
    fn default_frame(&self) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&low, &high)| {
                let span = high - low;
                if span.is_finite() && span > 0.0 {
                    span / 10.0
                } else {
                    1.0
                }
            })
            .collect()
    }
}

/// A compact mesh-adaptive direct-search engine.
///
/// Two proposal modes, selected by the configuration set it is asked with:
///
/// - `LH_EVAL n` — bootstrap sampling: `n` latin-hypercube points spread
///   over the (finite) bounds.
/// - `MEGA_SEARCH_POLL yes` — a poll stencil around the cache incumbent,
///   scaled by the current `FRAME_SIZE`, with already-evaluated points
///   filtered out. An empty cache yields an empty batch.
///
/// On tell, evaluated points are appended to the cache file and the frame
/// is grown (new incumbent) or shrunk (no improvement); the updated
/// `FRAME_SIZE` and `MESH_SIZE` come back as a configuration set for the
/// session to merge.
///
/// All randomness flows through a single seeded generator, so capturing
/// and restoring [`RngState`] replays ask batches exactly.
pub struct MeshSearchEngine {
    rng: fastrand::Rng,
}

impl MeshSearchEngine {
    /// Create an engine with a randomly seeded generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Create an engine with a fixed seed for reproducible runs.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// `n` latin-hypercube samples: each coordinate axis is cut into `n`
    /// strata and every point lands in a distinct stratum per axis.
    fn latin_hypercube(&mut self, problem: &Problem, n: usize) -> Result<Vec<Vec<f64>>> {
        for (&low, &high) in problem.lower.iter().zip(&problem.upper) {
            if !low.is_finite() || !high.is_finite() {
                return Err(Error::Engine(
                    "LH_EVAL requires finite LOWER_BOUND and UPPER_BOUND".to_string(),
                ));
            }
        }

        let mut points = vec![vec![0.0; problem.dim]; n];
        #[allow(clippy::cast_precision_loss)]
        for j in 0..problem.dim {
            let mut strata: Vec<usize> = (0..n).collect();
            self.rng.shuffle(&mut strata);
            let width = (problem.upper[j] - problem.lower[j]) / n as f64;
            for (point, &stratum) in points.iter_mut().zip(&strata) {
                point[j] = problem.lower[j] + (stratum as f64 + self.rng.f64()) * width;
            }
        }
        Ok(points)
    }

    /// Poll stencil around the incumbent: one random dense direction pair
    /// plus the positive and negative coordinate steps, frame-scaled.
    fn poll(&mut self, problem: &Problem, config: &ConfigSet) -> Result<Vec<Vec<f64>>> {
        let cache_path = config.get("CACHE_FILE").ok_or_else(|| {
            Error::Engine("MEGA_SEARCH_POLL requires a CACHE_FILE".to_string())
        })?;
        let cache = EvalCache::open(cache_path)?;
        let Some(incumbent) = cache.best() else {
            return Ok(Vec::new());
        };
        if incumbent.point.len() != problem.dim {
            return Err(Error::Engine(format!(
                "cache entry has dimension {} but configuration declares {}",
                incumbent.point.len(),
                problem.dim
            )));
        }
        let frame = frame_size(config, problem)?;
        let center = &incumbent.point;

        let dense: Vec<f64> = (0..problem.dim)
            .map(|_| if self.rng.bool() { 1.0 } else { -1.0 })
            .collect();

        let mut directions: Vec<Vec<f64>> = vec![dense.clone(), negate(&dense)];
        for i in 0..problem.dim {
            let mut unit = vec![0.0; problem.dim];
            unit[i] = 1.0;
            directions.push(unit.clone());
            unit[i] = -1.0;
            directions.push(unit);
        }

        let mut candidates: Vec<Vec<f64>> = Vec::new();
        for direction in directions {
            let mut candidate: Vec<f64> = center
                .iter()
                .zip(&frame)
                .zip(&direction)
                .map(|((&x, &f), &d)| x + f * d)
                .collect();
            problem.clip(&mut candidate);
            if cache.contains(&candidate) || contains_point(&candidates, &candidate) {
                continue;
            }
            candidates.push(candidate);
        }
        Ok(candidates)
    }
}

impl Default for MeshSearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MeshSearchEngine {
    fn ask(&mut self, config: &ConfigSet) -> Result<Vec<Vec<f64>>> {
        let problem = Problem::from_config(config)?;
        if let Some(n) = config.usize_value("LH_EVAL")? {
            if n > 0 {
                return self.latin_hypercube(&problem, n);
            }
        }
        if config.flag("MEGA_SEARCH_POLL")?.unwrap_or(false) {
            return self.poll(&problem, config);
        }
        Ok(Vec::new())
    }

    fn tell(
        &mut self,
        config: &ConfigSet,
        points: &[Vec<f64>],
        results: &[Vec<f64>],
        cache_path: &Path,
    ) -> Result<ConfigSet> {
        let problem = Problem::from_config(config)?;
        for (index, point) in points.iter().enumerate() {
            if point.len() != problem.dim {
                return Err(Error::DimensionMismatch {
                    expected: problem.dim,
                    got: point.len(),
                    index,
                });
            }
        }

        let cache = EvalCache::open(cache_path)?;
        let incumbent = cache.best();
        let frame = frame_size(config, &problem)?;

        // Results with non-finite values count as failed evaluations: they
        // are not cached and cannot improve the incumbent.
        let entries: Vec<CacheEntry> = points
            .iter()
            .zip(results)
            .filter(|(_, outputs)| outputs.iter().all(|v| v.is_finite()))
            .map(|(point, outputs)| CacheEntry::new(point.clone(), outputs.clone()))
            .collect();
        cache.append(&entries)?;

        let improved = entries.iter().any(|entry| match incumbent.as_ref() {
            None => true,
            Some(inc) => compare_entries(entry, inc) == core::cmp::Ordering::Less,
        });
        let factor = if improved { 2.0 } else { 0.5 };

        let new_frame: Vec<f64> = frame
            .iter()
            .zip(&problem.lower)
            .zip(&problem.upper)
            .map(|((&f, &low), &high)| {
                let grown = f * factor;
                let span = high - low;
                if span.is_finite() && span > 0.0 {
                    grown.min(span)
                } else {
                    grown
                }
            })
            .collect();
        let mesh: Vec<f64> = new_frame.iter().map(|&f| f.min(f * f)).collect();

        ConfigSet::parse([
            format!("FRAME_SIZE ( {} )", join(&new_frame)),
            format!("MESH_SIZE ( {} )", join(&mesh)),
        ])
    }

    fn capture_rng(&self) -> RngState {
        RngState::from_raw(self.rng.get_seed())
    }

    fn restore_rng(&mut self, state: &RngState) {
        self.rng.seed(state.to_raw());
    }
}

/// Current frame size: `FRAME_SIZE` if the session carries one already,
/// else `INITIAL_FRAME_SIZE`, else a bounds-derived default.
fn frame_size(config: &ConfigSet, problem: &Problem) -> Result<Vec<f64>> {
    if let Some(frame) = config.vector("FRAME_SIZE", problem.dim)? {
        return Ok(frame);
    }
    if let Some(frame) = config.vector("INITIAL_FRAME_SIZE", problem.dim)? {
        return Ok(frame);
    }
    Ok(problem.default_frame())
}

fn negate(direction: &[f64]) -> Vec<f64> {
    direction.iter().map(|&d| -d).collect()
}

fn contains_point(batch: &[Vec<f64>], point: &[f64]) -> bool {
    batch.iter().any(|existing| {
        existing
            .iter()
            .zip(point)
            .all(|(a, b)| (a - b).abs() <= crate::cache::POINT_TOLERANCE)
    })
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
