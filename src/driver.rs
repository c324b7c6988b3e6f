//! A self-contained suggest → evaluate → observe driving loop.
//!
//! [`optimize`] is the convenience entry point mirroring the classic
//! run-to-convergence call: hand it an evaluator, bounds and option lines
//! and it builds a [`Session`], drives it until a stop condition fires and
//! reports the best point found. [`run`] does the same for a session you
//! built yourself (custom engine, pre-seeded cache, ...).
//!
//! Stop conditions — checked before every suggest, never mid-batch:
//!
//! - the cumulative evaluation budget (`MAX_BB_EVAL`) would be exceeded;
//! - the frame size read back from the running configuration fell below
//!   `MIN_FRAME_SIZE` in every coordinate;
//! - the iteration ceiling (`MAX_ITERATIONS`) was reached;
//! - the session has nothing left to suggest.
//!
//! Suggest batches are capped to the remaining budget, so a round never
//! overshoots it; a returned batch is always evaluated in full.

use crate::cache::{CacheEntry, compare_entries};
use crate::config::ConfigSet;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::session::Session;
use crate::types::StopReason;

/// Budget knobs for a driving loop, read from the option list with
/// defaults applied.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Cumulative blackbox evaluation budget (`MAX_BB_EVAL`).
    pub max_bb_eval: usize,
    /// Stop once every frame-size coordinate is below this
    /// (`MIN_FRAME_SIZE`).
    pub min_frame_size: f64,
    /// Ceiling on suggest/observe rounds (`MAX_ITERATIONS`).
    pub max_iterations: usize,
    /// Points requested per suggest round (`BB_MAX_BLOCK_SIZE`).
    pub block_size: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_bb_eval: 100,
            min_frame_size: 1e-6,
            max_iterations: 100,
            block_size: 4,
        }
    }
}

impl RunOptions {
    /// Read the budget knobs out of a configuration set, falling back to
    /// the defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOption`] if a present value fails to
    /// parse.
    pub fn from_config(config: &ConfigSet) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            max_bb_eval: config
                .usize_value("MAX_BB_EVAL")?
                .unwrap_or(defaults.max_bb_eval),
            min_frame_size: config
                .f64_value("MIN_FRAME_SIZE")?
                .unwrap_or(defaults.min_frame_size),
            max_iterations: config
                .usize_value("MAX_ITERATIONS")?
                .unwrap_or(defaults.max_iterations),
            block_size: config
                .usize_value("BB_MAX_BLOCK_SIZE")?
                .unwrap_or(defaults.block_size)
                .max(1),
        })
    }
}

/// The outcome of a driving loop.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OptimizationResult {
    /// The best point found, feasible-first; `None` if nothing completed.
    pub x_best: Option<Vec<f64>>,
    /// The objective value at `x_best`.
    pub f_best: Option<f64>,
    /// The aggregate constraint violation at `x_best` (0 when feasible).
    pub h_best: Option<f64>,
    /// Total blackbox evaluations issued, failed ones included.
    pub nb_evals: usize,
    /// Completed suggest/observe rounds.
    pub nb_iters: usize,
    /// Which stop condition ended the loop.
    pub stop_reason: StopReason,
}

/// Run a full optimization with a freshly built session.
///
/// `options` uses the same `"KEY value"` lines a session accepts; the
/// driver additionally honors `MAX_BB_EVAL`, `MIN_FRAME_SIZE`,
/// `MAX_ITERATIONS`, `BB_MAX_BLOCK_SIZE` and `SEED`. When `x0` is given it
/// is evaluated and observed before the loop starts, seeding the cache
/// with a poll center.
///
/// # Errors
///
/// Propagates builder, session and engine errors. Per-point evaluator
/// failures are not errors: the point counts against the budget, is
/// excluded from that round's observe and the loop continues (a round
/// where every point failed skips its observe entirely).
pub fn optimize<E: Evaluator>(
    evaluator: &E,
    x0: Option<&[f64]>,
    lower: &[f64],
    upper: &[f64],
    options: &[&str],
) -> Result<OptimizationResult> {
    if lower.len() != upper.len() || lower.is_empty() {
        return Err(Error::DimensionMismatch {
            expected: lower.len(),
            got: upper.len(),
            index: 0,
        });
    }
    let parsed = ConfigSet::parse(options)?;
    let run_options = RunOptions::from_config(&parsed)?;

    let mut builder = Session::builder()
        .dimension(lower.len())
        .lower_bound(lower.to_vec())
        .upper_bound(upper.to_vec());
    if let Some(value) = parsed.get("SEED") {
        let seed: u64 = value
            .parse()
            .map_err(|_| Error::MalformedOption(format!("SEED {value}")))?;
        builder = builder.seed(seed);
    }
    for line in options {
        builder = builder.option(*line);
    }
    let mut session = builder.build()?;

    let mut best: Option<CacheEntry> = None;
    let mut nb_evals = 0;

    if let Some(x0) = x0 {
        if x0.len() != session.dimension() {
            return Err(Error::DimensionMismatch {
                expected: session.dimension(),
                got: x0.len(),
                index: 0,
            });
        }
        nb_evals += 1;
        match evaluator.eval(x0) {
            Ok(outputs) => {
                consider(&mut best, x0, &outputs);
                session.observe(&[x0.to_vec()], &[outputs])?;
            }
            Err(_err) => {
                trace_debug!(reason = %_err.to_string(), "initial point evaluation failed");
            }
        }
    }

    drive(&mut session, evaluator, &run_options, best, nb_evals)
}

/// Drive an existing session to a stop condition.
///
/// Like [`optimize`] but for sessions built by hand; no initial point is
/// evaluated and the budget starts at zero.
///
/// # Errors
///
/// Propagates session and engine errors.
pub fn run<E: Evaluator>(
    session: &mut Session,
    evaluator: &E,
    options: &RunOptions,
) -> Result<OptimizationResult> {
    drive(session, evaluator, options, None, 0)
}

fn drive<E: Evaluator>(
    session: &mut Session,
    evaluator: &E,
    options: &RunOptions,
    mut best: Option<CacheEntry>,
    mut nb_evals: usize,
) -> Result<OptimizationResult> {
    let dimension = session.dimension();
    let mut nb_iters = 0;

    let stop_reason = loop {
        if nb_iters >= options.max_iterations {
            break StopReason::IterationLimit;
        }
        if frame_below(session.running_config(), dimension, options.min_frame_size)? {
            break StopReason::MinFrameSize;
        }
        let remaining = options.max_bb_eval.saturating_sub(nb_evals);
        if remaining == 0 {
            break StopReason::BudgetExhausted;
        }

        let points = session.suggest(remaining.min(options.block_size))?;
        if points.is_empty() {
            break StopReason::NoCandidates;
        }
        nb_iters += 1;

        let outcomes = evaluator.eval_block(&points);
        nb_evals += points.len();

        let mut observed_points = Vec::with_capacity(points.len());
        let mut observed_results = Vec::with_capacity(points.len());
        for (point, outcome) in points.iter().zip(outcomes) {
            match outcome {
                Ok(outputs) => {
                    consider(&mut best, point, &outputs);
                    observed_points.push(point.clone());
                    observed_results.push(outputs);
                }
                Err(_err) => {
                    trace_debug!(reason = %_err.to_string(), "point evaluation failed");
                }
            }
        }

        trace_info!(
            round = nb_iters,
            evaluated = points.len(),
            succeeded = observed_points.len(),
            total_evals = nb_evals,
            "round complete"
        );

        // A round where every evaluation failed has nothing to report.
        if observed_points.is_empty() {
            continue;
        }
        session.observe(&observed_points, &observed_results)?;
    };

    trace_info!(?stop_reason, nb_evals, nb_iters, "optimization stopped");

    Ok(OptimizationResult {
        x_best: best.as_ref().map(|entry| entry.point.clone()),
        f_best: best.as_ref().and_then(CacheEntry::objective),
        h_best: best.as_ref().map(CacheEntry::violation),
        nb_evals,
        nb_iters,
        stop_reason,
    })
}

/// Keep `best` pointing at the feasible-first champion. Results with a
/// non-finite objective never become the incumbent here, though they are
/// still forwarded to the engine untouched.
fn consider(best: &mut Option<CacheEntry>, point: &[f64], outputs: &[f64]) {
    if !outputs.first().is_some_and(|f| f.is_finite()) {
        return;
    }
    let candidate = CacheEntry::new(point.to_vec(), outputs.to_vec());
    let better = match best.as_ref() {
        None => true,
        Some(incumbent) => {
            compare_entries(&candidate, incumbent) == core::cmp::Ordering::Less
        }
    };
    if better {
        *best = Some(candidate);
    }
}

/// True when the running configuration carries a `FRAME_SIZE` whose every
/// coordinate is below `min`.
fn frame_below(config: &ConfigSet, dimension: usize, min: f64) -> Result<bool> {
    Ok(config
        .vector("FRAME_SIZE", dimension)?
        .is_some_and(|frame| frame.iter().all(|&f| f < min)))
}
