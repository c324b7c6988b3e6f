//! The ask/observe session controller.

use std::path::{Path, PathBuf};

use crate::cache::EvalCache;
use crate::config::ConfigSet;
use crate::engine::{Engine, MeshSearchEngine, RngState};
use crate::error::{Error, Result};
use crate::types::OutputType;

/// Default ceiling on bootstrap resampling when a suggest round comes up
/// short (see [`SessionBuilder::resample_attempts`]).
pub const DEFAULT_RESAMPLE_ATTEMPTS: usize = 10;

/// A restorable snapshot of the session's mutable state.
///
/// Pairs the engine's opaque [`RngState`] with the bootstrap flag, which is
/// everything needed to replay suggest output exactly — the evaluation
/// cache file and the running configuration persist on their own.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionState {
    /// The engine's random-generator snapshot.
    pub rng: RngState,
    /// Whether the session was still in bootstrap mode.
    pub use_bootstrap: bool,
}

/// Drives an [`Engine`] through repeated suggest/observe rounds.
///
/// The session owns two configuration sets: a bootstrap set used for the
/// initial space-filling round (and for topping up short suggest batches)
/// and a running set that accumulates the engine's search-progress updates
/// round after round. The bootstrap flag flips permanently after the first
/// successful observe.
///
/// Calls are strictly sequential; evaluating the points *within* one
/// suggested batch in parallel is fine, but all results must be gathered
/// before the single matching [`observe`](Session::observe) call.
///
/// # Examples
///
/// ```no_run
/// use mads_driver::{Session, Error};
///
/// let mut session = Session::builder()
///     .dimension(3)
///     .lower_bound(vec![-1.0; 3])
///     .upper_bound(vec![1.0; 3])
///     .cache_file("cache.jsonl")
///     .seed(42)
///     .build()?;
///
/// let points = session.suggest(5)?;
/// let results: Vec<Vec<f64>> = points
///     .iter()
///     .map(|x| vec![x.iter().sum::<f64>()])
///     .collect();
/// session.observe(&points, &results)?;
/// # Ok::<(), Error>(())
/// ```
pub struct Session {
    engine: Box<dyn Engine>,
    running: ConfigSet,
    bootstrap: ConfigSet,
    use_bootstrap: bool,
    dimension: usize,
    n_outputs: usize,
    cache_path: PathBuf,
    pending: Vec<Vec<f64>>,
    resample_attempts: usize,
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("dimension", &self.dimension)
            .field("n_outputs", &self.n_outputs)
            .field("use_bootstrap", &self.use_bootstrap)
            .field("cache_path", &self.cache_path)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Return a [`SessionBuilder`] for constructing a session.
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Assemble a session from an engine and two pre-built configuration
    /// sets.
    ///
    /// The running set must declare `DIMENSION` and `CACHE_FILE`; the
    /// output count is taken from `BB_OUTPUT_TYPE` (one objective if
    /// absent). Most callers want [`Session::builder`] instead; this
    /// constructor exists for custom engines driven with hand-written
    /// option lists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDimension`] or [`Error::Cache`] when the
    /// running set lacks the required options, or a parse error if
    /// `DIMENSION` is not a number.
    pub fn from_parts(
        engine: Box<dyn Engine>,
        running: ConfigSet,
        bootstrap: ConfigSet,
    ) -> Result<Self> {
        let dimension = running
            .usize_value("DIMENSION")?
            .ok_or(Error::MissingDimension)?;
        let n_outputs = running
            .get("BB_OUTPUT_TYPE")
            .map_or(1, |tags| tags.split_whitespace().count().max(1));
        let cache_path = running
            .get("CACHE_FILE")
            .map(PathBuf::from)
            .ok_or_else(|| Error::Cache("configuration declares no CACHE_FILE".to_string()))?;

        Ok(Self {
            engine,
            running,
            bootstrap,
            use_bootstrap: true,
            dimension,
            n_outputs,
            cache_path,
            pending: Vec::new(),
            resample_attempts: DEFAULT_RESAMPLE_ATTEMPTS,
        })
    }

    /// Request up to `count` new candidate points.
    ///
    /// The bootstrap configuration is submitted while the session has not
    /// yet observed anything, the running configuration afterwards. When
    /// the engine returns fewer points than requested, the bootstrap set
    /// is re-asked (its sampling mode is randomized, so repeats make
    /// progress) up to the configured resample ceiling; the batch is then
    /// truncated to `count`. A short or even empty batch after ceiling
    /// exhaustion is a valid outcome, not an error.
    ///
    /// Neither the running configuration nor the bootstrap flag changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSuggestCount`] for `count == 0` and
    /// propagates engine failures unchanged.
    pub fn suggest(&mut self, count: usize) -> Result<Vec<Vec<f64>>> {
        if count == 0 {
            return Err(Error::InvalidSuggestCount);
        }

        let submit = if self.use_bootstrap {
            &self.bootstrap
        } else {
            &self.running
        };
        let mut points = self.engine.ask(submit)?;

        let mut attempts = 0;
        while points.len() < count && attempts < self.resample_attempts {
            points.extend(self.engine.ask(&self.bootstrap)?);
            attempts += 1;
        }
        points.truncate(count);

        trace_info!(
            requested = count,
            returned = points.len(),
            bootstrap = self.use_bootstrap,
            resample_attempts = attempts,
            "suggest"
        );

        self.pending = points.clone();
        Ok(points)
    }

    /// Report evaluation results for previously suggested points.
    ///
    /// Points and results are forwarded to the engine together with the
    /// same configuration set the points were sampled under; the engine
    /// appends them to the evaluation cache and returns updated
    /// search-progress options, which are merged into the running set by
    /// key. After the first successful observe the session permanently
    /// leaves bootstrap mode.
    ///
    /// Result values are forwarded untouched — non-finite entries included;
    /// how the engine treats them is its own business. Only structure is
    /// checked here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`], [`Error::DimensionMismatch`] or
    /// [`Error::OutputArityMismatch`] before anything is mutated, and
    /// propagates engine failures unchanged (again without mutation).
    pub fn observe(&mut self, points: &[Vec<f64>], results: &[Vec<f64>]) -> Result<()> {
        if points.len() != results.len() {
            return Err(Error::LengthMismatch {
                points: points.len(),
                results: results.len(),
            });
        }
        for (index, point) in points.iter().enumerate() {
            if point.len() != self.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.dimension,
                    got: point.len(),
                    index,
                });
            }
        }
        for (index, result) in results.iter().enumerate() {
            if result.len() != self.n_outputs {
                return Err(Error::OutputArityMismatch {
                    expected: self.n_outputs,
                    got: result.len(),
                    index,
                });
            }
        }

        let submit = if self.use_bootstrap {
            &self.bootstrap
        } else {
            &self.running
        };
        let updates = self
            .engine
            .tell(submit, points, results, &self.cache_path)?;

        self.use_bootstrap = false;
        self.running.merge(&updates);
        self.pending.retain(|pending| !points.contains(pending));

        trace_info!(
            observed = points.len(),
            updated_options = updates.len(),
            "observe"
        );
        Ok(())
    }

    /// Snapshot the session's replayable state.
    #[must_use]
    pub fn capture_state(&self) -> SessionState {
        SessionState {
            rng: self.engine.capture_rng(),
            use_bootstrap: self.use_bootstrap,
        }
    }

    /// Restore a snapshot taken with [`capture_state`](Session::capture_state).
    pub fn restore_state(&mut self, state: &SessionState) {
        self.engine.restore_rng(&state.rng);
        self.use_bootstrap = state.use_bootstrap;
    }

    /// Snapshot only the engine's random-generator state.
    #[must_use]
    pub fn capture_rng(&self) -> RngState {
        self.engine.capture_rng()
    }

    /// Restore an engine random-generator snapshot.
    pub fn restore_rng(&mut self, state: &RngState) {
        self.engine.restore_rng(state);
    }

    /// The running configuration set, including all merged updates.
    #[must_use]
    pub fn running_config(&self) -> &ConfigSet {
        &self.running
    }

    /// The bootstrap configuration set.
    #[must_use]
    pub fn bootstrap_config(&self) -> &ConfigSet {
        &self.bootstrap
    }

    /// Whether the session is still in bootstrap mode (no observe yet).
    #[must_use]
    pub fn is_bootstrap(&self) -> bool {
        self.use_bootstrap
    }

    /// The declared problem dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The declared number of blackbox outputs.
    #[must_use]
    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    /// The evaluation cache file this session appends to.
    #[must_use]
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Points suggested but not yet observed (advisory bookkeeping only —
    /// observe accepts any structurally valid points).
    #[must_use]
    pub fn pending(&self) -> &[Vec<f64>] {
        &self.pending
    }
}

/// A builder for constructing [`Session`] instances with a fluent API.
///
/// Collects the problem description and assembles the bootstrap and
/// running configuration sets the way the engine expects them: the
/// bootstrap set carries `LH_EVAL n` (latin-hypercube sampling), the
/// running set `MEGA_SEARCH_POLL yes`.
///
/// # Defaults
///
/// - Output types: one [`Objective`](OutputType::Objective)
/// - Cache file: `mads_cache.jsonl`, truncated at build (or copied from a
///   seed file via [`seed_cache`](SessionBuilder::seed_cache))
/// - Bootstrap sample count: `2 * dimension`
/// - Resample ceiling: [`DEFAULT_RESAMPLE_ATTEMPTS`]
/// - Engine: [`MeshSearchEngine`]
pub struct SessionBuilder {
    dimension: Option<usize>,
    lower: Option<Vec<f64>>,
    upper: Option<Vec<f64>>,
    output_types: Vec<OutputType>,
    cache_path: PathBuf,
    seed_cache: Option<PathBuf>,
    seed: Option<u64>,
    mega_search_poll: bool,
    lh_count: Option<usize>,
    resample_attempts: usize,
    extra: Vec<String>,
    engine: Option<Box<dyn Engine>>,
}

impl SessionBuilder {
    fn new() -> Self {
        Self {
            dimension: None,
            lower: None,
            upper: None,
            output_types: vec![OutputType::Objective],
            cache_path: PathBuf::from("mads_cache.jsonl"),
            seed_cache: None,
            seed: None,
            mega_search_poll: true,
            lh_count: None,
            resample_attempts: DEFAULT_RESAMPLE_ATTEMPTS,
            extra: Vec::new(),
            engine: None,
        }
    }

    /// Set the problem dimension (required).
    #[must_use]
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// Set per-coordinate lower bounds.
    #[must_use]
    pub fn lower_bound(mut self, lower: Vec<f64>) -> Self {
        self.lower = Some(lower);
        self
    }

    /// Set per-coordinate upper bounds.
    #[must_use]
    pub fn upper_bound(mut self, upper: Vec<f64>) -> Self {
        self.upper = Some(upper);
        self
    }

    /// Declare the blackbox output kinds, objective first.
    #[must_use]
    pub fn output_types(mut self, types: impl Into<Vec<OutputType>>) -> Self {
        self.output_types = types.into();
        self
    }

    /// Set the evaluation cache file path.
    #[must_use]
    pub fn cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Start from a copy of `seed` instead of an empty cache file.
    #[must_use]
    pub fn seed_cache(mut self, seed: impl Into<PathBuf>) -> Self {
        self.seed_cache = Some(seed.into());
        self
    }

    /// Seed the default engine's random generator.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Toggle the mega-search-poll strategy on the running set (default on).
    #[must_use]
    pub fn mega_search_poll(mut self, enabled: bool) -> Self {
        self.mega_search_poll = enabled;
        self
    }

    /// Number of latin-hypercube samples per bootstrap ask
    /// (default `2 * dimension`).
    #[must_use]
    pub fn bootstrap_samples(mut self, count: usize) -> Self {
        self.lh_count = Some(count);
        self
    }

    /// Ceiling on bootstrap re-asks when a suggest round returns fewer
    /// points than requested. Zero disables topping up entirely.
    #[must_use]
    pub fn resample_attempts(mut self, attempts: usize) -> Self {
        self.resample_attempts = attempts;
        self
    }

    /// Append a raw option line to both configuration sets.
    ///
    /// `LH_EVAL` and `MEGA_SEARCH_POLL` lines are routed to the set they
    /// belong to rather than applied to both, and a `CACHE_FILE` line is
    /// equivalent to [`cache_file`](SessionBuilder::cache_file).
    #[must_use]
    pub fn option(mut self, line: impl Into<String>) -> Self {
        self.extra.push(line.into());
        self
    }

    /// Use a custom engine instead of the bundled [`MeshSearchEngine`].
    #[must_use]
    pub fn engine(mut self, engine: impl Engine + 'static) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    /// Build the session, initializing the evaluation cache file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDimension`], [`Error::DimensionMismatch`]
    /// (bound arity), [`Error::InvalidBounds`], [`Error::Cache`] (cache
    /// initialization) or an option parse error.
    pub fn build(mut self) -> Result<Session> {
        let dimension = self.dimension.ok_or(Error::MissingDimension)?;
        if dimension == 0 {
            return Err(Error::MissingDimension);
        }
        for bound in [&self.lower, &self.upper] {
            if let Some(values) = bound {
                if values.len() != dimension {
                    return Err(Error::DimensionMismatch {
                        expected: dimension,
                        got: values.len(),
                        index: 0,
                    });
                }
            }
        }
        if let (Some(lower), Some(upper)) = (&self.lower, &self.upper) {
            for (&low, &high) in lower.iter().zip(upper) {
                if low > high {
                    return Err(Error::InvalidBounds { low, high });
                }
            }
        }

        // Extra option lines are routed before the cache file is touched:
        // the sampling knobs and the cache path steer construction itself,
        // everything else lands in the base set.
        let mut lh_count = self.lh_count.unwrap_or(2 * dimension);
        let mut mega_search_poll = self.mega_search_poll;
        let mut passthrough = Vec::new();
        for line in &self.extra {
            let option = crate::config::ConfigOption::parse(line)?;
            match option.key() {
                "LH_EVAL" => {
                    lh_count = option
                        .value()
                        .parse()
                        .map_err(|_| Error::MalformedOption(line.clone()))?;
                }
                "MEGA_SEARCH_POLL" => {
                    let mut probe = ConfigSet::new();
                    probe.push(line)?;
                    mega_search_poll = probe.flag("MEGA_SEARCH_POLL")?.unwrap_or(true);
                }
                "CACHE_FILE" => self.cache_path = PathBuf::from(option.value()),
                _ => passthrough.push(option),
            }
        }

        if let Some(seed_file) = &self.seed_cache {
            EvalCache::seeded_from(seed_file, &self.cache_path)?;
        } else {
            EvalCache::create(&self.cache_path)?;
        }

        let tags: Vec<&str> = self.output_types.iter().map(|t| t.tag()).collect();
        let mut base = ConfigSet::new();
        base.push(&format!("DIMENSION {dimension}"))?;
        if let Some(lower) = &self.lower {
            base.push(&format!("LOWER_BOUND ( {} )", join(lower)))?;
        }
        if let Some(upper) = &self.upper {
            base.push(&format!("UPPER_BOUND ( {} )", join(upper)))?;
        }
        base.push(&format!("BB_OUTPUT_TYPE {}", tags.join(" ")))?;
        base.push(&format!("CACHE_FILE {}", self.cache_path.display()))?;
        for option in passthrough {
            base.set(option.line())?;
        }

        let mut bootstrap = base.clone();
        bootstrap.set(&format!("LH_EVAL {lh_count}"))?;
        let mut running = base;
        if mega_search_poll {
            running.set("MEGA_SEARCH_POLL yes")?;
        }

        let engine: Box<dyn Engine> = match self.engine.take() {
            Some(engine) => engine,
            None => match self.seed {
                Some(seed) => Box::new(MeshSearchEngine::with_seed(seed)),
                None => Box::new(MeshSearchEngine::new()),
            },
        };

        let mut session = Session::from_parts(engine, running, bootstrap)?;
        session.resample_attempts = self.resample_attempts;
        Ok(session)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
