//! The optimizer engine seam.
//!
//! The session controller drives an [`Engine`] through the two-call
//! ask/tell protocol and never looks inside it: candidate generation, mesh
//! refinement and cache bookkeeping are the engine's business. The crate
//! bundles [`MeshSearchEngine`], a compact frame-adaptive direct-search
//! engine, and any collaborator implementing the trait can be swapped in
//! via [`SessionBuilder::engine`](crate::SessionBuilder::engine).

mod mesh;

use std::path::Path;

pub use mesh::MeshSearchEngine;
use serde::{Deserialize, Serialize};

use crate::config::ConfigSet;
use crate::error::Result;

/// An opaque snapshot of an engine's random-generator state.
///
/// The payload is owned by the engine that produced it; the session treats
/// it as an immutable token to persist and hand back. Restoring a state
/// makes the next ask produce the exact batch that followed the original
/// capture, given an identical configuration set and cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState(u64);

impl RngState {
    /// Wrap a raw engine-owned payload.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw payload, for engines restoring their generator from it.
    #[must_use]
    pub fn to_raw(&self) -> u64 {
        self.0
    }
}

/// A stateful direct-search procedure driven through ask/tell calls.
///
/// Within one session, calls are strictly sequential: the engine's random
/// generator and the cache file are mutated in place, so no two invocations
/// may be in flight at once.
pub trait Engine: Send {
    /// Propose candidate points for the given configuration set.
    ///
    /// Returning fewer points than the caller hoped for, or none at all,
    /// is legal: the engine may have nothing further to propose under this
    /// configuration. The session falls back to bootstrap resampling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`](crate::Error::Engine) for an invalid
    /// configuration or an internal failure.
    fn ask(&mut self, config: &ConfigSet) -> Result<Vec<Vec<f64>>>;

    /// Record evaluated points and derive updated search-progress options.
    ///
    /// The engine appends the `(point, result)` pairs to the cache file at
    /// `cache_path` and returns a configuration set carrying revised
    /// parameters (typically step-size bounds) for the session to merge
    /// into its running set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`](crate::Error::Engine) or
    /// [`Error::Cache`](crate::Error::Cache); the caller's state must be
    /// left as it was before the call.
    fn tell(
        &mut self,
        config: &ConfigSet,
        points: &[Vec<f64>],
        results: &[Vec<f64>],
        cache_path: &Path,
    ) -> Result<ConfigSet>;

    /// Snapshot the engine's random-generator state.
    fn capture_rng(&self) -> RngState;

    /// Restore a previously captured random-generator state.
    fn restore_rng(&mut self, state: &RngState);
}
