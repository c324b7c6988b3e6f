#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Ask/observe session layer for driving a mesh-adaptive direct-search
//! (MADS-style) blackbox optimizer. The caller asks for candidate points
//! ([`Session::suggest`]), evaluates them however it likes, reports the
//! results back ([`Session::observe`]) and the session keeps the
//! optimizer's state — running configuration, frame sizes, evaluation
//! cache, RNG — evolving correctly between calls.
//!
//! # Getting Started
//!
//! Drive a session by hand:
//!
//! ```no_run
//! use mads_driver::{Session, Error};
//!
//! let mut session = Session::builder()
//!     .dimension(3)
//!     .lower_bound(vec![-1.0; 3])
//!     .upper_bound(vec![1.0; 3])
//!     .cache_file("cache.jsonl")
//!     .seed(42)
//!     .build()?;
//!
//! for _ in 0..10 {
//!     let points = session.suggest(4)?;
//!     if points.is_empty() {
//!         break;
//!     }
//!     // Evaluate the batch (workers, processes, ... — your call).
//!     let results: Vec<Vec<f64>> = points
//!         .iter()
//!         .map(|x| vec![x.iter().map(|v| v * v).sum()])
//!         .collect();
//!     session.observe(&points, &results)?;
//! }
//! # Ok::<(), Error>(())
//! ```
//!
//! Or let [`optimize`] run the whole loop to a stop condition.
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Session`] | The ask/observe loop: configuration selection, bootstrap fallback, merge of engine updates. |
//! | [`ConfigSet`] | Ordered, key-unique option lines (`"DIMENSION 3"`, ...) with last-writer-wins merge. |
//! | [`EvalCache`](cache::EvalCache) | Append-only, file-backed store of every evaluated point. |
//! | [`Engine`] | The underlying direct-search procedure, driven through ask/tell. |
//! | [`Evaluator`] | Your blackbox: point in, outputs (objective, constraints) out. |
//! | [`RngState`] | Opaque engine RNG snapshot making suggest exactly replayable. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at suggest/observe/round boundaries | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod cache;
mod config;
mod driver;
pub mod engine;
mod error;
mod evaluator;
mod session;
mod types;

pub use config::{ConfigOption, ConfigSet};
pub use driver::{OptimizationResult, RunOptions, optimize, run};
pub use engine::{Engine, MeshSearchEngine, RngState};
pub use error::{Error, Result};
pub use evaluator::Evaluator;
pub use session::{DEFAULT_RESAMPLE_ATTEMPTS, Session, SessionBuilder, SessionState};
pub use types::{OutputType, StopReason};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use mads_driver::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::{CacheEntry, EvalCache};
    pub use crate::config::{ConfigOption, ConfigSet};
    pub use crate::driver::{OptimizationResult, RunOptions, optimize, run};
    pub use crate::engine::{Engine, MeshSearchEngine, RngState};
    pub use crate::error::{Error, Result};
    pub use crate::evaluator::Evaluator;
    pub use crate::session::{Session, SessionBuilder, SessionState};
    pub use crate::types::{OutputType, StopReason};
}
