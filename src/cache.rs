//! File-backed evaluation cache.
//!
//! Every evaluated point and its blackbox outputs land in an append-only
//! JSONL file shared by all suggest/observe rounds of a session, and by any
//! other session pointed at the same file. Entries are never rewritten;
//! reinitializing a session either truncates the file or copies a seed file.
//!
//! Writes take an exclusive file lock and reads a shared one, so concurrent
//! processes do not interleave partial lines. Serializing whole sessions
//! against each other remains the caller's job.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One evaluated point: its coordinates and the blackbox outputs
/// (objective first, constraint values after).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The candidate point's coordinates.
    pub point: Vec<f64>,
    /// The evaluation outputs, objective value first.
    pub outputs: Vec<f64>,
}

impl CacheEntry {
    /// Create an entry from a point and its outputs.
    #[must_use]
    pub fn new(point: Vec<f64>, outputs: Vec<f64>) -> Self {
        Self { point, outputs }
    }

    /// The objective value (first output), if any outputs were recorded.
    #[must_use]
    pub fn objective(&self) -> Option<f64> {
        self.outputs.first().copied()
    }

    /// Aggregate constraint violation: the sum of squared positive
    /// constraint values. Zero means feasible.
    #[must_use]
    pub fn violation(&self) -> f64 {
        self.outputs[1.min(self.outputs.len())..]
            .iter()
            .map(|&c| c.max(0.0).powi(2))
            .sum()
    }

    /// Whether every constraint output is satisfied (`<= 0`).
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.violation() == 0.0
    }
}

/// Coordinate tolerance used when checking whether a point is already cached.
pub const POINT_TOLERANCE: f64 = 1e-12;

/// Append-only store of evaluated points, mirrored in memory and persisted
/// as one JSON object per line.
///
/// # Examples
///
/// ```no_run
/// use mads_driver::cache::{CacheEntry, EvalCache};
///
/// let cache = EvalCache::open("cache.jsonl")?;
/// cache.append(&[CacheEntry::new(vec![0.5, 0.0, 0.5], vec![-1.0])])?;
/// # Ok::<(), mads_driver::Error>(())
/// ```
pub struct EvalCache {
    entries: Arc<RwLock<Vec<CacheEntry>>>,
    path: PathBuf,
    /// Serialise in-process writes so the file lock is held briefly.
    write_lock: Mutex<()>,
}

impl EvalCache {
    /// Open a cache file, loading any existing entries.
    ///
    /// A missing file yields an empty cache; the file is created on the
    /// first append.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] if the file exists but cannot be read or
    /// parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = load_entries(&path)?;
        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Create a fresh, empty cache file, truncating any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::create(&path).map_err(|e| Error::Cache(e.to_string()))?;
        Ok(Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Copy `seed` over `path` and open the result.
    ///
    /// This is how a session starts from a pre-seeded evaluation history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] if the copy or the subsequent load fails.
    pub fn seeded_from(seed: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<Self> {
        std::fs::copy(seed.as_ref(), path.as_ref()).map_err(|e| Error::Cache(e.to_string()))?;
        Self::open(path)
    }

    /// The path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append entries to the file and the in-memory mirror.
    ///
    /// Existing entries are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] if the file cannot be written. The
    /// in-memory mirror is only updated after a successful write.
    pub fn append(&self, entries: &[CacheEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::Cache(e.to_string()))?;
        file.lock_exclusive()
            .map_err(|e| Error::Cache(e.to_string()))?;

        let mut buffer = String::new();
        for entry in entries {
            let line =
                serde_json::to_string(entry).map_err(|e| Error::Cache(e.to_string()))?;
            buffer.push_str(&line);
            buffer.push('\n');
        }
        let write_result = file
            .write_all(buffer.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| Error::Cache(e.to_string()));
        let _ = file.unlock();
        write_result?;

        self.entries.write().extend_from_slice(entries);
        Ok(())
    }

    /// The number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// A snapshot of all entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.entries.read().clone()
    }

    /// Whether `point` is already cached, coordinate-wise within
    /// [`POINT_TOLERANCE`].
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        self.entries.read().iter().any(|entry| {
            entry.point.len() == point.len()
                && entry
                    .point
                    .iter()
                    .zip(point)
                    .all(|(a, b)| (a - b).abs() <= POINT_TOLERANCE)
        })
    }

    /// The incumbent: the best cached entry under feasible-first ranking.
    ///
    /// Feasible entries beat infeasible ones; among feasible entries the
    /// lowest objective wins; among infeasible entries the lowest aggregate
    /// violation wins.
    #[must_use]
    pub fn best(&self) -> Option<CacheEntry> {
        let entries = self.entries.read();
        entries
            .iter()
            .filter(|e| e.objective().is_some())
            .min_by(|a, b| compare_entries(a, b))
            .cloned()
    }
}

/// Feasible-first ordering: `Less` means "better".
pub(crate) fn compare_entries(a: &CacheEntry, b: &CacheEntry) -> core::cmp::Ordering {
    use core::cmp::Ordering;

    match (a.is_feasible(), b.is_feasible()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a
            .violation()
            .partial_cmp(&b.violation())
            .unwrap_or(Ordering::Equal),
        (true, true) => a
            .objective()
            .partial_cmp(&b.objective())
            .unwrap_or(Ordering::Equal),
    }
}

/// Read all entries from a JSONL cache file. A missing file is an empty
/// cache, not an error.
fn load_entries(path: &Path) -> Result<Vec<CacheEntry>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Cache(e.to_string())),
    };

    file.lock_shared().map_err(|e| Error::Cache(e.to_string()))?;

    let reader = BufReader::new(&file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| Error::Cache(e.to_string()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: CacheEntry =
            serde_json::from_str(line).map_err(|e| Error::Cache(e.to_string()))?;
        entries.push(entry);
    }

    let _ = file.unlock();
    Ok(entries)
}
