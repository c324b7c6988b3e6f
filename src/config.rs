//! Textual configuration sets and the merge-by-key policy.
//!
//! A configuration set is an ordered list of option lines of the form
//! `"KEY value..."`, the same surface the underlying direct-search engine
//! consumes. Keys are case-insensitive (compared by uppercased first token)
//! and unique within a set. Order is preserved for display; lookup goes
//! through a key index.
//!
//! ```
//! use mads_driver::ConfigSet;
//!
//! let mut running = ConfigSet::parse(["DIMENSION 3", "MEGA_SEARCH_POLL yes"]).unwrap();
//! let updates = ConfigSet::parse(["mega_search_poll no", "FRAME_SIZE ( 1 1 1 )"]).unwrap();
//!
//! running.merge(&updates);
//! assert_eq!(running.get("MEGA_SEARCH_POLL"), Some("no"));
//! assert_eq!(running.get("FRAME_SIZE"), Some("( 1 1 1 )"));
//! ```

use std::collections::HashMap;

use crate::error::{Error, Result};

/// A single configuration directive: an uppercased key plus the original line.
///
/// The key is the first whitespace-delimited token of the line, uppercased.
/// The rest of the line is the value and keeps its original spelling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigOption {
    key: String,
    line: String,
}

impl ConfigOption {
    /// Parse one `"KEY value..."` line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOption`] if the line contains no key token.
    pub fn parse(line: &str) -> Result<Self> {
        let trimmed = line.trim();
        let key = trimmed
            .split_whitespace()
            .next()
            .ok_or_else(|| Error::MalformedOption(line.to_string()))?;
        Ok(Self {
            key: key.to_uppercase(),
            line: trimmed.to_string(),
        })
    }

    /// The uppercased key token.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value portion of the line (everything after the key token).
    ///
    /// The line is re-split rather than sliced by the key's length: the
    /// uppercased key may occupy a different number of bytes than the
    /// original token.
    #[must_use]
    pub fn value(&self) -> &str {
        self.line
            .split_once(char::is_whitespace)
            .map_or("", |(_, rest)| rest.trim_start())
    }

    /// The full option line as originally written.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }
}

impl core::fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.line)
    }
}

/// An ordered collection of [`ConfigOption`]s with unique uppercased keys.
///
/// Lookup is O(1) via an internal key index; insertion order is preserved
/// for unmatched keys so the set displays the way it was written.
#[derive(Clone, Debug, Default)]
pub struct ConfigSet {
    options: Vec<ConfigOption>,
    index: HashMap<String, usize>,
}

impl ConfigSet {
    /// Create an empty configuration set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a sequence of option lines into a configuration set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOption`] for a line without a key token and
    /// [`Error::DuplicateOption`] if two lines share an uppercased key.
    /// Nothing is kept on error.
    pub fn parse<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for line in lines {
            set.push(line.as_ref())?;
        }
        Ok(set)
    }

    /// Append one option line, rejecting duplicate keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOption`] or [`Error::DuplicateOption`].
    pub fn push(&mut self, line: &str) -> Result<()> {
        let option = ConfigOption::parse(line)?;
        if self.index.contains_key(option.key()) {
            return Err(Error::DuplicateOption(option.key.clone()));
        }
        self.index.insert(option.key.clone(), self.options.len());
        self.options.push(option);
        Ok(())
    }

    /// Insert or replace one option line (single-option merge).
    ///
    /// On a key match the existing option is replaced in place, preserving
    /// its position; otherwise the option is appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOption`] if the line has no key token; the
    /// set is not modified in that case.
    pub fn set(&mut self, line: &str) -> Result<()> {
        let option = ConfigOption::parse(line)?;
        self.upsert(option);
        Ok(())
    }

    /// Merge `updates` into this set by matching uppercased keys.
    ///
    /// For each update option: replace the matching option in place
    /// (position preserved) or append it if its key is new. No option is
    /// ever deleted, and merging the same updates twice is a no-op the
    /// second time.
    ///
    /// Malformed lines cannot reach this point: both sets validated their
    /// options at construction, so the merge never partially applies.
    pub fn merge(&mut self, updates: &ConfigSet) {
        for option in &updates.options {
            self.upsert(option.clone());
        }
    }

    fn upsert(&mut self, option: ConfigOption) {
        if let Some(&pos) = self.index.get(option.key()) {
            self.options[pos] = option;
        } else {
            self.index.insert(option.key.clone(), self.options.len());
            self.options.push(option);
        }
    }

    /// Look up the value for `key` (case-insensitive).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(&key.to_uppercase())
            .map(|&pos| self.options[pos].value())
    }

    /// Whether an option with `key` is present (case-insensitive).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(&key.to_uppercase())
    }

    /// The number of options in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Whether the set contains no options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Iterate over the options in insertion order.
    pub fn iter(&self) -> core::slice::Iter<'_, ConfigOption> {
        self.options.iter()
    }

    /// Iterate over the raw option lines in insertion order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(ConfigOption::line)
    }

    /// Parse the value of `key` as a `usize`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOption`] if the value is present but not an
    /// unsigned integer.
    pub fn usize_value(&self, key: &str) -> Result<Option<usize>> {
        self.parsed_value(key, str::parse)
    }

    /// Parse the value of `key` as an `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOption`] if the value is present but not a
    /// number.
    pub fn f64_value(&self, key: &str) -> Result<Option<f64>> {
        self.parsed_value(key, str::parse)
    }

    /// Parse the value of `key` as a yes/no flag.
    ///
    /// Accepts `yes`/`no`, `true`/`false` and `1`/`0`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOption`] for any other value.
    pub fn flag(&self, key: &str) -> Result<Option<bool>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.to_lowercase().as_str() {
            "yes" | "true" | "1" => Ok(Some(true)),
            "no" | "false" | "0" => Ok(Some(false)),
            _ => Err(Error::MalformedOption(format!("{key} {value}"))),
        }
    }

    /// Parse the value of `key` as a vector of `dim` numbers.
    ///
    /// Two spellings are accepted: an explicit vector `( a b c )` with
    /// exactly `dim` entries, or a scalar broadcast `* s` that repeats `s`
    /// across all `dim` coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOption`] for any other spelling and
    /// [`Error::DimensionMismatch`] when an explicit vector has the wrong
    /// number of entries.
    pub fn vector(&self, key: &str, dim: usize) -> Result<Option<Vec<f64>>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let malformed = || Error::MalformedOption(format!("{key} {value}"));

        let tokens: Vec<&str> = value.split_whitespace().collect();
        if let ["*", scalar] = tokens.as_slice() {
            let s: f64 = scalar.parse().map_err(|_| malformed())?;
            return Ok(Some(vec![s; dim]));
        }
        if tokens.first() != Some(&"(") || tokens.last() != Some(&")") {
            return Err(malformed());
        }
        let entries = &tokens[1..tokens.len() - 1];
        if entries.len() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                got: entries.len(),
                index: 0,
            });
        }
        entries
            .iter()
            .map(|t| t.parse().map_err(|_| malformed()))
            .collect::<Result<Vec<f64>>>()
            .map(Some)
    }

    fn parsed_value<T, E>(
        &self,
        key: &str,
        parse: impl Fn(&str) -> core::result::Result<T, E>,
    ) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => parse(value)
                .map(Some)
                .map_err(|_| Error::MalformedOption(format!("{key} {value}"))),
        }
    }
}

impl core::fmt::Display for ConfigSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, option) in self.options.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{option}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ConfigSet {
    type Item = &'a ConfigOption;
    type IntoIter = core::slice::Iter<'a, ConfigOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.iter()
    }
}
