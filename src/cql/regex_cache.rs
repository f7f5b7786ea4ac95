//! Process-wide cache of compiled regular expressions.

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use regex::Regex;

static SHARED: LazyLock<RegexCache> = LazyLock::new(RegexCache::new);

/// The cache used by the evaluator.
pub fn shared() -> &'static RegexCache {
    &SHARED
}

/// Thread-safe map from pattern text to its compiled form.
///
/// Each distinct pattern is compiled at most once; compile failures are
/// cached as well so a bad pattern is not recompiled on every match.
#[derive(Debug, Default)]
pub struct RegexCache {
    entries: DashMap<String, Result<Arc<Regex>, regex::Error>>,
}

impl RegexCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Get the compiled pattern, compiling it on first use.
    pub fn compile(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        if let Some(entry) = self.entries.get(pattern) {
            return entry.value().clone();
        }

        // entry() holds the shard lock, so racing callers compile once
        self.entries
            .entry(pattern.to_string())
            .or_insert_with(|| {
                tracing::debug!(pattern, "compiling regular expression");
                Regex::new(pattern).map(Arc::new)
            })
            .value()
            .clone()
    }

    /// Number of distinct patterns seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
