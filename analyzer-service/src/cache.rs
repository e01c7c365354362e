//! Memoization of completed analyses.
//!
//! Keyed by a content fingerprint (filename plus SHA-256 of the bytes), with
//! a mandatory byte comparison on lookup so a hash collision can never
//! produce a false hit. Entries live for the process lifetime; there is no
//! eviction. Concurrent identical uploads both run the pipeline and both
//! store, last write wins.

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::models::AnalysisResult;

/// Compute the cache key for a submission: the declared filename plus the
/// SHA-256 hex digest of the exact byte content.
pub fn fingerprint(filename: &str, content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}:{:x}", filename, hasher.finalize())
}

struct CacheEntry {
    content: Vec<u8>,
    result: AnalysisResult,
}

/// In-memory result cache shared across jobs.
#[derive(Default)]
pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the cached result for `fingerprint` only when the stored bytes
    /// are identical to `content`.
    pub fn lookup(&self, fingerprint: &str, content: &[u8]) -> Option<AnalysisResult> {
        self.entries.get(fingerprint).and_then(|entry| {
            if entry.content == content {
                Some(entry.result.clone())
            } else {
                None
            }
        })
    }

    pub fn store(&self, fingerprint: String, content: Vec<u8>, result: AnalysisResult) {
        self.entries
            .insert(fingerprint, CacheEntry { content, result });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
