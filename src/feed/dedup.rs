//! Session-wide duplicate suppression by title fingerprint.

use std::collections::HashSet;

use crate::feed::types::FeedItem;
use crate::util::normalize_words;

/// Characters of the normalised title that make up a fingerprint.
pub const FINGERPRINT_LEN: usize = 16;

/// Normalised content key used to spot the same story across batches.
///
/// Two items with equal fingerprints are duplicates regardless of their ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Case-folded, punctuation-insensitive prefix of the title. Items whose
    /// title normalises to nothing fall back to their id, so they are only
    /// ever duplicates of themselves.
    pub fn of(item: &FeedItem) -> Self {
        let normalized = normalize_words(&item.title);
        if normalized.is_empty() {
            return Self(format!("id:{}", item.id));
        }
        Self(normalized.chars().take(FINGERPRINT_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Registry of fingerprints admitted during one feed session.
///
/// Callers sharing a `Deduplicator` across tasks must serialise access
/// (the feed controller keeps it behind a mutex).
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<Fingerprint>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the subsequence of `items` whose fingerprints were not seen
    /// before, recording each admitted fingerprint.
    ///
    /// Duplicates inside `items` are handled too: the first occurrence wins.
    pub fn admit(&mut self, items: Vec<FeedItem>) -> Vec<FeedItem> {
        let before = items.len();
        let admitted: Vec<FeedItem> = items
            .into_iter()
            .filter(|item| self.seen.insert(Fingerprint::of(item)))
            .collect();

        let dropped = before - admitted.len();
        if dropped > 0 {
            tracing::debug!(
                admitted = admitted.len(),
                dropped = dropped,
                "Dropped duplicate feed items"
            );
        }
        admitted
    }

    pub fn contains(&self, item: &FeedItem) -> bool {
        self.seen.contains(&Fingerprint::of(item))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget every fingerprint (full feed reset).
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}
