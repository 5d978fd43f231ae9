use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::content::{
    image_for_category, parse_records, resolve_link, ContentRequest, ContentSource, RawRecord,
    WebReference,
};
use crate::feed::types::{Batch, FeedItem};

/// Label shown for items fetched in this session.
pub const PUBLISHED_LABEL: &str = "now";
pub const READ_TIME: &str = "1 min read";

const LIKE_SEED_MIN: u32 = 100;
const LIKE_SEED_SPAN: u32 = 500;

/// Disambiguates ids minted within the same millisecond.
static ITEM_SEQ: AtomicU64 = AtomicU64::new(0);

/// Turns one [`Batch`] into feed items through a [`ContentSource`].
///
/// `fetch` never fails. Source errors and unusable responses are logged and
/// yield an empty list; the caller decides what an empty batch means.
pub struct BatchFetcher {
    source: Arc<dyn ContentSource>,
    items_per_batch: usize,
    guidance: Vec<String>,
}

impl BatchFetcher {
    pub fn new(source: Arc<dyn ContentSource>, items_per_batch: usize) -> Self {
        Self {
            source,
            items_per_batch: items_per_batch.max(1),
            guidance: Vec::new(),
        }
    }

    /// Style constraints appended to every request (see
    /// [`UserPreferences::prompt_guidance`](crate::preferences::UserPreferences::prompt_guidance)).
    pub fn with_guidance(mut self, guidance: Vec<String>) -> Self {
        self.guidance = guidance;
        self
    }

    pub fn source_available(&self) -> bool {
        self.source.is_available()
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn items_per_batch(&self) -> usize {
        self.items_per_batch
    }

    /// Fetch up to `items_per_batch` items for `batch`.
    pub async fn fetch(&self, batch: &Batch) -> Vec<FeedItem> {
        let request = ContentRequest::new(batch.topics().to_vec(), self.items_per_batch)
            .with_guidance(self.guidance.clone());

        let response = match self.source.generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    source = self.source.name(),
                    topics = %batch.describe(),
                    error = %e,
                    "Content source request failed, batch yields no items"
                );
                return Vec::new();
            }
        };

        let outcome = parse_records(&response.text);
        if outcome.records.is_empty() {
            tracing::warn!(
                topics = %batch.describe(),
                text_len = response.text.len(),
                "Content response contained no usable records"
            );
            return Vec::new();
        }

        let fetched_at = Utc::now();
        let items: Vec<FeedItem> = outcome
            .records
            .into_iter()
            .take(self.items_per_batch)
            .map(|record| build_item(record, &response.references, fetched_at))
            .collect();

        tracing::debug!(
            topics = %batch.describe(),
            items = items.len(),
            repaired = outcome.repaired,
            "Batch fetched"
        );
        items
    }
}

/// Map a parsed record onto a display-ready item with a fresh id.
pub fn build_item(
    record: RawRecord,
    references: &[WebReference],
    fetched_at: DateTime<Utc>,
) -> FeedItem {
    let id = next_item_id(fetched_at);
    let source_link = resolve_link(&record.title, &record.publisher, references);
    FeedItem {
        like_count: like_seed(&id),
        image_ref: image_for_category(&record.category),
        source_link: Some(source_link),
        id,
        title: record.title,
        body: record.abstract_text,
        publisher_name: record.publisher,
        category: record.category,
        published_label: PUBLISHED_LABEL.to_string(),
        read_time: READ_TIME.to_string(),
        liked: false,
        saved: false,
        fetched_at,
    }
}

fn next_item_id(now: DateTime<Utc>) -> String {
    let seq = ITEM_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("live-{}-{}", now.timestamp_millis(), seq)
}

/// Initial like count in `100..600`, stable for a given id.
pub fn like_seed(id: &str) -> u32 {
    let hash = Sha256::digest(id.as_bytes());
    let n = u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]]);
    LIKE_SEED_MIN + n % LIKE_SEED_SPAN
}
