use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// FeedItem
// ============================================================================

/// A single card in the feed.
///
/// `id` identifies the object for like/save updates. Content identity for
/// deduplication is the title fingerprint, not the id: two fetches of the
/// same story produce two different ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    /// Abstract / summary text.
    pub body: String,
    pub publisher_name: String,
    pub category: String,
    /// Display label such as "now" or "DEC 10".
    pub published_label: String,
    /// Display label such as "1 min read".
    pub read_time: String,
    /// Illustrative image URL resolved from `category`.
    pub image_ref: String,
    /// Resolved article link, or a news search URL when none matched.
    pub source_link: Option<String>,
    pub like_count: u32,
    pub liked: bool,
    pub saved: bool,
    pub fetched_at: DateTime<Utc>,
}

impl FeedItem {
    /// Flip `liked`, moving `like_count` with it.
    pub fn toggle_like(&mut self) {
        if self.liked {
            self.like_count = self.like_count.saturating_sub(1);
        } else {
            self.like_count = self.like_count.saturating_add(1);
        }
        self.liked = !self.liked;
    }

    pub fn toggle_save(&mut self) {
        self.saved = !self.saved;
    }

    /// Case-insensitive substring match against title, body and publisher.
    ///
    /// `needle` must already be lower-cased.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.body.to_lowercase().contains(needle)
            || self.publisher_name.to_lowercase().contains(needle)
    }
}

// ============================================================================
// Batch
// ============================================================================

/// An ordered group of topics submitted to the content source as one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Batch {
    topics: Vec<String>,
}

impl Batch {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Comma-joined topic list used in prompts and log lines.
    pub fn describe(&self) -> String {
        self.topics.join(", ")
    }
}

#[cfg(test)]
pub(crate) fn test_item(id: &str, title: &str) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        title: title.to_string(),
        body: format!("Summary of {}", title),
        publisher_name: "Test Wire".to_string(),
        category: "World".to_string(),
        published_label: "now".to_string(),
        read_time: "1 min read".to_string(),
        image_ref: "https://images.example.com/x".to_string(),
        source_link: None,
        like_count: 10,
        liked: false,
        saved: false,
        fetched_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_like_round_trip() {
        let mut item = test_item("a", "Title");
        item.toggle_like();
        assert!(item.liked);
        assert_eq!(item.like_count, 11);
        item.toggle_like();
        assert!(!item.liked);
        assert_eq!(item.like_count, 10);
    }

    #[test]
    fn test_unlike_at_zero_saturates() {
        let mut item = test_item("a", "Title");
        item.like_count = 0;
        item.liked = true;
        item.toggle_like();
        assert_eq!(item.like_count, 0);
        assert!(!item.liked);
    }

    #[test]
    fn test_toggle_save() {
        let mut item = test_item("a", "Title");
        item.toggle_save();
        assert!(item.saved);
        item.toggle_save();
        assert!(!item.saved);
    }

    #[test]
    fn test_matches_lowercase() {
        let item = test_item("a", "Fusion Reactor Breakthrough");
        assert!(item.matches_lowercase("fusion"));
        assert!(item.matches_lowercase("test wire"));
        assert!(item.matches_lowercase("summary of"));
        assert!(!item.matches_lowercase("crypto"));
    }

    #[test]
    fn test_batch_describe() {
        let batch = Batch::new(["Breaking News", "Custom: SpaceX"]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.describe(), "Breaking News, Custom: SpaceX");
    }
}
