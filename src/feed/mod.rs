//! Feed assembly pipeline.
//!
//! Merges several asynchronous, unordered, possibly failing topic-batch
//! fetches into one ordered, duplicate-free feed:
//!
//! - [`planner`] - deterministic topic to batch partitioning
//! - [`fetcher`] - one batch in, feed items out; failures become empty lists
//! - [`dedup`] - session-wide title fingerprint registry
//! - [`buckets`] - per-batch storage flattened in index order
//! - [`controller`] - the state machine tying them together
//! - [`fallback`] - bundled cards for when the content source is down
//!
//! # Example
//!
//! ```ignore
//! let controller = FeedController::new(fetcher, TopicPlanner::default(), FeedOptions::default());
//! controller.set_topics(vec!["AI & Tech".into(), "Custom: SpaceX".into()]);
//!
//! // Batch 0 is on screen when this returns; the rest stream in.
//! controller.start(true).await;
//! controller.wait_idle().await;
//! let cards = controller.feed();
//! ```

pub mod buckets;
pub mod controller;
pub mod dedup;
pub mod fallback;
pub mod fetcher;
pub mod planner;
pub mod types;

pub use buckets::BucketStore;
pub use controller::{
    FeedController, FeedEvent, FeedOptions, FeedStatus, LoadMoreOutcome, StartOutcome,
};
pub use dedup::{Deduplicator, Fingerprint};
pub use fallback::bundled_items;
pub use fetcher::BatchFetcher;
pub use planner::{is_custom_topic, TopicPlanner, CUSTOM_PREFIX, KNOWN_TOPICS};
pub use types::{Batch, FeedItem};
