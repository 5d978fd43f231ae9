//! Topic-driven news feed assembled from generated "bytes".
//!
//! The pipeline turns a reader's topic selection into an ordered,
//! duplicate-free feed that streams in batch by batch:
//!
//! - [`feed`]: planner, batch fetcher, deduplicator, bucket store, controller
//! - [`content`]: content source seam, Gemini client, parsing and link matching
//! - [`preferences`]: onboarding result and its persistence
//! - [`storage`]: SQLite key-value store
//! - [`config`]: TOML configuration
//! - [`util`]: link validation and text helpers

pub mod config;
pub mod content;
pub mod feed;
pub mod preferences;
pub mod storage;
pub mod util;

pub use config::Config;
pub use feed::{FeedController, FeedItem, FeedStatus};
pub use preferences::{PreferenceStore, UserPreferences};
