//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Link validation**: scheme/host checks for links taken from model output,
//!   plus homepage detection for deep-link resolution
//! - **Text processing**: match normalisation and Unicode-aware truncation
//!
//! # Examples
//!
//! ```
//! use bytes_feed::util::{normalize_words, truncate_to_width, validate_link};
//!
//! let url = validate_link("https://example.com/story").unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//!
//! assert_eq!(normalize_words("Breaking: News!"), "breaking news");
//! assert_eq!(truncate_to_width("Long article title", 10), "Long ar...");
//! ```

mod text;
mod url_validator;

pub use text::{display_width, normalize_words, strip_control_chars, truncate_to_width};
pub use url_validator::{
    is_deep_link, is_local_http, validate_deep_link, validate_link, LinkError,
};

/// Maximum accepted search term length for the client-side feed filter.
pub const MAX_SEARCH_TERM_LENGTH: usize = 256;
