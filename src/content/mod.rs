//! Generated news content.
//!
//! - [`source`]: the [`ContentSource`] seam and its request/response types
//! - [`gemini`]: Gemini REST client with search grounding
//! - [`parse`]: tolerant JSON record extraction from model text
//! - [`links`]: deep-link matching against grounding references
//! - [`images`]: category illustrations
//! - [`editor`]: conversational Q&A over the current feed

pub mod editor;
pub mod gemini;
pub mod images;
pub mod links;
pub mod parse;
pub mod source;

pub use editor::{ChatRole, ChatTurn, EditorChat};
pub use gemini::GeminiSource;
pub use images::image_for_category;
pub use links::{best_link, resolve_link, search_link};
pub use parse::{parse_records, ParseOutcome, RawRecord};
pub use source::{ContentError, ContentRequest, ContentSource, SourceResponse, WebReference};
