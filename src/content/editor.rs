//! Conversational "ask the editor" over the current feed.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::content::gemini::GeminiSource;
use crate::content::source::ContentSource;
use crate::feed::FeedItem;

/// Reply when the content source has no credentials.
pub const MISSING_API_KEY_REPLY: &str = "Missing API key.";

/// Reply for any other failure.
pub const SERVICE_UNAVAILABLE_REPLY: &str = "Service unavailable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_api_role(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// System instruction listing the stories the reader can currently see.
pub fn system_instruction(items: &[FeedItem]) -> String {
    let mut wire = String::new();
    for item in items {
        let _ = writeln!(
            wire,
            "- \"{}\" ({}). Section: {}. Lead: {}",
            item.title, item.published_label, item.category, item.body
        );
    }
    if wire.is_empty() {
        wire.push_str("- (no stories loaded yet)\n");
    }

    format!(
        "You are the duty editor for \"Bytes\", a fast news briefing.\n\
         Your tone is clear, neutral, and concise.\n\n\
         Here is the current news wire:\n{wire}\n\
         Answer questions about these stories, the events behind them, and \
         what to watch next."
    )
}

/// A running conversation with the editor.
///
/// Only exchanges that got a real reply are kept in the history.
pub struct EditorChat {
    source: Arc<GeminiSource>,
    history: Vec<ChatTurn>,
}

impl EditorChat {
    pub fn new(source: Arc<GeminiSource>) -> Self {
        Self {
            source,
            history: Vec::new(),
        }
    }

    /// Ask a question about `items`. Never fails: errors become a fixed reply.
    pub async fn ask(&mut self, items: &[FeedItem], question: &str) -> String {
        if !self.source.is_available() {
            return MISSING_API_KEY_REPLY.to_string();
        }

        let system = system_instruction(items);
        match self.source.chat(&system, &self.history, question).await {
            Ok(reply) => {
                self.history.push(ChatTurn::user(question));
                self.history.push(ChatTurn::model(reply.clone()));
                reply
            }
            Err(e) => {
                tracing::warn!(error = %e, "Editor chat request failed");
                SERVICE_UNAVAILABLE_REPLY.to_string()
            }
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
