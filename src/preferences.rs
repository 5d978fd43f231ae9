//! Onboarding result: the reader's topics and style preferences.
//!
//! Stored as one JSON document under a fixed key in the `user_preferences`
//! table. An absent key means onboarding has not been completed.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::Database;

/// Key the serialized [`UserPreferences`] live under.
pub const PREFERENCES_KEY: &str = "bytes_prefs";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Preference storage failed: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("Stored preferences are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// Style enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadingDensity {
    #[serde(rename = "Ultra quick")]
    UltraQuick,
    #[default]
    #[serde(rename = "Brief summaries")]
    BriefSummaries,
    #[serde(rename = "Deep dives")]
    DeepDives,
}

impl ReadingDensity {
    pub fn label(self) -> &'static str {
        match self {
            ReadingDensity::UltraQuick => "Ultra quick",
            ReadingDensity::BriefSummaries => "Brief summaries",
            ReadingDensity::DeepDives => "Deep dives",
        }
    }

    fn guidance(self) -> &'static str {
        match self {
            ReadingDensity::UltraQuick => "Keep each abstract to one short sentence.",
            ReadingDensity::BriefSummaries => "Keep each abstract under 30 words.",
            ReadingDensity::DeepDives => "Give each abstract the key context in up to 60 words.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    #[serde(rename = "Straight facts")]
    StraightFacts,
    #[serde(rename = "More explanation")]
    MoreExplanation,
    #[serde(rename = "Context & opinion")]
    ContextAndOpinion,
}

impl Tone {
    pub fn label(self) -> &'static str {
        match self {
            Tone::StraightFacts => "Straight facts",
            Tone::MoreExplanation => "More explanation",
            Tone::ContextAndOpinion => "Context & opinion",
        }
    }

    fn guidance(self) -> &'static str {
        match self {
            Tone::StraightFacts => "State facts only, without commentary.",
            Tone::MoreExplanation => "Briefly explain why each story matters.",
            Tone::ContextAndOpinion => "Include background context and clearly labelled analysis.",
        }
    }
}

/// Parses the labels above as well as kebab-case forms (`ultra-quick`).
fn normalize_choice(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace('&', "and")
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

impl FromStr for ReadingDensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_choice(s).as_str() {
            "ultra-quick" => Ok(ReadingDensity::UltraQuick),
            "brief-summaries" | "brief" => Ok(ReadingDensity::BriefSummaries),
            "deep-dives" | "deep" => Ok(ReadingDensity::DeepDives),
            _ => Err(format!(
                "unknown reading density '{s}' (expected ultra-quick, brief-summaries or deep-dives)"
            )),
        }
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_choice(s).as_str() {
            "straight-facts" | "facts" => Ok(Tone::StraightFacts),
            "more-explanation" | "explain" => Ok(Tone::MoreExplanation),
            "context-and-opinion" | "context" => Ok(Tone::ContextAndOpinion),
            _ => Err(format!(
                "unknown tone '{s}' (expected straight-facts, more-explanation or context-and-opinion)"
            )),
        }
    }
}

impl fmt::Display for ReadingDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Content constraints
// ============================================================================

/// Named content filters chosen during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentConstraints {
    pub no_clickbait: bool,
    pub fewer_celebrity: bool,
    pub expert_sources: bool,
    pub safe_mode: bool,
}

impl Default for ContentConstraints {
    /// Onboarding defaults.
    fn default() -> Self {
        Self {
            no_clickbait: true,
            fewer_celebrity: false,
            expert_sources: true,
            safe_mode: false,
        }
    }
}

impl ContentConstraints {
    /// Flag names accepted by [`set`](Self::set).
    pub const NAMES: &'static [&'static str] =
        &["no-clickbait", "fewer-celebrity", "expert-sources", "safe-mode"];

    /// Set a flag by name. Returns false for an unknown name.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        let flag = match normalize_choice(name).as_str() {
            "no-clickbait" => &mut self.no_clickbait,
            "fewer-celebrity" => &mut self.fewer_celebrity,
            "expert-sources" => &mut self.expert_sources,
            "safe-mode" => &mut self.safe_mode,
            _ => return false,
        };
        *flag = value;
        true
    }

    fn guidance(&self) -> Vec<&'static str> {
        let mut lines = Vec::new();
        if self.no_clickbait {
            lines.push("Write plain, non-sensational headlines.");
        }
        if self.fewer_celebrity {
            lines.push("Avoid celebrity gossip.");
        }
        if self.expert_sources {
            lines.push("Prefer established outlets and expert sources.");
        }
        if self.safe_mode {
            lines.push("Exclude graphic or disturbing content.");
        }
        lines
    }
}

// ============================================================================
// UserPreferences
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Selected topics in the order they were added.
    pub topics: Vec<String>,
    #[serde(rename = "userName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "readingStyle")]
    pub reading_density: ReadingDensity,
    pub tone: Tone,
    #[serde(rename = "constraints")]
    pub content_constraints: ContentConstraints,
}

impl UserPreferences {
    /// Preferences with onboarding defaults and `topics` (duplicates dropped).
    pub fn with_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefs = Self::default();
        for topic in topics {
            prefs.add_topic(topic.as_ref());
        }
        prefs
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        let topic = topic.trim();
        self.topics.iter().any(|t| t.eq_ignore_ascii_case(topic))
    }

    /// Add `topic` unless it is blank or already present (ignoring case).
    /// Returns true if it was added.
    pub fn add_topic(&mut self, topic: &str) -> bool {
        let topic = topic.trim();
        if topic.is_empty() || self.has_topic(topic) {
            return false;
        }
        self.topics.push(topic.to_string());
        true
    }

    /// Add `topic` if absent, otherwise remove it. Returns true if the topic
    /// is selected afterwards.
    pub fn toggle_topic(&mut self, topic: &str) -> bool {
        let trimmed = topic.trim();
        if trimmed.is_empty() {
            return false;
        }
        if self.has_topic(trimmed) {
            self.topics.retain(|t| !t.eq_ignore_ascii_case(trimmed));
            false
        } else {
            self.topics.push(trimmed.to_string());
            true
        }
    }

    /// Natural-language constraints appended to content requests.
    pub fn prompt_guidance(&self) -> Vec<String> {
        let mut lines = vec![
            self.reading_density.guidance().to_string(),
            self.tone.guidance().to_string(),
        ];
        lines.extend(
            self.content_constraints
                .guidance()
                .into_iter()
                .map(str::to_string),
        );
        lines
    }
}

// ============================================================================
// PreferenceStore
// ============================================================================

/// Loads and saves [`UserPreferences`] through the key-value table.
#[derive(Clone)]
pub struct PreferenceStore {
    db: Database,
}

impl PreferenceStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stored preferences, or `None` on first run.
    pub async fn load(&self) -> Result<Option<UserPreferences>, PreferenceError> {
        match self.db.get_preference(PREFERENCES_KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, prefs: &UserPreferences) -> Result<(), PreferenceError> {
        let json = serde_json::to_string(prefs)?;
        self.db.set_preference(PREFERENCES_KEY, &json).await?;
        tracing::debug!(topics = prefs.topics.len(), "Preferences saved");
        Ok(())
    }

    /// Toggle a topic on the stored preferences (defaults on first run) and
    /// persist the result.
    pub async fn toggle_topic(&self, topic: &str) -> Result<UserPreferences, PreferenceError> {
        let mut prefs = self.load().await?.unwrap_or_default();
        let selected = prefs.toggle_topic(topic);
        self.save(&prefs).await?;
        tracing::info!(topic = %topic.trim(), selected = selected, "Topic toggled");
        Ok(prefs)
    }

    /// Forget the onboarding result. Returns true if anything was stored.
    pub async fn clear(&self) -> Result<bool, PreferenceError> {
        Ok(self.db.delete_preference(PREFERENCES_KEY).await?)
    }
}
