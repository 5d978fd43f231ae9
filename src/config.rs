//! Configuration file parser for ~/.config/bytes/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde, though we log a warning when the file
//! contains potential typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Environment variables consulted for the content source key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The `Debug` impl masks `api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generative model name used for both feed generation and editor chat.
    pub model: String,

    /// Override for the API origin (tests point this at a local mock server).
    pub api_base_url: Option<String>,

    /// API key (alternative to the GEMINI_API_KEY / API_KEY env vars).
    /// Env vars take precedence over the config file.
    pub api_key: Option<String>,

    /// Items requested from the content source per batch.
    pub items_per_batch: usize,

    /// Number of batches a topic plan aims for, filler included.
    pub target_batches: usize,

    /// Hard cap on batches in one plan regardless of topic count.
    pub max_batches: usize,

    /// Maximum topics grouped into one batch.
    pub max_batch_size: usize,

    /// Delay between successive secondary batch submissions.
    pub stagger_ms: u64,

    /// Secondary batches allowed in flight at once.
    pub max_concurrent_batches: usize,

    /// Per-attempt timeout for content source requests.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            api_base_url: None,
            api_key: None,
            items_per_batch: 6,
            target_batches: 5,
            max_batches: 6,
            max_batch_size: 3,
            stagger_ms: 100,
            max_concurrent_batches: 4,
            request_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("items_per_batch", &self.items_per_batch)
            .field("target_batches", &self.target_batches)
            .field("max_batches", &self.max_batches)
            .field("max_batch_size", &self.max_batch_size)
            .field("stagger_ms", &self.stagger_ms)
            .field("max_concurrent_batches", &self.max_concurrent_batches)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "model",
        "api_base_url",
        "api_key",
        "items_per_batch",
        "target_batches",
        "max_batches",
        "max_batch_size",
        "stagger_ms",
        "max_concurrent_batches",
        "request_timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(model = %config.model, "Loaded configuration");
        Ok(config.sanitized())
    }

    /// Clamp numeric settings into ranges the pipeline can work with.
    fn sanitized(mut self) -> Self {
        self.items_per_batch = self.items_per_batch.clamp(1, 20);
        self.target_batches = self.target_batches.max(1);
        self.max_batches = self.max_batches.max(self.target_batches);
        self.max_batch_size = self.max_batch_size.max(1);
        self.max_concurrent_batches = self.max_concurrent_batches.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self
    }

    /// Resolve the API key: env vars first, then the config file value.
    ///
    /// Blank values are treated as absent.
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .chain(self.api_key.clone())
            .find(|k| !k.trim().is_empty())
            .map(SecretString::from)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
