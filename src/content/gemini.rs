use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::content::editor::{ChatRole, ChatTurn};
use crate::content::source::{
    ContentError, ContentRequest, ContentSource, SourceResponse, WebReference,
};
use crate::util::is_local_http;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const MAX_RESPONSE_SIZE: usize = 2 * 1024 * 1024; // 2MB
const MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

/// Content source backed by the Gemini `generateContent` REST endpoint with
/// Google Search grounding.
pub struct GeminiSource {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout: Duration,
    retry_base: Duration,
}

impl std::fmt::Debug for GeminiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSource")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiSource {
    pub fn new(client: reqwest::Client, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
            retry_base: DEFAULT_RETRY_BASE,
        }
    }

    /// Build a source from configuration, resolving the API key from the
    /// environment first.
    pub fn from_config(client: reqwest::Client, config: &Config) -> Result<Self, ContentError> {
        let mut source = Self::new(client, config.resolve_api_key())
            .with_model(&config.model)
            .with_timeout(config.request_timeout());
        if let Some(base) = config.api_base_url.as_deref() {
            source = source.with_base_url(base)?;
        }
        Ok(source)
    }

    /// Point the source at a different API host.
    ///
    /// HTTPS is required, except for localhost test servers.
    pub fn with_base_url(mut self, base: &str) -> Result<Self, ContentError> {
        let base = base.trim().trim_end_matches('/');
        if !base.starts_with("https://") {
            if !is_local_http(base) {
                tracing::error!(base_url = %base, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
                return Err(ContentError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base, "Using non-HTTPS Gemini base URL (localhost only)");
        }
        if base != DEFAULT_BASE_URL {
            tracing::info!(base_url = %base, "Using custom Gemini API base URL");
        }
        self.base_url = base.to_string();
        Ok(self)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base delay for exponential backoff (doubles per retry).
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a conversation with a system instruction and return the reply
    /// text. No search grounding is requested.
    pub async fn chat(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, ContentError> {
        let mut contents: Vec<Content<'_>> = history
            .iter()
            .map(|turn| Content::text(turn.role.as_api_role(), &turn.text))
            .collect();
        contents.push(Content::text(ChatRole::User.as_api_role(), message));

        let request = GenerateRequest {
            contents,
            system_instruction: Some(Instruction {
                parts: vec![PartOut { text: system }],
            }),
            tools: Vec::new(),
        };

        let response = self.generate_with_retry(&request).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(ContentError::EmptyResponse);
        }
        Ok(text)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// The key goes to the official host, or to a localhost test server.
    /// Any other custom host never sees it.
    fn sends_key(&self) -> bool {
        self.base_url == DEFAULT_BASE_URL || is_local_http(&self.base_url)
    }

    /// POST with retry for transient failures.
    /// Uses exponential backoff: 1s, 2s, 4s (max 3 retries).
    async fn generate_with_retry(
        &self,
        request: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse, ContentError> {
        if self.api_key.is_none() {
            return Err(ContentError::MissingApiKey);
        }
        let payload =
            serde_json::to_vec(request).map_err(|e| ContentError::Encode(e.to_string()))?;
        let url = self.endpoint();
        let mut retry_count = 0;

        loop {
            match self.post_once(&url, &payload).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retry_count < MAX_RETRIES => {
                    let delay = self.retry_base * (1u32 << retry_count);
                    tracing::debug!(
                        error = %e,
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying Gemini request after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(ContentError::HttpStatus(429)) => {
                    return Err(ContentError::RateLimited(retry_count));
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once(&self, url: &str, payload: &[u8]) -> Result<GenerateResponse, ContentError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec());

        if let Some(key) = self.api_key.as_ref() {
            if self.sends_key() {
                tracing::trace!("Gemini API authentication configured");
                request = request.header("x-goog-api-key", key.expose_secret());
            } else {
                tracing::debug!("Skipping API key for non-official Gemini URL (custom base_url in use)");
            }
        }

        let body = tokio::time::timeout(self.timeout, async {
            let response = request.send().await.map_err(ContentError::Network)?;
            if !response.status().is_success() {
                return Err(ContentError::HttpStatus(response.status().as_u16()));
            }
            read_limited_text(response, MAX_RESPONSE_SIZE).await
        })
        .await
        .map_err(|_| ContentError::Timeout(self.timeout.as_secs()))??;

        serde_json::from_str(&body).map_err(|e| ContentError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContentSource for GeminiSource {
    async fn generate(&self, request: &ContentRequest) -> Result<SourceResponse, ContentError> {
        let prompt = request.prompt();
        let body = GenerateRequest {
            contents: vec![Content::text(ChatRole::User.as_api_role(), &prompt)],
            system_instruction: None,
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        };

        let response = self.generate_with_retry(&body).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(ContentError::EmptyResponse);
        }

        let references = response.references();
        tracing::debug!(
            topics = %request.topic_line(),
            text_len = text.len(),
            references = references.len(),
            "Gemini response received"
        );
        Ok(SourceResponse { text, references })
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Instruction<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<PartOut<'a>>,
}

impl<'a> Content<'a> {
    fn text(role: &'a str, text: &'a str) -> Self {
        Self {
            role,
            parts: vec![PartOut { text }],
        }
    }
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Instruction<'a> {
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Debug, Deserialize)]
struct PartIn {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Web grounding chunks of the first candidate that carry a URI.
    fn references(&self) -> Vec<WebReference> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .filter_map(|web| {
                        web.uri.as_ref().map(|uri| WebReference {
                            title: web.title.clone(),
                            uri: uri.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, ContentError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ContentError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ContentError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ContentError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| ContentError::InvalidUtf8)
}
