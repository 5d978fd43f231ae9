use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a content source.
///
/// None of these reach the feed: the batch fetcher logs them and treats the
/// batch as empty.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("No API key configured")]
    MissingApiKey,
    #[error("Could not encode request: {0}")]
    Encode(String),
    #[error("Could not decode response: {0}")]
    Decode(String),
    #[error("Response contained no text")]
    EmptyResponse,
}

impl ContentError {
    /// Returns true if this error is transient and the request should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ContentError::Timeout(_) | ContentError::Network(_) => true,
            ContentError::HttpStatus(status) => *status == 429 || *status >= 500,
            ContentError::RateLimited(_)
            | ContentError::ResponseTooLarge(_)
            | ContentError::InvalidUtf8
            | ContentError::InsecureBaseUrl
            | ContentError::MissingApiKey
            | ContentError::Encode(_)
            | ContentError::Decode(_)
            | ContentError::EmptyResponse => false,
        }
    }
}

/// One request for generated news: topics plus how many items to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub topics: Vec<String>,
    pub count: usize,
    /// Extra natural-language constraints (reading density, tone, filters).
    pub guidance: Vec<String>,
}

impl ContentRequest {
    pub fn new(topics: Vec<String>, count: usize) -> Self {
        Self {
            topics,
            count,
            guidance: Vec::new(),
        }
    }

    pub fn with_guidance(mut self, guidance: Vec<String>) -> Self {
        self.guidance = guidance;
        self
    }

    /// Comma-joined topics, or a generic default when none were given.
    pub fn topic_line(&self) -> String {
        if self.topics.is_empty() {
            "Global Breaking News".to_string()
        } else {
            self.topics.join(", ")
        }
    }

    /// Render the prompt sent to a generative source.
    pub fn prompt(&self) -> String {
        let mut prompt = format!(
            "Find {} distinct, high-impact breaking news stories related to: {}.\n\
             Events must be from the last 24 hours.\n\
             Output strictly as a valid JSON array:\n\
             [{{\"title\": \"Headline\", \"publisher\": \"Source\", \"abstract\": \"Summary (max 30 words)\", \"category\": \"Topic\"}}]",
            self.count,
            self.topic_line()
        );
        if !self.guidance.is_empty() {
            prompt.push_str("\nAdditional requirements:");
            for line in &self.guidance {
                prompt.push_str("\n- ");
                prompt.push_str(line);
            }
        }
        prompt
    }
}

/// A candidate web page returned alongside generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebReference {
    pub title: Option<String>,
    pub uri: String,
}

impl WebReference {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            uri: uri.into(),
        }
    }
}

/// Raw output of a content source. `text` is untrusted and may be malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceResponse {
    pub text: String,
    pub references: Vec<WebReference>,
}

/// Anything that can turn a [`ContentRequest`] into generated text.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn generate(&self, request: &ContentRequest) -> Result<SourceResponse, ContentError>;

    /// False when the source cannot work at all (e.g. no credentials), so the
    /// caller can skip straight to bundled content.
    fn is_available(&self) -> bool {
        true
    }

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_topics_and_count() {
        let request = ContentRequest::new(vec!["World".into(), "Science".into()], 4);
        let prompt = request.prompt();
        assert!(prompt.starts_with("Find 4 distinct"));
        assert!(prompt.contains("related to: World, Science."));
        assert!(prompt.contains("\"abstract\""));
        assert!(!prompt.contains("Additional requirements"));
    }

    #[test]
    fn test_prompt_without_topics_uses_default() {
        let request = ContentRequest::new(Vec::new(), 6);
        assert!(request.prompt().contains("Global Breaking News"));
    }

    #[test]
    fn test_prompt_appends_guidance() {
        let request = ContentRequest::new(vec!["World".into()], 6)
            .with_guidance(vec!["Avoid clickbait.".into(), "Cite experts.".into()]);
        let prompt = request.prompt();
        assert!(prompt.contains("Additional requirements:\n- Avoid clickbait.\n- Cite experts."));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ContentError::Timeout(30).is_retryable());
        assert!(ContentError::HttpStatus(503).is_retryable());
        assert!(ContentError::HttpStatus(429).is_retryable());
        assert!(!ContentError::HttpStatus(400).is_retryable());
        assert!(!ContentError::MissingApiKey.is_retryable());
        assert!(!ContentError::Decode("x".into()).is_retryable());
    }
}
