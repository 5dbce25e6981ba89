//! Reply generation behind a narrow trait so the chat and insights
//! layers never depend on a concrete LLM vendor.

mod gemini;

pub use gemini::GeminiClient;

use crate::models::enums::MessageRole;

/// One prior turn of a conversation, passed as generation context.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub text: String,
}

/// Errors from reply generation.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Gemini API key is missing; set GEMINI_API_KEY")]
    MissingApiKey,

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Gemini returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse Gemini response: {0}")]
    ResponseParsing(String),

    #[error("Empty response from Gemini")]
    EmptyResponse,
}

/// Synchronous reply generator. Implementations block; async callers
/// go through `tokio::task::spawn_blocking`.
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply to `prompt`, optionally conditioned on prior turns.
    fn generate(&self, history: &[ChatTurn], prompt: &str) -> Result<String, LlmError>;
}

/// Mock generator for tests: canned reply or canned failure, and a
/// record of whether it was invoked.
pub struct MockReplyGenerator {
    reply: Result<String, String>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockReplyGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl ReplyGenerator for MockReplyGenerator {
    fn generate(&self, _history: &[ChatTurn], _prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(LlmError::HttpClient(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_reply() {
        let mock = MockReplyGenerator::replying("canned");
        let reply = mock.generate(&[], "prompt").unwrap();
        assert_eq!(reply, "canned");
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn mock_returns_configured_failure() {
        let mock = MockReplyGenerator::failing("connection refused");
        let err = mock.generate(&[], "prompt").unwrap_err();
        assert!(matches!(err, LlmError::HttpClient(_)));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn mock_counts_every_call() {
        let mock = MockReplyGenerator::replying("x");
        for _ in 0..3 {
            mock.generate(&[], "p").unwrap();
        }
        assert_eq!(mock.call_count(), 3);
    }
}
