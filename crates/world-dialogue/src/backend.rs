//! Dialogue Backends
//!
//! An Ollama HTTP backend for real runs and a scripted backend for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ChatMessage, DialogueBackend, DialogueError, GenerationRequest};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Local-model backend speaking the Ollama chat API.
#[derive(Debug)]
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaBackend {
    /// Creates a backend against the default local endpoint.
    pub fn new(transport_timeout: Duration) -> Result<Self, DialogueError> {
        Self::with_base_url(DEFAULT_OLLAMA_URL, transport_timeout)
    }

    /// Creates a backend against a custom endpoint.
    pub fn with_base_url(
        base_url: impl Into<String>,
        transport_timeout: Duration,
    ) -> Result<Self, DialogueError> {
        let client = reqwest::Client::builder()
            .timeout(transport_timeout)
            .build()
            .map_err(|e| DialogueError::Request(format!("failed to build client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl DialogueBackend for OllamaBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, DialogueError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DialogueError::Timeout(0)
                } else {
                    DialogueError::Request(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DialogueError::Request(format!(
                "status {}: {}",
                status, text
            )));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| DialogueError::InvalidResponse(format!("bad response body: {}", e)))?;

        Ok(parsed.message.content.trim().to_string())
    }
}

/// Deterministic backend for tests and offline runs.
///
/// Cycles through a fixed list of response lines and records call counts and
/// the peak number of calls in flight at once, so tests can assert the
/// governor's cap was honored.
#[derive(Debug)]
pub struct ScriptedBackend {
    lines: Vec<String>,
    cursor: AtomicUsize,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    delay: Duration,
    fail_every: Option<usize>,
}

impl ScriptedBackend {
    /// Backend that cycles through the given lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            cursor: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail_every: None,
        }
    }

    /// Backend that always returns the same line.
    pub fn repeating(line: impl Into<String>) -> Self {
        Self::new(vec![line.into()])
    }

    /// Adds an artificial per-call delay, making concurrency observable.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes every n-th call (1-based) fail with a request error.
    pub fn failing_every(mut self, n: usize) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    /// Total calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Peak number of concurrent calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DialogueBackend for ScriptedBackend {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, DialogueError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(n) = self.fail_every {
            if call % n == 0 {
                return Err(DialogueError::Request("scripted failure".to_string()));
            }
        }

        if self.lines.is_empty() {
            return Err(DialogueError::InvalidResponse("no scripted lines".to_string()));
        }
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst) % self.lines.len();
        Ok(self.lines[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "test".to_string(),
            messages: vec![ChatMessage::user("hi")],
        }
    }

    #[tokio::test]
    async fn test_scripted_backend_cycles_lines() {
        let backend = ScriptedBackend::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(backend.generate(&request()).await.unwrap(), "a");
        assert_eq!(backend.generate(&request()).await.unwrap(), "b");
        assert_eq!(backend.generate(&request()).await.unwrap(), "a");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_scripted_backend_failures() {
        let backend = ScriptedBackend::repeating("ok").failing_every(2);
        assert!(backend.generate(&request()).await.is_ok());
        assert!(backend.generate(&request()).await.is_err());
        assert!(backend.generate(&request()).await.is_ok());
    }

    #[test]
    fn test_ollama_request_serialization() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hello")];
        let body = OllamaChatRequest {
            model: "tinyllama:1.1b",
            messages: &messages,
            stream: false,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""model":"tinyllama:1.1b""#));
        assert!(json.contains(r#""stream":false"#));
        assert!(json.contains(r#""role":"system""#));
    }
}
