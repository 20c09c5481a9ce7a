//! Chat-completion service clients.
//!
//! [`CompletionClient`] wraps the remote chat model behind the same kind of
//! injectable seam as [`crate::embeddings::EmbeddingClient`]: one
//! system/user prompt pair in, one textual reply out. No streaming, no
//! retry: a single request/response per call.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::embeddings::{DEFAULT_OPENAI_BASE_URL, parse_base_url};
use crate::types::RagError;

/// Sends one system instruction plus one user turn to the chat model and
/// returns its reply verbatim.
///
/// Failures surface as [`RagError::Completion`]. Implementations must be
/// stateless with respect to calls and safe to invoke concurrently.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, RagError>;
}

/// Client for an OpenAI-compatible `/chat/completions` API.
#[derive(Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(
        base_url: impl AsRef<str>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, RagError> {
        Ok(Self {
            client: Client::new(),
            base_url: parse_base_url(base_url.as_ref())?,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Creates a client against the public OpenAI endpoint.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, RagError> {
        Self::new(DEFAULT_OPENAI_BASE_URL, api_key, model)
    }

    /// Model name sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, RagError> {
        let endpoint = self
            .base_url
            .join("chat/completions")
            .map_err(|err| RagError::Completion(err.to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::Completion(err.to_string()))?
            .error_for_status()
            .map_err(|err| RagError::Completion(err.to_string()))?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| RagError::Completion(err.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Completion("response contained no choices".to_string()))
    }
}

/// A recorded prompt pair from [`MockCompletionClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedPrompt {
    pub system: String,
    pub user: String,
}

/// Completion client double that returns a canned reply and records every
/// prompt pair it receives.
#[derive(Clone, Debug)]
pub struct MockCompletionClient {
    reply: String,
    calls: Arc<Mutex<Vec<RecordedPrompt>>>,
}

impl MockCompletionClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of every prompt pair received so far, in call order.
    pub fn calls(&self) -> Vec<RecordedPrompt> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, RagError> {
        self.calls.lock().push(RecordedPrompt {
            system: system_prompt.to_string(),
            user: user_prompt.to_string(),
        });
        Ok(self.reply.clone())
    }
}
