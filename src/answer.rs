//! Answer composition over the chat-completion service.

use std::sync::Arc;

use crate::completion::CompletionClient;
use crate::types::RagError;

/// Standing instruction sent with every question.
pub const SYSTEM_PROMPT: &str =
    "You are a Malaysian real estate law assistant. Only answer based on the provided documents.";

/// Turns a question plus retrieved context into a grounded answer.
///
/// A pure orchestration step: one fixed system instruction, one user turn
/// carrying the context and question, and the model's reply returned
/// verbatim. No state is held between calls, so a single composer is safe
/// to share across concurrent questions.
#[derive(Clone)]
pub struct AnswerComposer {
    completions: Arc<dyn CompletionClient>,
    system_prompt: String,
}

impl AnswerComposer {
    pub fn new(completions: Arc<dyn CompletionClient>) -> Self {
        Self {
            completions,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Replaces the standing instruction, e.g. to target a different
    /// legal domain.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Sends the prompt pair and returns the model's reply.
    ///
    /// An empty `context` still produces an answer (the model is simply
    /// left ungrounded), while remote failures surface as
    /// [`RagError::Completion`].
    pub async fn compose(&self, question: &str, context: &str) -> Result<String, RagError> {
        let user_prompt = format!("Context:\n{context}\n\nQuestion: {question}");
        self.completions
            .complete(&self.system_prompt, &user_prompt)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::MockCompletionClient;

    #[tokio::test]
    async fn compose_builds_the_expected_prompt_pair() {
        let completions = MockCompletionClient::new("the answer");
        let composer = AnswerComposer::new(Arc::new(completions.clone()));

        let answer = composer
            .compose("What notice is required?", "Eviction requires 24 hours notice.")
            .await
            .unwrap();
        assert_eq!(answer, "the answer");

        let calls = completions.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, SYSTEM_PROMPT);
        assert_eq!(
            calls[0].user,
            "Context:\nEviction requires 24 hours notice.\n\nQuestion: What notice is required?"
        );
    }
}
