//! [`CompletionService`] backed by the OpenAI chat-completions API.

use async_trait::async_trait;
use openai_client::{strip_code_blocks, ChatRequest, Message, OpenAIClient};
use tracing::{debug, instrument};

use crate::error::{CompletionError, CompletionResult};
use crate::traits::completion::CompletionService;

/// Default model for classification requests.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sends each classification as a JSON-object-mode chat completion.
#[derive(Clone)]
pub struct OpenAIClassifier {
    client: OpenAIClient,
    model: String,
}

impl OpenAIClassifier {
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for OpenAIClassifier {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> CompletionResult<String> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(system_prompt))
            .message(Message::user(user_prompt))
            .temperature(0.0)
            .json_object();

        let response = self.client.chat_completion(request).await?;

        if let Some(usage) = &response.usage {
            debug!(total_tokens = usage.total_tokens, "Classification completed");
        }

        let content = response.content.unwrap_or_default();
        let content = strip_code_blocks(&content).trim();
        if content.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}
