//! Completion trait used by the classification stage.
//!
//! Infrastructure only: the prompt and response handling live in
//! [`crate::pipeline::classify`].

use async_trait::async_trait;

use crate::error::CompletionResult;

/// A generative completion service that answers with a JSON object.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one system instruction and one user prompt; return the raw
    /// response text, expected to be a JSON object.
    async fn complete_json(&self, system_prompt: &str, user_prompt: &str)
        -> CompletionResult<String>;
}
