//! Remote model provider seam.
//!
//! [`ModelProvider`] is the only way the rest of the crate talks to the
//! language model. A [`Dialogue`] is the stateful, provider-owned handle of
//! one conversation: it remembers earlier turns, so callers hand it just the
//! newest user message.

use async_trait::async_trait;
use tracing::debug;

use crate::api::generate::generate_content;
pub use crate::api::generate::ProviderError;
use crate::api::{Content, GenerateContentRequest};
use crate::core::config::Config;

#[async_trait]
pub trait Dialogue: Send {
    /// Send one user turn and return the model's reply text.
    async fn send(&mut self, text: &str) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Establish a dialogue scoped to `system_prompt` with no prior turns.
    async fn open_dialogue(
        &self,
        credential: &str,
        system_prompt: &str,
    ) -> Result<Box<dyn Dialogue>, ProviderError>;

    /// One stateless completion, without system prompt or history.
    async fn complete(&self, credential: &str, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(reqwest::Client::new(), config.base_url(), config.model())
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn open_dialogue(
        &self,
        credential: &str,
        system_prompt: &str,
    ) -> Result<Box<dyn Dialogue>, ProviderError> {
        // Gemini chats are client-side: the full history travels with every
        // request, so opening one needs no round-trip.
        debug!(model = %self.model, "opening Gemini dialogue");
        Ok(Box::new(GeminiDialogue {
            provider: self.clone(),
            api_key: credential.to_string(),
            system_instruction: Content::instruction(system_prompt),
            history: Vec::new(),
        }))
    }

    async fn complete(&self, credential: &str, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content::user(prompt)],
        };
        let response = generate_content(
            &self.client,
            &self.base_url,
            &self.model,
            credential,
            &request,
        )
        .await?;
        Ok(response.text())
    }
}

struct GeminiDialogue {
    provider: GeminiProvider,
    api_key: String,
    system_instruction: Content,
    /// Completed user/model pairs only.
    history: Vec<Content>,
}

#[async_trait]
impl Dialogue for GeminiDialogue {
    async fn send(&mut self, text: &str) -> Result<String, ProviderError> {
        let user_turn = Content::user(text);
        let mut contents = self.history.clone();
        contents.push(user_turn.clone());

        let request = GenerateContentRequest {
            system_instruction: Some(self.system_instruction.clone()),
            contents,
        };
        let response = generate_content(
            &self.provider.client,
            &self.provider.base_url,
            &self.provider.model,
            &self.api_key,
            &request,
        )
        .await?;

        let reply = response.text();
        if !reply.trim().is_empty() {
            self.history.push(user_turn);
            self.history.push(Content::model(reply.clone()));
        }
        Ok(reply)
    }
}
