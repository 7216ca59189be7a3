//! `genai` backed text generation (OpenAI, Anthropic, Gemini, Groq, Ollama, ...)

use super::client::TextGenerator;
use super::error::LlmError;
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use genai::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Model used when none is configured for a provider
pub fn default_model(provider: AdapterKind) -> &'static str {
    match provider {
        AdapterKind::OpenAI => "gpt-4o-mini",
        AdapterKind::Anthropic => "claude-3-5-haiku-latest",
        AdapterKind::Gemini => "gemini-1.5-flash",
        AdapterKind::Groq => "llama-3.1-8b-instant",
        AdapterKind::Ollama => "llama3.2",
        _ => "gpt-4o-mini",
    }
}

pub fn parse_provider(name: &str) -> Result<AdapterKind, LlmError> {
    AdapterKind::from_lower_str(&name.to_lowercase())
        .ok_or_else(|| LlmError::UnknownProvider(name.to_string()))
}

pub struct GenAiGenerator {
    client: Client,
    provider: AdapterKind,
    model: String,
    timeout: Duration,
}

impl GenAiGenerator {
    /// Fails with [`LlmError::MissingCredential`] before any request when the key is unset
    pub fn new(
        provider: AdapterKind,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        if let Some(env_var) = provider.default_key_env_name() {
            let present = std::env::var(env_var)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(LlmError::MissingCredential {
                    provider: provider.as_str().to_string(),
                    env_var: env_var.to_string(),
                });
            }
        }

        let model = model.unwrap_or_else(|| default_model(provider).to_string());
        debug!(provider = provider.as_str(), model = %model, "Creating text generator");

        Ok(Self {
            client: Client::default(),
            provider,
            model,
            timeout,
        })
    }
}

#[async_trait]
impl TextGenerator for GenAiGenerator {
    async fn generate_text(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, LlmError> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_content),
        ]);
        let options = ChatOptions::default().with_temperature(0.1);

        let response = match tokio::time::timeout(
            self.timeout,
            self.client.exec_chat(&self.model, request, Some(&options)),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!("{} API error: {}", self.provider.as_str(), e);
                return Err(LlmError::Api {
                    provider: self.provider.as_str().to_string(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(LlmError::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        let text = response.first_text().unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }
}

impl std::fmt::Debug for GenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiGenerator")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
