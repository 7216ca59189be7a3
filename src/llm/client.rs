use super::error::LlmError;
use async_trait::async_trait;

/// Text generation capability of a language-model vendor
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, LlmError>;

    fn name(&self) -> &str;
}
