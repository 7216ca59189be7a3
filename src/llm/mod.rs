//! Optional language-model collaborator
//!
//! The pipeline works without it. When enabled, the only use is a cleaning pass over
//! the unresolved requirement list before locking.

mod client;
mod error;
mod genai;
mod mock;

pub use self::client::TextGenerator;
pub use self::error::LlmError;
pub use self::genai::{default_model, parse_provider, GenAiGenerator};
pub use self::mock::MockTextGenerator;

use tracing::{info, warn};

pub const CLEAN_REQUIREMENTS_PROMPT: &str = "You receive a list of Python package names, one per line, \
inferred from import statements. Remove entries that are not installable from PyPI, replace import \
names with their distribution names where they differ (for example cv2 becomes opencv-python, \
sklearn becomes scikit-learn), and drop duplicates. Answer with the cleaned list only, one package \
per line, without versions, numbering, markdown or commentary.";

/// Runs the cleaning pass; on any failure the input list is returned unchanged
pub async fn clean_requirement_list(generator: &dyn TextGenerator, requirements: &str) -> String {
    if requirements.trim().is_empty() {
        return requirements.to_string();
    }

    match generator
        .generate_text(CLEAN_REQUIREMENTS_PROMPT, requirements)
        .await
    {
        Ok(cleaned) => {
            let cleaned = strip_code_fence(&cleaned);
            info!(generator = generator.name(), lines = cleaned.lines().count(), "Requirements cleaned");
            cleaned
        }
        Err(e) => {
            warn!(generator = generator.name(), error = %e, "Cleaning failed, using uncleaned requirements");
            requirements.to_string()
        }
    }
}

fn strip_code_fence(text: &str) -> String {
    text.lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cleaning_uses_generator_output() {
        let generator = MockTextGenerator::new().with_response("```\nscikit-learn\nnumpy\n```");
        let cleaned = clean_requirement_list(&generator, "sklearn\nnumpy").await;
        assert_eq!(cleaned, "scikit-learn\nnumpy");
    }

    #[tokio::test]
    async fn test_cleaning_failure_falls_back() {
        let generator = MockTextGenerator::new().with_error(LlmError::MissingCredential {
            provider: "OpenAI".to_string(),
            env_var: "OPENAI_API_KEY".to_string(),
        });
        let cleaned = clean_requirement_list(&generator, "sklearn\nnumpy").await;
        assert_eq!(cleaned, "sklearn\nnumpy");
    }

    #[tokio::test]
    async fn test_empty_list_skips_generator() {
        let generator = MockTextGenerator::new();
        assert_eq!(clean_requirement_list(&generator, "").await, "");
        assert!(generator.received().is_empty());
    }
}
