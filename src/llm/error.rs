use thiserror::Error;

/// Failures of the text-generation collaborator. None of them abort a pipeline run.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// The provider's API key variable is not set
    #[error("Missing credential for {provider}: set {env_var}")]
    MissingCredential { provider: String, env_var: String },

    #[error("{provider} request failed: {message}")]
    Api { provider: String, message: String },

    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),
}
