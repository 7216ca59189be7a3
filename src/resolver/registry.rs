//! Package index existence checks

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Registry request for '{name}' failed: {message}")]
    Request { name: String, message: String },
}

/// Existence check against a package index
#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// `Ok(true)` when the index knows a project called `name`
    async fn exists(&self, name: &str) -> Result<bool, RegistryError>;
}

/// Name sent to the index for a top-level module (`google.generativeai` → `google-generativeai`)
pub fn registry_name(module: &str) -> String {
    module.replace(['.', '_'], "-")
}

/// PyPI JSON API: `GET {base}/pypi/{name}/json`, 200 means the project exists
pub struct PypiIndex {
    client: reqwest::Client,
    base_url: String,
}

impl PypiIndex {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("miniogre/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn project_url(&self, name: &str) -> String {
        format!("{}/pypi/{}/json", self.base_url, name)
    }
}

#[async_trait]
impl PackageIndex for PypiIndex {
    async fn exists(&self, name: &str) -> Result<bool, RegistryError> {
        let url = self.project_url(name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RegistryError::Request {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        debug!(name, status = status.as_u16(), "Registry lookup");
        Ok(status == StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_registry_name() {
        assert_eq!(registry_name("numpy"), "numpy");
        assert_eq!(registry_name("google.generativeai"), "google-generativeai");
        assert_eq!(registry_name("typing_extensions"), "typing-extensions");
    }

    #[tokio::test]
    async fn test_lookup_hits_and_misses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pypi/numpy/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pypi/not-a-package/json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let index = PypiIndex::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
        assert!(index.exists("numpy").await.unwrap());
        assert!(!index.exists("not-a-package").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_an_error() {
        let index = PypiIndex::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        assert!(index.exists("numpy").await.is_err());
    }
}
