//! Configuration management for miniogre
//!
//! All knobs of a pipeline run live in one [`OgreConfig`] value. It is built once per
//! invocation (environment variables with constant fallbacks, then CLI overrides) and
//! passed by reference to every stage; stage code never reads the environment itself.
//!
//! # Environment Variables
//!
//! - `MINIOGRE_ENV_DIR`: Name of the environment directory inside the project - default: "ogre_dir"
//! - `MINIOGRE_TIMEZONE`: Timezone baked into generated images - default: "America/Chicago"
//! - `MINIOGRE_BASEIMAGE`: Base image override, or "auto" - default: "auto"
//! - `MINIOGRE_BASEIMAGE_TEMPLATE`: Generic base image, `{arch}` is substituted - default: "ogrerun/base:ubuntu22.04-{arch}"
//! - `MINIOGRE_NODE_BASEIMAGE`: Base image for Node frameworks - default: "node:20-bookworm"
//! - `MINIOGRE_PLATFORM`: Target platform (e.g. "linux/arm64") - default: host platform
//! - `MINIOGRE_REGISTRY_URL`: Package index root - default: "https://pypi.org"
//! - `MINIOGRE_REGISTRY_TIMEOUT`: Registry lookup timeout in seconds - default: "10"
//! - `MINIOGRE_LOCK_COMMAND`: Dependency resolution command, reads one requirement on stdin.
//!   Split on whitespace; quotes are rejected, so wrap quoted arguments in a script
//! - `MINIOGRE_INTERPRETER`: Python interpreter used for metadata discovery - default: "python3"
//! - `MINIOGRE_SITE_PACKAGES`: Colon separated site-packages directories - default: ask the interpreter
//! - `MINIOGRE_CONTAINER_ENGINE`: Container engine CLI - default: "docker"
//! - `MINIOGRE_WORDLIST_URL`: Word list used for base image passphrases
//! - `MINIOGRE_PASSPHRASE_WORDS`: Number of words in a passphrase - default: "4"
//! - `MINIOGRE_LOG_LEVEL`: Logging level - default: "info"

use crate::engine::{PortMapping, SbomFormat};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENV_DIR: &str = "ogre_dir";
pub const DEFAULT_TIMEZONE: &str = "America/Chicago";
pub const AUTO_BASE_IMAGE: &str = "auto";
pub const DEFAULT_BASE_IMAGE_TEMPLATE: &str = "ogrerun/base:ubuntu22.04-{arch}";
pub const DEFAULT_NODE_BASE_IMAGE: &str = "node:20-bookworm";
pub const DEFAULT_REGISTRY_URL: &str = "https://pypi.org";
const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOCK_COMMAND: &str = "uv pip compile - --no-header --no-annotate --quiet";
const DEFAULT_INTERPRETER: &str = "python3";
const DEFAULT_CONTAINER_ENGINE: &str = "docker";
pub const DEFAULT_WORDLIST_URL: &str = "https://www.mit.edu/~ecprice/wordlist.10000";
const DEFAULT_PASSPHRASE_WORDS: usize = 4;
pub const DEFAULT_PORT_MAP: &str = "8001:8001";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Directories never descended into while scanning a project
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Per-invocation configuration shared by every pipeline stage
#[derive(Debug, Clone)]
pub struct OgreConfig {
    /// Environment directory name, created inside the project root
    pub env_dir_name: String,

    /// Timezone exported into generated images
    pub timezone: String,

    /// Explicit base image, or "auto" to resolve it from the detected framework
    pub base_image: String,

    /// Generic base image; `{arch}` is replaced by the target architecture
    pub base_image_template: String,

    /// Base image for Node-family frameworks
    pub node_base_image: String,

    /// Target platform such as `linux/arm64`; host platform when unset
    pub platform: Option<String>,

    /// Package index root used for existence lookups
    pub registry_url: String,

    /// Registry lookup timeout in seconds
    pub registry_timeout_secs: u64,

    /// External dependency resolution command, split on whitespace without quoting
    pub lock_command: String,

    /// Python interpreter queried for site-packages and stdlib names
    pub interpreter: String,

    /// Explicit site-packages directories; empty means "ask the interpreter"
    pub site_packages: Vec<PathBuf>,

    /// Container engine CLI
    pub container_engine: String,

    /// Word list used for base image passphrases
    pub wordlist_url: String,

    /// Number of words in a generated passphrase
    pub passphrase_words: usize,

    /// Host to container port mapping used by `run` and `spinup`
    pub port_map: PortMapping,

    /// Report tool used for the SBOM
    pub sbom_format: SbomFormat,

    /// Reuse the container engine's build cache
    pub cache: bool,

    /// Stream container engine output instead of capturing it
    pub verbose: bool,

    /// Directory names skipped at any depth while scanning
    pub excluded_dirs: Vec<String>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for OgreConfig {
    /// Loads `MINIOGRE_*` environment variables, falling back to the built-in defaults
    fn default() -> Self {
        let env_dir_name =
            env::var("MINIOGRE_ENV_DIR").unwrap_or_else(|_| DEFAULT_ENV_DIR.to_string());

        let site_packages = env::var("MINIOGRE_SITE_PACKAGES")
            .map(|v| {
                v.split(':')
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        let registry_timeout_secs = env::var("MINIOGRE_REGISTRY_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REGISTRY_TIMEOUT_SECS);

        let passphrase_words = env::var("MINIOGRE_PASSPHRASE_WORDS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_PASSPHRASE_WORDS);

        let mut excluded_dirs: Vec<String> =
            DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect();
        excluded_dirs.push(env_dir_name.clone());

        Self {
            env_dir_name,
            timezone: env::var("MINIOGRE_TIMEZONE")
                .unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string()),
            base_image: env::var("MINIOGRE_BASEIMAGE")
                .unwrap_or_else(|_| AUTO_BASE_IMAGE.to_string()),
            base_image_template: env::var("MINIOGRE_BASEIMAGE_TEMPLATE")
                .unwrap_or_else(|_| DEFAULT_BASE_IMAGE_TEMPLATE.to_string()),
            node_base_image: env::var("MINIOGRE_NODE_BASEIMAGE")
                .unwrap_or_else(|_| DEFAULT_NODE_BASE_IMAGE.to_string()),
            platform: env::var("MINIOGRE_PLATFORM").ok().filter(|p| !p.is_empty()),
            registry_url: env::var("MINIOGRE_REGISTRY_URL")
                .unwrap_or_else(|_| DEFAULT_REGISTRY_URL.to_string()),
            registry_timeout_secs,
            lock_command: env::var("MINIOGRE_LOCK_COMMAND")
                .unwrap_or_else(|_| DEFAULT_LOCK_COMMAND.to_string()),
            interpreter: env::var("MINIOGRE_INTERPRETER")
                .unwrap_or_else(|_| DEFAULT_INTERPRETER.to_string()),
            site_packages,
            container_engine: env::var("MINIOGRE_CONTAINER_ENGINE")
                .unwrap_or_else(|_| DEFAULT_CONTAINER_ENGINE.to_string()),
            wordlist_url: env::var("MINIOGRE_WORDLIST_URL")
                .unwrap_or_else(|_| DEFAULT_WORDLIST_URL.to_string()),
            passphrase_words,
            port_map: PortMapping::single(8001, 8001),
            sbom_format: SbomFormat::PipLicenses,
            cache: false,
            verbose: false,
            excluded_dirs,
            log_level: env::var("MINIOGRE_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
        }
    }
}

impl OgreConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any value is out of range or malformed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.env_dir_name.is_empty()
            || self.env_dir_name.contains('/')
            || self.env_dir_name.contains('\\')
            || self.env_dir_name == "."
            || self.env_dir_name == ".."
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Environment directory must be a plain directory name, got '{}'",
                self.env_dir_name
            )));
        }

        if self.registry_timeout_secs == 0 || self.registry_timeout_secs > 300 {
            return Err(ConfigError::ValidationFailed(
                "Registry timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        if self.passphrase_words == 0 {
            return Err(ConfigError::ValidationFailed(
                "Passphrase must contain at least one word".to_string(),
            ));
        }

        if self.lock_command.split_whitespace().next().is_none() {
            return Err(ConfigError::ValidationFailed(
                "Lock command cannot be empty".to_string(),
            ));
        }

        if self.lock_command.contains(['\'', '"']) {
            return Err(ConfigError::ValidationFailed(
                "Lock command cannot contain quotes; wrap quoted arguments in a script".to_string(),
            ));
        }

        if self.container_engine.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Container engine cannot be empty".to_string(),
            ));
        }

        if let Some(platform) = &self.platform {
            if !platform.contains('/') {
                return Err(ConfigError::ParseError {
                    field: "platform".to_string(),
                    error: format!("expected os/arch, got '{}'", platform),
                });
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    /// Whether the base image should be resolved from the detected framework
    pub fn base_image_is_auto(&self) -> bool {
        self.base_image.is_empty() || self.base_image == AUTO_BASE_IMAGE
    }

    /// Target platform, defaulting to the host's `linux/<arch>`
    pub fn target_platform(&self) -> String {
        self.platform
            .clone()
            .unwrap_or_else(|| format!("linux/{}", host_arch()))
    }

    /// Architecture component of the target platform
    pub fn target_arch(&self) -> String {
        let platform = self.target_platform();
        let arch = platform.split('/').nth(1).unwrap_or(platform.as_str());
        normalize_arch(arch).to_string()
    }

    /// Path of the environment directory for a given project root
    pub fn env_dir(&self, project_root: &std::path::Path) -> PathBuf {
        project_root.join(&self.env_dir_name)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();

        map.insert("env_dir".to_string(), self.env_dir_name.clone());
        map.insert("timezone".to_string(), self.timezone.clone());
        map.insert("base_image".to_string(), self.base_image.clone());
        map.insert("platform".to_string(), self.target_platform());
        map.insert("registry_url".to_string(), self.registry_url.clone());
        map.insert("lock_command".to_string(), self.lock_command.clone());
        map.insert(
            "container_engine".to_string(),
            self.container_engine.clone(),
        );
        map.insert("port_map".to_string(), self.port_map.to_string());
        map.insert("sbom_format".to_string(), self.sbom_format.to_string());
        map.insert("cache".to_string(), self.cache.to_string());
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

/// Host CPU architecture in container platform notation
pub fn host_arch() -> &'static str {
    normalize_arch(env::consts::ARCH)
}

fn normalize_arch(arch: &str) -> &str {
    match arch {
        "x86_64" | "x64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}

impl fmt::Display for OgreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Miniogre Configuration:")?;
        writeln!(f, "  Environment Dir: {}", self.env_dir_name)?;
        writeln!(f, "  Base Image: {}", self.base_image)?;
        writeln!(f, "  Platform: {}", self.target_platform())?;
        writeln!(f, "  Timezone: {}", self.timezone)?;
        writeln!(f, "  Registry: {}", self.registry_url)?;
        writeln!(f, "  Lock Command: {}", self.lock_command)?;
        writeln!(f, "  Container Engine: {}", self.container_engine)?;
        writeln!(f, "  Port Map: {}", self.port_map)?;
        writeln!(f, "  SBOM Format: {}", self.sbom_format)?;
        writeln!(f, "  Build Cache: {}", self.cache)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
