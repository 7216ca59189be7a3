//! Container engine orchestration: image build, interactive run and SBOM reports
//!
//! Every operation here is a single subprocess invocation whose exit status is
//! the only thing interpreted. Failures are folded into outcome values
//! ([`BuildOutcome::Failed`], [`RunOutcome::Failed`], [`SbomOutcome::Failed`])
//! so that callers can log them and keep going.

mod docker;
mod sbom;

pub use docker::{check_docker_daemon, DockerCli};
pub use sbom::{generate_sbom, sbom_invocation, SbomRequest};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Repository prefix of every image miniogre builds
pub const IMAGE_REPOSITORY: &str = "miniogre";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid port mapping '{0}': expected HOST:CONTAINER or H1-H2:C1-C2")]
    InvalidPortMap(String),

    #[error("Unknown SBOM format '{0}': expected pip-licenses or cyclonedx")]
    UnknownSbomFormat(String),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Container engine unavailable: {0}")]
    Unavailable(String),
}

/// Lowercases a project name and replaces anything outside `[a-z0-9_.-]` with `-`
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "project".to_string()
    } else {
        sanitized
    }
}

/// `miniogre/<name>:latest`
pub fn image_tag(name: &str) -> String {
    format!("{}/{}:latest", IMAGE_REPOSITORY, sanitize_name(name))
}

/// `miniogre-<name>`
pub fn container_name(name: &str) -> String {
    format!("{}-{}", IMAGE_REPOSITORY, sanitize_name(name))
}

/// Inclusive port range; a single port has `start == end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    fn span(&self) -> u16 {
        self.end - self.start
    }

    fn parse(input: &str) -> Option<Self> {
        match input.split_once('-') {
            Some((start, end)) => {
                let start = start.trim().parse().ok()?;
                let end = end.trim().parse().ok()?;
                (start <= end).then_some(Self { start, end })
            }
            None => {
                let port = input.trim().parse().ok()?;
                Some(Self {
                    start: port,
                    end: port,
                })
            }
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Host to container port publication, rendered as the engine's `-p` value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host: PortRange,
    pub container: PortRange,
}

impl PortMapping {
    pub fn single(host: u16, container: u16) -> Self {
        Self {
            host: PortRange {
                start: host,
                end: host,
            },
            container: PortRange {
                start: container,
                end: container,
            },
        }
    }
}

impl FromStr for PortMapping {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidPortMap(s.to_string());

        let (host, container) = s.split_once(':').ok_or_else(invalid)?;
        let host = PortRange::parse(host).ok_or_else(invalid)?;
        let container = PortRange::parse(container).ok_or_else(invalid)?;

        if host.span() != container.span() {
            return Err(invalid());
        }

        Ok(Self { host, container })
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// Report tool used for the software bill of materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SbomFormat {
    /// Dependency license list (`pip-licenses`)
    PipLicenses,
    /// Dependency component list (`cyclonedx-py`)
    #[serde(rename = "cyclonedx")]
    CycloneDx,
}

impl FromStr for SbomFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pip-licenses" => Ok(Self::PipLicenses),
            "cyclonedx" => Ok(Self::CycloneDx),
            _ => Err(EngineError::UnknownSbomFormat(s.to_string())),
        }
    }
}

impl fmt::Display for SbomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PipLicenses => f.write_str("pip-licenses"),
            Self::CycloneDx => f.write_str("cyclonedx"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub dockerfile: PathBuf,
    /// Build context, always the project root
    pub context_dir: PathBuf,
    pub tag: String,
    pub platform: String,
    pub cache: bool,
    /// Plain progress streamed to the terminal instead of captured
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildOutcome {
    Built { tag: String },
    Failed { reason: String, log: String },
}

impl BuildOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self, Self::Built { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub tag: String,
    pub container_name: String,
    pub project_root: PathBuf,
    /// Mount point of the project inside the container
    pub mount_target: String,
    pub port_map: PortMapping,
    pub command: Vec<String>,
}

impl RunRequest {
    /// Mounts `project_root` at `/opt/<project name>`, like the generated Dockerfile's workdir
    pub fn for_project(
        project_root: &Path,
        project_name: &str,
        port_map: PortMapping,
        command: &[&str],
    ) -> Self {
        Self {
            tag: image_tag(project_name),
            container_name: container_name(project_name),
            project_root: project_root.to_path_buf(),
            mount_target: format!("/opt/{}", project_name),
            port_map,
            command: command.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Exited { code: i32 },
    Failed { reason: String },
}

impl RunOutcome {
    /// The container could not be started at all
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SbomOutcome {
    Written { path: PathBuf },
    Failed { reason: String },
}

/// Container engine seam; the pipeline only ever talks to this trait
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn build(&self, request: &BuildRequest) -> BuildOutcome;

    async fn run(&self, request: &RunRequest) -> RunOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_port() {
        let mapping: PortMapping = "8001:8001".parse().unwrap();
        assert_eq!(mapping, PortMapping::single(8001, 8001));
        assert_eq!(mapping.to_string(), "8001:8001");
    }

    #[test]
    fn test_parse_port_range() {
        let mapping: PortMapping = "8000-8010:9000-9010".parse().unwrap();
        assert_eq!(mapping.host.start, 8000);
        assert_eq!(mapping.container.end, 9010);
        assert_eq!(mapping.to_string(), "8000-8010:9000-9010");
    }

    #[test]
    fn test_reject_malformed_port_maps() {
        for bad in ["8001", "a:b", "8000-8010:9000", "8010-8000:9010-9000", "70000:1"] {
            assert!(bad.parse::<PortMapping>().is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_sbom_format_parse_and_display() {
        assert_eq!(
            "pip-licenses".parse::<SbomFormat>().unwrap(),
            SbomFormat::PipLicenses
        );
        assert_eq!("CycloneDX".parse::<SbomFormat>().unwrap(), SbomFormat::CycloneDx);
        assert!("spdx".parse::<SbomFormat>().is_err());
        assert_eq!(SbomFormat::CycloneDx.to_string(), "cyclonedx");
    }

    #[test]
    fn test_deterministic_names() {
        assert_eq!(image_tag("My Project"), "miniogre/my-project:latest");
        assert_eq!(container_name("My Project"), "miniogre-my-project");
        assert_eq!(sanitize_name("api_v2.1"), "api_v2.1");
        assert_eq!(sanitize_name(""), "project");
    }

    #[test]
    fn test_run_request_for_project() {
        let request = RunRequest::for_project(
            Path::new("/work/demo"),
            "demo",
            PortMapping::single(8001, 8001),
            &["npm", "start"],
        );
        assert_eq!(request.tag, "miniogre/demo:latest");
        assert_eq!(request.container_name, "miniogre-demo");
        assert_eq!(request.mount_target, "/opt/demo");
        assert_eq!(request.command, vec!["npm", "start"]);
    }
}
