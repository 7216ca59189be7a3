//! Environment synthesis: Dockerfile, bootstrap profile and base-image passphrase
//!
//! Dockerfiles are built as a typed [`DockerfileSpec`] and rendered by a single
//! function. A project that already ships a root `Dockerfile` gets it copied
//! byte-for-byte instead; its authors own dependency installation.

pub mod bashrc;
pub mod passphrase;
pub mod templates;

pub use bashrc::{write_bashrc, WelcomeInfo, BASHRC};
pub use passphrase::{generate_passphrase, Passphrase, PassphraseSource};
pub use templates::TemplateInputs;

use crate::config::OgreConfig;
use crate::stack::FrameworkId;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const DOCKERFILE: &str = "Dockerfile";

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Base-image mode requires a passphrase")]
    MissingPassphrase,
}

/// Caller intent; the three modes are mutually exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    Standard,
    /// No dependency installation at all
    Dry,
    /// Shared ogre base image with a non-root user
    BaseImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Generic,
    NodeFramework,
    Dry,
    BaseImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Run(String),
    Copy { src: String, dest: String },
    Env { key: String, value: String },
    User(String),
}

impl Instruction {
    pub fn run(command: impl Into<String>) -> Self {
        Instruction::Run(command.into())
    }

    pub fn copy(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Instruction::Copy {
            src: src.into(),
            dest: dest.into(),
        }
    }
}

/// Typed Dockerfile model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerfileSpec {
    pub template: TemplateKind,
    pub base_image: String,
    pub workdir: String,
    /// Emitted right after `FROM`
    pub env: Vec<(String, String)>,
    pub steps: Vec<Instruction>,
}

impl DockerfileSpec {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "FROM {}", self.base_image);
        for (key, value) in &self.env {
            let _ = writeln!(out, "ENV {}={}", key, value);
        }
        let _ = writeln!(out, "WORKDIR {}", self.workdir);
        for step in &self.steps {
            let _ = match step {
                Instruction::Run(command) => writeln!(out, "RUN {}", command),
                Instruction::Copy { src, dest } => writeln!(out, "COPY {} {}", src, dest),
                Instruction::Env { key, value } => writeln!(out, "ENV {}={}", key, value),
                Instruction::User(user) => writeln!(out, "USER {}", user),
            };
        }
        out
    }
}

/// Explicit override, then Node image for Node frameworks, then the arch-specific generic image
pub fn resolve_base_image(config: &OgreConfig, framework: Option<FrameworkId>) -> String {
    if !config.base_image_is_auto() {
        return config.base_image.clone();
    }

    match framework {
        Some(f) if f.is_node_family() => config.node_base_image.clone(),
        _ => config
            .base_image_template
            .replace("{arch}", &config.target_arch()),
    }
}

/// Where the synthesized Dockerfile came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DockerfileSource {
    Copied { from: PathBuf },
    Generated { template: TemplateKind },
}

pub struct DockerfileRequest<'a> {
    pub project_root: &'a Path,
    pub env_dir: &'a Path,
    pub mode: SynthesisMode,
    pub framework: Option<FrameworkId>,
    pub inputs: TemplateInputs,
    pub passphrase: Option<&'a str>,
}

/// Selects the template for a request, `None` when an existing Dockerfile is reused
pub fn select_template(request: &DockerfileRequest<'_>) -> Option<TemplateKind> {
    match request.mode {
        SynthesisMode::Dry => Some(TemplateKind::Dry),
        SynthesisMode::BaseImage => Some(TemplateKind::BaseImage),
        SynthesisMode::Standard => {
            if request.project_root.join(DOCKERFILE).is_file() {
                None
            } else if request.framework.map(|f| f.is_node_family()).unwrap_or(false) {
                Some(TemplateKind::NodeFramework)
            } else {
                Some(TemplateKind::Generic)
            }
        }
    }
}

/// Writes `<env_dir>/Dockerfile`, by copy or by rendering a template
pub fn write_dockerfile(
    request: &DockerfileRequest<'_>,
) -> Result<(PathBuf, DockerfileSource), SynthesisError> {
    let target = request.env_dir.join(DOCKERFILE);

    let template = match select_template(request) {
        Some(template) => template,
        None => {
            let existing = request.project_root.join(DOCKERFILE);
            info!(path = %existing.display(), "Dockerfile exists, copying it verbatim");
            fs::copy(&existing, &target).map_err(|source| SynthesisError::Copy {
                from: existing.clone(),
                to: target.clone(),
                source,
            })?;
            return Ok((target, DockerfileSource::Copied { from: existing }));
        }
    };

    let spec = match template {
        TemplateKind::Generic => templates::generic(&request.inputs),
        TemplateKind::NodeFramework => templates::node_framework(&request.inputs),
        TemplateKind::Dry => templates::dry(&request.inputs),
        TemplateKind::BaseImage => {
            let passphrase = request.passphrase.ok_or(SynthesisError::MissingPassphrase)?;
            templates::base_image(&request.inputs, passphrase)
        }
    };

    info!(
        template = ?template,
        base_image = %spec.base_image,
        "Generating Dockerfile"
    );
    fs::write(&target, spec.render()).map_err(|source| SynthesisError::Write {
        path: target.clone(),
        source,
    })?;

    Ok((target, DockerfileSource::Generated { template }))
}
