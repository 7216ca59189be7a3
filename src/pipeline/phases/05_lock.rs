use crate::dockerfile::SynthesisMode;
use crate::llm::clean_requirement_list;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::{PipelineError, StageStatus};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::imports::REQUIREMENTS_FILE;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lock command is empty")]
    EmptyCommand,

    #[error("Lock command '{0}' contains quotes; arguments are split on whitespace, use a script for quoted arguments")]
    QuotedCommand(String),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock command exited with {code:?} for '{requirement}': {stderr}")]
    CommandFailed {
        requirement: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// External lock tool invocation, e.g. `uv pip compile - --no-header`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LockCommand {
    /// Splits on whitespace. Quotes are rejected rather than passed through verbatim.
    pub fn parse(command: &str) -> Result<Self, LockError> {
        if command.contains(['\'', '"']) {
            return Err(LockError::QuotedCommand(command.trim().to_string()));
        }
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(LockError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// Pinned requirement lines, sorted and distinct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequirementsManifest {
    pub lines: BTreeSet<String>,
}

impl RequirementsManifest {
    /// Keeps non-blank lines that are not comments
    pub fn extend_from_output(&mut self, output: &str) {
        self.lines.extend(
            output
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string),
        );
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Bare package names, without pins, extras or markers
    pub fn package_names(&self) -> Vec<String> {
        let Some(pattern) = requirement_name_pattern() else {
            return Vec::new();
        };
        let names: BTreeSet<String> = self
            .lines
            .iter()
            .filter_map(|line| pattern.captures(line))
            .filter_map(|captures| captures.get(1))
            .map(|name| name.as_str().to_string())
            .collect();
        names.into_iter().collect()
    }

    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(REQUIREMENTS_FILE);
        fs::write(&path, self.render())?;
        Ok(path)
    }
}

/// PEP 508 distribution name at the start of a requirement line. Editable and URL
/// lines (`-e ./pkg`, `git+https://...`) carry no name and never match.
fn requirement_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^\s*([a-z0-9](?:[a-z0-9._-]*[a-z0-9])?)\s*(?:$|[=<>!~;\[@ ])").ok())
        .as_ref()
}

#[derive(Debug, Default)]
pub struct LockResult {
    pub manifest: RequirementsManifest,
    pub failed: Vec<String>,
}

/// Pins a requirement list one line at a time so a single bad entry cannot
/// take down the whole manifest
pub struct RequirementsLocker {
    command: LockCommand,
}

impl RequirementsLocker {
    pub fn new(command: LockCommand) -> Self {
        Self { command }
    }

    pub async fn lock(&self, requirement_list: &str) -> LockResult {
        let mut result = LockResult::default();
        let mut seen = BTreeSet::new();

        for requirement in requirement_list
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
        {
            if !seen.insert(requirement) {
                continue;
            }
            match self.lock_one(requirement).await {
                Ok(output) => {
                    let before = result.manifest.len();
                    result.manifest.extend_from_output(&output);
                    debug!(
                        requirement,
                        added = result.manifest.len() - before,
                        "Requirement locked"
                    );
                }
                Err(e) => {
                    warn!(requirement, error = %e, "Failed to lock requirement, leaving it out");
                    result.failed.push(requirement.to_string());
                }
            }
        }

        result
    }

    async fn lock_one(&self, requirement: &str) -> Result<String, LockError> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LockError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let line = format!("{}\n", requirement);
            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                debug!(requirement, error = %e, "Lock command closed stdin early");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| LockError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(LockError::CommandFailed {
                requirement: requirement.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub struct LockPhase;

#[async_trait]
impl WorkflowPhase for LockPhase {
    fn name(&self) -> &'static str {
        "lock"
    }

    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus> {
        if context.options.mode == SynthesisMode::Dry {
            return Ok(StageStatus::skipped("dry mode"));
        }

        let mut requirement_list = context
            .requirement_list
            .clone()
            .ok_or(PipelineError::MissingInput {
                stage: "lock",
                requires: "resolve",
            })?;

        let mut notes = Vec::new();
        if let Some(generator) = context.generator.as_ref() {
            requirement_list = clean_requirement_list(generator.as_ref(), &requirement_list).await;
        } else if let Some(error) = context.cleaning_unavailable.as_ref() {
            warn!(error = %error, "Cleaning pass unavailable, locking uncleaned requirements");
            notes.push(format!("cleaning skipped: {}", error));
        }

        let command = LockCommand::parse(&context.config.lock_command)?;
        info!(program = %command.program, "Locking requirements");
        let result = RequirementsLocker::new(command).lock(&requirement_list).await;

        let env_dir = context.ensure_env_dir()?;
        let path = result
            .manifest
            .write_to(&env_dir)
            .map_err(|source| PipelineError::EnvironmentDir {
                path: env_dir.clone(),
                source,
            })?;
        info!(
            path = %path.display(),
            lines = result.manifest.len(),
            failed = result.failed.len(),
            "requirements.txt written"
        );

        context.manifest = Some(result.manifest);
        if !result.failed.is_empty() {
            notes.push(format!("could not lock: {}", result.failed.join(", ")));
        }
        if notes.is_empty() {
            Ok(StageStatus::Complete)
        } else {
            Ok(StageStatus::degraded(notes.join("; ")))
        }
    }
}
