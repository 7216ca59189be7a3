use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Project path is not a directory: {0}")]
    InvalidProject(PathBuf),

    #[error("Environment directory {path} is not writable: {source}")]
    EnvironmentDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Synthesis(#[from] crate::dockerfile::SynthesisError),

    #[error("Stage '{stage}' requires the output of '{requires}'")]
    MissingInput {
        stage: &'static str,
        requires: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Complete,
    Degraded { reason: String },
    Skipped { reason: String },
}

impl StageStatus {
    pub fn degraded(reason: impl Into<String>) -> Self {
        StageStatus::Degraded {
            reason: reason.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        StageStatus::Skipped {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    #[serde(flatten)]
    pub status: StageStatus,
    pub duration_ms: u64,
}

/// Outcome of every stage of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub project: String,
    pub project_root: PathBuf,
    pub stages: Vec<StageReport>,
    pub total_ms: u64,
}

impl RunReport {
    pub fn new(project: impl Into<String>, project_root: PathBuf) -> Self {
        Self {
            project: project.into(),
            project_root,
            stages: Vec::new(),
            total_ms: 0,
        }
    }

    pub fn record(&mut self, stage: &str, status: StageStatus, duration: Duration) {
        self.stages.push(StageReport {
            stage: stage.to_string(),
            status,
            duration_ms: duration.as_millis() as u64,
        });
    }

    pub fn status_of(&self, stage: &str) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| &s.status)
    }

    pub fn degraded_stages(&self) -> Vec<&StageReport> {
        self.stages
            .iter()
            .filter(|s| matches!(s.status, StageStatus::Degraded { .. }))
            .collect()
    }
}
