//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a pipeline run advances through its stages
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started for a project
    Started { project_path: String },

    /// A stage began executing
    StageStarted { stage: String },

    /// A stage finished and its output is materialized
    StageComplete { stage: String, duration: Duration },

    /// A stage finished with degraded output (external failure absorbed)
    StageDegraded { stage: String, reason: String },

    /// Stage skipped by caller intent (dry mode, `--no-container`, reuse)
    StageSkipped { stage: String, reason: String },

    /// Run finished
    Completed { stages: usize, total_time: Duration },

    /// Run aborted by a fatal error
    Failed { error: String },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
