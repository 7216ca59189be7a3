//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { project_path } => {
                info!(project = %project_path, "Starting miniogre");
            }
            ProgressEvent::StageStarted { stage } => {
                info!(stage = %stage, "Starting stage");
            }
            ProgressEvent::StageComplete { stage, duration } => {
                debug!(
                    stage = %stage,
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::StageDegraded { stage, reason } => {
                warn!(stage = %stage, reason = %reason, "Stage completed with degraded output");
            }
            ProgressEvent::StageSkipped { stage, reason } => {
                info!(stage = %stage, reason = %reason, "Stage skipped");
            }
            ProgressEvent::Completed { stages, total_time } => {
                info!(
                    stages,
                    total_time_ms = total_time.as_millis(),
                    "Done"
                );
            }
            ProgressEvent::Failed { error } => {
                error!(error = %error, "Run failed");
            }
        }
    }
}
