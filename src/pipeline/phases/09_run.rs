use crate::engine::{RunOutcome, RunRequest};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::StageStatus;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

const SHELL_COMMAND: &[&str] = &["bash"];

pub struct RunPhase;

impl RunPhase {
    /// `npm start` for Node frameworks, an interactive shell otherwise
    pub fn entry_command(context: &PipelineContext) -> &'static [&'static str] {
        context
            .environment
            .as_ref()
            .and_then(|env| env.framework)
            .map(|f| f.entry_command())
            .unwrap_or(SHELL_COMMAND)
    }
}

#[async_trait]
impl WorkflowPhase for RunPhase {
    fn name(&self) -> &'static str {
        "run"
    }

    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus> {
        if context.options.no_container {
            return Ok(StageStatus::skipped("--no-container"));
        }
        if matches!(context.build, Some(ref build) if !build.is_built()) {
            return Ok(StageStatus::skipped("image was not built"));
        }

        let request = RunRequest::for_project(
            &context.project_root,
            context.image_name(),
            context.config.port_map,
            Self::entry_command(context),
        );

        let outcome = context.engine.run(&request).await;
        let status = match &outcome {
            RunOutcome::Exited { code } => {
                info!(container = %request.container_name, code, "Container exited");
                StageStatus::Complete
            }
            RunOutcome::Failed { reason } => StageStatus::degraded(reason.clone()),
        };
        context.run = Some(outcome);
        Ok(status)
    }
}
