use crate::engine::{image_tag, BuildOutcome, BuildRequest};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::{PipelineError, StageStatus};
use anyhow::Result;
use async_trait::async_trait;

pub struct BuildPhase;

#[async_trait]
impl WorkflowPhase for BuildPhase {
    fn name(&self) -> &'static str {
        "build"
    }

    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus> {
        if context.options.no_container {
            return Ok(StageStatus::skipped("--no-container"));
        }
        let synthesized = context
            .synthesized
            .as_ref()
            .ok_or(PipelineError::MissingInput {
                stage: "build",
                requires: "synthesize",
            })?;

        let request = BuildRequest {
            dockerfile: synthesized.dockerfile.clone(),
            context_dir: context.project_root.clone(),
            tag: image_tag(context.image_name()),
            platform: context.config.target_platform(),
            cache: context.config.cache,
            verbose: context.config.verbose,
        };

        let outcome = context.engine.build(&request).await;
        let status = match &outcome {
            BuildOutcome::Built { .. } => StageStatus::Complete,
            BuildOutcome::Failed { reason, .. } => StageStatus::degraded(reason.clone()),
        };
        context.build = Some(outcome);
        Ok(status)
    }
}
