use super::imports::REQUIREMENTS_FILE;
use crate::dockerfile::SynthesisMode;
use crate::engine::{generate_sbom, SbomOutcome, SbomRequest};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::StageStatus;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

pub struct SbomPhase;

#[async_trait]
impl WorkflowPhase for SbomPhase {
    fn name(&self) -> &'static str {
        "sbom"
    }

    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus> {
        if context.options.mode == SynthesisMode::BaseImage {
            return Ok(StageStatus::skipped("base-image mode"));
        }

        let env_dir = context.ensure_env_dir()?;
        let manifest_path = env_dir.join(REQUIREMENTS_FILE);
        let request = SbomRequest {
            format: context.config.sbom_format,
            project_root: context.project_root.clone(),
            env_dir,
            manifest: manifest_path.is_file().then_some(manifest_path),
            packages: context
                .manifest
                .as_ref()
                .map(|m| m.package_names())
                .unwrap_or_default(),
        };

        let outcome = generate_sbom(&request).await;
        let status = match &outcome {
            SbomOutcome::Written { path } => {
                info!(path = %path.display(), format = %request.format, "SBOM written");
                StageStatus::Complete
            }
            SbomOutcome::Failed { reason } => StageStatus::degraded(reason.clone()),
        };
        context.sbom = Some(outcome);
        Ok(status)
    }
}
