use super::context::PipelineContext;
use super::report::StageStatus;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait WorkflowPhase: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Err` aborts the run; absorbed external failures come back as [`StageStatus::Degraded`]
    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus>;
}
