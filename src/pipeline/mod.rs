//! Linear, single-invocation pipeline
//!
//! Stages run strictly in order and each one fully materializes its output in the
//! [`PipelineContext`] (and on disk, for the environment directory) before the next
//! one starts. Stages degrade instead of failing; only environment directory writes
//! abort a run.

pub mod context;
pub mod orchestrator;
pub mod phase_trait;
pub mod phases;
pub mod report;

pub use context::{PipelineContext, RunOptions};
pub use orchestrator::{PipelineOrchestrator, Workflow};
pub use phase_trait::WorkflowPhase;
pub use report::{PipelineError, RunReport, StageReport, StageStatus};
