use super::context::PipelineContext;
use super::phase_trait::WorkflowPhase;
use super::phases::{
    BuildPhase, DetectPhase, ImportsPhase, LockPhase, ResolvePhase, RunPhase, SbomPhase,
    ScanPhase, SynthesizePhase,
};
use super::report::{RunReport, StageStatus};
use crate::progress::{ProgressEvent, ProgressHandler};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Named stage sequences, one per CLI entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    /// Scan through run
    Run,
    /// Scan through lock
    Requirements,
    /// Scan through resolve
    Detect,
    /// Start a container from an image built earlier
    Spinup,
    /// Base-image synthesis and build
    BaseImage,
}

impl Workflow {
    pub fn phases(self) -> Vec<Box<dyn WorkflowPhase>> {
        match self {
            Workflow::Run => vec![
                Box::new(ScanPhase),
                Box::new(DetectPhase),
                Box::new(ImportsPhase),
                Box::new(ResolvePhase),
                Box::new(LockPhase),
                Box::new(SynthesizePhase),
                Box::new(SbomPhase),
                Box::new(BuildPhase),
                Box::new(RunPhase),
            ],
            Workflow::Requirements => vec![
                Box::new(ScanPhase),
                Box::new(DetectPhase),
                Box::new(ImportsPhase),
                Box::new(ResolvePhase),
                Box::new(LockPhase),
            ],
            Workflow::Detect => vec![
                Box::new(ScanPhase),
                Box::new(DetectPhase),
                Box::new(ImportsPhase),
                Box::new(ResolvePhase),
            ],
            Workflow::Spinup => vec![
                Box::new(ScanPhase),
                Box::new(DetectPhase),
                Box::new(RunPhase),
            ],
            Workflow::BaseImage => vec![Box::new(SynthesizePhase), Box::new(BuildPhase)],
        }
    }
}

pub struct PipelineOrchestrator {
    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl PipelineOrchestrator {
    pub fn new(progress_handler: Option<Arc<dyn ProgressHandler>>) -> Self {
        Self { progress_handler }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }

    /// Runs every stage of `workflow` in order. Degraded and skipped stages do
    /// not stop the run; an error does.
    pub async fn execute(
        &self,
        workflow: Workflow,
        context: &mut PipelineContext,
    ) -> Result<RunReport> {
        let start = Instant::now();
        info!(
            project = %context.project_root.display(),
            workflow = ?workflow,
            "Starting pipeline"
        );
        self.emit(ProgressEvent::Started {
            project_path: context.project_root.display().to_string(),
        });

        let mut report = RunReport::new(&context.project_name, context.project_root.clone());

        for phase in workflow.phases() {
            let name = phase.name();
            self.emit(ProgressEvent::StageStarted {
                stage: name.to_string(),
            });

            let phase_start = Instant::now();
            let status = match phase
                .execute(context)
                .await
                .with_context(|| format!("Stage {} failed", name))
            {
                Ok(status) => status,
                Err(e) => {
                    self.emit(ProgressEvent::Failed {
                        error: format!("{:#}", e),
                    });
                    return Err(e);
                }
            };
            let duration = phase_start.elapsed();

            match &status {
                StageStatus::Complete => self.emit(ProgressEvent::StageComplete {
                    stage: name.to_string(),
                    duration,
                }),
                StageStatus::Degraded { reason } => self.emit(ProgressEvent::StageDegraded {
                    stage: name.to_string(),
                    reason: reason.clone(),
                }),
                StageStatus::Skipped { reason } => self.emit(ProgressEvent::StageSkipped {
                    stage: name.to_string(),
                    reason: reason.clone(),
                }),
            }
            debug!(stage = name, status = ?status, "Stage finished");
            report.record(name, status, duration);
        }

        let total_time = start.elapsed();
        report.total_ms = total_time.as_millis() as u64;
        self.emit(ProgressEvent::Completed {
            stages: report.stages.len(),
            total_time,
        });
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OgreConfig;
    use crate::engine::{BuildOutcome, BuildRequest, ContainerEngine, RunOutcome, RunRequest};
    use crate::pipeline::context::RunOptions;
    use crate::resolver::{PackageIndex, RegistryError};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct RecordingHandler(Mutex<Vec<String>>);

    impl ProgressHandler for RecordingHandler {
        fn on_progress(&self, event: &ProgressEvent) {
            let label = match event {
                ProgressEvent::StageStarted { stage } => format!("start:{}", stage),
                ProgressEvent::StageSkipped { stage, .. } => format!("skip:{}", stage),
                ProgressEvent::Failed { .. } => "failed".to_string(),
                _ => return,
            };
            self.0.lock().unwrap().push(label);
        }
    }

    struct NoIndex;

    #[async_trait]
    impl PackageIndex for NoIndex {
        async fn exists(&self, _name: &str) -> Result<bool, RegistryError> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct FakeEngine {
        builds: Mutex<Vec<String>>,
        runs: Mutex<Vec<Vec<String>>>,
        fail_build: bool,
    }

    #[async_trait]
    impl ContainerEngine for FakeEngine {
        fn name(&self) -> &str {
            "fake"
        }

        async fn build(&self, request: &BuildRequest) -> BuildOutcome {
            self.builds.lock().unwrap().push(request.tag.clone());
            if self.fail_build {
                BuildOutcome::Failed {
                    reason: "daemon unreachable".to_string(),
                    log: String::new(),
                }
            } else {
                BuildOutcome::Built {
                    tag: request.tag.clone(),
                }
            }
        }

        async fn run(&self, request: &RunRequest) -> RunOutcome {
            self.runs.lock().unwrap().push(request.command.clone());
            RunOutcome::Exited { code: 0 }
        }
    }

    fn context(root: &std::path::Path, engine: Arc<FakeEngine>) -> PipelineContext {
        let mut config = OgreConfig::default();
        config.interpreter = "miniogre-no-such-python".to_string();
        config.site_packages = vec![root.join("no-site-packages")];
        config.lock_command = "miniogre-no-such-locker".to_string();
        config.sbom_format = crate::engine::SbomFormat::CycloneDx;
        PipelineContext::new(root, config)
            .unwrap()
            .with_index(Arc::new(NoIndex))
            .with_engine(engine)
    }

    #[test]
    fn test_workflow_stage_order() {
        let names: Vec<_> = Workflow::Run.phases().iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                "scan", "detect", "imports", "resolve", "lock", "synthesize", "sbom", "build",
                "run"
            ]
        );
        let names: Vec<_> = Workflow::BaseImage.phases().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["synthesize", "build"]);
    }

    #[tokio::test]
    async fn test_run_workflow_builds_and_runs() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("main.py"), "import os\n").unwrap();
        let engine = Arc::new(FakeEngine::default());
        let mut context = context(temp.path(), engine.clone());

        let report = PipelineOrchestrator::new(None)
            .execute(Workflow::Run, &mut context)
            .await
            .unwrap();

        assert_eq!(report.stages.len(), 9);
        assert_eq!(report.status_of("build"), Some(&StageStatus::Complete));
        assert_eq!(engine.builds.lock().unwrap().len(), 1);
        assert_eq!(*engine.runs.lock().unwrap(), vec![vec!["bash".to_string()]]);
    }

    #[tokio::test]
    async fn test_failed_build_skips_run() {
        let temp = TempDir::new().unwrap();
        let engine = Arc::new(FakeEngine {
            fail_build: true,
            ..Default::default()
        });
        let mut context = context(temp.path(), engine.clone());

        let report = PipelineOrchestrator::new(None)
            .execute(Workflow::Run, &mut context)
            .await
            .unwrap();

        assert!(matches!(
            report.status_of("build"),
            Some(StageStatus::Degraded { .. })
        ));
        assert!(matches!(report.status_of("run"), Some(StageStatus::Skipped { .. })));
        assert!(engine.runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_container_emits_skips() {
        let temp = TempDir::new().unwrap();
        let engine = Arc::new(FakeEngine::default());
        let handler = Arc::new(RecordingHandler(Mutex::new(Vec::new())));
        let mut context = context(temp.path(), engine.clone()).with_options(RunOptions {
            no_container: true,
            ..Default::default()
        });

        PipelineOrchestrator::new(Some(handler.clone()))
            .execute(Workflow::Run, &mut context)
            .await
            .unwrap();

        let events = handler.0.lock().unwrap().clone();
        assert!(events.contains(&"skip:build".to_string()));
        assert!(events.contains(&"skip:run".to_string()));
        assert!(engine.builds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_env_dir_aborts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("main.py"), "import os\n").unwrap();
        let engine = Arc::new(FakeEngine::default());
        let handler = Arc::new(RecordingHandler(Mutex::new(Vec::new())));
        let mut context = context(temp.path(), engine.clone());
        fs::write(context.env_dir(), "occupied").unwrap();

        let result = PipelineOrchestrator::new(Some(handler.clone()))
            .execute(Workflow::Run, &mut context)
            .await;

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Stage lock failed"));
        assert_eq!(handler.0.lock().unwrap().last().map(String::as_str), Some("failed"));
        assert!(engine.builds.lock().unwrap().is_empty());
    }
}
