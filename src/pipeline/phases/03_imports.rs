use crate::dockerfile::SynthesisMode;
use crate::extractors::{extract_python_imports, ProjectImports};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::{PipelineError, StageStatus};
use crate::stack::LanguageId;
use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use tracing::{info, warn};

pub const REQUIREMENTS_FILE: &str = "requirements.txt";

pub struct ImportsPhase;

#[async_trait]
impl WorkflowPhase for ImportsPhase {
    fn name(&self) -> &'static str {
        "imports"
    }

    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus> {
        if context.options.mode == SynthesisMode::Dry {
            return Ok(StageStatus::skipped("dry mode"));
        }

        if context.options.reuse_requirements {
            let existing = context.project_root.join(REQUIREMENTS_FILE);
            if existing.is_file() {
                match fs::read_to_string(&existing) {
                    Ok(content) => {
                        info!(path = %existing.display(), "Reusing existing requirements.txt");
                        context.requirement_list = Some(content);
                        return Ok(StageStatus::skipped("reusing requirements.txt"));
                    }
                    Err(e) => warn!(
                        path = %existing.display(),
                        error = %e,
                        "Failed to read requirements.txt, generating from imports"
                    ),
                }
            }
        }

        let scan = context.scan.as_ref().ok_or(PipelineError::MissingInput {
            stage: "imports",
            requires: "scan",
        })?;
        let primary = context
            .environment
            .as_ref()
            .and_then(|env| env.primary_language);

        if primary != Some(LanguageId::Python) {
            let language = primary.map(|l| l.name()).unwrap_or("unknown");
            context.imports = Some(ProjectImports::default());
            return Ok(StageStatus::skipped(format!(
                "no import extractor for {} projects",
                language
            )));
        }

        let mut files = scan.files_with_extension("py");
        files.extend(scan.files_with_extension("ipynb"));
        let imports = extract_python_imports(&files)?;

        let status = if imports.skipped_files.is_empty() {
            StageStatus::Complete
        } else {
            StageStatus::degraded(format!(
                "{} file(s) could not be parsed",
                imports.skipped_files.len()
            ))
        };
        context.imports = Some(imports);
        Ok(status)
    }
}
