use crate::dockerfile::{
    generate_passphrase, resolve_base_image, write_bashrc, write_dockerfile, DockerfileRequest,
    DockerfileSource, PassphraseSource, SynthesisMode, TemplateInputs, WelcomeInfo,
};
use crate::pipeline::context::{PipelineContext, BASE_IMAGE_PROJECT_NAME};
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::{PipelineError, StageStatus};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Files written to the environment directory by synthesis
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedEnvironment {
    pub dockerfile: PathBuf,
    pub source: DockerfileSource,
    pub bashrc: PathBuf,
    pub bashrc_from_project: bool,
    pub base_image: String,
    /// Base-image mode only
    #[serde(skip_serializing)]
    pub passphrase: Option<String>,
}

pub struct SynthesizePhase;

#[async_trait]
impl WorkflowPhase for SynthesizePhase {
    fn name(&self) -> &'static str {
        "synthesize"
    }

    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus> {
        let env_dir = context.ensure_env_dir()?;
        let mode = context.options.mode;
        let framework = match mode {
            SynthesisMode::BaseImage => None,
            _ => context.environment.as_ref().and_then(|env| env.framework),
        };

        let mut status = StageStatus::Complete;
        let passphrase = if mode == SynthesisMode::BaseImage {
            let passphrase = generate_passphrase(
                &context.config.wordlist_url,
                context.config.passphrase_words,
                context.config.registry_timeout(),
            )
            .await;
            if passphrase.source == PassphraseSource::Random {
                status = StageStatus::degraded("word list unavailable, random passphrase used");
            }
            Some(passphrase.value)
        } else {
            None
        };

        let welcome = WelcomeInfo::collect(&context.project_root).await;
        let (bashrc, bashrc_from_project) =
            write_bashrc(&context.project_root, &env_dir, &welcome).map_err(PipelineError::from)?;

        let base_image = resolve_base_image(&context.config, framework);
        let project_name = match mode {
            SynthesisMode::BaseImage => BASE_IMAGE_PROJECT_NAME.to_string(),
            _ => context.project_name.clone(),
        };
        let request = DockerfileRequest {
            project_root: &context.project_root,
            env_dir: &env_dir,
            mode,
            framework,
            inputs: TemplateInputs {
                project_name,
                base_image: base_image.clone(),
                timezone: context.config.timezone.clone(),
                env_dir_name: context.config.env_dir_name.clone(),
            },
            passphrase: passphrase.as_deref(),
        };
        let (dockerfile, source) = write_dockerfile(&request).map_err(PipelineError::from)?;

        info!(
            dockerfile = %dockerfile.display(),
            base_image = %base_image,
            "Environment synthesized"
        );

        context.synthesized = Some(SynthesizedEnvironment {
            dockerfile,
            source,
            bashrc,
            bashrc_from_project,
            base_image,
            passphrase,
        });
        Ok(status)
    }
}
