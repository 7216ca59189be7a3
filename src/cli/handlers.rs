//! Subcommand handlers; each returns the process exit code

use super::commands::{
    BaseImageArgs, CleanArgs, DetectArgs, RequirementsArgs, RunArgs, SpinupArgs,
};
use super::output::{DetectionReport, OutputFormat, OutputFormatter};
use crate::config::OgreConfig;
use crate::dockerfile::templates::BASE_IMAGE_USER;
use crate::dockerfile::SynthesisMode;
use crate::llm::{GenAiGenerator, LlmError, TextGenerator};
use crate::pipeline::phases::imports::REQUIREMENTS_FILE;
use crate::pipeline::{PipelineContext, PipelineOrchestrator, RunOptions, RunReport, Workflow};
use crate::progress::LoggingHandler;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

fn project_path(path: &Option<PathBuf>) -> PathBuf {
    path.clone().unwrap_or_else(|| PathBuf::from("."))
}

fn build_generator(clean: &CleanArgs) -> Result<Option<Arc<dyn TextGenerator>>, LlmError> {
    match clean.clean_with {
        Some(provider) => {
            let generator = GenAiGenerator::new(
                provider,
                clean.model.clone(),
                Duration::from_secs(clean.timeout),
            )?;
            Ok(Some(Arc::new(generator)))
        }
        None => Ok(None),
    }
}

fn prepare_context(
    path: &Path,
    config: OgreConfig,
    options: RunOptions,
    clean: Option<&CleanArgs>,
) -> Result<PipelineContext> {
    config.validate().context("Invalid configuration")?;
    debug!(config = %config, "Configuration loaded");

    let mut context = PipelineContext::new(path, config)?.with_options(options);
    if let Some(clean) = clean {
        match build_generator(clean) {
            Ok(Some(generator)) => context = context.with_generator(generator),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Cleaning disabled");
                context = context.with_cleaning_unavailable(e);
            }
        }
    }
    Ok(context)
}

async fn execute(workflow: Workflow, context: &mut PipelineContext) -> Result<RunReport> {
    PipelineOrchestrator::new(Some(Arc::new(LoggingHandler)))
        .execute(workflow, context)
        .await
}

fn print_report(report: &RunReport, quiet: bool) {
    if quiet {
        return;
    }
    match OutputFormatter::new(OutputFormat::Human).format_run_report(report) {
        Ok(text) => print!("{}", text),
        Err(e) => warn!(error = %e, "Failed to format run report"),
    }
}

pub async fn handle_run(args: &RunArgs, quiet: bool, verbose: bool) -> i32 {
    match run_pipeline(args, quiet, verbose).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

async fn run_pipeline(args: &RunArgs, quiet: bool, verbose: bool) -> Result<()> {
    let mut config = OgreConfig::default();
    if let Some(base_image) = &args.baseimage {
        config.base_image = base_image.clone();
    }
    if let Some(port_map) = args.port_map {
        config.port_map = port_map;
    }
    if let Some(format) = args.sbom_format {
        config.sbom_format = format;
    }
    if args.platform.is_some() {
        config.platform = args.platform.clone();
    }
    config.cache |= args.cache;
    config.verbose |= verbose;

    let options = RunOptions {
        mode: if args.dry {
            SynthesisMode::Dry
        } else {
            SynthesisMode::Standard
        },
        reuse_requirements: args.reuse_requirements,
        no_container: args.no_container,
        image_name: None,
    };

    let mut context = prepare_context(
        &project_path(&args.project_path),
        config,
        options,
        Some(&args.clean),
    )?;
    let report = execute(Workflow::Run, &mut context).await?;

    // A degraded build or SBOM still exits 0
    if !report.degraded_stages().is_empty() {
        warn!(
            degraded = report.degraded_stages().len(),
            "Run finished with degraded stages"
        );
    }
    print_report(&report, quiet);
    Ok(())
}

pub async fn handle_requirements(args: &RequirementsArgs, quiet: bool) -> i32 {
    let result = async {
        let options = RunOptions {
            reuse_requirements: args.reuse_requirements,
            ..Default::default()
        };
        let mut context = prepare_context(
            &project_path(&args.project_path),
            OgreConfig::default(),
            options,
            Some(&args.clean),
        )?;
        execute(Workflow::Requirements, &mut context).await?;
        Ok::<_, anyhow::Error>(context)
    }
    .await;

    match result {
        Ok(context) => {
            let path = context.env_dir().join(REQUIREMENTS_FILE);
            info!(path = %path.display(), "Requirements written");
            if !quiet {
                if let Some(manifest) = &context.manifest {
                    print!("{}", manifest.render());
                }
            }
            0
        }
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

pub async fn handle_detect(args: &DetectArgs) -> i32 {
    let result = async {
        let mut context = prepare_context(
            &project_path(&args.project_path),
            OgreConfig::default(),
            RunOptions::default(),
            None,
        )?;
        execute(Workflow::Detect, &mut context).await?;
        let report = DetectionReport::from_context(&context);
        OutputFormatter::new(args.format.into()).format_detection(&report)
    }
    .await;

    match result {
        Ok(text) => {
            println!("{}", text.trim_end());
            0
        }
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

pub async fn handle_spinup(args: &SpinupArgs) -> i32 {
    let result = async {
        let mut config = OgreConfig::default();
        if let Some(port_map) = args.port_map {
            config.port_map = port_map;
        }
        let mut context = prepare_context(
            &project_path(&args.project_path),
            config,
            RunOptions::default(),
            None,
        )?;
        execute(Workflow::Spinup, &mut context).await?;
        Ok::<_, anyhow::Error>(context)
    }
    .await;

    match result {
        Ok(context) if context.run.as_ref().map(|r| r.is_failed()).unwrap_or(false) => 1,
        Ok(_) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

pub async fn handle_build_base_image(args: &BaseImageArgs, quiet: bool, verbose: bool) -> i32 {
    let result = async {
        let mut config = OgreConfig::default();
        if let Some(base_image) = &args.baseimage {
            config.base_image = base_image.clone();
        }
        if let Some(words) = args.words {
            config.passphrase_words = words;
        }
        if args.platform.is_some() {
            config.platform = args.platform.clone();
        }
        config.cache |= args.cache;
        config.verbose |= verbose;

        let options = RunOptions {
            mode: SynthesisMode::BaseImage,
            image_name: Some(args.image_name.clone()),
            ..Default::default()
        };
        let mut context =
            prepare_context(&project_path(&args.project_path), config, options, None)?;
        let report = execute(Workflow::BaseImage, &mut context).await?;
        Ok::<_, anyhow::Error>((context, report))
    }
    .await;

    match result {
        Ok((context, report)) => {
            print_report(&report, quiet);
            if let Some(passphrase) = context
                .synthesized
                .as_ref()
                .and_then(|s| s.passphrase.as_deref())
            {
                println!("Passphrase for user '{}': {}", BASE_IMAGE_USER, passphrase);
            }
            match &context.build {
                Some(build) if build.is_built() => 0,
                _ => 1,
            }
        }
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}
