use crate::engine::{PortMapping, SbomFormat};
use crate::llm::parse_provider;
use crate::pipeline::context::DEFAULT_BASE_IMAGE_NAME;
use clap::{Args, Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;

/// Reproducible container environments inferred from a project's imports
#[derive(Parser, Debug)]
#[command(
    name = "miniogre",
    about = "Reproducible container environments inferred from a project's source imports",
    version,
    long_about = "miniogre scans a project, infers its third-party Python packages from import \
                  statements, pins them into requirements.txt, writes a Dockerfile and a shell \
                  profile into the environment directory, then builds and runs the image."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Verbose logging and plain build progress"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate the environment, build the image and open a shell in it",
        long_about = "Runs every stage: scan, detect, imports, resolve, lock, synthesize, SBOM, \
                      build and run.\n\n\
                      Examples:\n  \
                      miniogre run\n  \
                      miniogre run /path/to/project --no-container\n  \
                      miniogre run --dry --port-map 8000-8010:8000-8010"
    )]
    Run(RunArgs),

    #[command(
        about = "Write a pinned requirements.txt without building anything",
        long_about = "Runs scan, detect, imports, resolve and lock, leaving \
                      <env dir>/requirements.txt behind.\n\n\
                      Examples:\n  \
                      miniogre requirements\n  \
                      miniogre requirements --clean-with openai"
    )]
    Requirements(RequirementsArgs),

    #[command(
        about = "Report detected languages, framework and import resolution",
        long_about = "Runs scan, detect, imports and resolve and prints what was found. \
                      Nothing is written to the project.\n\n\
                      Examples:\n  \
                      miniogre detect\n  \
                      miniogre detect /path/to/project --format json"
    )]
    Detect(DetectArgs),

    #[command(about = "Start a container from an image built by an earlier run")]
    Spinup(SpinupArgs),

    #[command(
        about = "Build the shared ogre base image with a non-root sudo user",
        long_about = "Generates a base-image Dockerfile whose user password is a passphrase of \
                      random words, builds it and prints the passphrase.\n\n\
                      Examples:\n  \
                      miniogre build-base-image\n  \
                      miniogre build-base-image --baseimage ubuntu:22.04 --image-name ogre-base"
    )]
    BuildBaseImage(BaseImageArgs),
}

/// Optional language-model cleaning pass over the requirement list
#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    #[arg(
        long,
        value_name = "PROVIDER",
        value_parser = parse_adapter_kind,
        help = "Clean the requirement list with a language model before locking (openai, anthropic, gemini, groq, ollama, ...)"
    )]
    pub clean_with: Option<AdapterKind>,

    #[arg(long, value_name = "MODEL", requires = "clean_with", help = "Model for --clean-with")]
    pub model: Option<String>,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value = "60",
        help = "Language model request timeout in seconds"
    )]
    pub timeout: u64,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "PATH", help = "Project directory (defaults to current directory)")]
    pub project_path: Option<PathBuf>,

    #[arg(long, value_name = "IMAGE", help = "Base image override (default: auto)")]
    pub baseimage: Option<String>,

    #[arg(long, value_name = "HOST:CONTAINER", help = "Port mapping, e.g. 8001:8001 or 8000-8010:8000-8010")]
    pub port_map: Option<PortMapping>,

    #[arg(long, help = "Skip dependency inference and installation")]
    pub dry: bool,

    #[arg(long, help = "Lock the project's own requirements.txt instead of inferring one")]
    pub reuse_requirements: bool,

    #[arg(long, value_name = "FORMAT", help = "SBOM format: pip-licenses or cyclonedx")]
    pub sbom_format: Option<SbomFormat>,

    #[arg(long, help = "Generate files only; do not build or run a container")]
    pub no_container: bool,

    #[arg(long, help = "Use the build cache")]
    pub cache: bool,

    #[arg(long, value_name = "PLATFORM", help = "Target platform, e.g. linux/arm64")]
    pub platform: Option<String>,

    #[command(flatten)]
    pub clean: CleanArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RequirementsArgs {
    #[arg(value_name = "PATH", help = "Project directory (defaults to current directory)")]
    pub project_path: Option<PathBuf>,

    #[arg(long, help = "Lock the project's own requirements.txt instead of inferring one")]
    pub reuse_requirements: bool,

    #[command(flatten)]
    pub clean: CleanArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    #[arg(value_name = "PATH", help = "Project directory (defaults to current directory)")]
    pub project_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct SpinupArgs {
    #[arg(value_name = "PATH", help = "Project directory (defaults to current directory)")]
    pub project_path: Option<PathBuf>,

    #[arg(long, value_name = "HOST:CONTAINER", help = "Port mapping, e.g. 8001:8001")]
    pub port_map: Option<PortMapping>,
}

#[derive(Args, Debug, Clone)]
pub struct BaseImageArgs {
    #[arg(value_name = "PATH", help = "Directory holding the environment directory (defaults to current directory)")]
    pub project_path: Option<PathBuf>,

    #[arg(long, value_name = "IMAGE", help = "Image to build from (default: the ogre base for the platform)")]
    pub baseimage: Option<String>,

    #[arg(long, value_name = "NAME", default_value = DEFAULT_BASE_IMAGE_NAME, help = "Name of the resulting image")]
    pub image_name: String,

    #[arg(long, value_name = "N", help = "Number of words in the passphrase")]
    pub words: Option<usize>,

    #[arg(long, value_name = "PLATFORM", help = "Target platform, e.g. linux/arm64")]
    pub platform: Option<String>,

    #[arg(long, help = "Use the build cache")]
    pub cache: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    parse_provider(s).map_err(|e| {
        format!(
            "{}. Valid options: openai, anthropic, gemini, groq, xai, ollama",
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_run_args() {
        let args = CliArgs::parse_from(["miniogre", "run"]);
        match args.command {
            Commands::Run(run) => {
                assert!(run.project_path.is_none());
                assert!(run.port_map.is_none());
                assert!(!run.dry);
                assert!(!run.no_container);
                assert!(run.clean.clean_with.is_none());
                assert_eq!(run.clean.timeout, 60);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_options() {
        let args = CliArgs::parse_from([
            "miniogre",
            "run",
            "/tmp/project",
            "--port-map",
            "8000-8010:9000-9010",
            "--sbom-format",
            "cyclonedx",
            "--platform",
            "linux/arm64",
            "--no-container",
            "--reuse-requirements",
            "--clean-with",
            "openai",
            "--model",
            "gpt-4o",
        ]);
        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.project_path, Some(PathBuf::from("/tmp/project")));
                assert_eq!(run.port_map.unwrap().to_string(), "8000-8010:9000-9010");
                assert_eq!(run.sbom_format, Some(SbomFormat::CycloneDx));
                assert_eq!(run.platform.as_deref(), Some("linux/arm64"));
                assert!(run.no_container);
                assert!(run.reuse_requirements);
                assert_eq!(run.clean.clean_with, Some(AdapterKind::OpenAI));
                assert_eq!(run.clean.model.as_deref(), Some("gpt-4o"));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_rejects_bad_port_map() {
        assert!(CliArgs::try_parse_from(["miniogre", "run", "--port-map", "8001"]).is_err());
    }

    #[test]
    fn test_model_requires_provider() {
        assert!(CliArgs::try_parse_from(["miniogre", "requirements", "--model", "x"]).is_err());
    }

    #[test]
    fn test_detect_format() {
        let args = CliArgs::parse_from(["miniogre", "detect", "--format", "yaml"]);
        match args.command {
            Commands::Detect(detect) => assert_eq!(detect.format, OutputFormatArg::Yaml),
            _ => panic!("Expected Detect command"),
        }
    }

    #[test]
    fn test_build_base_image_defaults() {
        let args = CliArgs::parse_from(["miniogre", "build-base-image"]);
        match args.command {
            Commands::BuildBaseImage(base) => {
                assert_eq!(base.image_name, "baseimage");
                assert!(base.words.is_none());
                assert!(base.baseimage.is_none());
            }
            _ => panic!("Expected BuildBaseImage command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["miniogre", "-v", "detect"]);
        assert!(args.verbose);
        let args = CliArgs::parse_from(["miniogre", "--log-level", "debug", "spinup"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(CliArgs::try_parse_from(["miniogre", "-v", "-q", "detect"]).is_err());
    }

    #[test]
    fn test_adapter_kind_parsing() {
        assert_eq!(parse_adapter_kind("anthropic"), Ok(AdapterKind::Anthropic));
        assert!(parse_adapter_kind("invalid").is_err());
    }
}
