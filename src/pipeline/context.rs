//! Mutable state threaded through one pipeline run

use super::phases::detect::DetectedEnvironment;
use super::phases::lock::RequirementsManifest;
use super::phases::scan::ProjectScan;
use super::phases::synthesize::SynthesizedEnvironment;
use super::report::PipelineError;
use crate::config::OgreConfig;
use crate::dockerfile::SynthesisMode;
use crate::engine::{BuildOutcome, ContainerEngine, DockerCli, RunOutcome, SbomOutcome};
use crate::extractors::ProjectImports;
use crate::llm::{LlmError, TextGenerator};
use crate::resolver::{PackageIndex, PackageMapping, PypiIndex};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory name used for the workdir of base-image builds
pub const BASE_IMAGE_PROJECT_NAME: &str = "ogre";

/// Image name used by `build-base-image` when none is given
pub const DEFAULT_BASE_IMAGE_NAME: &str = "baseimage";

/// Caller intent for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: SynthesisMode,
    pub reuse_requirements: bool,
    pub no_container: bool,
    /// Overrides the project name as the image name (base-image builds)
    pub image_name: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: SynthesisMode::Standard,
            reuse_requirements: false,
            no_container: false,
            image_name: None,
        }
    }
}

pub struct PipelineContext {
    pub project_root: PathBuf,
    pub project_name: String,
    pub config: OgreConfig,
    pub options: RunOptions,

    pub index: Arc<dyn PackageIndex>,
    pub engine: Arc<dyn ContainerEngine>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    /// Why a requested cleaning pass cannot run; reported by the lock stage
    pub cleaning_unavailable: Option<LlmError>,

    pub scan: Option<ProjectScan>,
    pub environment: Option<DetectedEnvironment>,
    pub imports: Option<ProjectImports>,
    pub mapping: Option<PackageMapping>,
    /// Unresolved package names, one per line, before locking
    pub requirement_list: Option<String>,
    pub manifest: Option<RequirementsManifest>,
    pub synthesized: Option<SynthesizedEnvironment>,
    pub sbom: Option<SbomOutcome>,
    pub build: Option<BuildOutcome>,
    pub run: Option<RunOutcome>,
}

impl PipelineContext {
    /// Canonicalizes the project root and wires the production registry and engine
    pub fn new(project_root: &Path, config: OgreConfig) -> Result<Self> {
        if !project_root.is_dir() {
            return Err(PipelineError::InvalidProject(project_root.to_path_buf()).into());
        }
        let project_root = project_root
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", project_root.display()))?;
        let project_name = project_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());

        let index = PypiIndex::new(config.registry_url.clone(), config.registry_timeout())
            .context("Failed to create package registry client")?;
        let engine = DockerCli::new(config.container_engine.clone());

        Ok(Self {
            project_root,
            project_name,
            config,
            options: RunOptions::default(),
            index: Arc::new(index),
            engine: Arc::new(engine),
            generator: None,
            cleaning_unavailable: None,
            scan: None,
            environment: None,
            imports: None,
            mapping: None,
            requirement_list: None,
            manifest: None,
            synthesized: None,
            sbom: None,
            build: None,
            run: None,
        })
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_index(mut self, index: Arc<dyn PackageIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn ContainerEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Records a cleaning pass that was requested but could not be set up
    pub fn with_cleaning_unavailable(mut self, error: LlmError) -> Self {
        self.generator = None;
        self.cleaning_unavailable = Some(error);
        self
    }

    /// Name used for the image tag and container name
    pub fn image_name(&self) -> &str {
        self.options
            .image_name
            .as_deref()
            .unwrap_or(self.project_name.as_str())
    }

    pub fn env_dir(&self) -> PathBuf {
        self.config.env_dir(&self.project_root)
    }

    /// Creates the environment directory if needed; failure here is fatal
    pub fn ensure_env_dir(&self) -> Result<PathBuf, PipelineError> {
        let dir = self.env_dir();
        fs::create_dir_all(&dir).map_err(|source| PipelineError::EnvironmentDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_derives_project_name() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("my-app");
        fs::create_dir(&project).unwrap();

        let context = PipelineContext::new(&project, OgreConfig::default()).unwrap();
        assert_eq!(context.project_name, "my-app");
        assert_eq!(context.image_name(), "my-app");
        assert!(context.project_root.is_absolute());
    }

    #[test]
    fn test_image_name_override() {
        let temp = TempDir::new().unwrap();
        let context = PipelineContext::new(temp.path(), OgreConfig::default())
            .unwrap()
            .with_options(RunOptions {
                image_name: Some("baseimage".to_string()),
                ..Default::default()
            });
        assert_eq!(context.image_name(), "baseimage");
    }

    #[test]
    fn test_rejects_missing_project() {
        let temp = TempDir::new().unwrap();
        let result = PipelineContext::new(&temp.path().join("nope"), OgreConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_ensure_env_dir_creates_directory() {
        let temp = TempDir::new().unwrap();
        let context = PipelineContext::new(temp.path(), OgreConfig::default()).unwrap();
        let dir = context.ensure_env_dir().unwrap();
        assert!(dir.is_dir());
        assert!(dir.ends_with(&context.config.env_dir_name));
    }

    #[test]
    fn test_ensure_env_dir_fails_when_path_is_a_file() {
        let temp = TempDir::new().unwrap();
        let context = PipelineContext::new(temp.path(), OgreConfig::default()).unwrap();
        fs::write(context.env_dir(), "not a directory").unwrap();

        let err = context.ensure_env_dir().unwrap_err();
        assert!(matches!(err, PipelineError::EnvironmentDir { .. }));
    }
}
