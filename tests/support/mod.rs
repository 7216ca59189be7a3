//! Shared fixtures for integration tests: project builders, a static package
//! index, a recording container engine and lock-tool scripts.

#![allow(dead_code)]

use async_trait::async_trait;
use miniogre::config::OgreConfig;
use miniogre::engine::{
    BuildOutcome, BuildRequest, ContainerEngine, RunOutcome, RunRequest, SbomFormat,
};
use miniogre::resolver::{PackageIndex, RegistryError};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Creates `<root>/<name>` populated with `files` (relative path, content)
pub fn write_project(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let project = root.join(name);
    for (rel, content) in files {
        let path = project.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    fs::create_dir_all(&project).unwrap();
    project
}

/// Writes a lock script and returns a lock command running it with `sh`
pub fn lock_script(root: &Path, body: &str) -> String {
    let path = root.join("lock.sh");
    fs::write(&path, body).unwrap();
    format!("sh {}", path.display())
}

/// Pins every requirement to version 1.0
pub const PIN_ALL: &str = "read name; echo \"$name==1.0\"";

/// Configuration that never touches the host interpreter or real registries
pub fn offline_config(root: &Path, lock_command: String) -> OgreConfig {
    let site_packages = root.join("site-packages");
    fs::create_dir_all(&site_packages).unwrap();

    let mut config = OgreConfig::default();
    config.env_dir_name = "ogre_dir".to_string();
    config.excluded_dirs = [".git", "__pycache__", "node_modules", ".venv", "venv", "ogre_dir"]
        .iter()
        .map(|d| d.to_string())
        .collect();
    config.site_packages = vec![site_packages];
    config.interpreter = "miniogre-no-such-python".to_string();
    config.lock_command = lock_command;
    config.base_image = "auto".to_string();
    config.base_image_template = "ogrerun/base:ubuntu22.04-{arch}".to_string();
    config.node_base_image = "node:20-bookworm".to_string();
    config.platform = Some("linux/amd64".to_string());
    config.timezone = "UTC".to_string();
    config.sbom_format = SbomFormat::CycloneDx;
    config
}

/// Registry double that knows a fixed set of package names
pub struct StaticIndex {
    known: BTreeSet<String>,
    lookups: Mutex<Vec<String>>,
}

impl StaticIndex {
    pub fn new(known: &[&str]) -> Self {
        Self {
            known: known.iter().map(|s| s.to_string()).collect(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageIndex for StaticIndex {
    async fn exists(&self, name: &str) -> Result<bool, RegistryError> {
        self.lookups.lock().unwrap().push(name.to_string());
        Ok(self.known.contains(name))
    }
}

/// Container engine that records requests instead of running anything
#[derive(Default)]
pub struct RecordingEngine {
    pub builds: Mutex<Vec<BuildRequest>>,
    pub runs: Mutex<Vec<RunRequest>>,
    pub fail_build: bool,
}

impl RecordingEngine {
    pub fn failing() -> Self {
        Self {
            fail_build: true,
            ..Default::default()
        }
    }

    pub fn built_tags(&self) -> Vec<String> {
        self.builds.lock().unwrap().iter().map(|b| b.tag.clone()).collect()
    }

    pub fn run_commands(&self) -> Vec<Vec<String>> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.command.clone())
            .collect()
    }
}

#[async_trait]
impl ContainerEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn build(&self, request: &BuildRequest) -> BuildOutcome {
        self.builds.lock().unwrap().push(request.clone());
        if self.fail_build {
            BuildOutcome::Failed {
                reason: "docker daemon unreachable".to_string(),
                log: String::new(),
            }
        } else {
            BuildOutcome::Built {
                tag: request.tag.clone(),
            }
        }
    }

    async fn run(&self, request: &RunRequest) -> RunOutcome {
        self.runs.lock().unwrap().push(request.clone());
        RunOutcome::Exited { code: 0 }
    }
}
