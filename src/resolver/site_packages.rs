//! Installed-distribution metadata (`*.dist-info` / `*.egg-info`)

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, trace};

/// One installed distribution and the top-level modules it provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub name: String,
    pub top_level: BTreeSet<String>,
}

/// Site-packages directories reported by `interpreter`; empty when it cannot be run
pub async fn interpreter_site_packages(interpreter: &str) -> Vec<PathBuf> {
    let script = "import site, sys; print(chr(10).join(site.getsitepackages() + [site.getusersitepackages()]))";
    match Command::new(interpreter).args(["-c", script]).output().await {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .filter(|p| p.is_dir())
            .collect(),
        _ => {
            debug!(interpreter, "Could not query site-packages");
            Vec::new()
        }
    }
}

/// Reads every distribution found in `dirs`, in sorted directory-name order
pub fn read_distributions(dirs: &[PathBuf]) -> Vec<Distribution> {
    let mut distributions = Vec::new();

    for dir in dirs {
        let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| is_metadata_dir(p))
                .collect(),
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Skipping unreadable site-packages");
                continue;
            }
        };
        entries.sort();

        for entry in entries {
            if let Some(distribution) = read_distribution(&entry) {
                trace!(
                    name = %distribution.name,
                    modules = distribution.top_level.len(),
                    "Found distribution"
                );
                distributions.push(distribution);
            }
        }
    }

    debug!(count = distributions.len(), "Local distributions loaded");
    distributions
}

fn is_metadata_dir(path: &Path) -> bool {
    path.is_dir()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(".dist-info") || n.ends_with(".egg-info"))
            .unwrap_or(false)
}

fn read_distribution(dir: &Path) -> Option<Distribution> {
    let dir_name = dir.file_name()?.to_str()?;
    let stem = dir_name
        .strip_suffix(".dist-info")
        .or_else(|| dir_name.strip_suffix(".egg-info"))?;

    let name = ["METADATA", "PKG-INFO"]
        .iter()
        .filter_map(|f| fs::read_to_string(dir.join(f)).ok())
        .find_map(|content| metadata_name(&content))
        .unwrap_or_else(|| name_from_stem(stem));

    let top_level = match fs::read_to_string(dir.join("top_level.txt")) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => fs::read_to_string(dir.join("RECORD"))
            .map(|record| modules_from_record(&record))
            .unwrap_or_default(),
    };

    Some(Distribution { name, top_level })
}

/// `Name:` header of a core-metadata file
fn metadata_name(content: &str) -> Option<String> {
    content
        .lines()
        .take_while(|l| !l.is_empty())
        .find_map(|l| l.strip_prefix("Name:"))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// `requests-2.31.0` → `requests`
fn name_from_stem(stem: &str) -> String {
    stem.split_once('-')
        .map(|(name, _)| name)
        .unwrap_or(stem)
        .to_string()
}

/// First path segments of installed files, minus metadata and bytecode caches
fn modules_from_record(record: &str) -> BTreeSet<String> {
    record
        .lines()
        .filter_map(|line| line.split(',').next())
        .filter_map(|path| {
            let first = path.split('/').next()?;
            if first.ends_with(".dist-info")
                || first.ends_with(".egg-info")
                || first.ends_with(".data")
                || first == "__pycache__"
                || first == ".."
                || first.is_empty()
            {
                return None;
            }
            if path.contains('/') {
                Some(first.to_string())
            } else {
                first
                    .strip_suffix(".py")
                    .map(str::to_string)
            }
        })
        .collect()
}
