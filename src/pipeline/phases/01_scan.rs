use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::StageStatus;
use crate::stack::LanguageId;
use anyhow::Result;
use async_trait::async_trait;
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Project path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Every regular file under the project root, as absolute paths in path order
#[derive(Debug, Clone, Serialize)]
pub struct ProjectScan {
    pub root: PathBuf,
    pub files: BTreeSet<PathBuf>,
    /// Lowercased extension with its leading dot (".py") to file count
    pub extension_counts: BTreeMap<String, usize>,
}

impl ProjectScan {
    /// Relative entries in `files` are joined onto `root`
    pub fn from_files(root: PathBuf, files: BTreeSet<PathBuf>) -> Self {
        let files: BTreeSet<PathBuf> = files.into_iter().map(|f| root.join(f)).collect();
        let mut extension_counts = BTreeMap::new();
        for file in &files {
            if let Some(ext) = extension_of(file) {
                *extension_counts.entry(ext).or_insert(0) += 1;
            }
        }
        Self {
            root,
            files,
            extension_counts,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Absolute paths of files with the given extension, in path order
    pub fn files_with_extension(&self, extension: &str) -> Vec<PathBuf> {
        let wanted = format!(".{}", extension.trim_start_matches('.').to_lowercase());
        self.files
            .iter()
            .filter(|f| extension_of(f).as_deref() == Some(wanted.as_str()))
            .cloned()
            .collect()
    }

    /// Absolute paths of files with the given file name, in path order
    pub fn find_by_name(&self, name: &str) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|f| f.file_name().and_then(|n| n.to_str()) == Some(name))
            .cloned()
            .collect()
    }

    /// Files relative to the project root, for display
    pub fn relative_files(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .map(|f| f.strip_prefix(&self.root).unwrap_or(f.as_path()))
    }

    pub fn count(&self, extension: &str) -> usize {
        self.extension_counts.get(extension).copied().unwrap_or(0)
    }

    /// Most frequent extension that belongs to a known language; ties go to the
    /// alphabetically first extension
    pub fn dominant_extension(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (ext, count) in &self.extension_counts {
            if LanguageId::from_extension(ext).is_none() {
                continue;
            }
            if best.map(|(_, c)| *count > c).unwrap_or(true) {
                best = Some((ext.as_str(), *count));
            }
        }
        best.map(|(ext, _)| ext)
    }
}

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

/// Lists every file under `root`, pruning directories named in `excluded_dirs`.
///
/// Hidden files are included and ignore files are not honoured. Unreadable
/// entries are logged and skipped.
pub fn scan_project(root: &Path, excluded_dirs: &[String]) -> Result<ProjectScan, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let excluded: HashSet<String> = excluded_dirs.iter().cloned().collect();
    let mut files = BTreeSet::new();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(entry.depth() > 0
                && is_dir
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| excluded.contains(name))
                    .unwrap_or(false))
        })
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        trace!(path = %entry.path().display(), "Added file");
        files.insert(entry.path().to_path_buf());
    }

    Ok(ProjectScan::from_files(root.to_path_buf(), files))
}

pub struct ScanPhase;

#[async_trait]
impl WorkflowPhase for ScanPhase {
    fn name(&self) -> &'static str {
        "scan"
    }

    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus> {
        let start = Instant::now();
        let scan = scan_project(&context.project_root, &context.config.excluded_dirs)?;

        info!(
            files = scan.len(),
            extensions = scan.extension_counts.len(),
            "Project scan complete"
        );
        debug!(
            dominant = ?scan.dominant_extension(),
            scan_time_ms = start.elapsed().as_millis() as u64,
            "Extension histogram built"
        );

        context.scan = Some(scan);
        Ok(StageStatus::Complete)
    }
}
