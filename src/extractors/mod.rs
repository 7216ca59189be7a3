//! Static import extraction
//!
//! Source files of the dominant language are parsed into syntax trees and every
//! import statement contributes its top-level module. One bad file never stops the
//! batch: it is retried once after style normalization, then skipped with an error
//! log.

pub mod notebook;
pub mod python;

pub use python::PythonImportExtractor;

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

/// Top-level module names, de-duplicated and ordered
pub type ImportSet = BTreeSet<String>;

/// Namespace package whose imports keep their second segment
const NAMESPACE_PACKAGE: &str = "google";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to load Python grammar: {0}")]
    Grammar(String),

    #[error("Syntax error in Python source")]
    Syntax,

    #[error("Invalid notebook: {0}")]
    Notebook(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Collapses an absolute import path to the unit of package resolution.
///
/// `numpy.linalg` becomes `numpy`, `google.cloud.storage` becomes `google.cloud`.
/// Relative imports and `__future__` yield `None`.
pub fn top_level_module(import_path: &str) -> Option<String> {
    let import_path = import_path.trim();
    if import_path.is_empty() || import_path.starts_with('.') {
        return None;
    }

    let mut segments = import_path.split('.').map(str::trim);
    let first = segments.next().filter(|s| !s.is_empty())?;
    if first == "__future__" {
        return None;
    }

    if first == NAMESPACE_PACKAGE {
        if let Some(second) = segments.next().filter(|s| !s.is_empty()) {
            return Some(format!("{}.{}", first, second));
        }
    }

    Some(first.to_string())
}

/// Union of imports across a project's files plus the files that had to be skipped
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectImports {
    pub modules: ImportSet,
    pub parsed_files: usize,
    pub skipped_files: Vec<PathBuf>,
}

/// Extracts imports from every `.py` and `.ipynb` file in `files`.
///
/// Only grammar initialization can fail; per-file problems are logged and skipped.
pub fn extract_python_imports(files: &[PathBuf]) -> Result<ProjectImports, ExtractError> {
    let mut extractor = PythonImportExtractor::new()?;
    let mut result = ProjectImports::default();

    for path in files {
        match extract_file(&mut extractor, path) {
            Ok(modules) => {
                debug!(file = %path.display(), count = modules.len(), "Imports extracted");
                result.modules.extend(modules);
                result.parsed_files += 1;
            }
            Err(e) => {
                error!(
                    file = %path.display(),
                    error = %e,
                    "External imports extraction failed, skipping file"
                );
                result.skipped_files.push(path.clone());
            }
        }
    }

    info!(
        modules = result.modules.len(),
        parsed = result.parsed_files,
        skipped = result.skipped_files.len(),
        "Import extraction complete"
    );
    Ok(result)
}

fn extract_file(
    extractor: &mut PythonImportExtractor,
    path: &Path,
) -> Result<ImportSet, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);

    let is_notebook = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("ipynb"))
        .unwrap_or(false);

    if is_notebook {
        let source = notebook::notebook_source(&text)?;
        extractor.extract(&source)
    } else {
        extractor.extract(&text)
    }
}
