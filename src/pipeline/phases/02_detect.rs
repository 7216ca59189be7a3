use super::scan::ProjectScan;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::{PipelineError, StageStatus};
use crate::stack::framework_id::PACKAGE_JSON_KEYWORDS;
use crate::stack::{FrameworkId, LanguageId};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const PACKAGE_JSON: &str = "package.json";
const ANGULAR_JSON: &str = "angular.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedEnvironment {
    pub languages: BTreeSet<LanguageId>,
    pub primary_language: Option<LanguageId>,
    pub framework: Option<FrameworkId>,
}

impl DetectedEnvironment {
    pub fn from_scan(scan: &ProjectScan) -> Self {
        Self {
            languages: detect_languages(scan),
            primary_language: primary_language(scan),
            framework: detect_framework(scan),
        }
    }

    pub fn is_python(&self) -> bool {
        self.primary_language == Some(LanguageId::Python)
    }
}

/// Every known language with at least one file in the scan
pub fn detect_languages(scan: &ProjectScan) -> BTreeSet<LanguageId> {
    scan.extension_counts
        .keys()
        .filter_map(|ext| LanguageId::from_extension(ext))
        .collect()
}

/// Language with the most files, notebooks counted as Python. Ties go to the
/// alphabetically first language key.
pub fn primary_language(scan: &ProjectScan) -> Option<LanguageId> {
    let mut totals: BTreeMap<&'static str, (LanguageId, usize)> = BTreeMap::new();
    for (ext, count) in &scan.extension_counts {
        if let Some(lang) = LanguageId::from_extension(ext) {
            let lang = lang.source_language();
            totals.entry(lang.key()).or_insert((lang, 0)).1 += count;
        }
    }

    let mut best: Option<(LanguageId, usize)> = None;
    for (lang, count) in totals.into_values() {
        if best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((lang, count));
        }
    }
    best.map(|(lang, _)| lang)
}

/// Framework named by the project's `package.json` files, visited in path order.
/// The last keyword match wins, both within one manifest and across manifests.
/// A manifest with a sibling `angular.json` ends detection with Angular.
pub fn detect_framework(scan: &ProjectScan) -> Option<FrameworkId> {
    let mut detected = None;
    for manifest in scan.find_by_name(PACKAGE_JSON) {
        if has_angular_config(&manifest) {
            debug!(manifest = %manifest.display(), "angular.json found, framework is Angular");
            return Some(FrameworkId::Angular);
        }
        if let Some(framework) = framework_for_manifest(&manifest) {
            debug!(
                manifest = %manifest.display(),
                framework = framework.name(),
                "Framework keyword found"
            );
            detected = Some(framework);
        }
    }
    detected
}

fn has_angular_config(manifest: &Path) -> bool {
    manifest
        .parent()
        .map(|dir| dir.join(ANGULAR_JSON).is_file())
        .unwrap_or(false)
}

fn framework_for_manifest(manifest: &Path) -> Option<FrameworkId> {
    let content = match fs::read_to_string(manifest) {
        Ok(content) => content,
        Err(e) => {
            warn!(manifest = %manifest.display(), error = %e, "Failed to read package.json");
            return None;
        }
    };
    framework_from_keywords(&content)
}

pub fn framework_from_keywords(content: &str) -> Option<FrameworkId> {
    PACKAGE_JSON_KEYWORDS
        .iter()
        .filter(|(keyword, _)| content.contains(keyword))
        .map(|(_, framework)| *framework)
        .last()
}

pub struct DetectPhase;

#[async_trait]
impl WorkflowPhase for DetectPhase {
    fn name(&self) -> &'static str {
        "detect"
    }

    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus> {
        let scan = context.scan.as_ref().ok_or(PipelineError::MissingInput {
            stage: "detect",
            requires: "scan",
        })?;

        let environment = DetectedEnvironment::from_scan(scan);
        info!(
            primary_language = environment.primary_language.map(|l| l.name()).unwrap_or("none"),
            framework = environment.framework.map(|f| f.name()).unwrap_or("none"),
            languages = environment.languages.len(),
            "Detected project environment"
        );

        context.environment = Some(environment);
        Ok(StageStatus::Complete)
    }
}
