//! Output formatting for command results
//!
//! Reports go to stdout in JSON, YAML or a human-readable layout; logs stay on stderr.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::pipeline::{PipelineContext, RunReport, StageStatus};
use crate::resolver::{PackageMapping, Resolution};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

/// What `detect` found, assembled from the pipeline context
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub project: String,
    pub project_root: PathBuf,
    pub files: usize,
    pub languages: Vec<String>,
    pub primary_language: Option<String>,
    pub framework: Option<String>,
    pub imports: BTreeSet<String>,
    pub skipped_files: Vec<PathBuf>,
    pub resolution: PackageMapping,
    pub requirements: Vec<String>,
}

impl DetectionReport {
    pub fn from_context(context: &PipelineContext) -> Self {
        let environment = context.environment.as_ref();
        let resolution = context.mapping.clone().unwrap_or_default();
        Self {
            project: context.project_name.clone(),
            project_root: context.project_root.clone(),
            files: context.scan.as_ref().map(|s| s.len()).unwrap_or(0),
            languages: environment
                .map(|env| env.languages.iter().map(|l| l.name().to_string()).collect())
                .unwrap_or_default(),
            primary_language: environment
                .and_then(|env| env.primary_language)
                .map(|l| l.name().to_string()),
            framework: environment
                .and_then(|env| env.framework)
                .map(|f| f.name().to_string()),
            imports: context
                .imports
                .as_ref()
                .map(|i| i.modules.clone())
                .unwrap_or_default(),
            skipped_files: context
                .imports
                .as_ref()
                .map(|i| i.skipped_files.clone())
                .unwrap_or_default(),
            requirements: resolution.packages().into_iter().map(str::to_string).collect(),
            resolution,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_detection(&self, report: &DetectionReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize detection report to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(report)
                .context("Failed to serialize detection report to YAML"),
            OutputFormat::Human => Ok(self.format_detection_human(report)),
        }
    }

    pub fn format_run_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).context("Failed to serialize run report to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize run report to YAML")
            }
            OutputFormat::Human => Ok(self.format_run_report_human(report)),
        }
    }

    fn format_detection_human(&self, report: &DetectionReport) -> String {
        let mut output = String::new();
        output.push_str("\u{2713} Project Environment\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Project:    {}\n", report.project));
        output.push_str(&format!("Files:      {}\n", report.files));
        output.push_str(&format!(
            "Language:   {}\n",
            report.primary_language.as_deref().unwrap_or("(unknown)")
        ));
        output.push_str(&format!(
            "Framework:  {}\n",
            report.framework.as_deref().unwrap_or("(none)")
        ));
        if report.languages.len() > 1 {
            output.push_str(&format!("Also seen:  {}\n", report.languages.join(", ")));
        }
        output.push('\n');

        if report.resolution.is_empty() {
            output.push_str("Imports: (none)\n");
        } else {
            output.push_str("Imports:\n");
            let total = report.resolution.len();
            for (i, (module, resolution)) in report.resolution.iter().enumerate() {
                let connector = if i + 1 == total { "\u{2514}" } else { "\u{251C}" };
                let target = match resolution {
                    Resolution::Package(name) => name.clone(),
                    Resolution::StandardLibrary => "(standard library)".to_string(),
                    Resolution::Unresolved => "(unresolved)".to_string(),
                };
                output.push_str(&format!("{}\u{2500} {} \u{2192} {}\n", connector, module, target));
            }
        }

        if !report.skipped_files.is_empty() {
            output.push_str("\n\u{26A0} Files that could not be parsed:\n");
            for file in &report.skipped_files {
                output.push_str(&format!("  - {}\n", file.display()));
            }
        }

        output.push_str(&format!("\nRequirements: {}\n", report.requirements.len()));
        output
    }

    fn format_run_report_human(&self, report: &RunReport) -> String {
        let mut output = String::new();
        output.push_str(&format!("Stages for {}:\n", report.project));

        let total = report.stages.len();
        for (i, stage) in report.stages.iter().enumerate() {
            let connector = if i + 1 == total { "\u{2514}" } else { "\u{251C}" };
            let detail = match &stage.status {
                StageStatus::Complete => format!("complete  {}ms", stage.duration_ms),
                StageStatus::Degraded { reason } => format!("degraded  {}", reason),
                StageStatus::Skipped { reason } => format!("skipped   {}", reason),
            };
            output.push_str(&format!("{}\u{2500} {:<11} {}\n", connector, stage.stage, detail));
        }
        output.push_str(&format!("\nFinished in {}ms\n", report.total_ms));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn detection() -> DetectionReport {
        let mut resolution = PackageMapping::new();
        resolution.insert("numpy", Resolution::Package("numpy".to_string()));
        resolution.insert("os", Resolution::StandardLibrary);
        resolution.insert("acme_internal", Resolution::Unresolved);

        DetectionReport {
            project: "demo".to_string(),
            project_root: PathBuf::from("/work/demo"),
            files: 3,
            languages: vec!["Python".to_string()],
            primary_language: Some("Python".to_string()),
            framework: None,
            imports: ["acme_internal", "numpy", "os"].iter().map(|s| s.to_string()).collect(),
            skipped_files: vec![],
            requirements: vec!["numpy".to_string()],
            resolution,
        }
    }

    #[test]
    fn test_human_detection_output() {
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_detection(&detection())
            .unwrap();

        assert!(output.contains("Language:   Python"));
        assert!(output.contains("Framework:  (none)"));
        assert!(output.contains("\u{251C}\u{2500} numpy \u{2192} numpy\n"));
        assert!(output.contains("\u{2514}\u{2500} os \u{2192} (standard library)\n"));
        assert!(output.contains("acme_internal \u{2192} (unresolved)"));
    }

    #[test]
    fn test_json_detection_output() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_detection(&detection())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["project"], "demo");
        assert_eq!(value["requirements"][0], "numpy");
        assert!(value["resolution"].is_object());
    }

    #[test]
    fn test_yaml_detection_output() {
        let output = OutputFormatter::new(OutputFormat::Yaml)
            .format_detection(&detection())
            .unwrap();
        assert!(output.contains("project: demo"));
    }

    #[test]
    fn test_human_run_report() {
        let mut report = RunReport::new("demo", PathBuf::from("/work/demo"));
        report.record("scan", StageStatus::Complete, Duration::from_millis(4));
        report.record("run", StageStatus::skipped("--no-container"), Duration::ZERO);

        let output = OutputFormatter::new(OutputFormat::Human)
            .format_run_report(&report)
            .unwrap();
        assert!(output.contains("\u{251C}\u{2500} scan        complete  4ms\n"));
        assert!(output.contains("\u{2514}\u{2500} run         skipped   --no-container\n"));
    }
}
