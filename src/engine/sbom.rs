use super::{EngineError, SbomFormat, SbomOutcome};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

pub const SBOM_FILE: &str = "sbom.json";

#[derive(Debug, Clone)]
pub struct SbomRequest {
    pub format: SbomFormat,
    pub project_root: PathBuf,
    pub env_dir: PathBuf,
    /// Locked manifest, when one was produced
    pub manifest: Option<PathBuf>,
    /// Distribution names from the manifest, passed to `pip-licenses --packages`
    pub packages: Vec<String>,
}

/// Program and arguments for the report tool selected by `format`
pub fn sbom_invocation(request: &SbomRequest) -> Result<(String, Vec<String>), EngineError> {
    let output = request.env_dir.join(SBOM_FILE).display().to_string();

    match request.format {
        SbomFormat::PipLicenses => {
            // Without --packages the tool lists the whole host environment
            if request.packages.is_empty() {
                return Err(EngineError::Unavailable(
                    "pip-licenses needs packages from a locked manifest".to_string(),
                ));
            }
            let mut args: Vec<String> = [
                "--with-authors",
                "--with-maintainers",
                "--with-urls",
                "--with-description",
                "-l",
                "--format",
                "json",
                "--output-file",
            ]
            .iter()
            .map(|a| a.to_string())
            .collect();
            args.push(output);
            args.push("--packages".to_string());
            args.extend(request.packages.iter().cloned());
            Ok(("pip-licenses".to_string(), args))
        }
        SbomFormat::CycloneDx => {
            let manifest = request.manifest.as_deref().ok_or_else(|| {
                EngineError::Unavailable("cyclonedx needs a locked requirements.txt".to_string())
            })?;
            Ok((
                "cyclonedx-py".to_string(),
                vec![
                    "requirements".to_string(),
                    manifest.display().to_string(),
                    "-o".to_string(),
                    output,
                ],
            ))
        }
    }
}

/// Runs the report tool; any failure is logged and returned as [`SbomOutcome::Failed`]
pub async fn generate_sbom(request: &SbomRequest) -> SbomOutcome {
    let (program, args) = match sbom_invocation(request) {
        Ok(invocation) => invocation,
        Err(e) => {
            warn!(error = %e, "SBOM generation skipped");
            return SbomOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    info!(tool = %program, format = %request.format, "Generating SBOM");

    let output = Command::new(&program)
        .args(&args)
        .current_dir(&request.project_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let path = request.env_dir.join(SBOM_FILE);
    match output {
        Ok(output) if output.status.success() && report_exists(&path) => {
            info!(path = %path.display(), "SBOM written");
            SbomOutcome::Written { path }
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            );
            warn!(reason = %reason, "SBOM generation failed");
            SbomOutcome::Failed { reason }
        }
        Err(source) => {
            let err = EngineError::Spawn {
                command: program,
                source,
            };
            warn!(error = %err, "SBOM generation failed");
            SbomOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}

fn report_exists(path: &Path) -> bool {
    path.metadata().map(|m| m.len() > 0).unwrap_or(false)
}
