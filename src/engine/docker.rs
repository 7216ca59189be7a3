use super::{BuildOutcome, BuildRequest, ContainerEngine, EngineError, RunOutcome, RunRequest};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Checks that a Docker daemon answers before any build is attempted
pub async fn check_docker_daemon() -> Result<String, EngineError> {
    use bollard::Docker;

    let docker = Docker::connect_with_local_defaults()
        .map_err(|e| EngineError::Unavailable(format!("failed to connect: {}", e)))?;

    let version = docker
        .version()
        .await
        .map_err(|e| EngineError::Unavailable(format!("daemon did not answer: {}", e)))?;

    let api_version = version.api_version.unwrap_or_else(|| "0.0".to_string());
    debug!(api_version = %api_version, "Docker daemon reachable");
    Ok(api_version)
}

/// Container engine driven through its command line (`docker`, or a CLI-compatible one)
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The daemon check only applies when the CLI is Docker itself
    fn talks_to_docker_daemon(&self) -> bool {
        Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n == "docker")
            .unwrap_or(false)
    }

    pub fn build_args(request: &BuildRequest) -> Vec<String> {
        let mut args = vec!["buildx".to_string(), "build".to_string()];
        if !request.cache {
            args.push("--no-cache".to_string());
        }
        args.push("--load".to_string());
        args.push(format!(
            "--progress={}",
            if request.verbose { "plain" } else { "auto" }
        ));
        args.extend([
            "--platform".to_string(),
            request.platform.clone(),
            "-t".to_string(),
            request.tag.clone(),
            "-f".to_string(),
            request.dockerfile.display().to_string(),
            request.context_dir.display().to_string(),
        ]);
        args
    }

    pub fn run_args(request: &RunRequest) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-it".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!(
                "{}:{}",
                request.project_root.display(),
                request.mount_target
            ),
            "-p".to_string(),
            request.port_map.to_string(),
            "--name".to_string(),
            request.container_name.clone(),
            request.tag.clone(),
        ];
        args.extend(request.command.iter().cloned());
        args
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    fn name(&self) -> &str {
        &self.program
    }

    async fn build(&self, request: &BuildRequest) -> BuildOutcome {
        if self.talks_to_docker_daemon() {
            if let Err(e) = check_docker_daemon().await {
                warn!(error = %e, "Skipping image build");
                return BuildOutcome::Failed {
                    reason: e.to_string(),
                    log: String::new(),
                };
            }
        }

        let args = Self::build_args(request);
        info!(
            tag = %request.tag,
            platform = %request.platform,
            command = %format!("{} {}", self.program, args.join(" ")),
            "Building image"
        );

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .env("DOCKER_BUILDKIT", "1")
            .current_dir(&request.context_dir)
            .stdin(Stdio::null());

        if request.verbose {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let output = match command.output().await {
            Ok(output) => output,
            Err(source) => {
                let err = EngineError::Spawn {
                    command: format!("{} buildx build", self.program),
                    source,
                };
                warn!(error = %err, "Image build could not start");
                return BuildOutcome::Failed {
                    reason: err.to_string(),
                    log: String::new(),
                };
            }
        };

        let log = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        if output.status.success() {
            info!(tag = %request.tag, "Image built");
            BuildOutcome::Built {
                tag: request.tag.clone(),
            }
        } else {
            let reason = match output.status.code() {
                Some(code) => format!("build exited with status {}", code),
                None => "build terminated by signal".to_string(),
            };
            warn!(tag = %request.tag, reason = %reason, "Image build failed");
            BuildOutcome::Failed { reason, log }
        }
    }

    async fn run(&self, request: &RunRequest) -> RunOutcome {
        let args = Self::run_args(request);
        info!(
            container = %request.container_name,
            command = %format!("{} {}", self.program, args.join(" ")),
            "Starting container"
        );

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await;

        match status {
            Ok(status) => {
                let outcome = run_outcome(&self.program, status.code());
                if let RunOutcome::Failed { reason } = &outcome {
                    warn!(container = %request.container_name, reason = %reason, "Container did not start");
                }
                outcome
            }
            Err(source) => {
                let err = EngineError::Spawn {
                    command: format!("{} run", self.program),
                    source,
                };
                warn!(error = %err, "Container could not start");
                RunOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Maps the exit status of `<engine> run` to an outcome.
///
/// 125, 126 and 127 are reserved by the engine for errors that happen
/// before the entry command runs.
fn run_outcome(program: &str, code: Option<i32>) -> RunOutcome {
    match code {
        Some(125) => RunOutcome::Failed {
            reason: format!("{} could not create the container (exit 125)", program),
        },
        Some(126) => RunOutcome::Failed {
            reason: "container command could not be invoked (exit 126)".to_string(),
        },
        Some(127) => RunOutcome::Failed {
            reason: "container command not found (exit 127)".to_string(),
        },
        Some(code) => RunOutcome::Exited { code },
        None => RunOutcome::Exited { code: -1 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PortMapping;
    use std::path::PathBuf;

    fn build_request(cache: bool, verbose: bool) -> BuildRequest {
        BuildRequest {
            dockerfile: PathBuf::from("/work/demo/ogre_dir/Dockerfile"),
            context_dir: PathBuf::from("/work/demo"),
            tag: "miniogre/demo:latest".to_string(),
            platform: "linux/amd64".to_string(),
            cache,
            verbose,
        }
    }

    #[test]
    fn test_build_args_without_cache() {
        let args = DockerCli::build_args(&build_request(false, false));
        assert_eq!(
            args,
            vec![
                "buildx",
                "build",
                "--no-cache",
                "--load",
                "--progress=auto",
                "--platform",
                "linux/amd64",
                "-t",
                "miniogre/demo:latest",
                "-f",
                "/work/demo/ogre_dir/Dockerfile",
                "/work/demo",
            ]
        );
    }

    #[test]
    fn test_build_args_with_cache_and_plain_progress() {
        let args = DockerCli::build_args(&build_request(true, true));
        assert!(!args.contains(&"--no-cache".to_string()));
        assert!(args.contains(&"--progress=plain".to_string()));
    }

    #[test]
    fn test_run_args() {
        let request = RunRequest::for_project(
            &PathBuf::from("/work/demo"),
            "demo",
            "8000-8001:9000-9001".parse::<PortMapping>().unwrap(),
            &["bash"],
        );
        let args = DockerCli::run_args(&request);
        assert_eq!(
            args,
            vec![
                "run",
                "-it",
                "--rm",
                "-v",
                "/work/demo:/opt/demo",
                "-p",
                "8000-8001:9000-9001",
                "--name",
                "miniogre-demo",
                "miniogre/demo:latest",
                "bash",
            ]
        );
    }

    #[test]
    fn test_daemon_check_only_for_docker() {
        assert!(DockerCli::new("docker").talks_to_docker_daemon());
        assert!(DockerCli::new("/usr/bin/docker").talks_to_docker_daemon());
        assert!(!DockerCli::new("podman").talks_to_docker_daemon());
    }

    #[tokio::test]
    async fn test_missing_engine_binary_degrades() {
        let engine = DockerCli::new("miniogre-test-no-such-engine");
        let outcome = engine.build(&build_request(false, false)).await;
        assert!(matches!(outcome, BuildOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_daemon_check_reports_result() {
        // Succeeds or fails depending on whether a daemon runs here; must not panic
        let _ = check_docker_daemon().await;
    }

    #[test]
    fn test_engine_reserved_exit_codes_are_failures() {
        for code in [125, 126, 127] {
            assert!(
                matches!(run_outcome("docker", Some(code)), RunOutcome::Failed { .. }),
                "exit {} should fail",
                code
            );
        }
        let RunOutcome::Failed { reason } = run_outcome("podman", Some(125)) else {
            panic!("expected failure");
        };
        assert!(reason.contains("podman"));
    }

    #[test]
    fn test_application_exit_codes_are_reported() {
        assert_eq!(run_outcome("docker", Some(0)), RunOutcome::Exited { code: 0 });
        assert_eq!(run_outcome("docker", Some(1)), RunOutcome::Exited { code: 1 });
        assert_eq!(run_outcome("docker", Some(130)), RunOutcome::Exited { code: 130 });
        assert_eq!(run_outcome("docker", None), RunOutcome::Exited { code: -1 });
    }

    #[tokio::test]
    async fn test_run_reports_engine_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let fake = dir.path().join("fake-engine");
        std::fs::write(&fake, "#!/bin/sh\nexit 125\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let engine = DockerCli::new(fake.to_string_lossy().to_string());
        let request = RunRequest::for_project(
            dir.path(),
            "demo",
            "8000:8000".parse::<PortMapping>().unwrap(),
            &["python", "main.py"],
        );

        let outcome = engine.run(&request).await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }));
    }
}
