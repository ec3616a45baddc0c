//! docker compose CLI wrapper
//!
//! Invokes `docker compose` as a child process and captures its output.
//! `DOCKER_HOST` and the rest of the docker environment pass through
//! untouched.

use crate::commands::error::CommandError;
use std::path::PathBuf;
use std::process::Command;

/// Fixed compose project name, so invocations from different working
/// directories always target the same cluster.
const PROJECT_NAME: &str = "pitcrew";

/// Runner bound to one compose file.
#[derive(Debug)]
pub struct Compose {
    file: PathBuf,
}

impl Compose {
    pub fn new(file: PathBuf) -> Self {
        Self { file }
    }

    /// `docker compose up -d`, scaling `agent_service` to `scale` replicas.
    pub fn up(&self, agent_service: &str, scale: u32) -> Result<String, CommandError> {
        self.run(&up_args(agent_service, scale))
    }

    /// `docker compose down`, removing volumes when asked.
    pub fn down(&self, volumes: bool) -> Result<String, CommandError> {
        self.run(&down_args(volumes))
    }

    /// `docker compose ps` in plain text form.
    pub fn ps(&self) -> Result<String, CommandError> {
        self.run(&["ps".to_string()])
    }

    /// Full log output of one service.
    pub fn logs(&self, service: &str) -> Result<String, CommandError> {
        self.run(&logs_args(service))
    }

    fn run(&self, args: &[String]) -> Result<String, CommandError> {
        let verb = args.first().cloned().unwrap_or_default();
        tracing::debug!(file = %self.file.display(), ?args, "running docker compose");
        let output = Command::new("docker")
            .arg("compose")
            .arg("-f")
            .arg(&self.file)
            .arg("-p")
            .arg(PROJECT_NAME)
            .args(args)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CommandError::DockerNotFound
                } else {
                    CommandError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CommandError::Compose { verb, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn up_args(agent_service: &str, scale: u32) -> Vec<String> {
    vec![
        "up".to_string(),
        "-d".to_string(),
        "--scale".to_string(),
        format!("{agent_service}={scale}"),
    ]
}

fn down_args(volumes: bool) -> Vec<String> {
    let mut args = vec!["down".to_string()];
    if volumes {
        args.push("-v".to_string());
    }
    args
}

fn logs_args(service: &str) -> Vec<String> {
    // No color codes and no container-name prefix: the output gets scanned
    // for the super user token.
    vec![
        "logs".to_string(),
        "--no-color".to_string(),
        "--no-log-prefix".to_string(),
        service.to_string(),
    ]
}
