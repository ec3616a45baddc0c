//! Error types for command execution

use thiserror::Error;

/// Command execution errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// docker CLI is not installed or not on PATH
    #[error("docker CLI not found. Install from https://docs.docker.com/get-docker/")]
    DockerNotFound,

    /// docker compose invocation failed
    #[error("docker compose {verb} failed: {stderr}")]
    Compose { verb: String, stderr: String },

    /// A polling loop hit its overall deadline
    #[error("timed out after {seconds}s waiting for {condition}")]
    Timeout { seconds: u64, condition: String },

    /// REST API call failed
    #[error("API request failed: {0}")]
    Api(#[from] pitcrew_core::HttpError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
