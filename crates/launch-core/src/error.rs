//! Error types for the launch toolkit

use thiserror::Error;

/// Result type alias using the launch Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the launch toolkit
#[derive(Error, Debug)]
pub enum Error {
    // Environment errors
    #[error("must have {var} environment variable")]
    MissingEnv { var: String },

    // Container build errors
    #[error("container runtime not found: {runtime}")]
    RuntimeNotFound { runtime: String },

    #[error("command failed: {command} (exit {status}): {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    // Cluster errors
    #[error("HTTP error: {message}")]
    Http { message: String },

    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("submit failed for {pipeline}: {message}")]
    SubmitFailed { pipeline: String, message: String },

    #[error("run {run_id} finished with status {status}")]
    RunFailed { run_id: String, status: String },

    // Artifact errors
    #[error("artifact error: {message}")]
    Artifact { message: String },

    #[error("artifact not found: {path}")]
    ArtifactNotFound { path: String },

    // Collective errors
    #[error("rendezvous error: {message}")]
    Rendezvous { message: String },

    #[error("rank already joined: {rank}")]
    RankConflict { rank: u32 },

    #[error("world size mismatch: expected {expected}, computed {computed}")]
    WorldSizeMismatch { expected: u32, computed: u32 },

    // Configuration errors
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Timeout errors
    #[error("operation timeout: {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http { .. }
                | Error::Artifact { .. }
                | Error::Rendezvous { .. }
                | Error::Timeout { .. }
        )
    }

    /// Returns true if this error indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MissingEnv { .. }
                | Error::InvalidConfig { .. }
                | Error::RuntimeNotFound { .. }
                | Error::Auth { .. }
                | Error::RankConflict { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
