//! Shared error type across fiorunner crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request body.
    BadRequest,
    /// The job description was rejected by the dry run.
    ValidationFailed,
    /// Another job already holds the node.
    Conflict,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::ValidationFailed => "VALIDATION_FAILED",
            ClientCode::Conflict => "CONFLICT",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, FioRunnerError>;

/// Unified error type used by core and agent.
#[derive(Debug, Error)]
pub enum FioRunnerError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("job has syntax errors: {}", diagnostics.join(","))]
    Validation { diagnostics: Vec<String> },
    #[error("fio job already active")]
    AdmissionConflict,
    #[error("failed to launch fio: {0}")]
    Spawn(String),
    #[error("invalid interval report: {0}")]
    StreamDecode(String),
    #[error("fio exited with {0}")]
    ProcessExitedNonZero(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl FioRunnerError {
    /// Map internal error to a stable client-facing code.
    ///
    /// Only the first three variants can reach a caller as a rejection; the
    /// rest are reported as internal failures.
    pub fn client_code(&self) -> ClientCode {
        match self {
            FioRunnerError::BadRequest(_) => ClientCode::BadRequest,
            FioRunnerError::Validation { .. } => ClientCode::ValidationFailed,
            FioRunnerError::AdmissionConflict => ClientCode::Conflict,
            FioRunnerError::Spawn(_)
            | FioRunnerError::StreamDecode(_)
            | FioRunnerError::ProcessExitedNonZero(_)
            | FioRunnerError::Config(_)
            | FioRunnerError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Dry-run diagnostics carried by a validation failure.
    pub fn diagnostics(&self) -> &[String] {
        match self {
            FioRunnerError::Validation { diagnostics } => diagnostics,
            _ => &[],
        }
    }
}
