//! Job submission types.
//!
//! A job is an opaque fio job description. The agent never looks inside it;
//! it is written to a file and handed to `fio`.

use serde::Deserialize;

use crate::error::{FioRunnerError, Result};

/// Lifecycle of the single job slot on this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// No job admitted; the next submission may start.
    Idle,
    /// Admitted, dry run in progress.
    Validating,
    /// fio is running and streaming reports.
    Running,
    /// fio exited with status zero; release pending.
    Completed,
    /// fio exited non-zero, crashed or could not be reaped; release pending.
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Validating => "validating",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// True for every state other than `Idle`.
    pub fn is_active(self) -> bool {
        !matches!(self, JobState::Idle)
    }
}

/// Wire shape of a submission body: `{"job": "<job description>"}`.
#[derive(Debug, Deserialize)]
struct Submission {
    job: Option<String>,
}

/// The job description of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    description: String,
}

const EXPECTED_SHAPE: &str = r#"expecting json of the form {"job": "<parms>"}"#;

impl JobRequest {
    pub fn new(description: impl Into<String>) -> Result<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(FioRunnerError::BadRequest(format!(
                "empty job description - {EXPECTED_SHAPE}"
            )));
        }
        Ok(Self { description })
    }

    /// Parse a submission body.
    ///
    /// Job decks are multi-line and callers often paste them verbatim into the
    /// JSON string, so a body that fails to parse is retried once with raw
    /// newlines escaped.
    pub fn from_json_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(FioRunnerError::BadRequest(format!(
                "empty request - {EXPECTED_SHAPE}"
            )));
        }

        let text = std::str::from_utf8(body)
            .map_err(|e| FioRunnerError::BadRequest(format!("body is not utf-8: {e}")))?;

        let submission: Submission = match serde_json::from_str(text) {
            Ok(s) => s,
            Err(first) => {
                let escaped = text.replace('\r', "").replace('\n', "\\n");
                serde_json::from_str(&escaped).map_err(|_| {
                    FioRunnerError::BadRequest(format!("invalid json ({first}) - {EXPECTED_SHAPE}"))
                })?
            }
        };

        let job = submission.job.ok_or_else(|| {
            FioRunnerError::BadRequest(format!("missing \"job\" - {EXPECTED_SHAPE}"))
        })?;
        Self::new(job)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn len(&self) -> usize {
        self.description.len()
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_empty()
    }
}
