//! Dry-run syntax check (`fio <jobfile> --parse-only`).

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use fiorunner_core::error::{FioRunnerError, Result};
use fiorunner_core::job::JobRequest;

use crate::config::FioSection;
use crate::job::write_job_file;

/// Outcome of a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub ok: bool,
    /// fio's stderr, one entry per line.
    pub diagnostics: Vec<String>,
}

impl ValidationReport {
    /// Turn a failed report into a `Validation` error.
    pub fn into_result(self) -> Result<()> {
        if self.ok {
            Ok(())
        } else {
            Err(FioRunnerError::Validation {
                diagnostics: self.diagnostics,
            })
        }
    }
}

/// Ask fio whether it can parse `job`.
///
/// The job file lives only as long as this call; it is removed when the
/// `NamedTempFile` drops, whichever way we leave. A dry run that outlives
/// `validate_timeout_ms` is killed and reported as a failure.
pub async fn validate(cfg: &FioSection, job: &JobRequest) -> Result<ValidationReport> {
    let job_file = write_job_file(cfg, job)?;
    let started = Instant::now();

    let child = Command::new(&cfg.binary)
        .arg(job_file.path())
        .arg("--parse-only")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| FioRunnerError::Spawn(format!("{}: {e}", cfg.binary.display())))?;

    let limit = Duration::from_millis(cfg.validate_timeout_ms);
    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(FioRunnerError::Internal(format!("waiting for fio dry run: {e}")));
        }
        Err(_) => {
            tracing::warn!(timeout_ms = cfg.validate_timeout_ms, "fio dry run timed out");
            return Ok(ValidationReport {
                ok: false,
                diagnostics: vec![format!(
                    "syntax check timed out after {}ms",
                    cfg.validate_timeout_ms
                )],
            });
        }
    };

    let diagnostics = split_diagnostics(&String::from_utf8_lossy(&output.stderr));
    tracing::debug!(
        status = %output.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        lines = diagnostics.len(),
        "fio dry run finished"
    );

    Ok(ValidationReport {
        ok: output.status.success(),
        diagnostics,
    })
}

/// Split on `\n`, dropping the empty element a trailing newline leaves.
pub fn split_diagnostics(stderr: &str) -> Vec<String> {
    let mut lines: Vec<String> = stderr.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
