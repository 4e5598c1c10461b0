//! Job lifecycle: admission, dry-run validation and the fio run itself.

pub mod admission;
pub mod runner;
pub mod validator;

use std::io::Write;

use tempfile::NamedTempFile;

use fiorunner_core::error::{FioRunnerError, Result};
use fiorunner_core::job::JobRequest;

use crate::config::FioSection;

pub use admission::{JobAdmission, RunPermit};
pub use runner::{FioRun, RunOutcome};
pub use validator::{validate, ValidationReport};

/// Write the job description to a fresh temp file in `fio.job_dir`.
/// The file is deleted when the returned handle drops.
pub(crate) fn write_job_file(cfg: &FioSection, job: &JobRequest) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("fiorunner-").suffix(".fio");

    let mut file = match &cfg.job_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| FioRunnerError::Internal(format!("create job file: {e}")))?;

    file.write_all(job.description().as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| FioRunnerError::Internal(format!("write job file: {e}")))?;

    Ok(file)
}
