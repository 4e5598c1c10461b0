//! fio process runner.
//!
//! One `FioRun` exists per admitted job and moves through
//! `Spawning -> Streaming -> Draining -> Exited`:
//!
//! - Spawning (`FioRun::spawn`): job file written, fio launched in periodic
//!   JSON report mode, admission marked running.
//! - Streaming: stdout is read line by line into a `StatsFramer`, with any
//!   line cut into pieces of at most `max_report_bytes`. Each completed
//!   report is decoded and swapped into the `StatsStore`. A report
//!   that fails to decode is dropped and the run carries on. Reading stops
//!   once a read returns no data, i.e. fio closed its stdout.
//! - Draining: the exit status is reaped and the job file removed.
//! - Exited: the outcome is recorded and admission released.
//!
//! The `RunPermit` is the last field of `FioRun`, so even if the task
//! panics the child is killed and the job file removed before the node is
//! released.

use std::process::Stdio;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::Instrument;

use fiorunner_core::error::{FioRunnerError, Result};
use fiorunner_core::job::JobRequest;
use fiorunner_core::stats::{StatsFramer, StatsSnapshot, StatsStore};

use crate::config::FioSection;
use crate::job::{write_job_file, RunPermit};
use crate::obs::metrics::AgentMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// fio exited with status zero.
    Completed,
    /// fio exited non-zero, was killed, or could not be reaped.
    Failed,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub snapshots: u64,
    pub decode_errors: u64,
    pub dropped_frames: u64,
}

#[derive(Debug)]
pub struct FioRun {
    child: Child,
    pid: Option<u32>,
    max_report_bytes: usize,
    job_file: Option<NamedTempFile>,
    permit: RunPermit,
}

impl FioRun {
    /// Write the job file and launch fio.
    ///
    /// On error the permit is dropped here, which releases admission.
    pub fn spawn(cfg: &FioSection, job: &JobRequest, permit: RunPermit) -> Result<Self> {
        let job_file = write_job_file(cfg, job)?;

        let child = Command::new(&cfg.binary)
            .arg(job_file.path())
            .arg(format!("--status-interval={}s", cfg.status_interval_secs))
            .arg("--output-format=json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FioRunnerError::Spawn(format!("{}: {e}", cfg.binary.display())))?;

        let pid = child.id();
        permit.mark_running();
        tracing::info!(pid, job_bytes = job.len(), "fio running");

        Ok(Self {
            child,
            pid,
            max_report_bytes: cfg.max_report_bytes,
            job_file: Some(job_file),
            permit,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Detach the rest of the run onto its own task.
    pub fn launch(self, store: Arc<StatsStore>, metrics: Arc<AgentMetrics>) -> JoinHandle<RunSummary> {
        let span = tracing::info_span!("fio_run", pid = self.pid);
        tokio::spawn(self.stream(store, metrics).instrument(span))
    }

    /// Drive the run to completion and release admission.
    pub async fn stream(mut self, store: Arc<StatsStore>, metrics: Arc<AgentMetrics>) -> RunSummary {
        if let Some(stderr) = self.child.stderr.take() {
            tokio::spawn(forward_stderr(stderr).in_current_span());
        }

        let mut summary = RunSummary {
            outcome: RunOutcome::Failed,
            snapshots: 0,
            decode_errors: 0,
            dropped_frames: 0,
        };

        if let Some(stdout) = self.child.stdout.take() {
            read_reports(stdout, self.max_report_bytes, &store, &metrics, &mut summary).await;
        }

        // Draining
        summary.outcome = match self.child.wait().await {
            Ok(status) if status.success() => RunOutcome::Completed,
            Ok(status) => {
                let err = FioRunnerError::ProcessExitedNonZero(status.to_string());
                tracing::warn!(error = %err, "fio run failed");
                RunOutcome::Failed
            }
            Err(e) => {
                tracing::error!(error = %e, "could not reap fio");
                RunOutcome::Failed
            }
        };
        self.remove_job_file();

        // Exited
        metrics.runs.inc(&[("outcome", summary.outcome.as_str())]);
        tracing::info!(
            outcome = summary.outcome.as_str(),
            snapshots = summary.snapshots,
            decode_errors = summary.decode_errors,
            "fio job finished"
        );

        let FioRun { permit, .. } = self;
        permit.finish(summary.outcome == RunOutcome::Completed);
        summary
    }

    fn remove_job_file(&mut self) {
        if let Some(file) = self.job_file.take() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                tracing::warn!(path = %path.display(), error = %e, "removing job file failed");
            }
        }
    }
}

async fn read_reports(
    stdout: ChildStdout,
    max_report_bytes: usize,
    store: &StatsStore,
    metrics: &AgentMetrics,
    summary: &mut RunSummary,
) {
    let mut reader = BufReader::new(stdout);
    let mut framer = StatsFramer::new(max_report_bytes);
    let mut buf = Vec::with_capacity(4096);
    // A longer line cannot belong to a report the framer would keep.
    let limit = max_report_bytes as u64 + 1;

    loop {
        buf.clear();
        match (&mut reader).take(limit).read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "reading fio stdout failed");
                break;
            }
        }

        let text = String::from_utf8_lossy(&buf);
        let mut next = if buf.last() == Some(&b'\n') {
            framer.feed(text.trim_end_matches(['\n', '\r']))
        } else {
            // Cut at the limit, or the last line before EOF.
            framer.push_str(&text);
            framer.next_frame()
        };
        while let Some(frame) = next {
            publish(&frame, store, metrics, summary);
            next = framer.next_frame();
        }
    }

    let dropped = framer.dropped_frames();
    if dropped > 0 {
        metrics.frames_dropped.add(&[], dropped);
    }
    summary.dropped_frames = dropped;
}

fn publish(frame: &str, store: &StatsStore, metrics: &AgentMetrics, summary: &mut RunSummary) {
    match StatsSnapshot::decode(frame) {
        Ok(snapshot) => {
            store.write(snapshot);
            summary.snapshots += 1;
            metrics.snapshots.inc(&[("result", "decoded")]);
        }
        Err(e) => {
            summary.decode_errors += 1;
            metrics.snapshots.inc(&[("result", "invalid")]);
            tracing::warn!(error = %e, bytes = frame.len(), "dropping interval report");
        }
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.is_empty() {
            tracing::warn!(target: "fio", "{line}");
        }
    }
}
