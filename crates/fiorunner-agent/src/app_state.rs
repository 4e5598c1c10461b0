//! Shared application state for the fio runner agent.
//!
//! Holds the explicit state objects every handler needs: the admission gate,
//! the stats store and the agent's own metrics. Cloned per request.

use std::path::Path;
use std::sync::Arc;

use fiorunner_core::error::{FioRunnerError, Result};
use fiorunner_core::stats::StatsStore;

use crate::config::AgentConfig;
use crate::job::JobAdmission;
use crate::obs::metrics::AgentMetrics;

const FAIL_FAST_ON_MISSING_BINARY: bool = false; // if changed to true, boot fails.

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    admission: Arc<JobAdmission>,
    store: Arc<StatsStore>,
    metrics: Arc<AgentMetrics>,
}

struct AppStateInner {
    cfg: AgentConfig,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: AgentConfig) -> Result<Self> {
        cfg.validate()?;

        // fio is only needed once a job arrives; a node may be provisioned
        // before the tool is installed.
        if !binary_available(&cfg.fio.binary) {
            tracing::warn!(binary = %cfg.fio.binary.display(), "fio binary not found");
            if FAIL_FAST_ON_MISSING_BINARY {
                return Err(FioRunnerError::Config(format!(
                    "fio binary not found: {}",
                    cfg.fio.binary.display()
                )));
            }
        }

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg }),
            admission: Arc::new(JobAdmission::new()),
            store: Arc::new(StatsStore::new()),
            metrics: Arc::new(AgentMetrics::default()),
        })
    }

    pub fn cfg(&self) -> &AgentConfig {
        &self.inner.cfg
    }

    pub fn admission(&self) -> Arc<JobAdmission> {
        Arc::clone(&self.admission)
    }

    pub fn store(&self) -> Arc<StatsStore> {
        Arc::clone(&self.store)
    }

    pub fn metrics(&self) -> Arc<AgentMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Unlabelled counters appended to `/metrics`.
    pub fn metrics_extra(&self) -> [(&'static str, &'static str, u64); 2] {
        [
            (
                "fiorunner_jobs_admitted_total",
                "Jobs admitted since startup.",
                self.admission.admitted_runs(),
            ),
            (
                "fiorunner_report_updates_total",
                "Interval reports written to the stats store since startup.",
                self.store.updates(),
            ),
        ]
    }
}

/// A path with a separator must exist; a bare name is looked up on `PATH`.
fn binary_available(binary: &Path) -> bool {
    if binary.components().count() > 1 {
        return binary.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file()))
        .unwrap_or(false)
}
