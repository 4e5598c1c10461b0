//! Single-job admission gate.
//!
//! The node runs at most one fio job. `JobAdmission` owns the only
//! `JobState` in the agent; every transition happens under one mutex, so two
//! submissions can never both observe `Idle`.
//!
//! Transition table:
//! - `try_admit`    Idle -> Validating
//! - `mark_running` Validating -> Running
//! - `finish`       Running -> Completed | Failed
//! - `release`      Validating | Running | Completed | Failed -> Idle
//!
//! A transition from any other state is an agent bug and panics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fiorunner_core::job::JobState;

#[derive(Debug)]
pub struct JobAdmission {
    state: Mutex<JobState>,
    admitted: AtomicU64,
    released: AtomicU64,
}

impl Default for JobAdmission {
    fn default() -> Self {
        Self::new()
    }
}

impl JobAdmission {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(JobState::Idle),
            admitted: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> JobState {
        *self.lock()
    }

    /// Claim the node. Returns false, without side effects, unless idle.
    pub fn try_admit(&self) -> bool {
        let mut state = self.lock();
        if *state != JobState::Idle {
            return false;
        }
        *state = JobState::Validating;
        self.admitted.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn mark_running(&self) {
        let mut state = self.lock();
        assert_eq!(
            *state,
            JobState::Validating,
            "mark_running outside of validation"
        );
        *state = JobState::Running;
    }

    /// Record how the run ended. Release must still follow.
    pub fn finish(&self, succeeded: bool) {
        let mut state = self.lock();
        assert_eq!(*state, JobState::Running, "finish without a running job");
        *state = if succeeded {
            JobState::Completed
        } else {
            JobState::Failed
        };
    }

    pub fn release(&self) {
        let mut state = self.lock();
        assert!(state.is_active(), "release without an admitted job");
        *state = JobState::Idle;
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    /// `try_admit` wrapped in a guard that releases on drop.
    pub fn admit(self: &Arc<Self>) -> Option<RunPermit> {
        self.try_admit().then(|| RunPermit {
            admission: Arc::clone(self),
        })
    }

    /// Runs admitted since startup.
    pub fn admitted_runs(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    /// Runs released since startup.
    pub fn released_runs(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    // The guarded value is a plain enum, always consistent, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive claim on the node for one run.
///
/// Dropping the permit releases admission, so every exit path of a run
/// (rejected dry run, spawn failure, stream end, panic) frees the node
/// exactly once.
#[derive(Debug)]
pub struct RunPermit {
    admission: Arc<JobAdmission>,
}

impl RunPermit {
    pub fn mark_running(&self) {
        self.admission.mark_running();
    }

    /// Record the outcome and release.
    pub fn finish(self, succeeded: bool) {
        self.admission.finish(succeeded);
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.admission.release();
    }
}
