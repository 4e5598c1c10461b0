//! Latest-snapshot store shared by the runner (writer) and exporters (readers).
//!
//! The published state is an `Arc` swapped under the write lock, so a reader
//! either sees the previous snapshot or the new one, never a mix. Readers
//! only hold the read lock long enough to clone the `Arc`; projection into a
//! `MetricsDocument` happens after the lock is released.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::metrics::{CounterTotals, MetricsDocument};
use super::snapshot::StatsSnapshot;

#[derive(Debug, Default)]
struct Published {
    snapshot: Option<Arc<StatsSnapshot>>,
    totals: CounterTotals,
}

#[derive(Debug, Default)]
pub struct StatsStore {
    current: RwLock<Arc<Published>>,
    fresh_job: AtomicBool,
    updates: AtomicU64,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a new job. The previous job's data stays visible
    /// until the first report of the new job replaces it, and that report
    /// starts counter totals from scratch.
    pub fn begin_job(&self) {
        self.fresh_job.store(true, Ordering::Release);
    }

    /// Replace the current snapshot.
    pub fn write(&self, snapshot: StatsSnapshot) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);

        let mut totals = if self.fresh_job.swap(false, Ordering::AcqRel) {
            CounterTotals::new()
        } else {
            guard.totals.clone()
        };
        totals.observe(&snapshot);

        *guard = Arc::new(Published {
            snapshot: Some(Arc::new(snapshot)),
            totals,
        });
        drop(guard);

        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Project the current state for export.
    pub fn read_snapshot_for_export(&self) -> MetricsDocument {
        let published = self.published();
        MetricsDocument::project(published.snapshot.as_deref(), &published.totals)
    }

    /// The most recent snapshot, if any report has been decoded yet.
    pub fn latest(&self) -> Option<Arc<StatsSnapshot>> {
        self.published().snapshot.clone()
    }

    /// Number of snapshots written since startup.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    fn published(&self) -> Arc<Published> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }
}
