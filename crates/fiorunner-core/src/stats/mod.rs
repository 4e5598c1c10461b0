//! Interval report pipeline: framing, decoding, storage and projection.

pub mod framer;
pub mod metrics;
pub mod snapshot;
pub mod store;

pub use framer::StatsFramer;
pub use metrics::{labels_of, CounterTotals, LabelSet, MetricKind, MetricSeries, MetricsDocument, Sample};
pub use snapshot::{DiskUtil, IoStats, JobStats, LatencyStats, StatsSnapshot};
pub use store::StatsStore;
