//! Metrics model projected from interval reports.
//!
//! A `MetricsDocument` is rebuilt from the latest snapshot on every read and
//! never patched in place. Counter series are taken from `CounterTotals`
//! rather than the raw snapshot so they stay monotonic within a job.

use std::collections::{BTreeMap, HashMap};

use super::snapshot::StatsSnapshot;

/// Label key/value pairs. Keys are unique and iterate in sorted order.
pub type LabelSet = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: LabelSet,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

impl MetricSeries {
    pub fn new(help: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            help: help.into(),
            kind,
            samples: Vec::new(),
        }
    }

    pub fn add(&mut self, labels: LabelSet, value: f64) {
        self.samples.push(Sample { labels, value });
    }

    /// Value of the sample whose labels match exactly.
    pub fn value(&self, labels: &[(&str, &str)]) -> Option<f64> {
        let want = labels_of(labels);
        self.samples.iter().find(|s| s.labels == want).map(|s| s.value)
    }
}

/// Build a `LabelSet` from borrowed pairs.
pub fn labels_of(pairs: &[(&str, &str)]) -> LabelSet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsDocument {
    series: HashMap<String, MetricSeries>,
}

impl MetricsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a snapshot and the running counter totals.
    pub fn project(snapshot: Option<&StatsSnapshot>, totals: &CounterTotals) -> Self {
        let mut doc = Self::new();

        for ((name, labels), value) in &totals.values {
            let help = counter_help(name);
            doc.series_mut(name, help, MetricKind::Counter)
                .add(labels.clone(), *value);
        }

        if let Some(snapshot) = snapshot {
            project_gauges(snapshot, &mut doc);
        }
        doc
    }

    /// Get or create a series. An existing series keeps its help and kind.
    pub fn series_mut(&mut self, name: &str, help: &str, kind: MetricKind) -> &mut MetricSeries {
        self.series
            .entry(name.to_string())
            .or_insert_with(|| MetricSeries::new(help, kind))
    }

    pub fn get(&self, name: &str) -> Option<&MetricSeries> {
        self.series.get(name)
    }

    /// Series in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricSeries)> {
        self.series.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

const COUNTERS: &[(&str, &str)] = &[
    ("fio_io_bytes_total", "Bytes transferred by the job, per data direction."),
    ("fio_ios_total", "I/O operations completed by the job, per data direction."),
    ("fio_context_switches_total", "Context switches taken by the job."),
    ("fio_disk_ios_total", "I/O operations completed by the device, per direction."),
];

fn counter_help(name: &str) -> &'static str {
    COUNTERS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, h)| *h)
        .unwrap_or("fio counter.")
}

/// Labels of a series that belongs to one `jobs[]` entry.
///
/// fio repeats `jobname` for every clone of a `numjobs` section unless
/// `group_reporting` is set, so the entry's position is part of its identity.
fn job_labels(job: &str, index: &str, extra: &[(&str, &str)]) -> LabelSet {
    let mut labels = labels_of(&[("job", job), ("job_index", index)]);
    labels.extend(labels_of(extra));
    labels
}

/// Counter samples carried by one snapshot, before monotonic clamping.
fn counter_samples(snapshot: &StatsSnapshot) -> Vec<(&'static str, LabelSet, f64)> {
    let mut out = Vec::new();
    for (i, job) in snapshot.jobs.iter().enumerate() {
        let index = i.to_string();
        let name = job.jobname.as_str();
        for (op, io) in job.directions() {
            let labels = job_labels(name, &index, &[("op", op)]);
            out.push(("fio_io_bytes_total", labels.clone(), io.io_bytes as f64));
            out.push(("fio_ios_total", labels, io.total_ios as f64));
        }
        out.push((
            "fio_context_switches_total",
            job_labels(name, &index, &[]),
            job.ctx as f64,
        ));
    }
    for disk in &snapshot.disk_util {
        for (op, ios) in [("read", disk.read_ios), ("write", disk.write_ios)] {
            out.push((
                "fio_disk_ios_total",
                labels_of(&[("device", disk.name.as_str()), ("op", op)]),
                ios as f64,
            ));
        }
    }
    out
}

/// High-water marks for counter series within one job.
///
/// fio reports cumulative totals, but a restarted job section or a rounding
/// wobble can make a later report smaller. Exported counters never go down.
#[derive(Debug, Clone, Default)]
pub struct CounterTotals {
    values: BTreeMap<(String, LabelSet), f64>,
}

impl CounterTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a snapshot's counters in, keeping the maximum seen per series.
    pub fn observe(&mut self, snapshot: &StatsSnapshot) {
        for (name, labels, value) in counter_samples(snapshot) {
            let slot = self.values.entry((name.to_string(), labels)).or_insert(value);
            if value > *slot {
                *slot = value;
            }
        }
    }

    pub fn get(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.values.get(&(name.to_string(), labels_of(labels))).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn project_gauges(snapshot: &StatsSnapshot, doc: &mut MetricsDocument) {
    if let Some(ts) = snapshot.timestamp {
        doc.series_mut(
            "fio_report_timestamp_seconds",
            "Unix time at which fio produced the latest interval report.",
            MetricKind::Gauge,
        )
        .add(LabelSet::new(), ts as f64);
    }

    for (i, job) in snapshot.jobs.iter().enumerate() {
        let index = i.to_string();
        let job_name = job.jobname.as_str();

        for (op, io) in job.directions() {
            let base = [("op", op)];

            doc.series_mut(
                "fio_bandwidth_bytes_per_second",
                "Average bandwidth over the job so far.",
                MetricKind::Gauge,
            )
            .add(job_labels(job_name, &index, &base), io.bandwidth_bytes());

            doc.series_mut("fio_iops", "Average I/O operations per second.", MetricKind::Gauge)
                .add(job_labels(job_name, &index, &base), io.iops);

            let lat = &io.lat_ns;
            let latency = doc.series_mut(
                "fio_latency_seconds",
                "Total I/O latency summary.",
                MetricKind::Gauge,
            );
            for (stat, ns) in [
                ("min", lat.min),
                ("max", lat.max),
                ("mean", lat.mean),
                ("stddev", lat.stddev),
            ] {
                latency.add(job_labels(job_name, &index, &[("op", op), ("stat", stat)]), ns / 1e9);
            }

            if !io.clat_ns.percentile.is_empty() {
                let pct = doc.series_mut(
                    "fio_completion_latency_seconds",
                    "Completion latency percentiles.",
                    MetricKind::Gauge,
                );
                for (p, ns) in &io.clat_ns.percentile {
                    pct.add(
                        job_labels(job_name, &index, &[("op", op), ("percentile", p.as_str())]),
                        ns / 1e9,
                    );
                }
            }
        }

        let cpu = doc.series_mut(
            "fio_cpu_usage_ratio",
            "Share of one CPU used by the job.",
            MetricKind::Gauge,
        );
        cpu.add(job_labels(job_name, &index, &[("mode", "user")]), job.usr_cpu / 100.0);
        cpu.add(job_labels(job_name, &index, &[("mode", "system")]), job.sys_cpu / 100.0);

        doc.series_mut("fio_job_errors", "Error code reported by the job.", MetricKind::Gauge)
            .add(job_labels(job_name, &index, &[]), job.error as f64);

        doc.series_mut(
            "fio_job_elapsed_seconds",
            "Wall-clock time since the job started.",
            MetricKind::Gauge,
        )
        .add(job_labels(job_name, &index, &[]), job.elapsed as f64);
    }

    for disk in &snapshot.disk_util {
        doc.series_mut(
            "fio_disk_utilization_ratio",
            "Device busy time as a share of wall-clock time.",
            MetricKind::Gauge,
        )
        .add(labels_of(&[("device", disk.name.as_str())]), disk.util / 100.0);
    }
}
