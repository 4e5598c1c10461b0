//! Agent self-metrics and Prometheus text rendering.
//!
//! Counter/gauge/histogram types with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic
//! ordering. Histogram buckets are fixed in milliseconds.
//!
//! `AgentMetrics::render` also writes out the `MetricsDocument` projected
//! from the latest fio report, so `/metrics` is a single exposition.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use fiorunner_core::stats::{LabelSet, MetricsDocument};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn join_labels<'a>(pairs: impl Iterator<Item = (&'a String, &'a String)>) -> String {
    pairs
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_sample(out: &mut String, name: &str, labels: &str, value: impl std::fmt::Display) {
    if labels.is_empty() {
        let _ = writeln!(out, "{} {}", name, value);
    } else {
        let _ = writeln!(out, "{}{{{}}} {}", name, labels, value);
    }
}

/// Float formatting accepted by the exposition format.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for an exact label set.
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
        let _ = writeln!(out, "# TYPE {} counter", name);
        let mut rows: Vec<(String, u64)> = self
            .map
            .iter()
            .map(|r| {
                let labels = join_labels(r.key().iter().map(|(k, v)| (k, v)));
                (labels, r.value().load(Ordering::Relaxed))
            })
            .collect();
        rows.sort();
        for (labels, val) in rows {
            write_sample(out, name, &labels, val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<Vec<(String, String)>, AtomicI64>,
}

impl GaugeVec {
    pub fn set(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.store(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
        let _ = writeln!(out, "# TYPE {} gauge", name);
        let mut rows: Vec<(String, i64)> = self
            .map
            .iter()
            .map(|r| {
                let labels = join_labels(r.key().iter().map(|(k, v)| (k, v)));
                (labels, r.value().load(Ordering::Relaxed))
            })
            .collect();
        rows.sort();
        for (labels, val) in rows {
            write_sample(out, name, &labels, val);
        }
    }
}

// 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s, 5s, 10s
const BUCKETS_MILLIS: [u64; 9] = [1, 5, 10, 50, 100, 500, 1_000, 5_000, 10_000];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 9],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<Vec<(String, String)>, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration and increment cumulative buckets (millisecond scale).
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(AtomicHistogram::default);
        let millis = duration.as_millis() as u64;

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(millis, Ordering::Relaxed);

        for (i, &b) in BUCKETS_MILLIS.iter().enumerate() {
            if millis <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
        let _ = writeln!(out, "# TYPE {} histogram", name);
        for r in self.map.iter() {
            let hist = r.value();
            let label_str = join_labels(r.key().iter().map(|(k, v)| (k, v)));
            let prefix = if label_str.is_empty() {
                String::new()
            } else {
                format!("{},", label_str)
            };

            for (i, &le) in BUCKETS_MILLIS.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count);

            let sum = hist.sum.load(Ordering::Relaxed);
            write_sample(out, &format!("{}_sum", name), &label_str, sum);
            write_sample(out, &format!("{}_count", name), &label_str, count);
        }
    }
}

#[derive(Default)]
pub struct AgentMetrics {
    /// `PUT /job` results, labelled by `outcome`.
    pub job_submissions: CounterVec,
    /// Finished fio runs, labelled by `outcome`.
    pub runs: CounterVec,
    /// Interval reports, labelled by `result` (`decoded` | `invalid`).
    pub snapshots: CounterVec,
    pub frames_dropped: CounterVec,
    pub validation_duration: HistogramVec, // In Milliseconds
    pub job_active: GaugeVec,
}

impl AgentMetrics {
    /// Render the projected fio document, then agent metrics, then the
    /// unlabelled counters provided by callers as `(name, help, value)`.
    pub fn render(&self, doc: &MetricsDocument, extra: &[(&str, &str, u64)]) -> String {
        let mut out = String::new();
        render_document(doc, &mut out);

        self.job_submissions.render(
            "fiorunner_job_submissions_total",
            "Job submissions by outcome.",
            &mut out,
        );
        self.runs
            .render("fiorunner_runs_total", "Finished fio runs by outcome.", &mut out);
        self.snapshots.render(
            "fiorunner_snapshots_total",
            "Interval reports read from fio by result.",
            &mut out,
        );
        self.frames_dropped.render(
            "fiorunner_frames_dropped_total",
            "Interval reports dropped for exceeding the size limit.",
            &mut out,
        );
        self.validation_duration.render(
            "fiorunner_validation_duration_millis", // Explicit unit
            "Duration of fio dry runs in milliseconds.",
            &mut out,
        );
        self.job_active.render(
            "fiorunner_job_active",
            "1 while a job is admitted on this node.",
            &mut out,
        );

        for (name, help, v) in extra {
            let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
            let _ = writeln!(out, "# TYPE {} counter", name);
            write_sample(&mut out, name, "", v);
        }
        out
    }
}

/// Write a `MetricsDocument` in exposition format, series sorted by name.
pub fn render_document(doc: &MetricsDocument, out: &mut String) {
    let mut series: Vec<_> = doc.iter().collect();
    series.sort_by(|a, b| a.0.cmp(b.0));

    for (name, s) in series {
        if s.samples.is_empty() {
            continue;
        }
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(&s.help));
        let _ = writeln!(out, "# TYPE {} {}", name, s.kind.as_str());
        for sample in &s.samples {
            let labels = render_labels(&sample.labels);
            write_sample(out, name, &labels, format_value(sample.value));
        }
    }
}

fn render_labels(labels: &LabelSet) -> String {
    join_labels(labels.iter())
}
