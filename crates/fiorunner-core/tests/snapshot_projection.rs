//! Snapshot decoding and metrics projection.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use fiorunner_core::stats::{CounterTotals, MetricKind, MetricsDocument, StatsSnapshot};

const REPORT: &str = r#"{
  "fio version" : "fio-3.35",
  "timestamp" : 1700000001,
  "timestamp_ms" : 1700000001234,
  "time" : "Tue Nov 14 22:13:21 2023",
  "global options" : { "ioengine" : "psync" },
  "jobs" : [
    {
      "jobname" : "seqread",
      "groupid" : 0,
      "error" : 0,
      "elapsed" : 2,
      "job_runtime" : 1000,
      "read" : {
        "io_bytes" : 1048576,
        "io_kbytes" : 1024,
        "bw_bytes" : 1048576,
        "bw" : 1024,
        "iops" : 256.000000,
        "runtime" : 1000,
        "total_ios" : 256,
        "clat_ns" : {
          "min" : 1000,
          "max" : 9000,
          "mean" : 2000.5,
          "stddev" : 10.0,
          "N" : 256,
          "percentile" : { "50.000000" : 2000, "99.000000" : 8000 }
        },
        "lat_ns" : { "min" : 1500, "max" : 9500, "mean" : 2500.0, "stddev" : 12.0, "N" : 256 }
      },
      "write" : { "io_bytes" : 0, "bw" : 0, "iops" : 0.0, "total_ios" : 0 },
      "trim" : { "io_bytes" : 0, "bw" : 0, "iops" : 0.0, "total_ios" : 0 },
      "usr_cpu" : 12.5,
      "sys_cpu" : 25.0,
      "ctx" : 300
    }
  ],
  "disk_util" : [
    { "name" : "nvme0n1", "read_ios" : 250, "write_ios" : 3, "util" : 50.0 }
  ]
}"#;

fn snapshot() -> StatsSnapshot {
    StatsSnapshot::decode(REPORT).expect("report decodes")
}

#[test]
fn decodes_fio_report() {
    let s = snapshot();
    assert_eq!(s.fio_version.as_deref(), Some("fio-3.35"));
    assert_eq!(s.timestamp, Some(1_700_000_001));
    assert_eq!(s.jobs.len(), 1);

    let job = &s.jobs[0];
    assert_eq!(job.jobname, "seqread");
    assert_eq!(job.read.io_bytes, 1_048_576);
    assert_eq!(job.read.clat_ns.samples, 256);
    assert_eq!(job.read.clat_ns.percentile.get("99.000000"), Some(&8000.0));
    assert_eq!(s.disk_util[0].name, "nvme0n1");
}

#[test]
fn any_object_is_a_snapshot_but_other_json_is_not() {
    let s = StatsSnapshot::decode(r#"{"a": "}", "b": 1}"#).expect("unknown fields are ignored");
    assert!(s.jobs.is_empty());

    for bad in ["[1, 2]", "\"text\"", "{\"jobs\": 3}", "{\"a\": 1"] {
        let err = StatsSnapshot::decode(bad).expect_err("must fail");
        assert_eq!(err.client_code().as_str(), "INTERNAL", "input={bad}");
        assert!(err.to_string().starts_with("invalid interval report"), "input={bad}");
    }
}

#[test]
fn projects_counters_and_gauges() {
    let s = snapshot();
    let mut totals = CounterTotals::new();
    totals.observe(&s);
    let doc = MetricsDocument::project(Some(&s), &totals);

    let bytes = doc.get("fio_io_bytes_total").unwrap();
    assert_eq!(bytes.kind, MetricKind::Counter);
    assert_eq!(bytes.value(&[("job", "seqread"), ("job_index", "0"), ("op", "read")]), Some(1_048_576.0));
    assert_eq!(bytes.value(&[("job", "seqread"), ("job_index", "0"), ("op", "write")]), Some(0.0));

    let ios = doc.get("fio_ios_total").unwrap();
    assert_eq!(ios.value(&[("job", "seqread"), ("job_index", "0"), ("op", "read")]), Some(256.0));

    let bw = doc.get("fio_bandwidth_bytes_per_second").unwrap();
    assert_eq!(bw.kind, MetricKind::Gauge);
    assert_eq!(bw.value(&[("job", "seqread"), ("job_index", "0"), ("op", "read")]), Some(1_048_576.0));

    let lat = doc.get("fio_latency_seconds").unwrap();
    assert_eq!(lat.value(&[("job", "seqread"), ("job_index", "0"), ("op", "read"), ("stat", "mean")]), Some(2500.0 / 1e9));

    let pct = doc.get("fio_completion_latency_seconds").unwrap();
    assert_eq!(
        pct.value(&[("job", "seqread"), ("job_index", "0"), ("op", "read"), ("percentile", "99.000000")]),
        Some(8000.0 / 1e9)
    );

    let cpu = doc.get("fio_cpu_usage_ratio").unwrap();
    assert_eq!(cpu.value(&[("job", "seqread"), ("job_index", "0"), ("mode", "system")]), Some(0.25));

    let disk = doc.get("fio_disk_utilization_ratio").unwrap();
    assert_eq!(disk.value(&[("device", "nvme0n1")]), Some(0.5));
    let disk_ios = doc.get("fio_disk_ios_total").unwrap();
    assert_eq!(disk_ios.value(&[("device", "nvme0n1"), ("op", "read")]), Some(250.0));

    let ts = doc.get("fio_report_timestamp_seconds").unwrap();
    assert_eq!(ts.value(&[]), Some(1_700_000_001.0));
}

#[test]
fn bandwidth_falls_back_to_kib() {
    let s = StatsSnapshot::decode(r#"{"jobs": [{"jobname": "j", "write": {"bw": 2}}]}"#).unwrap();
    let doc = MetricsDocument::project(Some(&s), &CounterTotals::new());
    let bw = doc.get("fio_bandwidth_bytes_per_second").unwrap();
    assert_eq!(bw.value(&[("job", "j"), ("job_index", "0"), ("op", "write")]), Some(2048.0));
}

#[test]
fn counters_never_decrease() {
    let first = StatsSnapshot::decode(r#"{"jobs": [{"jobname": "j", "read": {"io_bytes": 500, "total_ios": 5}}]}"#).unwrap();
    let smaller = StatsSnapshot::decode(r#"{"jobs": [{"jobname": "j", "read": {"io_bytes": 100, "total_ios": 9}}]}"#).unwrap();

    let mut totals = CounterTotals::new();
    totals.observe(&first);
    totals.observe(&smaller);

    assert_eq!(totals.get("fio_io_bytes_total", &[("job", "j"), ("job_index", "0"), ("op", "read")]), Some(500.0));
    assert_eq!(totals.get("fio_ios_total", &[("job", "j"), ("job_index", "0"), ("op", "read")]), Some(9.0));
}

#[test]
fn empty_store_projects_empty_document() {
    let doc = MetricsDocument::project(None, &CounterTotals::new());
    assert!(doc.is_empty());
}

#[test]
fn cloned_jobs_sharing_a_name_stay_distinct() {
    // numjobs=2 without group_reporting: two entries, one jobname.
    let s = StatsSnapshot::decode(
        r#"{"jobs": [
            {"jobname": "seq", "read": {"io_bytes": 100, "iops": 5.0}},
            {"jobname": "seq", "read": {"io_bytes": 300, "iops": 7.0}}
        ]}"#,
    )
    .unwrap();

    let mut totals = CounterTotals::new();
    totals.observe(&s);
    let doc = MetricsDocument::project(Some(&s), &totals);

    for (name, series) in doc.iter() {
        let mut seen = std::collections::HashSet::new();
        for sample in &series.samples {
            assert!(seen.insert(sample.labels.clone()), "{name} repeats {:?}", sample.labels);
        }
    }

    let bytes = doc.get("fio_io_bytes_total").unwrap();
    assert_eq!(bytes.value(&[("job", "seq"), ("job_index", "0"), ("op", "read")]), Some(100.0));
    assert_eq!(bytes.value(&[("job", "seq"), ("job_index", "1"), ("op", "read")]), Some(300.0));

    let iops = doc.get("fio_iops").unwrap();
    assert_eq!(iops.value(&[("job", "seq"), ("job_index", "0"), ("op", "read")]), Some(5.0));
    assert_eq!(iops.value(&[("job", "seq"), ("job_index", "1"), ("op", "read")]), Some(7.0));
}
