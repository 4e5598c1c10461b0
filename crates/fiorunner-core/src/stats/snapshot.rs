//! Decoded fio interval report.
//!
//! fio's JSON layout shifts between releases, so every field is optional
//! with a default and unknown fields are ignored. Any JSON object decodes;
//! anything else is a `StreamDecode` error and the frame is dropped.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{FioRunnerError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    #[serde(rename = "fio version")]
    pub fio_version: Option<String>,
    /// Unix seconds at which the report was produced.
    pub timestamp: Option<u64>,
    pub timestamp_ms: Option<u64>,
    pub time: Option<String>,
    pub jobs: Vec<JobStats>,
    pub disk_util: Vec<DiskUtil>,
}

impl StatsSnapshot {
    /// Decode one framed report.
    pub fn decode(frame: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(frame)
            .map_err(|e| FioRunnerError::StreamDecode(e.to_string()))?;
        if !value.is_object() {
            return Err(FioRunnerError::StreamDecode("report is not a json object".into()));
        }
        serde_json::from_value(value).map_err(|e| FioRunnerError::StreamDecode(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobStats {
    pub jobname: String,
    pub groupid: u32,
    pub error: i64,
    /// Wall-clock seconds since the job started.
    pub elapsed: u64,
    /// Milliseconds the job has spent doing I/O.
    pub job_runtime: u64,
    pub read: IoStats,
    pub write: IoStats,
    pub trim: IoStats,
    /// Percent.
    pub usr_cpu: f64,
    /// Percent.
    pub sys_cpu: f64,
    pub ctx: u64,
}

impl JobStats {
    /// The three data directions, labelled the way they are exported.
    pub fn directions(&self) -> [(&'static str, &IoStats); 3] {
        [("read", &self.read), ("write", &self.write), ("trim", &self.trim)]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IoStats {
    pub io_bytes: u64,
    pub io_kbytes: u64,
    pub bw_bytes: Option<u64>,
    /// KiB/s.
    pub bw: f64,
    pub iops: f64,
    /// Milliseconds.
    pub runtime: u64,
    pub total_ios: u64,
    pub short_ios: u64,
    pub drop_ios: u64,
    pub slat_ns: LatencyStats,
    pub clat_ns: LatencyStats,
    pub lat_ns: LatencyStats,
}

impl IoStats {
    pub fn bandwidth_bytes(&self) -> f64 {
        match self.bw_bytes {
            Some(b) => b as f64,
            None => self.bw * 1024.0,
        }
    }
}

/// Nanosecond latency summary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    #[serde(rename = "N")]
    pub samples: u64,
    /// Keyed by fio's own percentile string, e.g. `"99.000000"`.
    pub percentile: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiskUtil {
    pub name: String,
    pub read_ios: u64,
    pub write_ios: u64,
    pub read_merges: u64,
    pub write_merges: u64,
    pub read_ticks: u64,
    pub write_ticks: u64,
    pub in_queue: u64,
    /// Percent.
    pub util: f64,
}
