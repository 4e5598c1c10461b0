use std::path::PathBuf;

use serde::Deserialize;
use fiorunner_core::error::{FioRunnerError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub version: u32,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub fio: FioSection,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: 1,
            agent: AgentSection::default(),
            fio: FioSection::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FioRunnerError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.agent.validate()?;
        self.fio.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl AgentSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(FioRunnerError::Config(
                "agent.listen must be a valid socket address".into(),
            ));
        }
        if !(1024..=64 * 1024 * 1024).contains(&self.max_body_bytes) {
            return Err(FioRunnerError::Config(
                "agent.max_body_bytes must be between 1024 and 67108864".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8081".into()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FioSection {
    /// Program name (looked up on PATH) or path to the fio binary.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,

    #[serde(default = "default_validate_timeout_ms")]
    pub validate_timeout_ms: u64,

    #[serde(default = "default_max_report_bytes")]
    pub max_report_bytes: usize,

    /// Where job files are written. System temp dir when unset.
    #[serde(default)]
    pub job_dir: Option<PathBuf>,
}

impl Default for FioSection {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            status_interval_secs: default_status_interval_secs(),
            validate_timeout_ms: default_validate_timeout_ms(),
            max_report_bytes: default_max_report_bytes(),
            job_dir: None,
        }
    }
}

impl FioSection {
    pub fn validate(&self) -> Result<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(FioRunnerError::Config("fio.binary must not be empty".into()));
        }
        if !(1..=3600).contains(&self.status_interval_secs) {
            return Err(FioRunnerError::Config(
                "fio.status_interval_secs must be between 1 and 3600".into(),
            ));
        }
        if !(100..=600_000).contains(&self.validate_timeout_ms) {
            return Err(FioRunnerError::Config(
                "fio.validate_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if self.max_report_bytes < 1024 {
            return Err(FioRunnerError::Config(
                "fio.max_report_bytes must be at least 1024".into(),
            ));
        }
        Ok(())
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("fio")
}
fn default_status_interval_secs() -> u64 {
    1
}
fn default_validate_timeout_ms() -> u64 {
    30_000
}
fn default_max_report_bytes() -> usize {
    16 * 1024 * 1024
}
