//! Agent config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use fiorunner_core::error::{FioRunnerError, Result};

pub use schema::{AgentConfig, AgentSection, FioSection};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<AgentConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| FioRunnerError::Config(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AgentConfig> {
    let cfg: AgentConfig = serde_yaml::from_str(s)
        .map_err(|e| FioRunnerError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
