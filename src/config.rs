//! Runtime configuration
//!
//! Loaded from a YAML file (`--config` / `MINDSTREAM_CONFIG`). Every section
//! and field is optional; omitted values take the defaults below.
//!
//! ```yaml
//! buffer:
//!   max_chunks: 100
//! backend:
//!   command: ["ollama", "run", "llama3.1"]
//!   timeout_secs: 60
//! parser:
//!   strict: false
//!   dangling_parent: promote   # promote | drop | reject
//! merge:
//!   strategy: backend          # backend | heuristic
//!   strict: false
//! planner:
//!   enabled: true
//! storage:
//!   path: /var/lib/mindstream/sessions.db
//! ```

use crate::backend::CallPolicy;
use crate::buffer::DEFAULT_MAX_CHUNKS;
use crate::map::DanglingParentPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub buffer: BufferConfig,
    pub backend: BackendConfig,
    pub parser: ParserConfig,
    pub merge: MergeConfig,
    pub planner: PlannerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub max_chunks: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// argv of the generation command; the prompt goes to its stdin
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: vec!["ollama".to_string(), "run".to_string(), "llama3.1".to_string()],
            timeout_secs: 60,
        }
    }
}

impl BackendConfig {
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Fail extraction instead of returning a stub map
    pub strict: bool,
    pub dangling_parent: DanglingParentPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    #[default]
    Backend,
    Heuristic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub strategy: MergeStrategy,
    /// Fail on unreadable merge output instead of returning the disjoint union
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Let the backend plan `planned`-mode runs; otherwise they use the fixed sequence
    pub enabled: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; `None` means the platform data dir
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        // An empty file deserializes to unit, not to an empty mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.buffer.max_chunks == 0 {
            return Err(ConfigError::Invalid("buffer.max_chunks must be at least 1".to_string()));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid("backend.timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}
