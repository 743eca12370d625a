//! Engine configuration.
//!
//! Grounded on `tools/nika/src/config.rs`: a struct with
//! `Default`, a `load`/`save` pair against a directory resolved via `dirs`,
//! and a `with_env` pass that lets environment variables override whatever
//! was loaded from disk. Env var names here mirror the `MERCURY_SYNC_*`
//! family from the original `hedra` config surface.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Engine-wide tunables. All fields have defaults matching the original
/// system's constants so a bare `EngineConfig::default()` behaves the same
/// as an unconfigured `hedra` pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Max stages allowed to run concurrently within one generation.
    pub max_concurrent_stages: usize,
    /// Max in-flight actions per stage's executor.
    pub max_concurrent_actions: usize,
    /// Size of each action's connection pool.
    pub pool_capacity: usize,
    /// Default per-action timeout.
    #[serde(with = "duration_millis")]
    pub action_timeout: Duration,
    /// RAFT election timeout ceiling; the floor is half of this, per the
    /// original `_min_election_timeout = max(_max_election_timeout * 0.5, 1)`.
    #[serde(with = "duration_millis")]
    pub raft_max_election_timeout: Duration,
    /// How often the RAFT monitor polls member health.
    #[serde(with = "duration_millis")]
    pub raft_logs_poll_interval: Duration,
    /// Flexible Paxos quorum fraction (0.0-1.0); quorum size is
    /// `ceil(members * (1 - quorum_fraction)) + 1`.
    pub raft_quorum_fraction: f64,
    /// This node's RAFT member id, used to seed the Snowflake generator.
    pub node_id: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_stages: 8,
            max_concurrent_actions: 1000,
            pool_capacity: 100,
            action_timeout: Duration::from_secs(60),
            raft_max_election_timeout: Duration::from_secs(10),
            raft_logs_poll_interval: Duration::from_millis(500),
            raft_quorum_fraction: 0.5,
            node_id: 0,
        }
    }
}

impl EngineConfig {
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("graphline"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    pub fn load(path: &Path) -> GraphResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(GraphError::ConfigIo)?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Load from the default config path if present, falling back to
    /// `Self::default()` when no file exists.
    pub fn load_or_default() -> GraphResult<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> GraphResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(GraphError::ConfigIo)?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| GraphError::InvalidConfig {
                field: "*".into(),
                message: e.to_string(),
            })?;
        std::fs::write(path, raw).map_err(GraphError::ConfigIo)?;
        Ok(())
    }

    /// Overlay `MERCURY_SYNC_*` environment variables, highest precedence.
    pub fn with_env(mut self) -> Self {
        if let Ok(v) = std::env::var("MERCURY_SYNC_MAX_CONCURRENT_STAGES") {
            if let Ok(n) = v.parse() {
                self.max_concurrent_stages = n;
            }
        }
        if let Ok(v) = std::env::var("MERCURY_SYNC_MAX_CONCURRENT_ACTIONS") {
            if let Ok(n) = v.parse() {
                self.max_concurrent_actions = n;
            }
        }
        if let Ok(v) = std::env::var("MERCURY_SYNC_POOL_CAPACITY") {
            if let Ok(n) = v.parse() {
                self.pool_capacity = n;
            }
        }
        if let Ok(v) = std::env::var("MERCURY_SYNC_ACTION_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.action_timeout = Duration::from_millis(n);
            }
        }
        if let Ok(v) = std::env::var("MERCURY_SYNC_RAFT_MAX_ELECTION_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.raft_max_election_timeout = Duration::from_millis(n);
            }
        }
        if let Ok(v) = std::env::var("MERCURY_SYNC_RAFT_QUORUM_FRACTION") {
            if let Ok(n) = v.parse() {
                self.raft_quorum_fraction = n;
            }
        }
        if let Ok(v) = std::env::var("MERCURY_SYNC_NODE_ID") {
            if let Ok(n) = v.parse() {
                self.node_id = n;
            }
        }
        self
    }

    /// The floor of the election timeout range, per the original's
    /// `max(max_election_timeout * 0.5, 1)`.
    pub fn raft_min_election_timeout(&self) -> Duration {
        let half = self.raft_max_election_timeout / 2;
        half.max(Duration::from_secs(1))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
