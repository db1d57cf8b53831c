use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SkillpathConfig {
    pub worker: WorkerConfig,
    pub storage: StorageConfig,
    pub queue: QueueConfig,
    pub embedding: EmbeddingConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkerConfig {
    pub log_level: String,
    pub poll_interval_ms: u64,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    /// Deliveries after which a message is failed without running it again.
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueueConfig {
    pub name: String,
    /// Queue database; `None` shares the store database.
    pub db_path: Option<String>,
    pub visibility_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"local"` (ONNX all-MiniLM-L6-v2) or `"trigram"` (offline hashing).
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RankingConfig {
    pub top_n: usize,
    pub secondary_weight: f64,
    /// Relative shares of the secondary score; normalized to sum to one.
    pub rating_share: f64,
    pub duration_share: f64,
    /// Share taken by peer usage: how many other users' approved or
    /// completed plans suggest the resource.
    pub popularity_share: f64,
    pub duration_pivot_minutes: f64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            poll_interval_ms: 500,
            backoff_initial_ms: 1_000,
            backoff_max_ms: 30_000,
            max_attempts: 3,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_skillpath_dir()
            .join("skillpath.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "recommendation_queue".into(),
            db_path: None,
            visibility_timeout_secs: 300,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_skillpath_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            secondary_weight: 0.1,
            rating_share: 0.6,
            duration_share: 0.25,
            popularity_share: 0.15,
            duration_pivot_minutes: 600.0,
        }
    }
}

/// Returns `~/.skillpath/`, or `./.skillpath/` when no home directory is known.
pub fn default_skillpath_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".skillpath")
}

/// Returns the default config file path: `~/.skillpath/config.toml`
pub fn default_config_path() -> PathBuf {
    default_skillpath_dir().join("config.toml")
}

impl SkillpathConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SkillpathConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SKILLPATH_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("SKILLPATH_QUEUE") {
            self.queue.name = val;
        }
        if let Ok(val) = std::env::var("SKILLPATH_QUEUE_DB") {
            self.queue.db_path = Some(val);
        }
        if let Ok(val) = std::env::var("SKILLPATH_LOG_LEVEL") {
            self.worker.log_level = val;
        }
        if let Ok(val) = std::env::var("SKILLPATH_EMBEDDING_PROVIDER") {
            self.embedding.provider = val;
        }
    }

    /// Resolve the store database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the queue database path; falls back to the store database.
    pub fn resolved_queue_db_path(&self) -> PathBuf {
        match self.queue.db_path.as_deref() {
            Some(path) if !path.is_empty() => expand_tilde(path),
            _ => self.resolved_db_path(),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SkillpathConfig::default();
        assert_eq!(config.worker.log_level, "info");
        assert_eq!(config.queue.name, "recommendation_queue");
        assert!(config.queue.db_path.is_none());
        assert_eq!(config.ranking.top_n, 10);
        assert_eq!(config.worker.max_attempts, 3);
        assert!((config.ranking.secondary_weight - 0.1).abs() < f64::EPSILON);
        assert!(config.storage.db_path.ends_with("skillpath.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[worker]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[queue]
name = "idp_jobs"

[ranking]
top_n = 5
popularity_share = 0.3
"#;
        let config: SkillpathConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.worker.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.queue.name, "idp_jobs");
        assert_eq!(config.ranking.top_n, 5);
        assert_eq!(config.ranking.popularity_share, 0.3);
        assert_eq!(config.ranking.rating_share, 0.6);
        // defaults still apply for unset fields
        assert_eq!(config.worker.poll_interval_ms, 500);
        assert_eq!(config.embedding.provider, "local");
    }

    #[test]
    fn queue_db_falls_back_to_store_db() {
        let mut config = SkillpathConfig::default();
        config.storage.db_path = "/tmp/store.db".into();
        assert_eq!(config.resolved_queue_db_path(), PathBuf::from("/tmp/store.db"));

        config.queue.db_path = Some("/tmp/queue.db".into());
        assert_eq!(config.resolved_queue_db_path(), PathBuf::from("/tmp/queue.db"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = SkillpathConfig::default();
        std::env::set_var("SKILLPATH_DB", "/tmp/override.db");
        std::env::set_var("SKILLPATH_QUEUE", "env-queue");
        std::env::set_var("SKILLPATH_LOG_LEVEL", "trace");
        std::env::set_var("SKILLPATH_EMBEDDING_PROVIDER", "trigram");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.queue.name, "env-queue");
        assert_eq!(config.worker.log_level, "trace");
        assert_eq!(config.embedding.provider, "trigram");

        // Clean up
        std::env::remove_var("SKILLPATH_DB");
        std::env::remove_var("SKILLPATH_QUEUE");
        std::env::remove_var("SKILLPATH_LOG_LEVEL");
        std::env::remove_var("SKILLPATH_EMBEDDING_PROVIDER");
    }
}
