//! Agent configuration

use anyhow::{Context, Result};
use monitor_lib::ElasticConfig;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

const DEFAULT_WORKER_THREADS: usize = 10;

/// Agent configuration, read from `AGENT_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Elasticsearch base URL. Required.
    pub elastic_url: String,

    /// Optional basic-auth credentials for the index.
    #[serde(default)]
    pub elastic_username: Option<String>,
    #[serde(default)]
    pub elastic_password: Option<String>,

    /// Index documents are written to.
    #[serde(default = "default_elastic_index")]
    pub elastic_index: String,

    /// Size of the reporting worker pool.
    #[serde(
        default = "default_worker_threads",
        deserialize_with = "lenient_worker_threads"
    )]
    pub worker_threads: usize,

    /// Collection cycle interval in seconds.
    #[serde(default = "default_cycle_seconds")]
    pub cycle_seconds: u64,
}

fn default_elastic_index() -> String {
    "kube-monitoring".to_string()
}

fn default_worker_threads() -> usize {
    DEFAULT_WORKER_THREADS
}

fn default_cycle_seconds() -> u64 {
    60
}

/// Pool size falls back to the default when the value is unparsable or
/// zero, rather than refusing to start.
fn lenient_worker_threads<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }

    let parsed = match Raw::deserialize(deserializer) {
        Ok(Raw::Number(value)) => Some(value),
        Ok(Raw::Text(value)) => value.parse().ok(),
        Err(_) => None,
    };

    Ok(match parsed {
        Some(value) if value > 0 => value,
        _ => {
            tracing::warn!(
                default = DEFAULT_WORKER_THREADS,
                "Invalid worker_threads value, using default"
            );
            DEFAULT_WORKER_THREADS
        }
    })
}

impl AgentConfig {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let source = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT"))
            .build()
            .context("Failed to read environment configuration")?;

        source
            .try_deserialize()
            .context("Invalid agent configuration (AGENT_ELASTIC_URL is required)")
    }

    /// Sink settings derived from this configuration.
    pub fn elastic(&self) -> ElasticConfig {
        ElasticConfig {
            url: self.elastic_url.clone(),
            username: self.elastic_username.clone(),
            password: self.elastic_password.clone(),
            index: self.elastic_index.clone(),
            ..Default::default()
        }
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_seconds.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let config: AgentConfig =
            serde_json::from_value(json!({"elastic_url": "http://elastic:9200"})).unwrap();

        assert_eq!(config.elastic_index, "kube-monitoring");
        assert_eq!(config.worker_threads, 10);
        assert_eq!(config.cycle_seconds, 60);
        assert!(config.elastic_username.is_none());
    }

    #[test]
    fn test_worker_threads_from_string() {
        let config: AgentConfig = serde_json::from_value(json!({
            "elastic_url": "http://elastic:9200",
            "worker_threads": "16"
        }))
        .unwrap();

        assert_eq!(config.worker_threads, 16);
    }

    #[test]
    fn test_worker_threads_unparsable_falls_back() {
        let config: AgentConfig = serde_json::from_value(json!({
            "elastic_url": "http://elastic:9200",
            "worker_threads": "not-a-number"
        }))
        .unwrap();

        assert_eq!(config.worker_threads, 10);
    }

    #[test]
    fn test_worker_threads_zero_falls_back() {
        let config: AgentConfig = serde_json::from_value(json!({
            "elastic_url": "http://elastic:9200",
            "worker_threads": 0
        }))
        .unwrap();

        assert_eq!(config.worker_threads, 10);
    }

    #[test]
    fn test_missing_elastic_url_is_an_error() {
        let result: Result<AgentConfig, _> = serde_json::from_value(json!({}));
        assert!(result.is_err());
    }
}
