//! Elasticsearch-backed document sink

use super::{Document, DocumentSink, SinkError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the Elasticsearch sink.
#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URL of the cluster, e.g. `http://elasticsearch:9200`.
    pub url: String,
    /// Optional basic-auth credentials.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Index documents are written to.
    pub index: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            password: None,
            index: "kube-monitoring".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Writes each document with a single `POST {url}/{index}/_doc` call.
///
/// The underlying `reqwest::Client` is a connection pool and is safe for
/// concurrent use from all pool workers.
pub struct ElasticsearchSink {
    http: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchSink {
    pub fn new(config: ElasticConfig) -> Result<Self> {
        if config.url.is_empty() {
            anyhow::bail!("Elasticsearch URL is required");
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build Elasticsearch HTTP client")?;

        let endpoint = format!("{}/{}/_doc", config.url.trim_end_matches('/'), config.index);

        Ok(Self {
            http,
            endpoint,
            username: config.username,
            password: config.password,
        })
    }

    /// The `_doc` endpoint documents are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DocumentSink for ElasticsearchSink {
    async fn write(&self, document: Document) -> Result<(), SinkError> {
        let mut request = self.http.post(&self.endpoint).json(&document);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SinkError::Rejected {
                status: response.status().as_u16(),
            });
        }

        debug!(
            kind = document.kind(),
            subject = document.subject(),
            "Indexed document"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_index() {
        let config = ElasticConfig::default();
        assert_eq!(config.index, "kube-monitoring");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_shape() {
        let sink = ElasticsearchSink::new(ElasticConfig {
            url: "http://elastic:9200/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(sink.endpoint(), "http://elastic:9200/kube-monitoring/_doc");
    }

    #[test]
    fn test_missing_url_is_an_error() {
        assert!(ElasticsearchSink::new(ElasticConfig::default()).is_err());
    }
}
