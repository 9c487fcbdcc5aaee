//! Document sink seam
//!
//! The pipeline hands finished documents to a [`DocumentSink`] and forgets
//! about them: a write either lands or is logged and lost. There is no
//! retry, queueing, or cross-cycle deduplication — that is the contract,
//! not an omission.

mod elastic;

pub use elastic::{ElasticConfig, ElasticsearchSink};

use crate::report::document::{NodeDocument, PodDocument};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A sink-bound record, either kind.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Document {
    Pod(PodDocument),
    Node(NodeDocument),
}

impl Document {
    pub fn kind(&self) -> &'static str {
        match self {
            Document::Pod(_) => "pod",
            Document::Node(_) => "node",
        }
    }

    /// Name of the pod or node the document describes, for logging.
    pub fn subject(&self) -> &str {
        match self {
            Document::Pod(document) => &document.pod_name,
            Document::Node(document) => &document.node_name,
        }
    }
}

/// Failure to persist one document. Non-fatal everywhere in the pipeline.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("request to document index failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("document index rejected the write with status {status}")]
    Rejected { status: u16 },
}

/// Durable document index. One call per produced document; implementations
/// must be safe for concurrent use from all pool workers.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn write(&self, document: Document) -> Result<(), SinkError>;
}
