//! Library for the cluster monitoring agent
//!
//! This crate provides the core functionality for:
//! - Snapshot models for pods and usage metrics
//! - Joining per-container metrics with owning-pod metadata
//! - Bounded worker-pool dispatch with drain synchronization
//! - Document shaping and forwarding to a document index

pub mod cluster;
pub mod models;
pub mod report;
pub mod sink;

pub use cluster::{ClusterSource, KubeClusterSource};
pub use models::*;
pub use report::{CycleSummary, MetricsReporter, PodIndex, PoolConfig, SubmitError};
pub use sink::{Document, DocumentSink, ElasticConfig, ElasticsearchSink, SinkError};
