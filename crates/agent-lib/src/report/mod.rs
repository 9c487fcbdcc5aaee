//! Fan-out and join pipeline
//!
//! This module is the core of the agent: it joins per-container metrics
//! with owning-pod metadata, shapes the sink-bound documents, and dispatches
//! one reporting task per container (and one per node) across a fixed-size
//! worker pool with drain synchronization.

pub mod document;
mod index;
mod pool;
mod reporter;


pub use document::{
    normalize_labels, to_node_document, to_pod_document, ContainerUsage, NodeDocument, NodeUsage,
    PodDocument, RedactedPodSpec,
};
pub use index::PodIndex;
pub use pool::{PoolConfig, PoolTask, ReportPool, SubmitError};
pub use reporter::{CycleSummary, MetricsReporter, NodeReportTask, PodReportTask, ReportTask};
