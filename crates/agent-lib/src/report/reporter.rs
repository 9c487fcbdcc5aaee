//! Reporting coordinator
//!
//! Drives one collection cycle: builds the pod index, fans one task out per
//! container metric and one per node metric, and waits for the pool to
//! drain. Transform and sink write both execute inside the workers, off the
//! coordinator's task.

use super::document::{to_node_document, to_pod_document};
use super::index::PodIndex;
use super::pool::{PoolConfig, PoolTask, ReportPool};
use crate::models::{ContainerMetricSample, NodeMetricSample, PodMetricsEntry, PodSnapshot};
use crate::sink::{Document, DocumentSink};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::warn;

/// Reporting unit for one container metric joined with its owning pod.
pub struct PodReportTask {
    container: ContainerMetricSample,
    entry: Arc<PodMetricsEntry>,
    pod: Option<PodSnapshot>,
    recorded_at: Arc<str>,
    sink: Arc<dyn DocumentSink>,
}

/// Reporting unit for one node metric sample.
pub struct NodeReportTask {
    sample: NodeMetricSample,
    recorded_at: Arc<str>,
    sink: Arc<dyn DocumentSink>,
}

/// The closed set of work the pool executes. Pod and node reports share one
/// pool and one drain.
pub enum ReportTask {
    Pod(PodReportTask),
    Node(NodeReportTask),
}

#[async_trait]
impl PoolTask for ReportTask {
    async fn run(self) {
        match self {
            ReportTask::Pod(task) => task.report().await,
            ReportTask::Node(task) => task.report().await,
        }
    }
}

impl PodReportTask {
    async fn report(self) {
        let document = to_pod_document(
            &self.container,
            &self.entry,
            self.pod.as_ref(),
            &self.recorded_at,
        );
        let pod_name = document.pod_name.clone();
        let container_name = document.metrics.container_name.clone();
        if let Err(error) = self.sink.write(Document::Pod(document)).await {
            warn!(
                pod = %pod_name,
                container = %container_name,
                error = %error,
                "Failed to write pod document"
            );
        }
    }
}

impl NodeReportTask {
    async fn report(self) {
        let document = to_node_document(&self.sample, &self.recorded_at);
        let node_name = document.node_name.clone();
        if let Err(error) = self.sink.write(Document::Node(document)).await {
            warn!(node = %node_name, error = %error, "Failed to write node document");
        }
    }
}

/// Counts for one completed cycle. `dropped` covers tasks the pool refused
/// at submission time; those documents are lost.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub pod_documents: usize,
    pub node_documents: usize,
    pub dropped: usize,
}

/// Orchestrates collection cycles over a shared worker pool and sink.
pub struct MetricsReporter {
    pool: ReportPool<ReportTask>,
    sink: Arc<dyn DocumentSink>,
}

impl MetricsReporter {
    pub fn new(sink: Arc<dyn DocumentSink>, config: PoolConfig) -> Self {
        Self {
            pool: ReportPool::new(config),
            sink,
        }
    }

    /// Run one collection cycle over already-fetched snapshots and block
    /// until every accepted task has completed.
    ///
    /// Worker completion order is unspecified; only the drain point is a
    /// synchronization guarantee.
    pub async fn run_cycle(
        &self,
        pods: Vec<PodSnapshot>,
        pod_metrics: Vec<PodMetricsEntry>,
        node_metrics: Vec<NodeMetricSample>,
    ) -> CycleSummary {
        let recorded_at: Arc<str> =
            Arc::from(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        let index = PodIndex::build(pods);
        let mut summary = CycleSummary::default();

        for entry in pod_metrics {
            let entry = Arc::new(entry);
            for container in &entry.containers {
                let task = ReportTask::Pod(PodReportTask {
                    container: container.clone(),
                    entry: Arc::clone(&entry),
                    pod: index.lookup(&entry.pod_name).cloned(),
                    recorded_at: Arc::clone(&recorded_at),
                    sink: Arc::clone(&self.sink),
                });
                match self.pool.submit(task).await {
                    Ok(()) => summary.pod_documents += 1,
                    Err(error) => {
                        summary.dropped += 1;
                        warn!(pod = %entry.pod_name, error = %error, "Dropped pod report task");
                    }
                }
            }
        }

        for sample in node_metrics {
            let node_name = sample.node_name.clone();
            let task = ReportTask::Node(NodeReportTask {
                sample,
                recorded_at: Arc::clone(&recorded_at),
                sink: Arc::clone(&self.sink),
            });
            match self.pool.submit(task).await {
                Ok(()) => summary.node_documents += 1,
                Err(error) => {
                    summary.dropped += 1;
                    warn!(node = %node_name, error = %error, "Dropped node report task");
                }
            }
        }

        self.pool.drain().await;
        summary
    }

    /// Total tasks refused by the pool since construction.
    pub fn dropped_tasks(&self) -> u64 {
        self.pool.dropped()
    }

    /// Stop accepting work and join the workers. Used at process shutdown;
    /// the steady-state cycle loop never closes the pool.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}
