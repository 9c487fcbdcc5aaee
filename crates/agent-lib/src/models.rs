//! Core data models for the monitoring agent
//!
//! All of these are immutable snapshot values: they are constructed fresh
//! from the cluster APIs at the start of a collection cycle and discarded
//! when the cycle ends.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Pod metadata captured from the cluster at snapshot time.
///
/// `spec` and `status` are carried as opaque JSON values; the agent only
/// passes them through into documents and never interprets them beyond the
/// startup-probe redaction applied at serialization time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodSnapshot {
    pub name: String,
    pub namespace: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub kind: String,
    pub spec: Value,
    pub status: Value,
}

/// One metrics-server sample for one pod at scrape time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetricsEntry {
    pub pod_name: String,
    pub namespace: String,
    /// Annotations the metrics API itself attached to the sample. Used as
    /// the document fallback when the owning pod is not in the snapshot.
    pub annotations: HashMap<String, String>,
    pub containers: Vec<ContainerMetricSample>,
}

/// Point-in-time usage gauges for a single container within a pod sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerMetricSample {
    pub container_name: String,
    /// CPU usage in fractional cores, not milli-units.
    pub cpu_cores: f64,
    /// Memory usage in raw bytes.
    pub memory_bytes: u64,
}

/// Point-in-time usage gauges for a cluster node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetricSample {
    pub node_name: String,
    /// Node object metadata as returned by the metrics API, pass-through.
    pub metadata: Value,
    pub cpu_cores: f64,
    pub memory_bytes: u64,
}
