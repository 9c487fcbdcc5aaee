//! Sink-bound document shapes and the transforms that produce them
//!
//! The field names here are the externally observable schema of the agent:
//! dotted `pod.*` keys, an `@timestamp` in RFC 3339, normalized label keys,
//! and a pod spec serialized without container startup probes.

use crate::models::{ContainerMetricSample, NodeMetricSample, PodMetricsEntry, PodSnapshot};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// Rewrite label keys containing a structural separator (dot) into flat,
/// index-safe keys (dash). Values and dot-free keys pass through unchanged.
///
/// Applied to pod labels only; annotations keep their original keys.
pub fn normalize_labels(labels: &HashMap<String, String>) -> HashMap<String, String> {
    labels
        .iter()
        .map(|(key, value)| (key.replace('.', "-"), value.clone()))
        .collect()
}

/// Usage block embedded in a pod document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerUsage {
    #[serde(rename = "containerName")]
    pub container_name: String,
    pub cpu: f64,
    pub memory: u64,
}

/// Usage block embedded in a node document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeUsage {
    pub cpu: f64,
    pub memory: u64,
}

/// One document per (pod metrics entry x container) pair.
#[derive(Debug, Clone, Serialize)]
pub struct PodDocument {
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    #[serde(rename = "pod.name")]
    pub pod_name: String,
    #[serde(rename = "pod.annotations")]
    pub annotations: HashMap<String, String>,
    #[serde(rename = "pod.status")]
    pub status: Value,
    #[serde(rename = "pod.kind")]
    pub kind: String,
    #[serde(rename = "pod.labels")]
    pub labels: HashMap<String, String>,
    #[serde(rename = "pod.namespace")]
    pub namespace: String,
    pub metrics: ContainerUsage,
    pub spec: RedactedPodSpec,
}

/// One document per node metric sample.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDocument {
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    #[serde(rename = "node.name")]
    pub node_name: String,
    #[serde(rename = "node.metadata")]
    pub metadata: Value,
    pub metrics: NodeUsage,
}

/// Serialization view over a pod spec that omits `startupProbe` from every
/// container, independent of whether the source pod declared one. All other
/// container fields, known or not, are preserved as-is.
#[derive(Debug, Clone, Default)]
pub struct RedactedPodSpec(Value);

impl RedactedPodSpec {
    pub fn new(spec: Value) -> Self {
        Self(spec)
    }

    /// The spec as it will appear on the wire.
    pub fn to_value(&self) -> Value {
        let mut spec = self.0.clone();
        if let Some(containers) = spec.get_mut("containers").and_then(Value::as_array_mut) {
            for container in containers {
                if let Some(fields) = container.as_object_mut() {
                    fields.remove("startupProbe");
                }
            }
        }
        spec
    }
}

impl Serialize for RedactedPodSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Join a container metric sample with its (optional) owning pod.
///
/// The metrics block and pod name always come from the sample; when the pod
/// snapshot is present it supplies annotations, status, kind, labels
/// (normalized), namespace and spec. When it is absent the annotations fall
/// back to whatever the metrics API attached and the remaining pod-level
/// fields stay empty.
pub fn to_pod_document(
    container: &ContainerMetricSample,
    entry: &PodMetricsEntry,
    pod: Option<&PodSnapshot>,
    recorded_at: &str,
) -> PodDocument {
    let mut document = PodDocument {
        timestamp: recorded_at.to_string(),
        pod_name: entry.pod_name.clone(),
        annotations: entry.annotations.clone(),
        status: Value::Null,
        kind: String::new(),
        labels: HashMap::new(),
        namespace: String::new(),
        metrics: ContainerUsage {
            container_name: container.container_name.clone(),
            cpu: container.cpu_cores,
            memory: container.memory_bytes,
        },
        spec: RedactedPodSpec::default(),
    };

    if let Some(pod) = pod {
        document.annotations = pod.annotations.clone();
        document.status = pod.status.clone();
        document.kind = pod.kind.clone();
        document.labels = normalize_labels(&pod.labels);
        document.namespace = pod.namespace.clone();
        document.spec = RedactedPodSpec::new(pod.spec.clone());
    }

    document
}

/// Map a node metric sample onto its document. No join involved.
pub fn to_node_document(sample: &NodeMetricSample, recorded_at: &str) -> NodeDocument {
    NodeDocument {
        timestamp: recorded_at.to_string(),
        node_name: sample.node_name.clone(),
        metadata: sample.metadata.clone(),
        metrics: NodeUsage {
            cpu: sample.cpu_cores,
            memory: sample.memory_bytes,
        },
    }
}
