//! Cluster API access
//!
//! `ClusterSource` is the seam the pipeline consumes: three listing calls
//! returning already-decoded snapshots. `KubeClusterSource` implements it
//! against a live cluster — pods through the typed core API, usage through
//! raw `metrics.k8s.io/v1beta1` requests.

pub mod quantity;

use crate::models::{ContainerMetricSample, NodeMetricSample, PodMetricsEntry, PodSnapshot};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams};
use kube::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Read-only view of the cluster as of call time. Each call may fail;
/// a failure aborts the current collection cycle only.
#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn list_pods(&self) -> Result<Vec<PodSnapshot>>;
    async fn list_pod_metrics(&self) -> Result<Vec<PodMetricsEntry>>;
    async fn list_node_metrics(&self) -> Result<Vec<NodeMetricSample>>;
}

const POD_METRICS_PATH: &str = "/apis/metrics.k8s.io/v1beta1/pods";
const NODE_METRICS_PATH: &str = "/apis/metrics.k8s.io/v1beta1/nodes";

/// Cluster source backed by the Kubernetes API server.
pub struct KubeClusterSource {
    client: Client,
}

impl KubeClusterSource {
    /// Connect using the inferred configuration: kubeconfig when running
    /// outside the cluster, the service account when running inside.
    pub async fn connect() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to build Kubernetes client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get_raw<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let request = http::Request::get(path)
            .body(Vec::new())
            .context("Failed to build metrics API request")?;
        self.client
            .request::<T>(request)
            .await
            .with_context(|| format!("Metrics API request failed: {path}"))
    }
}

#[async_trait]
impl ClusterSource for KubeClusterSource {
    async fn list_pods(&self) -> Result<Vec<PodSnapshot>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let listed = pods
            .list(&ListParams::default())
            .await
            .context("Failed to list pods")?;

        debug!(pods = listed.items.len(), "Listed cluster pods");
        listed.items.into_iter().map(pod_snapshot).collect()
    }

    async fn list_pod_metrics(&self) -> Result<Vec<PodMetricsEntry>> {
        let listed: MetricsList<PodMetricsObject> = self.get_raw(POD_METRICS_PATH).await?;
        Ok(listed.items.into_iter().map(pod_metrics_entry).collect())
    }

    async fn list_node_metrics(&self) -> Result<Vec<NodeMetricSample>> {
        let listed: MetricsList<NodeMetricsObject> = self.get_raw(NODE_METRICS_PATH).await?;
        listed.items.into_iter().map(node_metric_sample).collect()
    }
}

/// Wire shape of a `metrics.k8s.io` list response. Only the fields the
/// agent consumes; absent numeric fields surface as zero downstream.
#[derive(Debug, Deserialize)]
struct MetricsList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PodMetricsObject {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    containers: Vec<ContainerMetricsObject>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetricsObject {
    #[serde(default)]
    name: String,
    #[serde(default)]
    usage: UsageObject,
}

#[derive(Debug, Default, Deserialize)]
struct UsageObject {
    #[serde(default)]
    cpu: String,
    #[serde(default)]
    memory: String,
}

#[derive(Debug, Deserialize)]
struct NodeMetricsObject {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    usage: UsageObject,
}

fn string_map(map: Option<std::collections::BTreeMap<String, String>>) -> HashMap<String, String> {
    map.unwrap_or_default().into_iter().collect()
}

fn pod_snapshot(pod: Pod) -> Result<PodSnapshot> {
    let meta = pod.metadata;
    Ok(PodSnapshot {
        name: meta.name.unwrap_or_default(),
        namespace: meta.namespace.unwrap_or_default(),
        labels: string_map(meta.labels),
        annotations: string_map(meta.annotations),
        // Typed clients leave `kind` unset on listed items.
        kind: "Pod".to_string(),
        spec: pod
            .spec
            .map(serde_json::to_value)
            .transpose()
            .context("Failed to encode pod spec")?
            .unwrap_or(Value::Null),
        status: pod
            .status
            .map(serde_json::to_value)
            .transpose()
            .context("Failed to encode pod status")?
            .unwrap_or(Value::Null),
    })
}

fn pod_metrics_entry(object: PodMetricsObject) -> PodMetricsEntry {
    PodMetricsEntry {
        pod_name: object.metadata.name.unwrap_or_default(),
        namespace: object.metadata.namespace.unwrap_or_default(),
        annotations: string_map(object.metadata.annotations),
        containers: object
            .containers
            .into_iter()
            .map(|container| ContainerMetricSample {
                container_name: container.name,
                cpu_cores: quantity::cpu_cores(&container.usage.cpu),
                memory_bytes: quantity::memory_bytes(&container.usage.memory),
            })
            .collect(),
    }
}

fn node_metric_sample(object: NodeMetricsObject) -> Result<NodeMetricSample> {
    let node_name = object.metadata.name.clone().unwrap_or_default();
    Ok(NodeMetricSample {
        node_name,
        metadata: serde_json::to_value(&object.metadata)
            .context("Failed to encode node metadata")?,
        cpu_cores: quantity::cpu_cores(&object.usage.cpu),
        memory_bytes: quantity::memory_bytes(&object.usage.memory),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pod_metrics_wire_decoding() {
        let raw = json!({
            "kind": "PodMetricsList",
            "items": [{
                "metadata": {
                    "name": "api-abc",
                    "namespace": "prod",
                    "annotations": {"metrics.k8s.io/window": "30s"}
                },
                "containers": [
                    {"name": "c1", "usage": {"cpu": "250m", "memory": "512Mi"}},
                    {"name": "c2", "usage": {}}
                ]
            }]
        });

        let listed: MetricsList<PodMetricsObject> = serde_json::from_value(raw).unwrap();
        let entry = pod_metrics_entry(listed.items.into_iter().next().unwrap());

        assert_eq!(entry.pod_name, "api-abc");
        assert_eq!(entry.namespace, "prod");
        assert_eq!(entry.annotations["metrics.k8s.io/window"], "30s");
        assert_eq!(entry.containers.len(), 2);
        assert_eq!(entry.containers[0].cpu_cores, 0.25);
        assert_eq!(entry.containers[0].memory_bytes, 536_870_912);
        // Missing usage surfaces as zero, never an error.
        assert_eq!(entry.containers[1].cpu_cores, 0.0);
        assert_eq!(entry.containers[1].memory_bytes, 0);
    }

    #[test]
    fn test_node_metrics_wire_decoding() {
        let raw = json!({
            "items": [{
                "metadata": {"name": "n1", "labels": {"zone": "a"}},
                "usage": {"cpu": "2", "memory": "8Gi"}
            }]
        });

        let listed: MetricsList<NodeMetricsObject> = serde_json::from_value(raw).unwrap();
        let sample = node_metric_sample(listed.items.into_iter().next().unwrap()).unwrap();

        assert_eq!(sample.node_name, "n1");
        assert_eq!(sample.cpu_cores, 2.0);
        assert_eq!(sample.memory_bytes, 8_589_934_592);
        assert_eq!(sample.metadata["labels"]["zone"], "a");
    }

    #[test]
    fn test_empty_list_decodes() {
        let listed: MetricsList<PodMetricsObject> = serde_json::from_value(json!({})).unwrap();
        assert!(listed.items.is_empty());
    }
}
