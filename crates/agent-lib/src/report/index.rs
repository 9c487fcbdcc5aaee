//! Per-cycle pod lookup index

use crate::models::PodSnapshot;
use std::collections::HashMap;

/// Lookup table from pod name to its snapshot, built once per collection
/// cycle and read-only for the remainder of the cycle.
#[derive(Debug, Default)]
pub struct PodIndex {
    pods: HashMap<String, PodSnapshot>,
}

impl PodIndex {
    /// Build the index from a pod snapshot list.
    ///
    /// Duplicate names should not occur in a single all-namespaces listing,
    /// but are not structurally prevented; the last entry wins.
    pub fn build(pods: impl IntoIterator<Item = PodSnapshot>) -> Self {
        let pods = pods
            .into_iter()
            .map(|pod| (pod.name.clone(), pod))
            .collect();
        Self { pods }
    }

    /// Resolve a pod by exact name match. A miss is a normal outcome.
    pub fn lookup(&self, name: &str) -> Option<&PodSnapshot> {
        self.pods.get(name)
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::HashMap;

    fn pod(name: &str, namespace: &str) -> PodSnapshot {
        PodSnapshot {
            name: name.to_string(),
            namespace: namespace.to_string(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
            kind: "Pod".to_string(),
            spec: Value::Null,
            status: Value::Null,
        }
    }

    #[test]
    fn test_lookup_returns_inserted_pod() {
        let index = PodIndex::build(vec![pod("api", "prod"), pod("worker", "batch")]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup("api").unwrap().namespace, "prod");
        assert_eq!(index.lookup("worker").unwrap().namespace, "batch");
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let index = PodIndex::build(vec![pod("api", "prod")]);

        assert!(index.lookup("missing").is_none());
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let index = PodIndex::build(vec![pod("api", "old"), pod("api", "new")]);

        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("api").unwrap().namespace, "new");
    }

    #[test]
    fn test_empty_input() {
        let index = PodIndex::build(vec![]);

        assert!(index.is_empty());
        assert!(index.lookup("anything").is_none());
    }
}
