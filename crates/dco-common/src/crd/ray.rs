//! RayCluster Custom Resource Definition
//!
//! A Ray cluster is one head pod running the control plane (GCS, redis
//! shards, client server, dashboard) and a set of worker pods joining it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    is_default, ClusterConfig, ClusterDefaults, ClusterStatus, OciImageDefinition, WorkerConfig,
    WorkloadConfig,
};
use super::{DistributedCluster, Framework};

/// Documented Ray ports and limits
pub mod defaults {
    /// GCS / redis port on the head
    pub const PORT: i32 = 6379;
    /// Redis shard ports on the head
    pub const REDIS_SHARD_PORTS: [i32; 2] = [6380, 6381];
    /// Ray client server port
    pub const CLIENT_SERVER_PORT: i32 = 10001;
    /// Object manager port
    pub const OBJECT_MANAGER_PORT: i32 = 2384;
    /// Node manager port
    pub const NODE_MANAGER_PORT: i32 = 2385;
    /// GCS server port
    pub const GCS_SERVER_PORT: i32 = 2386;
    /// Dashboard port
    pub const DASHBOARD_PORT: i32 = 8265;
    /// Dashboard toggle
    pub const ENABLE_DASHBOARD: bool = true;
    /// Smallest object store Ray starts with (75 MiB)
    pub const MIN_OBJECT_STORE_MEMORY_BYTES: i64 = 78_643_200;
    /// Default image repository
    pub const IMAGE_REPOSITORY: &str = "rayproject/ray";
    /// Default image tag
    pub const IMAGE_TAG: &str = "1.3.0-cpu";
}

/// Specification for a RayCluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "distributed-compute.dominodatalab.com",
    version = "v1alpha1",
    kind = "RayCluster",
    plural = "rayclusters",
    status = "ClusterStatus",
    namespaced,
    derive = "PartialEq",
    scale = r#"{"specReplicasPath":".spec.worker.replicas","statusReplicasPath":".status.workerReplicas","labelSelectorPath":".status.workerSelector"}"#,
    printcolumn = r#"{"name":"Workers","type":"integer","jsonPath":".spec.worker.replicas"}"#,
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image.tag"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RayClusterSpec {
    /// Settings shared with the other cluster kinds
    #[serde(flatten)]
    pub cluster: ClusterConfig,

    /// GCS / redis port on the head
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    /// Redis shard ports on the head
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_shard_ports: Option<Vec<i32>>,

    /// Port of the Ray client server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_server_port: Option<i32>,

    /// Object manager port on every node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_manager_port: Option<i32>,

    /// Node manager port on every node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_manager_port: Option<i32>,

    /// GCS server port on the head
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs_server_port: Option<i32>,

    /// Explicit worker process ports; Ray picks random ones when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worker_ports: Vec<i32>,

    /// Dashboard port on the head
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_port: Option<i32>,

    /// Whether the head serves the dashboard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_dashboard: Option<bool>,

    /// Object store size per node; Ray sizes it itself when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_store_memory_bytes: Option<i64>,

    /// Head pod settings
    #[serde(default, skip_serializing_if = "is_default")]
    pub head: WorkloadConfig,

    /// Worker settings
    #[serde(default, skip_serializing_if = "is_default")]
    pub worker: WorkerConfig,
}

impl RayClusterSpec {
    /// GCS / redis port
    pub fn port(&self) -> i32 {
        self.port.unwrap_or(defaults::PORT)
    }

    /// Redis shard ports
    pub fn redis_shard_ports(&self) -> Vec<i32> {
        self.redis_shard_ports
            .clone()
            .unwrap_or_else(|| defaults::REDIS_SHARD_PORTS.to_vec())
    }

    /// Client server port
    pub fn client_server_port(&self) -> i32 {
        self.client_server_port
            .unwrap_or(defaults::CLIENT_SERVER_PORT)
    }

    /// Object manager port
    pub fn object_manager_port(&self) -> i32 {
        self.object_manager_port
            .unwrap_or(defaults::OBJECT_MANAGER_PORT)
    }

    /// Node manager port
    pub fn node_manager_port(&self) -> i32 {
        self.node_manager_port.unwrap_or(defaults::NODE_MANAGER_PORT)
    }

    /// GCS server port
    pub fn gcs_server_port(&self) -> i32 {
        self.gcs_server_port.unwrap_or(defaults::GCS_SERVER_PORT)
    }

    /// Dashboard port
    pub fn dashboard_port(&self) -> i32 {
        self.dashboard_port.unwrap_or(defaults::DASHBOARD_PORT)
    }

    /// Whether the dashboard is served
    pub fn dashboard_enabled(&self) -> bool {
        self.enable_dashboard.unwrap_or(defaults::ENABLE_DASHBOARD)
    }
}

impl DistributedCluster for RayCluster {
    const FRAMEWORK: Framework = Framework::Ray;

    fn cluster_config(&self) -> &ClusterConfig {
        &self.spec.cluster
    }

    fn worker_config(&self) -> &WorkerConfig {
        &self.spec.worker
    }

    fn head_config(&self) -> &WorkloadConfig {
        &self.spec.head
    }
}

/// Values admission defaulting substitutes for unset RayCluster fields
#[derive(Clone, Debug, PartialEq)]
pub struct RayDefaults {
    /// Image, worker replicas and network policy defaults
    pub cluster: ClusterDefaults,
    /// GCS / redis port
    pub port: i32,
    /// Redis shard ports
    pub redis_shard_ports: Vec<i32>,
    /// Client server port
    pub client_server_port: i32,
    /// Object manager port
    pub object_manager_port: i32,
    /// Node manager port
    pub node_manager_port: i32,
    /// GCS server port
    pub gcs_server_port: i32,
    /// Dashboard port
    pub dashboard_port: i32,
    /// Dashboard toggle
    pub enable_dashboard: bool,
}

impl Default for RayDefaults {
    fn default() -> Self {
        Self {
            cluster: ClusterDefaults::new(
                OciImageDefinition::new(defaults::IMAGE_REPOSITORY, defaults::IMAGE_TAG),
                Framework::Ray.default_access_labels(),
            ),
            port: defaults::PORT,
            redis_shard_ports: defaults::REDIS_SHARD_PORTS.to_vec(),
            client_server_port: defaults::CLIENT_SERVER_PORT,
            object_manager_port: defaults::OBJECT_MANAGER_PORT,
            node_manager_port: defaults::NODE_MANAGER_PORT,
            gcs_server_port: defaults::GCS_SERVER_PORT,
            dashboard_port: defaults::DASHBOARD_PORT,
            enable_dashboard: defaults::ENABLE_DASHBOARD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn story_crd_is_namespaced_in_the_distributed_compute_group() {
        let crd = RayCluster::crd();
        assert_eq!(crd.spec.group, "distributed-compute.dominodatalab.com");
        assert_eq!(crd.spec.names.kind, "RayCluster");
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.versions[0].name, "v1alpha1");
    }

    #[test]
    fn story_unset_ports_fall_back_to_ray_defaults() {
        let spec = RayClusterSpec::default();
        assert_eq!(spec.port(), 6379);
        assert_eq!(spec.redis_shard_ports(), vec![6380, 6381]);
        assert_eq!(spec.client_server_port(), 10001);
        assert_eq!(spec.gcs_server_port(), 2386);
        assert_eq!(spec.dashboard_port(), 8265);
        assert!(spec.dashboard_enabled());
    }

    #[test]
    fn story_spec_parses_from_manifest_json() {
        let spec: RayClusterSpec = serde_json::from_value(serde_json::json!({
            "image": {"repository": "rayproject/ray", "tag": "1.3.0-cpu"},
            "port": 7000,
            "redisShardPorts": [],
            "enableDashboard": false,
            "objectStoreMemoryBytes": 100000000,
            "worker": {"replicas": 2}
        }))
        .unwrap();

        assert_eq!(spec.port(), 7000);
        assert!(spec.redis_shard_ports().is_empty());
        assert!(!spec.dashboard_enabled());
        assert_eq!(spec.object_store_memory_bytes, Some(100_000_000));
        assert_eq!(spec.worker.replicas, Some(2));
    }

    #[test]
    fn story_default_values_match_documented_ray_settings() {
        let defaults = RayDefaults::default();
        assert_eq!(defaults.cluster.image.to_string(), "rayproject/ray:1.3.0-cpu");
        assert_eq!(defaults.cluster.worker_replicas, 1);
        assert!(defaults.cluster.enable_network_policy);
        assert!(defaults.cluster.network_policy_labels.contains_key("ray-client"));
    }
}
