//! SparkCluster Custom Resource Definition
//!
//! A Spark standalone cluster: one master and a set of workers registering
//! with it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    is_default, ClusterConfig, ClusterDefaults, ClusterStatus, OciImageDefinition, WorkerConfig,
    WorkloadConfig,
};
use super::{DistributedCluster, Framework};

/// Documented Spark ports
pub mod defaults {
    /// Master port workers and drivers connect to
    pub const CLUSTER_PORT: i32 = 7077;
    /// Web UI port on every pod
    pub const DASHBOARD_PORT: i32 = 8080;
    /// Dashboard toggle
    pub const ENABLE_DASHBOARD: bool = true;
    /// Default image repository
    pub const IMAGE_REPOSITORY: &str = "bitnami/spark";
    /// Default image tag
    pub const IMAGE_TAG: &str = "3.0.2-debian-10-r0";
}

/// Specification for a SparkCluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "distributed-compute.dominodatalab.com",
    version = "v1alpha1",
    kind = "SparkCluster",
    plural = "sparkclusters",
    status = "ClusterStatus",
    namespaced,
    derive = "PartialEq",
    scale = r#"{"specReplicasPath":".spec.worker.replicas","statusReplicasPath":".status.workerReplicas","labelSelectorPath":".status.workerSelector"}"#,
    printcolumn = r#"{"name":"Workers","type":"integer","jsonPath":".spec.worker.replicas"}"#,
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image.tag"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SparkClusterSpec {
    /// Settings shared with the other cluster kinds
    #[serde(flatten)]
    pub cluster: ClusterConfig,

    /// Master port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_port: Option<i32>,

    /// Web UI port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_port: Option<i32>,

    /// Whether the web UI is exposed to dashboard users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_dashboard: Option<bool>,

    /// Master pod settings, stored under `head` like the other kinds
    #[serde(rename = "head", default, skip_serializing_if = "is_default")]
    pub master: WorkloadConfig,

    /// Worker settings
    #[serde(default, skip_serializing_if = "is_default")]
    pub worker: WorkerConfig,
}

impl SparkClusterSpec {
    /// Master port
    pub fn cluster_port(&self) -> i32 {
        self.cluster_port.unwrap_or(defaults::CLUSTER_PORT)
    }

    /// Web UI port
    pub fn dashboard_port(&self) -> i32 {
        self.dashboard_port.unwrap_or(defaults::DASHBOARD_PORT)
    }

    /// Whether the web UI is exposed
    pub fn dashboard_enabled(&self) -> bool {
        self.enable_dashboard.unwrap_or(defaults::ENABLE_DASHBOARD)
    }
}

impl DistributedCluster for SparkCluster {
    const FRAMEWORK: Framework = Framework::Spark;

    fn cluster_config(&self) -> &ClusterConfig {
        &self.spec.cluster
    }

    fn worker_config(&self) -> &WorkerConfig {
        &self.spec.worker
    }

    fn head_config(&self) -> &WorkloadConfig {
        &self.spec.master
    }
}

/// Values admission defaulting substitutes for unset SparkCluster fields
#[derive(Clone, Debug, PartialEq)]
pub struct SparkDefaults {
    /// Image, worker replicas and network policy defaults
    pub cluster: ClusterDefaults,
    /// Master port
    pub cluster_port: i32,
    /// Web UI port
    pub dashboard_port: i32,
    /// Dashboard toggle
    pub enable_dashboard: bool,
}

impl Default for SparkDefaults {
    fn default() -> Self {
        Self {
            cluster: ClusterDefaults::new(
                OciImageDefinition::new(defaults::IMAGE_REPOSITORY, defaults::IMAGE_TAG),
                Framework::Spark.default_access_labels(),
            ),
            cluster_port: defaults::CLUSTER_PORT,
            dashboard_port: defaults::DASHBOARD_PORT,
            enable_dashboard: defaults::ENABLE_DASHBOARD,
        }
    }
}
