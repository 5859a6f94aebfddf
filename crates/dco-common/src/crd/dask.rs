//! DaskCluster Custom Resource Definition
//!
//! A Dask cluster is one scheduler pod and a set of worker pods that connect
//! to it. Every pod also serves a Bokeh dashboard.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    is_default, ClusterConfig, ClusterDefaults, ClusterStatus, OciImageDefinition, WorkerConfig,
    WorkloadConfig,
};
use super::{DistributedCluster, Framework};

/// Documented Dask ports
pub mod defaults {
    /// Scheduler port workers and clients connect to
    pub const SCHEDULER_PORT: i32 = 8786;
    /// Dashboard port on every pod
    pub const DASHBOARD_PORT: i32 = 8787;
    /// Worker listen port
    pub const WORKER_PORT: i32 = 3000;
    /// Nanny process port
    pub const NANNY_PORT: i32 = 3001;
    /// Default image repository
    pub const IMAGE_REPOSITORY: &str = "daskdev/dask";
    /// Default image tag
    pub const IMAGE_TAG: &str = "2021.6.1";
}

/// Specification for a DaskCluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "distributed-compute.dominodatalab.com",
    version = "v1alpha1",
    kind = "DaskCluster",
    plural = "daskclusters",
    status = "ClusterStatus",
    namespaced,
    derive = "PartialEq",
    scale = r#"{"specReplicasPath":".spec.worker.replicas","statusReplicasPath":".status.workerReplicas","labelSelectorPath":".status.workerSelector"}"#,
    printcolumn = r#"{"name":"Workers","type":"integer","jsonPath":".spec.worker.replicas"}"#,
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image.tag"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DaskClusterSpec {
    /// Settings shared with the other cluster kinds
    #[serde(flatten)]
    pub cluster: ClusterConfig,

    /// Scheduler port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_port: Option<i32>,

    /// Dashboard port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_port: Option<i32>,

    /// Worker listen port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_port: Option<i32>,

    /// Nanny port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nanny_port: Option<i32>,

    /// Scheduler pod settings
    #[serde(default, skip_serializing_if = "is_default")]
    pub scheduler: WorkloadConfig,

    /// Worker settings
    #[serde(default, skip_serializing_if = "is_default")]
    pub worker: WorkerConfig,
}

impl DaskClusterSpec {
    /// Scheduler port
    pub fn scheduler_port(&self) -> i32 {
        self.scheduler_port.unwrap_or(defaults::SCHEDULER_PORT)
    }

    /// Dashboard port
    pub fn dashboard_port(&self) -> i32 {
        self.dashboard_port.unwrap_or(defaults::DASHBOARD_PORT)
    }

    /// Worker port
    pub fn worker_port(&self) -> i32 {
        self.worker_port.unwrap_or(defaults::WORKER_PORT)
    }

    /// Nanny port
    pub fn nanny_port(&self) -> i32 {
        self.nanny_port.unwrap_or(defaults::NANNY_PORT)
    }
}

impl DistributedCluster for DaskCluster {
    const FRAMEWORK: Framework = Framework::Dask;

    fn cluster_config(&self) -> &ClusterConfig {
        &self.spec.cluster
    }

    fn worker_config(&self) -> &WorkerConfig {
        &self.spec.worker
    }

    fn head_config(&self) -> &WorkloadConfig {
        &self.spec.scheduler
    }
}

/// Values admission defaulting substitutes for unset DaskCluster fields
#[derive(Clone, Debug, PartialEq)]
pub struct DaskDefaults {
    /// Image, worker replicas and network policy defaults
    pub cluster: ClusterDefaults,
    /// Scheduler port
    pub scheduler_port: i32,
    /// Dashboard port
    pub dashboard_port: i32,
    /// Worker port
    pub worker_port: i32,
    /// Nanny port
    pub nanny_port: i32,
}

impl Default for DaskDefaults {
    fn default() -> Self {
        Self {
            cluster: ClusterDefaults::new(
                OciImageDefinition::new(defaults::IMAGE_REPOSITORY, defaults::IMAGE_TAG),
                Framework::Dask.default_access_labels(),
            ),
            scheduler_port: defaults::SCHEDULER_PORT,
            dashboard_port: defaults::DASHBOARD_PORT,
            worker_port: defaults::WORKER_PORT,
            nanny_port: defaults::NANNY_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn story_crd_serves_daskclusters() {
        let crd = DaskCluster::crd();
        assert_eq!(crd.spec.names.plural, "daskclusters");
        assert_eq!(crd.spec.scope, "Namespaced");
    }

    #[test]
    fn story_unset_ports_fall_back_to_dask_defaults() {
        let spec = DaskClusterSpec::default();
        assert_eq!(spec.scheduler_port(), 8786);
        assert_eq!(spec.dashboard_port(), 8787);
        assert_eq!(spec.worker_port(), 3000);
        assert_eq!(spec.nanny_port(), 3001);
    }

    #[test]
    fn story_scheduler_settings_parse_under_scheduler_key() {
        let spec: DaskClusterSpec = serde_json::from_value(serde_json::json!({
            "schedulerPort": 9000,
            "scheduler": {"nodeSelector": {"pool": "cpu"}}
        }))
        .unwrap();

        assert_eq!(spec.scheduler_port(), 9000);
        assert_eq!(
            spec.scheduler.node_selector.get("pool").map(String::as_str),
            Some("cpu")
        );
    }
}
