//! Custom Resource Definitions for distributed-compute clusters
//!
//! One CRD per framework. Every spec flattens the shared [`ClusterConfig`] and
//! carries a head-like role plus a [`WorkerConfig`].

mod dask;
mod ray;
mod spark;
mod types;

use std::collections::BTreeMap;
use std::fmt;

pub use dask::{DaskCluster, DaskClusterSpec, DaskDefaults};
pub use ray::{RayCluster, RayClusterSpec, RayDefaults};
pub use spark::{SparkCluster, SparkClusterSpec, SparkDefaults};
pub use types::{
    AdditionalStorage, Autoscaling, ClusterConfig, ClusterDefaults, ClusterStatus,
    NetworkPolicyConfig, OciImageDefinition, WorkerConfig, WorkloadConfig,
    DEFAULT_NETWORK_POLICY_ENABLED, DEFAULT_WORKER_REPLICAS, ISTIO_MUTUAL_TLS_MODES,
};

/// Framework-specific ports and defaults
pub mod defaults {
    pub use super::dask::defaults as dask;
    pub use super::ray::defaults as ray;
    pub use super::spark::defaults as spark;
}

use crate::metadata::Component;

/// Distributed-compute framework a cluster kind runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Framework {
    /// Ray: head plus workers
    Ray,
    /// Dask: scheduler plus workers
    Dask,
    /// Spark standalone: master plus workers
    Spark,
}

impl Framework {
    /// Application name used in object names and the `app.kubernetes.io/name` label
    pub fn application_name(&self) -> &'static str {
        match self {
            Self::Ray => "ray",
            Self::Dask => "dask",
            Self::Spark => "spark",
        }
    }

    /// Component of the coordinating role
    pub fn head_component(&self) -> Component {
        match self {
            Self::Ray => Component::Head,
            Self::Dask => Component::Scheduler,
            Self::Spark => Component::Master,
        }
    }

    /// HTTP path served on the dashboard port that answers health checks
    pub fn health_check_path(&self) -> &'static str {
        match self {
            Self::Dask => "/health",
            Self::Ray | Self::Spark => "/",
        }
    }

    /// Labels a client pod must carry to reach the cluster when none are configured
    pub fn default_access_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(
            format!("{}-client", self.application_name()),
            "true".to_string(),
        )])
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.application_name())
    }
}

/// Common view over the cluster kinds
///
/// Naming, labeling and the generic builders only need the framework, the
/// shared configuration and the worker settings.
pub trait DistributedCluster: kube::Resource<DynamicType = ()> {
    /// Framework this kind runs
    const FRAMEWORK: Framework;

    /// Shared configuration
    fn cluster_config(&self) -> &ClusterConfig;

    /// Worker role settings
    fn worker_config(&self) -> &WorkerConfig;

    /// Settings of the coordinating role
    fn head_config(&self) -> &WorkloadConfig;

    /// Client access labels, falling back to the framework default
    fn client_server_labels(&self) -> BTreeMap<String, String> {
        self.cluster_config()
            .network_policy
            .client_server_labels
            .clone()
            .unwrap_or_else(|| Self::FRAMEWORK.default_access_labels())
    }

    /// Dashboard access labels, falling back to the framework default
    fn dashboard_labels(&self) -> BTreeMap<String, String> {
        self.cluster_config()
            .network_policy
            .dashboard_labels
            .clone()
            .unwrap_or_else(|| Self::FRAMEWORK.default_access_labels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_each_framework_names_its_coordinator() {
        assert_eq!(Framework::Ray.head_component(), Component::Head);
        assert_eq!(Framework::Dask.head_component(), Component::Scheduler);
        assert_eq!(Framework::Spark.head_component(), Component::Master);
    }

    #[test]
    fn story_default_access_labels_follow_application_name() {
        let labels = Framework::Dask.default_access_labels();
        assert_eq!(labels.get("dask-client").map(String::as_str), Some("true"));
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn story_only_dask_serves_a_dedicated_health_path() {
        assert_eq!(Framework::Dask.health_check_path(), "/health");
        assert_eq!(Framework::Ray.health_check_path(), "/");
        assert_eq!(Framework::Spark.to_string(), "spark");
    }
}
