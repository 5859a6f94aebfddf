//! Configuration blocks shared by every cluster kind

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::{
    Affinity, Container, EnvVar, LocalObjectReference, PodSecurityContext, ResourceRequirements,
    Toleration, Volume, VolumeMount,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Worker replica count used when the cluster leaves it unset
pub const DEFAULT_WORKER_REPLICAS: i32 = 1;

/// Network policies are synthesized unless explicitly disabled
pub const DEFAULT_NETWORK_POLICY_ENABLED: bool = true;

/// Istio mutual TLS modes accepted for `istioMutualTLSMode`, sorted
pub const ISTIO_MUTUAL_TLS_MODES: [&str; 4] = ["DISABLE", "PERMISSIVE", "STRICT", "UNSET"];

/// Serde predicate skipping blocks the user never filled in
pub(crate) fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

// =============================================================================
// Image
// =============================================================================

/// Container image split into registry, repository and tag
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OciImageDefinition {
    /// Registry host with optional port; Docker Hub when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Repository path, e.g. `rayproject/ray`
    #[serde(default)]
    pub repository: String,

    /// Image tag
    #[serde(default)]
    pub tag: String,

    /// Kubernetes image pull policy (`Always`, `IfNotPresent`, `Never`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_policy: Option<String>,
}

impl OciImageDefinition {
    /// Image on the default registry with no pull policy
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            registry: None,
            repository: repository.into(),
            tag: tag.into(),
            pull_policy: None,
        }
    }
}

impl fmt::Display for OciImageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{registry}/")?;
        }
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

// =============================================================================
// Cluster-wide configuration
// =============================================================================

/// Horizontal autoscaling bounds for the worker role
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Autoscaling {
    /// Lower replica bound; the autoscaler defaults it to 1 when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    /// Upper replica bound
    pub max_replicas: i32,

    /// Target average CPU utilization across workers, in percent
    #[serde(
        rename = "averageCPUUtilization",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub average_cpu_utilization: Option<i32>,

    /// How long the autoscaler waits before acting on a lower recommendation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_down_stabilization_window_seconds: Option<i32>,
}

/// Network isolation settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyConfig {
    /// Whether network policies are synthesized at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Labels of client pods allowed to reach the head's client ports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_server_labels: Option<BTreeMap<String, String>>,

    /// Labels of pods allowed to reach the dashboard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_labels: Option<BTreeMap<String, String>>,
}

impl NetworkPolicyConfig {
    /// Whether policies should be built, treating unset as enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(DEFAULT_NETWORK_POLICY_ENABLED)
    }
}

/// Settings shared by every role of a cluster, flattened into each spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Image run by every role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<OciImageDefinition>,

    /// Pull secrets copied into every pod
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,

    /// Worker autoscaling; no autoscaler is built when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<Autoscaling>,

    /// Network isolation
    #[serde(default, skip_serializing_if = "is_default")]
    pub network_policy: NetworkPolicyConfig,

    /// Pod security context copied into every pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security_context: Option<PodSecurityContext>,

    /// Existing service account to run pods as; one is created when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// Extra environment appended to every container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<EnvVar>,

    /// Istio mutual TLS mode, one of [`ISTIO_MUTUAL_TLS_MODES`]
    #[serde(
        rename = "istioMutualTLSMode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub istio_mutual_tls_mode: Option<String>,
}

// =============================================================================
// Role configuration
// =============================================================================

/// Extra persistent storage mounted into every pod of a role
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalStorage {
    /// Claim template name; the volume is mounted at `/mnt/<name>`
    pub name: String,

    /// Access modes, `ReadWriteOnce` when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<String>,

    /// Requested size as a Kubernetes quantity, e.g. `10Gi`
    pub size: String,

    /// Storage class; the cluster default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl AdditionalStorage {
    /// Path the volume is mounted at inside the container
    pub fn mount_path(&self) -> String {
        format!("/mnt/{}", self.name)
    }
}

/// Pod-level settings for one role
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadConfig {
    /// Extra pod labels; standard labels win on collision
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Pod annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Node selector
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Scheduling affinity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,

    /// Tolerations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    /// Init containers run before the main container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<Container>,

    /// Additional pod volumes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,

    /// Mounts into the main container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,

    /// Requests and limits of the main container
    #[serde(default, skip_serializing_if = "is_default")]
    pub resources: ResourceRequirements,

    /// Persistent storage rendered as volume claim templates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_storage: Vec<AdditionalStorage>,
}

/// Worker role settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    /// Pod-level settings
    #[serde(flatten)]
    pub workload: WorkloadConfig,

    /// Number of worker pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

impl WorkerConfig {
    /// Replica count, treating unset as the default
    pub fn replicas(&self) -> i32 {
        self.replicas.unwrap_or(DEFAULT_WORKER_REPLICAS)
    }

    /// Whether the worker container requests any CPU
    pub fn requests_cpu(&self) -> bool {
        self.workload
            .resources
            .requests
            .as_ref()
            .is_some_and(|requests| requests.contains_key("cpu"))
    }
}

// =============================================================================
// Defaults and status
// =============================================================================

/// Defaults every framework applies to [`ClusterConfig`] and its worker
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterDefaults {
    /// Image used when none is given
    pub image: OciImageDefinition,
    /// Worker replica count
    pub worker_replicas: i32,
    /// Network policy toggle
    pub enable_network_policy: bool,
    /// Client and dashboard access labels
    pub network_policy_labels: BTreeMap<String, String>,
}

impl ClusterDefaults {
    /// Framework defaults with the given image and access labels
    pub fn new(image: OciImageDefinition, network_policy_labels: BTreeMap<String, String>) -> Self {
        Self {
            image,
            worker_replicas: DEFAULT_WORKER_REPLICAS,
            enable_network_policy: DEFAULT_NETWORK_POLICY_ENABLED,
            network_policy_labels,
        }
    }
}

/// Observed state shared by every cluster kind
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Names of the pods that make up the cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,

    /// Observed worker replica count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_replicas: Option<i32>,

    /// Label selector of the worker pods, for the scale subresource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_selector: Option<String>,
}
