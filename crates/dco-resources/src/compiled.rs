//! Full object graph of one cluster

use dco_common::crd::DistributedCluster;
use dco_common::{Error, Result};
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::ResourceExt;
use serde::Serialize;
use tracing::debug;

use crate::autoscaler::build_autoscaler;
use crate::network_policy::{
    build_access_policy, build_cluster_policy, CLIENT_POLICY_PURPOSE, DASHBOARD_POLICY_PURPOSE,
};
use crate::service::{build_service, ServiceExposure};
use crate::service_account::build_service_account;
use crate::statefulset::build_stateful_set;
use crate::strategy::RoleStrategy;

/// Every object derived from a cluster
///
/// Coordinating role first, workers second within each kind.
#[derive(Clone, Debug, Default)]
pub struct ClusterResources {
    /// Dedicated service account, absent when the cluster names one
    pub service_account: Option<ServiceAccount>,
    /// One StatefulSet per role
    pub stateful_sets: Vec<StatefulSet>,
    /// One service per role
    pub services: Vec<Service>,
    /// Isolation policies, empty when network policies are disabled
    pub network_policies: Vec<NetworkPolicy>,
    /// Worker autoscaler, present only when autoscaling is configured
    pub autoscaler: Option<HorizontalPodAutoscaler>,
}

impl ClusterResources {
    /// Check if any objects were derived
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of derived objects
    pub fn len(&self) -> usize {
        usize::from(self.service_account.is_some())
            + self.stateful_sets.len()
            + self.services.len()
            + self.network_policies.len()
            + usize::from(self.autoscaler.is_some())
    }

    /// Serialize every object in apply order
    ///
    /// Service account, services, StatefulSets, network policies, autoscaler.
    pub fn to_manifests(&self) -> Result<Vec<serde_json::Value>> {
        let mut manifests = Vec::with_capacity(self.len());
        if let Some(account) = &self.service_account {
            manifests.push(to_manifest(account, "ServiceAccount")?);
        }
        for service in &self.services {
            manifests.push(to_manifest(service, "Service")?);
        }
        for sts in &self.stateful_sets {
            manifests.push(to_manifest(sts, "StatefulSet")?);
        }
        for policy in &self.network_policies {
            manifests.push(to_manifest(policy, "NetworkPolicy")?);
        }
        if let Some(hpa) = &self.autoscaler {
            manifests.push(to_manifest(hpa, "HorizontalPodAutoscaler")?);
        }
        Ok(manifests)
    }
}

fn to_manifest<T: Serialize>(object: &T, kind: &str) -> Result<serde_json::Value> {
    serde_json::to_value(object).map_err(|e| Error::serialization_for_kind(kind, e.to_string()))
}

/// Ports the head role opens to outside clients
pub(crate) struct Access {
    /// Ports reachable by pods carrying the client labels
    pub client_ports: Vec<i32>,
    /// Dashboard port, `None` when the dashboard is disabled
    pub dashboard_port: Option<i32>,
}

/// Derive the object graph from a head strategy and a worker strategy
pub(crate) fn compile_cluster<C, H, W>(
    cluster: &C,
    head: &H,
    worker: &W,
    access: Access,
) -> Result<ClusterResources>
where
    C: DistributedCluster,
    H: RoleStrategy,
    W: RoleStrategy,
{
    let name = cluster.name_any();
    let config = cluster.cluster_config();

    let mut resources = ClusterResources {
        service_account: build_service_account(cluster),
        stateful_sets: vec![
            build_stateful_set(cluster, head)?,
            build_stateful_set(cluster, worker)?,
        ],
        services: vec![
            build_service(cluster, head, ServiceExposure::ClusterIp),
            build_service(cluster, worker, ServiceExposure::Headless),
        ],
        ..Default::default()
    };

    if config.network_policy.is_enabled() {
        let head_component = C::FRAMEWORK.head_component();
        resources.network_policies.push(build_cluster_policy(cluster));
        resources.network_policies.push(build_access_policy(
            cluster,
            head_component,
            CLIENT_POLICY_PURPOSE,
            cluster.client_server_labels(),
            &access.client_ports,
        ));
        if let Some(port) = access.dashboard_port {
            resources.network_policies.push(build_access_policy(
                cluster,
                head_component,
                DASHBOARD_POLICY_PURPOSE,
                cluster.dashboard_labels(),
                &[port],
            ));
        }
    }

    if let Some(autoscaling) = &config.autoscaling {
        resources.autoscaler = Some(build_autoscaler(cluster, worker, autoscaling));
    }

    debug!(
        cluster = %name,
        framework = %C::FRAMEWORK,
        objects = resources.len(),
        network_policies = resources.network_policies.len(),
        autoscaled = resources.autoscaler.is_some(),
        "compiled cluster resources"
    );

    Ok(resources)
}
