//! Service synthesis
//!
//! The coordinating role is reached through a regular ClusterIP service;
//! workers get a headless service so each pod has a stable DNS name.

use dco_common::crd::DistributedCluster;
use dco_common::metadata::{
    instance_name, match_labels_with_component, standard_labels_with_component,
};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::meta::object_meta;
use crate::strategy::RoleStrategy;

/// How a role's service is exposed inside the cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceExposure {
    /// Virtual IP load-balancing across the role's pods
    ClusterIp,
    /// No virtual IP; DNS resolves to the pod addresses
    Headless,
}

/// Build the service fronting one role
///
/// Service ports mirror the role's container ports and target them by name.
pub fn build_service<C, S>(cluster: &C, strategy: &S, exposure: ServiceExposure) -> Service
where
    C: DistributedCluster,
    S: RoleStrategy + ?Sized,
{
    let component = strategy.component();
    let ports = strategy
        .container_ports()
        .into_iter()
        .map(|port| ServicePort {
            target_port: Some(match &port.name {
                Some(name) => IntOrString::String(name.clone()),
                None => IntOrString::Int(port.container_port),
            }),
            name: port.name,
            port: port.container_port,
            protocol: port.protocol,
            ..Default::default()
        })
        .collect();

    Service {
        metadata: object_meta(
            cluster,
            instance_name(cluster, component),
            standard_labels_with_component(cluster, component),
        ),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            cluster_ip: match exposure {
                ServiceExposure::ClusterIp => None,
                ServiceExposure::Headless => Some("None".to_string()),
            },
            selector: Some(match_labels_with_component(cluster, component)),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    }
}
