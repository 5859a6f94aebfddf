//! Per-role configuration consumed by the generic builders
//!
//! A framework describes each of its roles (head, scheduler, master, worker)
//! by implementing [`RoleStrategy`]. The builders never look at
//! framework-specific fields directly.

use dco_common::crd::WorkloadConfig;
use dco_common::metadata::Component;
use k8s_openapi::api::core::v1::{
    ContainerPort, EnvVar, EnvVarSource, ObjectFieldSelector, ResourceFieldSelector,
};

/// Name of the port serving the dashboard and health checks
pub const DASHBOARD_PORT_NAME: &str = "dashboard";

/// How one role of a cluster runs
pub trait RoleStrategy {
    /// Role this strategy configures
    fn component(&self) -> Component;

    /// Pod-level settings from the cluster spec
    fn pod_config(&self) -> &WorkloadConfig;

    /// Desired pod count
    fn replicas(&self) -> i32;

    /// Container entrypoint
    fn command(&self) -> Vec<String>;

    /// Container arguments
    fn command_args(&self) -> Vec<String>;

    /// Role-specific environment, placed before the cluster-wide variables
    fn container_env(&self) -> Vec<EnvVar>;

    /// Named container ports
    fn container_ports(&self) -> Vec<ContainerPort>;

    /// Whether the role serves a port named [`DASHBOARD_PORT_NAME`]
    fn exposes_dashboard(&self) -> bool {
        self.container_ports()
            .iter()
            .any(|port| port.name.as_deref() == Some(DASHBOARD_PORT_NAME))
    }
}

/// TCP container port with a name
pub fn named_port(name: impl Into<String>, port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.into()),
        container_port: port,
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

/// Environment variable read from a pod field, e.g. `status.podIP`
pub fn field_env(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: None,
                field_path: field_path.to_string(),
            }),
            ..Default::default()
        }),
    }
}

/// Environment variable read from the container's resources, e.g. `requests.cpu`
pub fn resource_env(name: &str, resource: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            resource_field_ref: Some(ResourceFieldSelector {
                container_name: None,
                divisor: None,
                resource: resource.to_string(),
            }),
            ..Default::default()
        }),
    }
}

/// Pod's own name, used by workers to identify themselves
pub fn pod_name_env() -> EnvVar {
    field_env("MY_POD_NAME", "metadata.name")
}

/// Join ports for comma-separated command line flags
pub(crate) fn join_ports(ports: &[i32]) -> String {
    ports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<ContainerPort>, WorkloadConfig);

    impl RoleStrategy for Fixed {
        fn component(&self) -> Component {
            Component::Worker
        }
        fn pod_config(&self) -> &WorkloadConfig {
            &self.1
        }
        fn replicas(&self) -> i32 {
            1
        }
        fn command(&self) -> Vec<String> {
            vec![]
        }
        fn command_args(&self) -> Vec<String> {
            vec![]
        }
        fn container_env(&self) -> Vec<EnvVar> {
            vec![]
        }
        fn container_ports(&self) -> Vec<ContainerPort> {
            self.0.clone()
        }
    }

    #[test]
    fn story_dashboard_detection_uses_port_name() {
        let dashboard = Fixed(vec![named_port("dashboard", 8787)], WorkloadConfig::default());
        let worker = Fixed(vec![named_port("worker", 8787)], WorkloadConfig::default());
        assert!(dashboard.exposes_dashboard());
        assert!(!worker.exposes_dashboard());
    }

    #[test]
    fn story_env_helpers_reference_pod_fields() {
        let ip = field_env("MY_POD_IP", "status.podIP");
        let source = ip.value_from.unwrap().field_ref.unwrap();
        assert_eq!(source.field_path, "status.podIP");

        let cpu = resource_env("MY_CPU_REQUEST", "requests.cpu");
        assert_eq!(
            cpu.value_from.unwrap().resource_field_ref.unwrap().resource,
            "requests.cpu"
        );

        assert_eq!(pod_name_env().name, "MY_POD_NAME");
    }

    #[test]
    fn story_ports_join_with_commas() {
        assert_eq!(join_ports(&[6380, 6381]), "6380,6381");
        assert_eq!(join_ports(&[]), "");
    }
}
