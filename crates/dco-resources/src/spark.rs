//! Spark standalone roles: one master and a pool of workers

use dco_common::crd::{DistributedCluster, SparkCluster, WorkloadConfig};
use dco_common::metadata::{instance_name, Component};
use dco_common::Result;
use k8s_openapi::api::core::v1::{ContainerPort, EnvVar};

use crate::compiled::{compile_cluster, Access};
use crate::strategy::{named_port, pod_name_env, RoleStrategy, DASHBOARD_PORT_NAME};
use crate::ClusterResources;

/// Launcher shipped in the Spark image
pub const SPARK_CLASS: &str = "/opt/bitnami/spark/bin/spark-class";

/// Spark master
pub struct MasterStrategy<'a> {
    cluster: &'a SparkCluster,
}

impl<'a> MasterStrategy<'a> {
    /// Master of `cluster`
    pub fn new(cluster: &'a SparkCluster) -> Self {
        Self { cluster }
    }
}

impl RoleStrategy for MasterStrategy<'_> {
    fn component(&self) -> Component {
        Component::Master
    }

    fn pod_config(&self) -> &WorkloadConfig {
        &self.cluster.spec.master
    }

    fn replicas(&self) -> i32 {
        1
    }

    fn command(&self) -> Vec<String> {
        vec![SPARK_CLASS.to_string()]
    }

    fn command_args(&self) -> Vec<String> {
        let spec = &self.cluster.spec;
        vec![
            "org.apache.spark.deploy.master.Master".to_string(),
            "--port".to_string(),
            spec.cluster_port().to_string(),
            "--webui-port".to_string(),
            spec.dashboard_port().to_string(),
        ]
    }

    fn container_env(&self) -> Vec<EnvVar> {
        Vec::new()
    }

    fn container_ports(&self) -> Vec<ContainerPort> {
        let spec = &self.cluster.spec;
        vec![
            named_port("cluster", spec.cluster_port()),
            named_port(DASHBOARD_PORT_NAME, spec.dashboard_port()),
        ]
    }
}

/// Spark workers
pub struct WorkerStrategy<'a> {
    cluster: &'a SparkCluster,
}

impl<'a> WorkerStrategy<'a> {
    /// Workers of `cluster`
    pub fn new(cluster: &'a SparkCluster) -> Self {
        Self { cluster }
    }
}

impl RoleStrategy for WorkerStrategy<'_> {
    fn component(&self) -> Component {
        Component::Worker
    }

    fn pod_config(&self) -> &WorkloadConfig {
        &self.cluster.spec.worker.workload
    }

    fn replicas(&self) -> i32 {
        self.cluster.worker_config().replicas()
    }

    fn command(&self) -> Vec<String> {
        vec![SPARK_CLASS.to_string()]
    }

    fn command_args(&self) -> Vec<String> {
        let spec = &self.cluster.spec;
        let master = instance_name(self.cluster, Component::Master);
        vec![
            "org.apache.spark.deploy.worker.Worker".to_string(),
            "--webui-port".to_string(),
            spec.dashboard_port().to_string(),
            format!("spark://{master}:{}", spec.cluster_port()),
        ]
    }

    fn container_env(&self) -> Vec<EnvVar> {
        vec![pod_name_env()]
    }

    fn container_ports(&self) -> Vec<ContainerPort> {
        vec![named_port(
            DASHBOARD_PORT_NAME,
            self.cluster.spec.dashboard_port(),
        )]
    }
}

/// Derive every object of a Spark cluster
///
/// Clients reach the cluster port.
pub fn compile(cluster: &SparkCluster) -> Result<ClusterResources> {
    let spec = &cluster.spec;
    let access = Access {
        client_ports: vec![spec.cluster_port()],
        dashboard_port: spec.dashboard_enabled().then(|| spec.dashboard_port()),
    };
    compile_cluster(
        cluster,
        &MasterStrategy::new(cluster),
        &WorkerStrategy::new(cluster),
        access,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dco_admission::Defaulter;
    use dco_common::crd::SparkClusterSpec;

    fn defaulted(name: &str) -> SparkCluster {
        SparkCluster::new(name, SparkClusterSpec::default()).defaulted()
    }

    #[test]
    fn story_worker_registers_with_the_master_service() {
        let cluster = defaulted("test");
        let args = WorkerStrategy::new(&cluster).command_args();
        assert_eq!(args.last().map(String::as_str), Some("spark://test-spark-master:7077"));
        assert_eq!(WorkerStrategy::new(&cluster).command(), vec![SPARK_CLASS]);
    }

    #[test]
    fn story_master_serves_cluster_and_dashboard() {
        let cluster = defaulted("test");
        let master = MasterStrategy::new(&cluster);
        assert_eq!(
            master.command_args(),
            vec![
                "org.apache.spark.deploy.master.Master",
                "--port",
                "7077",
                "--webui-port",
                "8080"
            ]
        );
        assert!(master.exposes_dashboard());

        let resources = compile(&cluster).unwrap();
        let service = resources.services[0].spec.clone().unwrap();
        let ports: Vec<i32> = service.ports.unwrap().iter().map(|p| p.port).collect();
        assert_eq!(ports, vec![7077, 8080]);
    }

    #[test]
    fn story_disabled_dashboard_skips_dashboard_policy() {
        let mut cluster = defaulted("test");
        cluster.spec.enable_dashboard = Some(false);

        let resources = compile(&cluster).unwrap();
        let names: Vec<_> = resources
            .network_policies
            .iter()
            .filter_map(|policy| policy.metadata.name.clone())
            .collect();
        assert_eq!(names, vec!["test-spark", "test-spark-master-client"]);
    }

    #[test]
    fn story_named_service_account_is_not_created() {
        let mut cluster = defaulted("test");
        cluster.spec.cluster.service_account_name = Some("spark-runner".to_string());

        let resources = compile(&cluster).unwrap();
        assert!(resources.service_account.is_none());
        let pod = resources.stateful_sets[1].spec.clone().unwrap().template.spec.unwrap();
        assert_eq!(pod.service_account_name.as_deref(), Some("spark-runner"));
    }
}
