//! Dask roles: one scheduler and a pool of workers

use dco_common::crd::{DaskCluster, DistributedCluster, WorkloadConfig};
use dco_common::metadata::{instance_name, Component};
use dco_common::Result;
use k8s_openapi::api::core::v1::{ContainerPort, EnvVar};

use crate::compiled::{compile_cluster, Access};
use crate::strategy::{named_port, pod_name_env, RoleStrategy, DASHBOARD_PORT_NAME};
use crate::ClusterResources;

/// Dask scheduler
pub struct SchedulerStrategy<'a> {
    cluster: &'a DaskCluster,
}

impl<'a> SchedulerStrategy<'a> {
    /// Scheduler of `cluster`
    pub fn new(cluster: &'a DaskCluster) -> Self {
        Self { cluster }
    }
}

impl RoleStrategy for SchedulerStrategy<'_> {
    fn component(&self) -> Component {
        Component::Scheduler
    }

    fn pod_config(&self) -> &WorkloadConfig {
        &self.cluster.spec.scheduler
    }

    fn replicas(&self) -> i32 {
        1
    }

    fn command(&self) -> Vec<String> {
        vec!["dask-scheduler".to_string()]
    }

    fn command_args(&self) -> Vec<String> {
        let spec = &self.cluster.spec;
        vec![
            format!("--port={}", spec.scheduler_port()),
            format!("--dashboard-address=:{}", spec.dashboard_port()),
        ]
    }

    fn container_env(&self) -> Vec<EnvVar> {
        Vec::new()
    }

    fn container_ports(&self) -> Vec<ContainerPort> {
        let spec = &self.cluster.spec;
        vec![
            named_port("serve", spec.scheduler_port()),
            named_port(DASHBOARD_PORT_NAME, spec.dashboard_port()),
        ]
    }
}

/// Dask workers
pub struct WorkerStrategy<'a> {
    cluster: &'a DaskCluster,
}

impl<'a> WorkerStrategy<'a> {
    /// Workers of `cluster`
    pub fn new(cluster: &'a DaskCluster) -> Self {
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
        vec!["dask-worker".to_string()]
    }

    fn command_args(&self) -> Vec<String> {
        let spec = &self.cluster.spec;
        let scheduler = instance_name(self.cluster, Component::Scheduler);
        vec![
            "--name=$(MY_POD_NAME)".to_string(),
            format!("--worker-port={}", spec.worker_port()),
            format!("--nanny-port={}", spec.nanny_port()),
            format!("--dashboard-address=:{}", spec.dashboard_port()),
            format!("{scheduler}:{}", spec.scheduler_port()),
        ]
    }

    fn container_env(&self) -> Vec<EnvVar> {
        vec![pod_name_env()]
    }

    fn container_ports(&self) -> Vec<ContainerPort> {
        let spec = &self.cluster.spec;
        vec![
            named_port("worker", spec.worker_port()),
            named_port("nanny", spec.nanny_port()),
            named_port(DASHBOARD_PORT_NAME, spec.dashboard_port()),
        ]
    }
}

/// Derive every object of a Dask cluster
///
/// Clients reach the scheduler port; the dashboard is always served.
pub fn compile(cluster: &DaskCluster) -> Result<ClusterResources> {
    let access = Access {
        client_ports: vec![cluster.spec.scheduler_port()],
        dashboard_port: Some(cluster.spec.dashboard_port()),
    };
    compile_cluster(
        cluster,
        &SchedulerStrategy::new(cluster),
        &WorkerStrategy::new(cluster),
        access,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dco_admission::Defaulter;
    use dco_common::crd::{Autoscaling, DaskClusterSpec};
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    fn defaulted(name: &str) -> DaskCluster {
        let mut cluster = DaskCluster::new(name, DaskClusterSpec::default());
        cluster.metadata.namespace = Some("ns".to_string());
        cluster.defaulted()
    }

    fn port_names(strategy: &dyn RoleStrategy) -> Vec<String> {
        strategy
            .container_ports()
            .into_iter()
            .filter_map(|port| port.name)
            .collect()
    }

    #[test]
    fn story_worker_pool_serves_worker_nanny_and_dashboard() {
        let mut cluster = defaulted("test");
        cluster.spec.worker.replicas = Some(3);

        let worker = WorkerStrategy::new(&cluster);
        assert_eq!(worker.replicas(), 3);
        assert_eq!(port_names(&worker), vec!["worker", "nanny", "dashboard"]);

        let resources = compile(&cluster).unwrap();
        let sts = &resources.stateful_sets[1];
        assert_eq!(sts.metadata.name.as_deref(), Some("test-dask-worker"));
        assert_eq!(sts.spec.as_ref().unwrap().replicas, Some(3));
    }

    #[test]
    fn story_worker_dials_the_scheduler_service() {
        let cluster = defaulted("test");
        let args = WorkerStrategy::new(&cluster).command_args();
        assert_eq!(args.last().map(String::as_str), Some("test-dask-scheduler:8786"));
        assert!(args.contains(&"--name=$(MY_POD_NAME)".to_string()));

        let resources = compile(&cluster).unwrap();
        let scheduler_service = &resources.services[0];
        assert_eq!(scheduler_service.metadata.name.as_deref(), Some("test-dask-scheduler"));
    }

    #[test]
    fn story_scheduler_runs_alone() {
        let cluster = defaulted("test");
        let scheduler = SchedulerStrategy::new(&cluster);
        assert_eq!(scheduler.replicas(), 1);
        assert_eq!(
            scheduler.command_args(),
            vec!["--port=8786", "--dashboard-address=:8787"]
        );
        assert!(scheduler.container_env().is_empty());
    }

    #[test]
    fn story_defaulted_cluster_compiles_full_graph() {
        let resources = compile(&defaulted("test")).unwrap();

        assert!(resources.service_account.is_some());
        assert_eq!(resources.stateful_sets.len(), 2);
        assert_eq!(resources.services.len(), 2);
        let policy_names: Vec<_> = resources
            .network_policies
            .iter()
            .filter_map(|policy| policy.metadata.name.clone())
            .collect();
        assert_eq!(
            policy_names,
            vec![
                "test-dask",
                "test-dask-scheduler-client",
                "test-dask-scheduler-dashboard"
            ]
        );
        assert!(resources.autoscaler.is_none());
        assert_eq!(resources.len(), 8);
        assert_eq!(resources.to_manifests().unwrap().len(), 8);
    }

    #[test]
    fn story_client_policy_opens_the_scheduler_port() {
        let resources = compile(&defaulted("test")).unwrap();
        let client = &resources.network_policies[1];
        let rule = &client.spec.as_ref().unwrap().ingress.as_ref().unwrap()[0];
        let ports = rule.ports.as_ref().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, Some(IntOrString::Int(8786)));
    }

    #[test]
    fn story_disabled_policies_and_autoscaling_toggle_objects() {
        let mut cluster = defaulted("test");
        cluster.spec.cluster.network_policy.enabled = Some(false);
        cluster.spec.cluster.autoscaling = Some(Autoscaling {
            min_replicas: Some(1),
            max_replicas: 5,
            ..Default::default()
        });

        let resources = compile(&cluster).unwrap();
        assert!(resources.network_policies.is_empty());
        let hpa = resources.autoscaler.unwrap();
        assert_eq!(hpa.spec.unwrap().scale_target_ref.name, "test-dask-worker");
    }

    #[test]
    fn story_repeated_compilation_is_byte_identical() {
        let cluster = defaulted("test");
        let render = |cluster: &DaskCluster| {
            let manifests = compile(cluster).unwrap().to_manifests().unwrap();
            serde_json::to_string(&manifests).unwrap()
        };
        assert_eq!(render(&cluster), render(&cluster));
    }
}
