//! Ray roles: one head node and a pool of workers
//!
//! Both roles run `ray start --block` and find themselves through the pod IP
//! and CPU request injected into the environment.

use dco_common::crd::{DistributedCluster, RayCluster, RayClusterSpec, WorkloadConfig};
use dco_common::metadata::{instance_name, Component};
use dco_common::Result;
use k8s_openapi::api::core::v1::{ContainerPort, EnvVar};

use crate::compiled::{compile_cluster, Access};
use crate::strategy::{
    field_env, join_ports, named_port, pod_name_env, resource_env, RoleStrategy,
    DASHBOARD_PORT_NAME,
};
use crate::ClusterResources;

fn ray_env() -> Vec<EnvVar> {
    vec![
        field_env("MY_POD_IP", "status.podIP"),
        resource_env("MY_CPU_REQUEST", "requests.cpu"),
    ]
}

/// Flags both roles pass after their role-specific ones
fn node_args(spec: &RayClusterSpec) -> Vec<String> {
    let mut args = vec![
        format!("--object-manager-port={}", spec.object_manager_port()),
        format!("--node-manager-port={}", spec.node_manager_port()),
        "--num-cpus=$(MY_CPU_REQUEST)".to_string(),
    ];
    if let Some(bytes) = spec.object_store_memory_bytes {
        args.push(format!("--object-store-memory={bytes}"));
    }
    if !spec.worker_ports.is_empty() {
        args.push(format!("--worker-port-list={}", join_ports(&spec.worker_ports)));
    }
    args
}

/// Ray head node
pub struct HeadStrategy<'a> {
    cluster: &'a RayCluster,
}

impl<'a> HeadStrategy<'a> {
    /// Head node of `cluster`
    pub fn new(cluster: &'a RayCluster) -> Self {
        Self { cluster }
    }
}

impl RoleStrategy for HeadStrategy<'_> {
    fn component(&self) -> Component {
        Component::Head
    }

    fn pod_config(&self) -> &WorkloadConfig {
        &self.cluster.spec.head
    }

    fn replicas(&self) -> i32 {
        1
    }

    fn command(&self) -> Vec<String> {
        vec!["ray".to_string()]
    }

    fn command_args(&self) -> Vec<String> {
        let spec = &self.cluster.spec;
        let mut args = vec![
            "start".to_string(),
            "--head".to_string(),
            "--block".to_string(),
            "--node-ip-address=$(MY_POD_IP)".to_string(),
            format!("--port={}", spec.port()),
        ];

        let shards = spec.redis_shard_ports();
        if !shards.is_empty() {
            args.push(format!("--redis-shard-ports={}", join_ports(&shards)));
        }
        args.push(format!("--ray-client-server-port={}", spec.client_server_port()));
        args.push(format!("--gcs-server-port={}", spec.gcs_server_port()));

        if spec.dashboard_enabled() {
            args.push("--include-dashboard=true".to_string());
            args.push("--dashboard-host=0.0.0.0".to_string());
            args.push(format!("--dashboard-port={}", spec.dashboard_port()));
        } else {
            args.push("--include-dashboard=false".to_string());
        }

        args.extend(node_args(spec));
        args
    }

    fn container_env(&self) -> Vec<EnvVar> {
        ray_env()
    }

    fn container_ports(&self) -> Vec<ContainerPort> {
        let spec = &self.cluster.spec;
        let mut ports = vec![named_port("redis", spec.port())];
        ports.extend(
            spec.redis_shard_ports()
                .into_iter()
                .enumerate()
                .map(|(i, port)| named_port(format!("redis-shard-{i}"), port)),
        );
        ports.push(named_port("client", spec.client_server_port()));
        ports.push(named_port("object-manager", spec.object_manager_port()));
        ports.push(named_port("node-manager", spec.node_manager_port()));
        ports.push(named_port("gcs-server", spec.gcs_server_port()));
        if spec.dashboard_enabled() {
            ports.push(named_port(DASHBOARD_PORT_NAME, spec.dashboard_port()));
        }
        ports
    }
}

/// Ray workers
pub struct WorkerStrategy<'a> {
    cluster: &'a RayCluster,
}

impl<'a> WorkerStrategy<'a> {
    /// Workers of `cluster`
    pub fn new(cluster: &'a RayCluster) -> Self {
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
        vec!["ray".to_string()]
    }

    fn command_args(&self) -> Vec<String> {
        let spec = &self.cluster.spec;
        let head = instance_name(self.cluster, Component::Head);
        let mut args = vec![
            "start".to_string(),
            "--block".to_string(),
            "--node-ip-address=$(MY_POD_IP)".to_string(),
            format!("--address={head}:{}", spec.port()),
        ];
        args.extend(node_args(spec));
        args
    }

    fn container_env(&self) -> Vec<EnvVar> {
        let mut env = vec![pod_name_env()];
        env.extend(ray_env());
        env
    }

    fn container_ports(&self) -> Vec<ContainerPort> {
        let spec = &self.cluster.spec;
        vec![
            named_port("object-manager", spec.object_manager_port()),
            named_port("node-manager", spec.node_manager_port()),
        ]
    }
}

/// Derive every object of a Ray cluster
///
/// Clients reach the head port and the client server; the dashboard policy
/// is only emitted while the dashboard is enabled.
pub fn compile(cluster: &RayCluster) -> Result<ClusterResources> {
    let spec = &cluster.spec;
    let access = Access {
        client_ports: vec![spec.port(), spec.client_server_port()],
        dashboard_port: spec.dashboard_enabled().then(|| spec.dashboard_port()),
    };
    compile_cluster(
        cluster,
        &HeadStrategy::new(cluster),
        &WorkerStrategy::new(cluster),
        access,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dco_admission::Defaulter;

    fn defaulted(name: &str) -> RayCluster {
        RayCluster::new(name, RayClusterSpec::default()).defaulted()
    }

    #[test]
    fn story_worker_joins_the_head_service() {
        let cluster = defaulted("test");
        let args = WorkerStrategy::new(&cluster).command_args();

        assert_eq!(&args[..2], ["start", "--block"]);
        assert!(args.contains(&"--address=test-ray-head:6379".to_string()));
        assert!(args.contains(&"--num-cpus=$(MY_CPU_REQUEST)".to_string()));
    }

    #[test]
    fn story_head_args_carry_every_configured_port() {
        let mut cluster = defaulted("test");
        cluster.spec.object_store_memory_bytes = Some(100_000_000);
        cluster.spec.worker_ports = vec![11000, 11001];

        let args = HeadStrategy::new(&cluster).command_args();
        for expected in [
            "--head",
            "--port=6379",
            "--redis-shard-ports=6380,6381",
            "--ray-client-server-port=10001",
            "--object-manager-port=2384",
            "--node-manager-port=2385",
            "--gcs-server-port=2386",
            "--include-dashboard=true",
            "--dashboard-port=8265",
            "--object-store-memory=100000000",
            "--worker-port-list=11000,11001",
        ] {
            assert!(args.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn story_head_ports_follow_shards_and_dashboard() {
        let cluster = defaulted("test");
        let names: Vec<String> = HeadStrategy::new(&cluster)
            .container_ports()
            .into_iter()
            .filter_map(|port| port.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "redis",
                "redis-shard-0",
                "redis-shard-1",
                "client",
                "object-manager",
                "node-manager",
                "gcs-server",
                "dashboard"
            ]
        );
    }

    #[test]
    fn story_disabled_dashboard_drops_port_probe_and_policy() {
        let mut cluster = defaulted("test");
        cluster.spec.enable_dashboard = Some(false);

        let head = HeadStrategy::new(&cluster);
        assert!(!head.exposes_dashboard());
        assert!(head.command_args().contains(&"--include-dashboard=false".to_string()));

        let resources = compile(&cluster).unwrap();
        let head_pod = resources.stateful_sets[0].spec.clone().unwrap().template.spec.unwrap();
        assert!(head_pod.containers[0].liveness_probe.is_none());
        assert_eq!(resources.network_policies.len(), 2);
    }

    #[test]
    fn story_workers_identify_themselves() {
        let cluster = defaulted("test");
        let names: Vec<String> = WorkerStrategy::new(&cluster)
            .container_env()
            .into_iter()
            .map(|var| var.name)
            .collect();
        assert_eq!(names, vec!["MY_POD_NAME", "MY_POD_IP", "MY_CPU_REQUEST"]);
    }

    #[test]
    fn story_defaulted_ray_cluster_compiles() {
        let resources = compile(&defaulted("test")).unwrap();
        let names: Vec<_> = resources
            .stateful_sets
            .iter()
            .filter_map(|sts| sts.metadata.name.clone())
            .collect();
        assert_eq!(names, vec!["test-ray-head", "test-ray-worker"]);
        assert_eq!(resources.network_policies.len(), 3);
        assert_eq!(resources.stateful_sets[1].spec.as_ref().unwrap().replicas, Some(1));
    }
}
