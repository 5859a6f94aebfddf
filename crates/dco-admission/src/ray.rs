//! RayCluster defaulting and validation

use dco_common::crd::defaults::ray::MIN_OBJECT_STORE_MEMORY_BYTES;
use dco_common::crd::{RayCluster, RayDefaults};
use kube::ResourceExt;

use crate::field::{ErrorList, FieldError};
use crate::rules::{self, fill, spec_path};
use crate::{Defaulter, Validator};

impl Defaulter for RayCluster {
    type Defaults = RayDefaults;

    fn defaulted_with(&self, defaults: &RayDefaults) -> Self {
        let name = self.name_any();
        let mut cluster = self.clone();
        let spec = &mut cluster.spec;

        fill(&mut spec.port, &defaults.port, "spec.port", &name);
        fill(
            &mut spec.redis_shard_ports,
            &defaults.redis_shard_ports,
            "spec.redisShardPorts",
            &name,
        );
        fill(
            &mut spec.client_server_port,
            &defaults.client_server_port,
            "spec.clientServerPort",
            &name,
        );
        fill(
            &mut spec.object_manager_port,
            &defaults.object_manager_port,
            "spec.objectManagerPort",
            &name,
        );
        fill(
            &mut spec.node_manager_port,
            &defaults.node_manager_port,
            "spec.nodeManagerPort",
            &name,
        );
        fill(
            &mut spec.gcs_server_port,
            &defaults.gcs_server_port,
            "spec.gcsServerPort",
            &name,
        );
        fill(
            &mut spec.dashboard_port,
            &defaults.dashboard_port,
            "spec.dashboardPort",
            &name,
        );
        fill(
            &mut spec.enable_dashboard,
            &defaults.enable_dashboard,
            "spec.enableDashboard",
            &name,
        );
        rules::default_cluster_config(
            &mut spec.cluster,
            &mut spec.worker,
            &defaults.cluster,
            &name,
        );

        cluster
    }
}

impl Validator for RayCluster {
    fn validate(&self) -> Result<(), ErrorList> {
        let spec = &self.spec;
        let mut errors = ErrorList::new();

        errors.push_opt(rules::validate_mutual_tls_mode(&spec.cluster));
        errors.push_opt(rules::validate_worker_replicas(&spec.worker));
        errors.push_opt(rules::validate_worker_resource_requests(
            &spec.cluster,
            &spec.worker,
        ));

        if let Some(bytes) = spec.object_store_memory_bytes {
            if bytes < MIN_OBJECT_STORE_MEMORY_BYTES {
                errors.push(FieldError::invalid(
                    &spec_path().child("objectStoreMemoryBytes"),
                    bytes,
                    format!("should be greater than or equal to {MIN_OBJECT_STORE_MEMORY_BYTES}"),
                ));
            }
        }

        errors.push_opt(rules::validate_port(spec.port, spec_path().child("port")));
        if let Some(shards) = &spec.redis_shard_ports {
            errors.append(rules::validate_port_list(
                shards,
                spec_path().child("redisShardPorts"),
            ));
        }
        errors.append(rules::validate_port_list(
            &spec.worker_ports,
            spec_path().child("workerPorts"),
        ));
        errors.append(rules::validate_ports(&[
            ("clientServerPort", spec.client_server_port),
            ("objectManagerPort", spec.object_manager_port),
            ("nodeManagerPort", spec.node_manager_port),
            ("gcsServerPort", spec.gcs_server_port),
            ("dashboardPort", spec.dashboard_port),
        ]));

        errors.append(rules::validate_autoscaling(spec.cluster.autoscaling.as_ref()));
        errors.append(rules::validate_image(spec.cluster.image.as_ref()));

        errors.into_result()
    }
}
