//! StatefulSet synthesis
//!
//! One StatefulSet per role. Everything role-specific comes from the
//! [`RoleStrategy`]; everything cluster-wide comes from the cluster's shared
//! configuration.

use std::collections::BTreeMap;

use dco_common::crd::{AdditionalStorage, DistributedCluster};
use dco_common::image::{parse_image_definition, ImageParseError};
use dco_common::metadata::{
    instance_name, match_labels_with_component, standard_labels_with_component,
};
use dco_common::{Error, Result};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec, StatefulSetUpdateStrategy};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, HTTPGetAction, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec, Probe, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use crate::meta::{merge_labels, non_empty, non_empty_map, object_meta};
use crate::service_account::service_account_name;
use crate::strategy::{RoleStrategy, DASHBOARD_PORT_NAME};

/// Pods of a role start and stop together rather than one at a time
pub const POD_MANAGEMENT_POLICY: &str = "Parallel";

/// Update strategy of every role
pub const UPDATE_STRATEGY: &str = "RollingUpdate";

/// Access mode of additional storage that lists none
pub const DEFAULT_STORAGE_ACCESS_MODE: &str = "ReadWriteOnce";

/// Build the StatefulSet running one role of the cluster
///
/// Fails only when the cluster's image cannot be turned into a pullable
/// reference.
pub fn build_stateful_set<C, S>(cluster: &C, strategy: &S) -> Result<StatefulSet>
where
    C: DistributedCluster,
    S: RoleStrategy + ?Sized,
{
    let config = cluster.cluster_config();
    let image_definition = config
        .image
        .as_ref()
        .ok_or_else(|| Error::image_for(cluster.name_any(), ImageParseError::Missing))?;
    let image = parse_image_definition(image_definition)
        .map_err(|source| Error::image_for(cluster.name_any(), source))?;

    let component = strategy.component();
    let pod_config = strategy.pod_config();
    let name = instance_name(cluster, component);
    let labels = merge_labels(
        &pod_config.labels,
        standard_labels_with_component(cluster, component),
    );

    let ports = strategy.container_ports();
    let probe = strategy
        .exposes_dashboard()
        .then(|| dashboard_probe(C::FRAMEWORK.health_check_path()));

    let mut volume_mounts = pod_config.volume_mounts.clone();
    volume_mounts.extend(pod_config.additional_storage.iter().map(storage_mount));

    let container = Container {
        name: C::FRAMEWORK.application_name().to_string(),
        image: Some(image),
        image_pull_policy: image_definition.pull_policy.clone(),
        command: non_empty(strategy.command()),
        args: non_empty(strategy.command_args()),
        env: non_empty(merge_env(strategy.container_env(), &config.env_vars)),
        ports: non_empty(ports),
        resources: Some(pod_config.resources.clone()),
        volume_mounts: non_empty(volume_mounts),
        liveness_probe: probe.clone(),
        readiness_probe: probe,
        ..Default::default()
    };

    let pod_spec = PodSpec {
        containers: vec![container],
        init_containers: non_empty(pod_config.init_containers.clone()),
        volumes: non_empty(pod_config.volumes.clone()),
        node_selector: non_empty_map(&pod_config.node_selector),
        affinity: pod_config.affinity.clone(),
        tolerations: non_empty(pod_config.tolerations.clone()),
        image_pull_secrets: non_empty(config.image_pull_secrets.clone()),
        security_context: config.pod_security_context.clone(),
        service_account_name: Some(service_account_name(cluster)),
        ..Default::default()
    };

    Ok(StatefulSet {
        metadata: object_meta(cluster, name.clone(), labels.clone()),
        spec: Some(StatefulSetSpec {
            replicas: Some(strategy.replicas()),
            selector: LabelSelector {
                match_labels: Some(match_labels_with_component(cluster, component)),
                ..Default::default()
            },
            service_name: name.into(),
            pod_management_policy: Some(POD_MANAGEMENT_POLICY.to_string()),
            update_strategy: Some(StatefulSetUpdateStrategy {
                type_: Some(UPDATE_STRATEGY.to_string()),
                ..Default::default()
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    annotations: non_empty_map(&pod_config.annotations),
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            volume_claim_templates: non_empty(
                pod_config
                    .additional_storage
                    .iter()
                    .map(volume_claim_template)
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Role env followed by spec-wide env; role entries win on name collision
fn merge_env(role: Vec<EnvVar>, cluster: &[EnvVar]) -> Vec<EnvVar> {
    let extra: Vec<EnvVar> = cluster
        .iter()
        .filter(|var| !role.iter().any(|own| own.name == var.name))
        .cloned()
        .collect();
    let mut env = role;
    env.extend(extra);
    env
}

/// HTTP GET on the dashboard port, used for both liveness and readiness
fn dashboard_probe(path: &str) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::String(DASHBOARD_PORT_NAME.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn storage_mount(storage: &AdditionalStorage) -> VolumeMount {
    VolumeMount {
        name: storage.name.clone(),
        mount_path: storage.mount_path(),
        ..Default::default()
    }
}

fn volume_claim_template(storage: &AdditionalStorage) -> PersistentVolumeClaim {
    let access_modes = if storage.access_modes.is_empty() {
        vec![DEFAULT_STORAGE_ACCESS_MODE.to_string()]
    } else {
        storage.access_modes.clone()
    };

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(storage.name.clone()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(access_modes),
            storage_class_name: storage.storage_class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(storage.size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
