//! Worker autoscaling

use dco_common::crd::{Autoscaling, DistributedCluster};
use dco_common::metadata::{instance_name, standard_labels_with_component};
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HPAScalingRules, HorizontalPodAutoscaler,
    HorizontalPodAutoscalerBehavior, HorizontalPodAutoscalerSpec, MetricSpec, MetricTarget,
    ResourceMetricSource,
};

use crate::meta::{non_empty, object_meta};
use crate::strategy::RoleStrategy;

/// Build an `autoscaling/v2` autoscaler for the worker StatefulSet
///
/// Scales on average CPU utilization when a target is set; the scale-down
/// stabilization window is passed through when set.
pub fn build_autoscaler<C, S>(
    cluster: &C,
    worker: &S,
    autoscaling: &Autoscaling,
) -> HorizontalPodAutoscaler
where
    C: DistributedCluster,
    S: RoleStrategy + ?Sized,
{
    let component = worker.component();
    let target = instance_name(cluster, component);

    let metrics = autoscaling
        .average_cpu_utilization
        .map(|utilization| MetricSpec {
            type_: "Resource".to_string(),
            resource: Some(ResourceMetricSource {
                name: "cpu".to_string(),
                target: MetricTarget {
                    type_: "Utilization".to_string(),
                    average_utilization: Some(utilization),
                    ..Default::default()
                },
            }),
            ..Default::default()
        })
        .into_iter()
        .collect();

    let behavior = autoscaling
        .scale_down_stabilization_window_seconds
        .map(|window| HorizontalPodAutoscalerBehavior {
            scale_down: Some(HPAScalingRules {
                stabilization_window_seconds: Some(window),
                ..Default::default()
            }),
            scale_up: None,
        });

    HorizontalPodAutoscaler {
        metadata: object_meta(
            cluster,
            target.clone(),
            standard_labels_with_component(cluster, component),
        ),
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "StatefulSet".to_string(),
                name: target,
            },
            min_replicas: autoscaling.min_replicas,
            max_replicas: autoscaling.max_replicas,
            metrics: non_empty(metrics),
            behavior,
        }),
        ..Default::default()
    }
}
