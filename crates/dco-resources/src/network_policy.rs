//! Network isolation
//!
//! Pods of a cluster may always talk to each other. Anything else reaching
//! the coordinating role has to carry the configured client or dashboard
//! labels, and only gets to the listed ports.

use std::collections::BTreeMap;

use dco_common::crd::DistributedCluster;
use dco_common::metadata::{
    instance_name, match_labels, match_labels_with_component, standard_labels,
    standard_labels_with_component, Component,
};
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicyPort,
    NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::meta::object_meta;

/// Suffix of the policy admitting client traffic
pub const CLIENT_POLICY_PURPOSE: &str = "client";

/// Suffix of the policy admitting dashboard traffic
pub const DASHBOARD_POLICY_PURPOSE: &str = "dashboard";

fn selector(labels: BTreeMap<String, String>) -> LabelSelector {
    LabelSelector {
        match_labels: Some(labels),
        ..Default::default()
    }
}

/// Restrict ingress to every pod of the cluster to pods of the same cluster
pub fn build_cluster_policy<C: DistributedCluster>(cluster: &C) -> NetworkPolicy {
    let members = match_labels(cluster);

    NetworkPolicy {
        metadata: object_meta(
            cluster,
            instance_name(cluster, Component::None),
            standard_labels(cluster),
        ),
        spec: Some(NetworkPolicySpec {
            pod_selector: selector(members.clone()).into(),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![NetworkPolicyPeer {
                    pod_selector: Some(selector(members)),
                    ..Default::default()
                }]),
                ports: None,
            }]),
            policy_types: Some(vec!["Ingress".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Admit pods carrying `labels` to `ports` of one role
///
/// Named `{role instance name}-{purpose}`.
pub fn build_access_policy<C: DistributedCluster>(
    cluster: &C,
    component: Component,
    purpose: &str,
    labels: BTreeMap<String, String>,
    ports: &[i32],
) -> NetworkPolicy {
    let ports = ports
        .iter()
        .map(|port| NetworkPolicyPort {
            port: Some(IntOrString::Int(*port)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        })
        .collect();

    NetworkPolicy {
        metadata: object_meta(
            cluster,
            format!("{}-{purpose}", instance_name(cluster, component)),
            standard_labels_with_component(cluster, component),
        ),
        spec: Some(NetworkPolicySpec {
            pod_selector: selector(match_labels_with_component(cluster, component)).into(),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![NetworkPolicyPeer {
                    pod_selector: Some(selector(labels)),
                    ..Default::default()
                }]),
                ports: Some(ports),
            }]),
            policy_types: Some(vec!["Ingress".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dco_common::crd::{SparkCluster, SparkClusterSpec};

    fn spec_json(policy: &NetworkPolicy) -> serde_json::Value {
        serde_json::to_value(policy.spec.as_ref().unwrap()).unwrap()
    }

    #[test]
    fn story_cluster_policy_admits_only_cluster_members() {
        let cluster = SparkCluster::new("test", SparkClusterSpec::default());
        let policy = build_cluster_policy(&cluster);

        assert_eq!(policy.metadata.name.as_deref(), Some("test-spark"));
        let spec = spec_json(&policy);
        let members = serde_json::json!({
            "app.kubernetes.io/instance": "test",
            "app.kubernetes.io/name": "spark"
        });
        assert_eq!(spec["podSelector"]["matchLabels"], members);
        assert_eq!(spec["ingress"][0]["from"][0]["podSelector"]["matchLabels"], members);
        assert_eq!(spec["policyTypes"], serde_json::json!(["Ingress"]));
    }

    #[test]
    fn story_access_policy_targets_the_head_on_listed_ports() {
        let cluster = SparkCluster::new("test", SparkClusterSpec::default());
        let labels = BTreeMap::from([("spark-client".to_string(), "true".to_string())]);
        let policy = build_access_policy(
            &cluster,
            Component::Master,
            CLIENT_POLICY_PURPOSE,
            labels,
            &[7077],
        );

        assert_eq!(policy.metadata.name.as_deref(), Some("test-spark-master-client"));
        let spec = spec_json(&policy);
        assert_eq!(
            spec["podSelector"]["matchLabels"]["app.kubernetes.io/component"],
            "master"
        );
        let rule = &spec["ingress"][0];
        assert_eq!(rule["from"][0]["podSelector"]["matchLabels"]["spark-client"], "true");
        assert_eq!(rule["ports"][0]["port"], 7077);
        assert_eq!(rule["ports"][0]["protocol"], "TCP");
    }
}
