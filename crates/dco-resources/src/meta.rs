//! Object metadata shared by the builders

use std::collections::BTreeMap;

use dco_common::crd::DistributedCluster;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;

/// Metadata of a derived object, owned by the cluster once it has a UID
pub(crate) fn object_meta<C: DistributedCluster>(
    cluster: &C,
    name: String,
    labels: BTreeMap<String, String>,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: cluster.namespace(),
        labels: Some(labels),
        owner_references: cluster.controller_owner_ref(&()).map(|owner| vec![owner]),
        ..Default::default()
    }
}

/// User labels overlaid with standard labels; standard keys always win
pub(crate) fn merge_labels(
    user: &BTreeMap<String, String>,
    standard: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut labels = user.clone();
    labels.extend(standard);
    labels
}

/// `None` for empty lists so unset fields stay out of the manifest
pub(crate) fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// `None` for empty maps
pub(crate) fn non_empty_map(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!map.is_empty()).then(|| map.clone())
}
