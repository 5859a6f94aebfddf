//! Service account pods run as

use dco_common::crd::DistributedCluster;
use dco_common::metadata::{instance_name, standard_labels, Component};
use k8s_openapi::api::core::v1::ServiceAccount;

use crate::meta::object_meta;

/// Service account every pod of the cluster runs as
///
/// The user-supplied `serviceAccountName` when set, otherwise the one
/// [`build_service_account`] creates.
pub fn service_account_name<C: DistributedCluster>(cluster: &C) -> String {
    cluster
        .cluster_config()
        .service_account_name
        .clone()
        .unwrap_or_else(|| instance_name(cluster, Component::None))
}

/// Dedicated service account, unless the cluster names an existing one
///
/// API tokens are not mounted; none of the frameworks talk to the API server.
pub fn build_service_account<C: DistributedCluster>(cluster: &C) -> Option<ServiceAccount> {
    if cluster.cluster_config().service_account_name.is_some() {
        return None;
    }

    Some(ServiceAccount {
        metadata: object_meta(
            cluster,
            instance_name(cluster, Component::None),
            standard_labels(cluster),
        ),
        automount_service_account_token: Some(false),
        ..Default::default()
    })
}
