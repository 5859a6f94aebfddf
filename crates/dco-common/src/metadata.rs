//! Object names and labels derived from a cluster
//!
//! Every name and selector the builders emit comes from here, so cross-role
//! references (a worker dialing its head's service) always agree with the
//! objects that were actually created.

use std::collections::BTreeMap;
use std::fmt;

use kube::ResourceExt;

use crate::crd::DistributedCluster;
use crate::MANAGED_BY;

/// `app.kubernetes.io/name` label key
pub const APPLICATION_NAME_LABEL: &str = "app.kubernetes.io/name";
/// `app.kubernetes.io/instance` label key
pub const APPLICATION_INSTANCE_LABEL: &str = "app.kubernetes.io/instance";
/// `app.kubernetes.io/version` label key
pub const APPLICATION_VERSION_LABEL: &str = "app.kubernetes.io/version";
/// `app.kubernetes.io/component` label key
pub const APPLICATION_COMPONENT_LABEL: &str = "app.kubernetes.io/component";
/// `app.kubernetes.io/managed-by` label key
pub const APPLICATION_MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Role a derived object belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    /// Cluster-wide objects that belong to no single role
    None,
    /// Ray head
    Head,
    /// Dask scheduler
    Scheduler,
    /// Spark master
    Master,
    /// Workers of any framework
    Worker,
}

impl Component {
    /// Label value and name suffix; empty for [`Component::None`]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Head => "head",
            Self::Scheduler => "scheduler",
            Self::Master => "master",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of an object derived from the cluster for a role
///
/// `{instance}-{application}` for [`Component::None`], otherwise
/// `{instance}-{application}-{component}`.
pub fn instance_name<C: DistributedCluster>(cluster: &C, component: Component) -> String {
    let app = C::FRAMEWORK.application_name();
    let instance = cluster.name_any();
    match component {
        Component::None => format!("{instance}-{app}"),
        _ => format!("{instance}-{app}-{component}"),
    }
}

/// Labels stamped on every object derived from the cluster
pub fn standard_labels<C: DistributedCluster>(cluster: &C) -> BTreeMap<String, String> {
    let version = cluster
        .cluster_config()
        .image
        .as_ref()
        .map(|image| image.tag.clone())
        .unwrap_or_default();

    let mut labels = match_labels(cluster);
    labels.insert(APPLICATION_VERSION_LABEL.to_string(), version);
    labels.insert(
        APPLICATION_MANAGED_BY_LABEL.to_string(),
        MANAGED_BY.to_string(),
    );
    labels
}

/// Standard labels plus the role
pub fn standard_labels_with_component<C: DistributedCluster>(
    cluster: &C,
    component: Component,
) -> BTreeMap<String, String> {
    let mut labels = standard_labels(cluster);
    labels.insert(
        APPLICATION_COMPONENT_LABEL.to_string(),
        component.to_string(),
    );
    labels
}

/// Selector matching every pod of the cluster
///
/// Never includes the version, so selectors survive image upgrades.
pub fn match_labels<C: DistributedCluster>(cluster: &C) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            APPLICATION_NAME_LABEL.to_string(),
            C::FRAMEWORK.application_name().to_string(),
        ),
        (APPLICATION_INSTANCE_LABEL.to_string(), cluster.name_any()),
    ])
}

/// Selector matching the pods of one role
pub fn match_labels_with_component<C: DistributedCluster>(
    cluster: &C,
    component: Component,
) -> BTreeMap<String, String> {
    let mut labels = match_labels(cluster);
    labels.insert(
        APPLICATION_COMPONENT_LABEL.to_string(),
        component.to_string(),
    );
    labels
}
