//! SparkCluster defaulting and validation

use dco_common::crd::{SparkCluster, SparkDefaults};
use kube::ResourceExt;

use crate::field::ErrorList;
use crate::rules::{self, fill};
use crate::{Defaulter, Validator};

impl Defaulter for SparkCluster {
    type Defaults = SparkDefaults;

    fn defaulted_with(&self, defaults: &SparkDefaults) -> Self {
        let name = self.name_any();
        let mut cluster = self.clone();
        let spec = &mut cluster.spec;

        fill(
            &mut spec.cluster_port,
            &defaults.cluster_port,
            "spec.clusterPort",
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

impl Validator for SparkCluster {
    fn validate(&self) -> Result<(), ErrorList> {
        let spec = &self.spec;
        let mut errors = ErrorList::new();

        errors.push_opt(rules::validate_mutual_tls_mode(&spec.cluster));
        errors.push_opt(rules::validate_worker_replicas(&spec.worker));
        errors.push_opt(rules::validate_worker_resource_requests(
            &spec.cluster,
            &spec.worker,
        ));
        errors.append(rules::validate_ports(&[
            ("clusterPort", spec.cluster_port),
            ("dashboardPort", spec.dashboard_port),
        ]));
        errors.append(rules::validate_autoscaling(spec.cluster.autoscaling.as_ref()));
        errors.append(rules::validate_image(spec.cluster.image.as_ref()));

        errors.into_result()
    }
}
