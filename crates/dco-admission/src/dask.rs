//! DaskCluster defaulting and validation

use dco_common::crd::{DaskCluster, DaskDefaults};
use kube::ResourceExt;

use crate::field::ErrorList;
use crate::rules::{self, fill};
use crate::{Defaulter, Validator};

impl Defaulter for DaskCluster {
    type Defaults = DaskDefaults;

    fn defaulted_with(&self, defaults: &DaskDefaults) -> Self {
        let name = self.name_any();
        let mut cluster = self.clone();
        let spec = &mut cluster.spec;

        fill(
            &mut spec.scheduler_port,
            &defaults.scheduler_port,
            "spec.schedulerPort",
            &name,
        );
        fill(
            &mut spec.dashboard_port,
            &defaults.dashboard_port,
            "spec.dashboardPort",
            &name,
        );
        fill(
            &mut spec.worker_port,
            &defaults.worker_port,
            "spec.workerPort",
            &name,
        );
        fill(
            &mut spec.nanny_port,
            &defaults.nanny_port,
            "spec.nannyPort",
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

impl Validator for DaskCluster {
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
            ("schedulerPort", spec.scheduler_port),
            ("dashboardPort", spec.dashboard_port),
            ("workerPort", spec.worker_port),
            ("nannyPort", spec.nanny_port),
        ]));
        errors.append(rules::validate_autoscaling(spec.cluster.autoscaling.as_ref()));
        errors.append(rules::validate_image(spec.cluster.image.as_ref()));

        errors.into_result()
    }
}
