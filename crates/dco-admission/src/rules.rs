//! Rules and defaulting shared by every cluster kind
//!
//! Each rule inspects one concern and reports every problem it finds; the
//! per-kind validators call them in a fixed order so reports are stable.

use std::fmt::Debug;

use dco_common::crd::{
    Autoscaling, ClusterConfig, ClusterDefaults, OciImageDefinition, WorkerConfig,
    ISTIO_MUTUAL_TLS_MODES,
};
use tracing::debug;

use crate::field::{ErrorList, FieldError, FieldPath};

/// Lowest port a cluster may listen on; privileged ports are refused
pub const MIN_PORT: i32 = 1024;

/// Highest valid TCP port
pub const MAX_PORT: i32 = 65535;

/// Root of every reported path
pub fn spec_path() -> FieldPath {
    FieldPath::new("spec")
}

// =============================================================================
// Defaulting
// =============================================================================

/// Fill an unset field, logging the substitution
pub fn fill<T: Clone + Debug>(slot: &mut Option<T>, value: &T, field: &str, cluster: &str) {
    if slot.is_none() {
        debug!(cluster = %cluster, field = %field, value = ?value, "Applying default");
        *slot = Some(value.clone());
    }
}

/// Apply the defaults every framework shares
pub fn default_cluster_config(
    config: &mut ClusterConfig,
    worker: &mut WorkerConfig,
    defaults: &ClusterDefaults,
    cluster: &str,
) {
    fill(&mut config.image, &defaults.image, "spec.image", cluster);
    fill(
        &mut worker.replicas,
        &defaults.worker_replicas,
        "spec.worker.replicas",
        cluster,
    );

    let policy = &mut config.network_policy;
    fill(
        &mut policy.enabled,
        &defaults.enable_network_policy,
        "spec.networkPolicy.enabled",
        cluster,
    );
    fill(
        &mut policy.client_server_labels,
        &defaults.network_policy_labels,
        "spec.networkPolicy.clientServerLabels",
        cluster,
    );
    fill(
        &mut policy.dashboard_labels,
        &defaults.network_policy_labels,
        "spec.networkPolicy.dashboardLabels",
        cluster,
    );
}

// =============================================================================
// Validation
// =============================================================================

/// `istioMutualTLSMode` must be empty or name a known mode when set
pub fn validate_mutual_tls_mode(config: &ClusterConfig) -> Option<FieldError> {
    let mode = config.istio_mutual_tls_mode.as_deref()?;
    if mode.is_empty() || ISTIO_MUTUAL_TLS_MODES.contains(&mode) {
        return None;
    }
    Some(FieldError::not_supported(
        &spec_path().child("istioMutualTLSMode"),
        mode,
        &ISTIO_MUTUAL_TLS_MODES,
    ))
}

/// Worker replicas cannot be negative
pub fn validate_worker_replicas(worker: &WorkerConfig) -> Option<FieldError> {
    let replicas = worker.replicas?;
    (replicas < 0).then(|| {
        FieldError::invalid(
            &spec_path().child("worker").child("replicas"),
            replicas,
            "should be greater than or equal to 0",
        )
    })
}

/// Autoscaling on CPU needs a CPU request to compute utilization against
pub fn validate_worker_resource_requests(
    config: &ClusterConfig,
    worker: &WorkerConfig,
) -> Option<FieldError> {
    if config.autoscaling.is_none() || worker.requests_cpu() {
        return None;
    }
    Some(FieldError::required(
        &spec_path()
            .child("worker")
            .child("resources")
            .child("requests")
            .child("cpu"),
        "is mandatory when autoscaling is enabled",
    ))
}

/// One port, when set, must sit in `[MIN_PORT, MAX_PORT]`
pub fn validate_port(port: Option<i32>, path: FieldPath) -> Option<FieldError> {
    let port = port?;
    if port < MIN_PORT {
        Some(FieldError::invalid(
            &path,
            port,
            format!("must be greater than or equal to {MIN_PORT}"),
        ))
    } else if port > MAX_PORT {
        Some(FieldError::invalid(
            &path,
            port,
            format!("must be less than or equal to {MAX_PORT}"),
        ))
    } else {
        None
    }
}

/// Every element of a port list, each reported at its own index
pub fn validate_port_list(ports: &[i32], path: FieldPath) -> ErrorList {
    let mut errors = ErrorList::new();
    for (i, port) in ports.iter().enumerate() {
        errors.push_opt(validate_port(Some(*port), path.index(i)));
    }
    errors
}

/// Named scalar ports of a spec, checked in the given order
pub fn validate_ports(ports: &[(&str, Option<i32>)]) -> ErrorList {
    let mut errors = ErrorList::new();
    for (name, port) in ports {
        errors.push_opt(validate_port(*port, spec_path().child(name)));
    }
    errors
}

/// Autoscaling bounds
pub fn validate_autoscaling(autoscaling: Option<&Autoscaling>) -> ErrorList {
    let mut errors = ErrorList::new();
    let Some(autoscaling) = autoscaling else {
        return errors;
    };
    let path = spec_path().child("autoscaling");

    if let Some(min) = autoscaling.min_replicas {
        if min < 1 {
            errors.push(FieldError::invalid(
                &path.child("minReplicas"),
                min,
                "must be greater than or equal to 1",
            ));
        }
        if autoscaling.max_replicas < min {
            errors.push(FieldError::invalid(
                &path.child("maxReplicas"),
                autoscaling.max_replicas,
                "cannot be less than spec.autoscaling.minReplicas",
            ));
        }
    }

    if autoscaling.max_replicas < 1 {
        errors.push(FieldError::invalid(
            &path.child("maxReplicas"),
            autoscaling.max_replicas,
            "must be greater than or equal to 1",
        ));
    }

    if let Some(utilization) = autoscaling.average_cpu_utilization {
        if utilization <= 0 {
            errors.push(FieldError::invalid(
                &path.child("averageCPUUtilization"),
                utilization,
                "must be greater than 0",
            ));
        }
    }

    if let Some(window) = autoscaling.scale_down_stabilization_window_seconds {
        if window < 0 {
            errors.push(FieldError::invalid(
                &path.child("scaleDownStabilizationWindowSeconds"),
                window,
                "must be greater than or equal to 0",
            ));
        }
    }

    errors
}

/// The image must be present with a repository and a tag
pub fn validate_image(image: Option<&OciImageDefinition>) -> ErrorList {
    let mut errors = ErrorList::new();
    let path = spec_path().child("image");
    let Some(image) = image else {
        errors.push(FieldError::required(&path, "is required"));
        return errors;
    };

    if image.repository.trim().is_empty() {
        errors.push(FieldError::required(
            &path.child("repository"),
            "cannot be blank",
        ));
    }
    if image.tag.trim().is_empty() {
        errors.push(FieldError::required(&path.child("tag"), "cannot be blank"));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ErrorType;

    fn autoscaling(min: Option<i32>, max: i32) -> Autoscaling {
        Autoscaling {
            min_replicas: min,
            max_replicas: max,
            ..Default::default()
        }
    }

    #[test]
    fn story_ports_must_be_unprivileged_and_in_range() {
        assert!(validate_port(None, spec_path().child("port")).is_none());
        assert!(validate_port(Some(1024), spec_path().child("port")).is_none());
        assert!(validate_port(Some(65535), spec_path().child("port")).is_none());

        let low = validate_port(Some(80), spec_path().child("port")).unwrap();
        assert_eq!(low.detail, "must be greater than or equal to 1024");
        let high = validate_port(Some(70000), spec_path().child("port")).unwrap();
        assert_eq!(high.detail, "must be less than or equal to 65535");
    }

    #[test]
    fn story_each_bad_list_element_is_reported_at_its_index() {
        let errors = validate_port_list(&[80, 6380, 90], spec_path().child("redisShardPorts"));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["spec.redisShardPorts[0]", "spec.redisShardPorts[2]"]);
    }

    #[test]
    fn story_max_below_min_is_reported_on_max() {
        let errors = validate_autoscaling(Some(&autoscaling(Some(5), 3)));
        assert_eq!(errors.len(), 1);
        let err = errors.iter().next().unwrap();
        assert_eq!(err.field, "spec.autoscaling.maxReplicas");
        assert_eq!(err.detail, "cannot be less than spec.autoscaling.minReplicas");
    }

    #[test]
    fn story_all_autoscaling_problems_are_reported_together() {
        let bad = Autoscaling {
            min_replicas: Some(0),
            max_replicas: 0,
            average_cpu_utilization: Some(0),
            scale_down_stabilization_window_seconds: Some(-1),
        };
        let fields: Vec<String> = validate_autoscaling(Some(&bad))
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "spec.autoscaling.minReplicas",
                "spec.autoscaling.maxReplicas",
                "spec.autoscaling.averageCPUUtilization",
                "spec.autoscaling.scaleDownStabilizationWindowSeconds",
            ]
        );
        assert!(validate_autoscaling(None).is_empty());
    }

    #[test]
    fn story_valid_autoscaling_bounds_are_accepted() {
        let policies = [
            Autoscaling {
                min_replicas: Some(1),
                max_replicas: 1,
                ..Default::default()
            },
            Autoscaling {
                min_replicas: None,
                max_replicas: 1,
                ..Default::default()
            },
            Autoscaling {
                min_replicas: Some(2),
                max_replicas: 8,
                average_cpu_utilization: Some(1),
                scale_down_stabilization_window_seconds: Some(0),
            },
        ];

        for policy in &policies {
            assert!(validate_autoscaling(Some(policy)).is_empty(), "{policy:?}");
        }
    }

    #[test]
    fn story_autoscaling_requires_a_worker_cpu_request() {
        let config = ClusterConfig {
            autoscaling: Some(autoscaling(None, 3)),
            ..Default::default()
        };
        let err = validate_worker_resource_requests(&config, &WorkerConfig::default()).unwrap();
        assert_eq!(err.error_type, ErrorType::Required);
        assert_eq!(err.field, "spec.worker.resources.requests.cpu");

        assert!(
            validate_worker_resource_requests(&ClusterConfig::default(), &WorkerConfig::default())
                .is_none()
        );
    }

    #[test]
    fn story_unknown_mtls_mode_lists_valid_modes() {
        let config = ClusterConfig {
            istio_mutual_tls_mode: Some("MAYBE".to_string()),
            ..Default::default()
        };
        let err = validate_mutual_tls_mode(&config).unwrap();
        assert_eq!(err.error_type, ErrorType::NotSupported);
        for mode in ISTIO_MUTUAL_TLS_MODES {
            assert!(err.detail.contains(mode));
        }

        let strict = ClusterConfig {
            istio_mutual_tls_mode: Some("STRICT".to_string()),
            ..Default::default()
        };
        assert!(validate_mutual_tls_mode(&strict).is_none());
    }

    #[test]
    fn story_empty_mtls_mode_is_accepted() {
        let config = ClusterConfig {
            istio_mutual_tls_mode: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_mutual_tls_mode(&config).is_none());
        assert!(validate_mutual_tls_mode(&ClusterConfig::default()).is_none());
    }

    #[test]
    fn story_image_parts_are_required() {
        let missing = validate_image(None);
        assert_eq!(missing.iter().next().map(|e| e.field.as_str()), Some("spec.image"));

        let blank = OciImageDefinition::new(" ", "");
        let fields: Vec<String> = validate_image(Some(&blank)).into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["spec.image.repository", "spec.image.tag"]);
    }

    #[test]
    fn story_negative_worker_replicas_are_rejected() {
        let worker = WorkerConfig {
            replicas: Some(-1),
            ..Default::default()
        };
        let err = validate_worker_replicas(&worker).unwrap();
        assert_eq!(err.field, "spec.worker.replicas");
        assert!(validate_worker_replicas(&WorkerConfig::default()).is_none());
    }

    #[test]
    fn story_shared_defaults_only_fill_gaps() {
        let defaults = dco_common::crd::RayDefaults::default().cluster;
        let mut config = ClusterConfig::default();
        config.network_policy.enabled = Some(false);
        let mut worker = WorkerConfig {
            replicas: Some(0),
            ..Default::default()
        };

        default_cluster_config(&mut config, &mut worker, &defaults, "test");

        assert_eq!(config.image, Some(defaults.image.clone()));
        assert_eq!(worker.replicas, Some(0));
        assert_eq!(config.network_policy.enabled, Some(false));
        assert_eq!(
            config.network_policy.client_server_labels,
            Some(defaults.network_policy_labels.clone())
        );
    }
}
