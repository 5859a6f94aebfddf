//! Admission review adapter
//!
//! Pure functions mapping admission requests for any cluster kind onto the
//! [`Defaulter`] and [`Validator`] stages. Serving them over HTTPS is left to
//! the hosting binary.

use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::{Resource, ResourceExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::field::ErrorList;
use crate::{Defaulter, Validator};

/// Handle a mutating admission review
pub fn review_mutation<K>(review: AdmissionReview<K>) -> AdmissionReview<DynamicObject>
where
    K: Resource<DynamicType = ()> + Defaulter + Serialize,
{
    let request: AdmissionRequest<K> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return AdmissionResponse::invalid(e.to_string()).into_review();
        }
    };
    mutate(&request).into_review()
}

/// Handle a validating admission review
pub fn review_validation<K>(review: AdmissionReview<K>) -> AdmissionReview<DynamicObject>
where
    K: Resource<DynamicType = ()> + Validator,
{
    let request: AdmissionRequest<K> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return AdmissionResponse::invalid(e.to_string()).into_review();
        }
    };
    validate(&request).into_review()
}

/// Default the submitted object and answer with a JSON patch of the changes
///
/// Objects that need no defaults are allowed without a patch.
pub fn mutate<K>(request: &AdmissionRequest<K>) -> AdmissionResponse
where
    K: Resource<DynamicType = ()> + Defaulter + Serialize,
{
    let uid = request.uid.clone();
    let Some(obj) = admitted_object(request) else {
        return AdmissionResponse::from(request);
    };

    let defaulted = obj.defaulted();
    let (original, updated) = match (serde_json::to_value(obj), serde_json::to_value(&defaulted)) {
        (Ok(original), Ok(updated)) => (original, updated),
        (Err(e), _) | (_, Err(e)) => {
            error!(uid = %uid, error = %e, "Failed to serialize object for defaulting");
            return AdmissionResponse::from(request).deny(format!("serialization error: {e}"));
        }
    };

    let patch = json_patch::diff(&original, &updated);
    if patch.0.is_empty() {
        debug!(uid = %uid, cluster = %obj.name_any(), "Nothing to default");
        return AdmissionResponse::from(request);
    }

    info!(
        uid = %uid,
        cluster = %obj.name_any(),
        patch_ops = patch.0.len(),
        "Applying defaults"
    );

    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => response,
        Err(e) => {
            error!(uid = %uid, error = %e, "Failed to serialize patch");
            AdmissionResponse::from(request).deny(format!("patch serialization error: {e}"))
        }
    }
}

/// Check the submitted object, denying it with every field error when invalid
pub fn validate<K>(request: &AdmissionRequest<K>) -> AdmissionResponse
where
    K: Resource<DynamicType = ()> + Validator,
{
    let Some(obj) = admitted_object(request) else {
        return AdmissionResponse::from(request);
    };

    match obj.validate() {
        Ok(()) => AdmissionResponse::from(request),
        Err(errors) => {
            let name = obj.name_any();
            warn!(
                uid = %request.uid,
                cluster = %name,
                errors = errors.len(),
                "Rejecting invalid cluster"
            );
            AdmissionResponse::from(request).deny(invalid_message::<K>(&name, &errors))
        }
    }
}

/// The object to act on, or `None` when the request should pass untouched
fn admitted_object<K: Resource>(request: &AdmissionRequest<K>) -> Option<&K> {
    if matches!(request.operation, Operation::Delete | Operation::Connect) {
        debug!(uid = %request.uid, operation = ?request.operation, "Allowing operation unchanged");
        return None;
    }
    request.object.as_ref()
}

/// `RayCluster.distributed-compute.dominodatalab.com "name" is invalid: [...]`
fn invalid_message<K: Resource<DynamicType = ()>>(name: &str, errors: &ErrorList) -> String {
    format!(
        "{}.{} {name:?} is invalid: {errors}",
        K::kind(&()),
        K::group(&())
    )
}
