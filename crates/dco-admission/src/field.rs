//! Field-pathed validation errors
//!
//! Messages render the way the Kubernetes API server renders its own field
//! errors, e.g. `spec.port: Invalid value: 80: must be greater than or equal to 1024`.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Dotted path to a field, with `[i]` for list elements
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    /// Root path, usually `spec`
    pub fn new(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    /// Path to a named child field
    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }

    /// Path to a list element
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    /// The rendered path
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of a field error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorType {
    /// Value present but outside its allowed range or shape
    Invalid,
    /// Value absent or blank where one is needed
    Required,
    /// Value not among an enumerated set
    NotSupported,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Invalid => "Invalid value",
            Self::Required => "Required value",
            Self::NotSupported => "Unsupported value",
        })
    }
}

/// One rejected field
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{field}: {error_type}{}: {detail}", render_value(.bad_value))]
pub struct FieldError {
    /// Category
    pub error_type: ErrorType,
    /// Path of the rejected field
    pub field: String,
    /// Offending value, absent for required fields
    pub bad_value: Option<Value>,
    /// Human-readable reason
    pub detail: String,
}

fn render_value(value: &Option<Value>) -> String {
    match value {
        Some(value) => format!(": {value}"),
        None => String::new(),
    }
}

impl FieldError {
    /// Value present but not acceptable
    pub fn invalid(path: &FieldPath, value: impl Into<Value>, detail: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Invalid,
            field: path.to_string(),
            bad_value: Some(value.into()),
            detail: detail.into(),
        }
    }

    /// Value missing
    pub fn required(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Required,
            field: path.to_string(),
            bad_value: None,
            detail: detail.into(),
        }
    }

    /// Value outside an enumerated set; the detail lists every valid value
    pub fn not_supported(path: &FieldPath, value: impl Into<Value>, valid: &[&str]) -> Self {
        let quoted: Vec<String> = valid.iter().map(|v| format!("{v:?}")).collect();
        Self {
            error_type: ErrorType::NotSupported,
            field: path.to_string(),
            bad_value: Some(value.into()),
            detail: format!("supported values: {}", quoted.join(", ")),
        }
    }
}

/// Every error found while validating one object, in rule order
#[derive(Clone, Debug, Default, PartialEq, Error)]
#[error("[{}]", join(.0))]
pub struct ErrorList(Vec<FieldError>);

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ErrorList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Record an error when a rule produced one
    pub fn push_opt(&mut self, error: Option<FieldError>) {
        self.0.extend(error);
    }

    /// Append another list
    pub fn append(&mut self, mut other: ErrorList) {
        self.0.append(&mut other.0);
    }

    /// Number of errors
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no rule failed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Errors in the order they were found
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// `Ok` when empty, the list itself otherwise
    pub fn into_result(self) -> Result<(), ErrorList> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Collapse into a single operator error for the named cluster
    ///
    /// The field is kept only when exactly one field was rejected.
    pub fn into_error(self, cluster: impl Into<String>) -> dco_common::Error {
        let message = self.to_string();
        match self.0.as_slice() {
            [only] => {
                dco_common::Error::validation_for_field(cluster, only.field.clone(), message)
            }
            _ => dco_common::Error::validation_for(cluster, message),
        }
    }
}

impl From<Vec<FieldError>> for ErrorList {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_paths_nest_children_and_indexes() {
        let spec = FieldPath::new("spec");
        assert_eq!(spec.child("redisShardPorts").index(1).as_str(), "spec.redisShardPorts[1]");
        assert_eq!(
            spec.child("autoscaling").child("maxReplicas").to_string(),
            "spec.autoscaling.maxReplicas"
        );
    }

    #[test]
    fn story_errors_render_like_the_api_server() {
        let port = FieldPath::new("spec").child("port");
        let invalid = FieldError::invalid(&port, 80, "must be greater than or equal to 1024");
        assert_eq!(
            invalid.to_string(),
            "spec.port: Invalid value: 80: must be greater than or equal to 1024"
        );

        let image = FieldPath::new("spec").child("image");
        let required = FieldError::required(&image, "is required");
        assert_eq!(required.to_string(), "spec.image: Required value: is required");
    }

    #[test]
    fn story_unsupported_values_list_every_option() {
        let path = FieldPath::new("spec").child("istioMutualTLSMode");
        let err = FieldError::not_supported(&path, "BOGUS", &["DISABLE", "STRICT"]);
        assert_eq!(
            err.to_string(),
            r#"spec.istioMutualTLSMode: Unsupported value: "BOGUS": supported values: "DISABLE", "STRICT""#
        );
    }

    #[test]
    fn story_empty_list_is_acceptance() {
        assert_eq!(ErrorList::new().into_result(), Ok(()));

        let mut errors = ErrorList::new();
        errors.push_opt(None);
        assert!(errors.is_empty());
        errors.push(FieldError::required(&FieldPath::new("spec").child("image"), "is required"));
        assert_eq!(errors.clone().into_result(), Err(errors));
    }

    #[test]
    fn story_single_error_keeps_its_field_when_collapsed() {
        let path = FieldPath::new("spec").child("port");
        let errors = ErrorList::from(vec![FieldError::invalid(&path, 80, "too low")]);
        let err = errors.into_error("test");

        assert_eq!(err.field(), Some("spec.port"));
        assert_eq!(err.cluster(), Some("test"));
        assert!(err.to_string().contains("spec.port: Invalid value: 80: too low"));
    }

    #[test]
    fn story_several_errors_collapse_without_a_field() {
        let spec = FieldPath::new("spec");
        let errors = ErrorList::from(vec![
            FieldError::invalid(&spec.child("port"), 80, "too low"),
            FieldError::required(&spec.child("image"), "is required"),
        ]);
        let err = errors.into_error("test");

        assert_eq!(err.field(), None);
        assert_eq!(err.cluster(), Some("test"));
        assert!(err.to_string().contains("spec.image: Required value: is required"));
    }
}
