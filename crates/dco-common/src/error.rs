//! Error types for the distributed-compute operator
//!
//! Errors carry the name of the cluster they concern so that a log line or an
//! admission message can be traced back to the offending object.

use thiserror::Error;

use crate::image::ImageParseError;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for cluster admission and synthesis
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error for a cluster spec
    #[error("validation error for {cluster}: {message}")]
    Validation {
        /// Name of the cluster with invalid configuration
        cluster: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.autoscaling.maxReplicas")
        field: Option<String>,
    },

    /// The cluster's image definition cannot be turned into a pullable reference
    #[error("invalid image for {cluster}: {source}")]
    Image {
        /// Name of the cluster whose image is malformed
        cluster: String,
        /// What was wrong with the image
        #[source]
        source: ImageParseError,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            cluster: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with cluster context
    pub fn validation_for(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            cluster: cluster.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with cluster context and field path
    pub fn validation_for_field(
        cluster: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            cluster: cluster.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create an image error for a cluster
    pub fn image_for(cluster: impl Into<String>, source: ImageParseError) -> Self {
        Self::Image {
            cluster: cluster.into(),
            source,
        }
    }

    /// Create a serialization error for a resource kind
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// The cluster this error concerns, if any
    pub fn cluster(&self) -> Option<&str> {
        match self {
            Self::Validation { cluster, .. } | Self::Image { cluster, .. } => Some(cluster),
            Self::Serialization { .. } => None,
        }
    }

    /// The field path this error points at, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}
