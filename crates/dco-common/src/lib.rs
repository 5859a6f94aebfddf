//! Common types for the distributed-compute operator: CRDs, naming, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod image;
pub mod metadata;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Value of the `app.kubernetes.io/managed-by` label on everything we create
pub const MANAGED_BY: &str = "distributed-compute-operator";
