//! Admission governance for distributed-compute clusters
//!
//! Two stages run on every create and update: [`Defaulter`] fills unset fields
//! with documented defaults, then [`Validator`] checks the result and reports
//! every violation with its field path. [`webhook`] adapts both to Kubernetes
//! admission reviews.

#![deny(missing_docs)]

mod dask;
pub mod field;
mod ray;
pub mod rules;
mod spark;
pub mod webhook;

pub use field::{ErrorList, ErrorType, FieldError, FieldPath};

/// Fills unset fields with defaults
///
/// Defaulting returns a new value, never fails, only touches absent fields and
/// is idempotent: `x.defaulted().defaulted() == x.defaulted()`.
pub trait Defaulter: Sized {
    /// Values substituted for unset fields
    type Defaults: Default;

    /// Apply the given defaults
    fn defaulted_with(&self, defaults: &Self::Defaults) -> Self;

    /// Apply the documented defaults
    fn defaulted(&self) -> Self {
        self.defaulted_with(&Self::Defaults::default())
    }
}

/// Checks an object against every admission rule
///
/// All rules run; the returned list holds every violation in rule order.
pub trait Validator {
    /// `Ok` when the object is acceptable
    fn validate(&self) -> Result<(), ErrorList>;
}
