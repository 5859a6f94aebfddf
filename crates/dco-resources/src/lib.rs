//! Kubernetes object synthesis for distributed-compute clusters
//!
//! Each framework module describes its roles as [`RoleStrategy`] values; the
//! generic builders turn a cluster plus a strategy into typed objects. Nothing
//! here talks to the API server.

#![deny(missing_docs)]

pub mod autoscaler;
mod compiled;
pub mod dask;
mod meta;
pub mod network_policy;
pub mod ray;
pub mod service;
pub mod service_account;
pub mod spark;
pub mod statefulset;
pub mod strategy;

pub use compiled::ClusterResources;
pub use statefulset::build_stateful_set;
pub use strategy::RoleStrategy;
