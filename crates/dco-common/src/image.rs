//! OCI image references
//!
//! Turns the structured image definition from a cluster spec into a fully
//! qualified, pullable reference. Short Docker Hub names are normalized the
//! way the container runtime does it: `ray` becomes
//! `docker.io/library/ray`, `rayproject/ray` becomes `docker.io/rayproject/ray`.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::crd::OciImageDefinition;

/// Registry used when the reference does not name one
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Namespace prepended to single-component Docker Hub repositories
pub const OFFICIAL_REPOSITORY_NAMESPACE: &str = "library";

/// Longest repository name a registry accepts
pub const MAX_NAME_LENGTH: usize = 255;

static DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])(?:\.(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]))*(?::[0-9]+)?$",
    )
    .expect("domain pattern is valid")
});

static PATH_COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").expect("path pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("tag pattern is valid"));

/// Reasons an image definition cannot be turned into a reference
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageParseError {
    /// No image definition at all
    #[error("image is not set")]
    Missing,

    /// Repository is empty or whitespace
    #[error("image repository cannot be blank")]
    EmptyRepository,

    /// Tag is empty or whitespace
    #[error("image tag cannot be blank")]
    EmptyTag,

    /// Registry host is not a valid domain with optional port
    #[error("invalid image registry {0:?}")]
    InvalidRegistry(String),

    /// Repository path does not match the distribution grammar
    #[error("invalid image repository {0:?}: path components must be lowercase alphanumerics separated by '.', '_', '__' or '-'")]
    InvalidRepository(String),

    /// Tag does not match the distribution grammar
    #[error("invalid image tag {0:?}")]
    InvalidTag(String),

    /// Normalized name is longer than registries accept
    #[error("image name {0:?} is longer than 255 characters")]
    NameTooLong(String),
}

/// Parse an image definition into a normalized `registry/repository:tag` reference
pub fn parse_image_definition(image: &OciImageDefinition) -> Result<String, ImageParseError> {
    let repository = image.repository.trim();
    if repository.is_empty() {
        return Err(ImageParseError::EmptyRepository);
    }
    let tag = image.tag.trim();
    if tag.is_empty() {
        return Err(ImageParseError::EmptyTag);
    }

    let (domain, path) = match image.registry.as_deref().map(str::trim) {
        Some(registry) if !registry.is_empty() => (registry.to_string(), repository.to_string()),
        _ => split_domain(repository),
    };

    if !DOMAIN.is_match(&domain) {
        return Err(ImageParseError::InvalidRegistry(domain));
    }
    if !path.split('/').all(|component| PATH_COMPONENT.is_match(component)) {
        return Err(ImageParseError::InvalidRepository(path));
    }
    if !TAG.is_match(tag) {
        return Err(ImageParseError::InvalidTag(tag.to_string()));
    }

    let name = format!("{domain}/{path}");
    if name.len() > MAX_NAME_LENGTH {
        return Err(ImageParseError::NameTooLong(name));
    }

    Ok(format!("{name}:{tag}"))
}

/// Split a repository that may start with a registry host
///
/// The first component is a host only when it looks like one: it contains a
/// dot or a port, or is `localhost`. Otherwise the image lives on Docker Hub.
fn split_domain(repository: &str) -> (String, String) {
    if let Some((first, rest)) = repository.split_once('/') {
        if first.contains('.') || first.contains(':') || first == "localhost" {
            return (first.to_string(), rest.to_string());
        }
    }

    let path = if repository.contains('/') {
        repository.to_string()
    } else {
        format!("{OFFICIAL_REPOSITORY_NAMESPACE}/{repository}")
    };
    (DEFAULT_REGISTRY.to_string(), path)
}
