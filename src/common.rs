/// Constants shared across the crate.
pub(crate) mod constants;

/// Crate-wide error types.
pub(crate) mod error;

/// Kubernetes API client helpers.
pub(crate) mod kube_client;

/// Macros.
pub(crate) mod macros;
