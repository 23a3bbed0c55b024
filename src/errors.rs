// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error taxonomy for the DNS reconciliation controller.
//!
//! This module provides the typed error hierarchy used across every layer of
//! the controller: config loading, template evaluation, and the inventory /
//! DNS backend HTTP clients. Each variant carries enough structured context
//! to serialize into the uniform `{success: false, error}` JSON envelope at
//! the trigger boundary (see [`crate::trigger`]).
//!
//! Low-level components raise the specific error kind; the trigger layer is
//! the only place that maps an [`Error`] to an HTTP status code.

use thiserror::Error;

/// Field-path-qualified validation failure accumulated while checking a
/// [`crate::config::Config`] document or a single template string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct FieldError {
    /// Dotted path to the offending field, e.g. `namedCidrLists[0].cidrs`.
    pub path: String,
    /// Human-readable explanation of what is invalid.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Schema/input validation failure. Surfaces at config writes and template
/// parsing. Maps to HTTP 400.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed: {0:?}")]
pub struct ValidationError(pub Vec<FieldError>);

impl ValidationError {
    /// Build a validation error from a single field failure.
    #[must_use]
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(path, message)])
    }

    /// `true` if no field errors were accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Required configuration missing or semantically invalid (e.g. a named
/// CIDR list with no ranges). Maps to HTTP 500 at startup, HTTP 400 on a
/// user-facing save.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No configuration document exists yet for this owner-id.
    #[error("no configuration found for owner '{owner_id}'")]
    NotFound {
        /// The owner-id that was looked up.
        owner_id: String,
    },

    /// The document failed schema validation before being persisted.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    /// A named CIDR list is referenced by a template but does not exist.
    #[error("named CIDR list '{name}' referenced by task '{task_id}' does not exist")]
    UnknownCidrList {
        /// The missing list name.
        name: String,
        /// The task whose template referenced it.
        task_id: String,
    },

    /// Deletion was attempted on a CIDR list still referenced by a template.
    #[error("CIDR list '{name}' is still referenced by task '{task_id}' and cannot be deleted")]
    CidrListInUse {
        /// The list that was targeted for deletion.
        name: String,
        /// The task whose template still references it.
        task_id: String,
    },
}

/// The upstream service an [`ApiError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// The mesh/VPN inventory source.
    Inventory,
    /// The cloud DNS backend.
    Dns,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Inventory => write!(f, "inventory"),
            Service::Dns => write!(f, "dns"),
        }
    }
}

/// An upstream API call (inventory or DNS backend) failed. Maps to HTTP 502.
/// Carries the service name and the upstream status code when known.
#[derive(Error, Debug, Clone)]
#[error("{service} API error: {message}{status}", status = status_code.map(|c| format!(" (HTTP {c})")).unwrap_or_default())]
pub struct ApiError {
    /// Which upstream service failed.
    pub service: Service,
    /// Upstream HTTP status code, if one was received.
    pub status_code: Option<u16>,
    /// Human-readable explanation.
    pub message: String,
}

impl ApiError {
    /// Construct an API error for a known HTTP status.
    pub fn with_status(service: Service, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            service,
            status_code: Some(status_code),
            message: message.into(),
        }
    }

    /// Construct an API error for a connection failure (no status received).
    pub fn connection(service: Service, message: impl Into<String>) -> Self {
        Self {
            service,
            status_code: None,
            message: message.into(),
        }
    }

    /// `true` if this failure is transient and a subsequent sync attempt is
    /// expected to succeed without operator intervention (429 and 5xx).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self.status_code {
            Some(code) => code == 429 || (500..600).contains(&code),
            None => true,
        }
    }
}

/// Generic recoverable failure that does not fit the other categories.
/// Maps to HTTP 500.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct AppError(pub String);

/// The unified error type returned by every fallible operation in this
/// crate above the HTTP-client layer.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`ApiError`].
    #[error(transparent)]
    Api(#[from] ApiError),

    /// See [`AppError`].
    #[error(transparent)]
    App(#[from] AppError),
}

impl Error {
    /// Map this error to the HTTP status code the trigger layer should use
    /// for the JSON error envelope (see `spec.md` §7).
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Config(ConfigError::Invalid(_)) => 400,
            Error::Config(_) => 400,
            Error::Api(_) => 502,
            Error::App(_) => 500,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::App(AppError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_status_mapping() {
        let e = Error::from(ApiError::with_status(Service::Dns, 503, "boom"));
        assert_eq!(e.status_code(), 502);
    }

    #[test]
    fn validation_error_status_mapping() {
        let e = Error::from(ValidationError::single("cidrs", "must not be empty"));
        assert_eq!(e.status_code(), 400);
    }

    #[test]
    fn transient_classification() {
        assert!(ApiError::with_status(Service::Inventory, 503, "x").is_transient());
        assert!(ApiError::with_status(Service::Inventory, 429, "x").is_transient());
        assert!(!ApiError::with_status(Service::Inventory, 404, "x").is_transient());
        assert!(ApiError::connection(Service::Inventory, "refused").is_transient());
    }
}
