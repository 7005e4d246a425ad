//! Error types for the scoring API.

use thiserror::Error;

use crate::rpc::{FORBIDDEN, INTERNAL_ERROR, INVALID_REQUEST};

/// A single field failed its contract
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field}: {kind} {reason}")]
pub struct FieldError {
    pub field: String,
    /// Name of the field kind, e.g. `PhoneField`
    pub kind: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &str, kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    MissingField,
    FieldInvalid,
    CrossFieldInvalid,
    UnknownMethod,
}

/// Request-level validation failure
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationKind,
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn missing_field(field: &str) -> Self {
        Self {
            kind: ValidationKind::MissingField,
            field: Some(field.to_string()),
            message: format!("{}: field is required", field),
        }
    }

    pub fn cross_field(message: impl Into<String>) -> Self {
        Self {
            kind: ValidationKind::CrossFieldInvalid,
            field: None,
            message: message.into(),
        }
    }

    pub fn unknown_method(name: &str) -> Self {
        Self {
            kind: ValidationKind::UnknownMethod,
            field: None,
            message: format!("Method '{}' not found", name),
        }
    }
}

impl From<FieldError> for ValidationError {
    fn from(err: FieldError) -> Self {
        Self {
            kind: ValidationKind::FieldInvalid,
            field: Some(err.field.clone()),
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Forbidden")]
pub struct AuthError;

/// Failure reported by the store collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record for {key}: {reason}")]
    Malformed { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FieldError> for ApiError {
    fn from(err: FieldError) -> Self {
        ApiError::Validation(err.into())
    }
}

impl ApiError {
    pub fn code(&self) -> u16 {
        match self {
            ApiError::Validation(_) => INVALID_REQUEST,
            ApiError::Auth(_) => FORBIDDEN,
            ApiError::Store(_) | ApiError::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Message safe to hand back to the caller.
    ///
    /// Store and internal failures are reduced to `None` so that the
    /// default reason for the status code is used instead.
    pub fn public_message(&self) -> Option<String> {
        match self {
            ApiError::Validation(e) => Some(e.to_string()),
            ApiError::Auth(e) => Some(e.to_string()),
            ApiError::Store(_) | ApiError::Internal(_) => None,
        }
    }
}
