//! Unified application error model and mapping helpers.
//! Every failure the handler can produce ends up as an `AppError`, which knows its
//! HTTP status and how to render itself as the JSON body returned to the caller.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::drive::DriveError;

/// Body returned for rejected origins. Kept verbatim for front ends that match on it.
pub const CORS_ERROR_MESSAGE: &str = "CORS error";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    AccessDenied { code: String, message: String },
    NotFound { code: String, message: String, status: u16 },
    Upstream { code: String, message: String, status: u16 },
    Config { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::AccessDenied { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Upstream { code, .. }
            | AppError::Config { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::AccessDenied { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Upstream { message, .. }
            | AppError::Config { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn access_denied() -> Self { AppError::AccessDenied { code: "cors".into(), message: CORS_ERROR_MESSAGE.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into(), status: 404 } }
    pub fn upstream<S: Into<String>>(code: S, msg: S) -> Self { AppError::Upstream { code: code.into(), message: msg.into(), status: 500 } }
    pub fn config<S: Into<String>>(code: S, msg: S) -> Self { AppError::Config { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Override the status of the deployment-dependent kinds (not-found and upstream).
    /// Other kinds keep their fixed status.
    pub fn with_status(self, new_status: u16) -> Self {
        match self {
            AppError::NotFound { code, message, .. } => AppError::NotFound { code, message, status: new_status },
            AppError::Upstream { code, message, .. } => AppError::Upstream { code, message, status: new_status },
            other => other,
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::AccessDenied { .. } => 401,
            AppError::NotFound { status, .. } => *status,
            AppError::Upstream { status, .. } => *status,
            AppError::Config { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }

    /// JSON body sent back to the caller.
    pub fn to_body(&self) -> serde_json::Value {
        match self {
            AppError::AccessDenied { .. } => serde_json::json!({ "error": CORS_ERROR_MESSAGE }),
            other => serde_json::json!({ "error": other.message(), "code": other.code_str() }),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<DriveError> for AppError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::NotFound(what) => AppError::not_found("file_not_found".to_string(), format!("file not found: {what}")),
            other => AppError::upstream("upstream_error".to_string(), other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
