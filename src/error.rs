// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Business rules a request can break. Always reported as 400 with a
/// human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("You can only hold up to {max} challenges at once")]
    LimitExceeded { max: usize },

    #[error("Shop {0} is already in your challenge list")]
    DuplicateTarget(u64),

    #[error("You have no active challenge")]
    NoActiveSession,

    #[error("Shop {0} is not in your challenge list")]
    NotInList(u64),

    #[error("Not enough points (have {balance}, need {required})")]
    InsufficientPoints { balance: u64, required: u64 },
}

impl RuleViolation {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            RuleViolation::LimitExceeded { .. } => "limit_exceeded",
            RuleViolation::DuplicateTarget(_) => "duplicate_target",
            RuleViolation::NoActiveSession => "no_active_session",
            RuleViolation::NotInList(_) => "not_in_list",
            RuleViolation::InsufficientPoints { .. } => "insufficient_points",
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error, details) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None)
            }
            AppError::Rule(rule) => (StatusCode::BAD_REQUEST, rule.code(), rule.to_string(), None),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "The operation could not be completed".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error,
            code,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
