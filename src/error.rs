//! Typed errors and HTTP mapping.

use crate::model::EntityType;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    #[error("inconsistent relation {source_type}/{relation}: {reason}")]
    InconsistentRelation {
        source_type: EntityType,
        relation: &'static str,
        reason: String,
    },
    #[error("config load: {0}")]
    Load(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),
    #[error("{entity_type} not found: {id}")]
    EntityNotFound { entity_type: EntityType, id: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to parse filter parameter: {0}")]
    FilterParse(String),
    #[error("{method} is not allowed on nested resource path {path}")]
    MethodNotAllowedOnNestedPath { method: String, path: String },
    #[error("unresolvable nested resource path: {0}")]
    UnresolvableNestedPath(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("backend: {0}")]
    Backend(String),
}

impl AppError {
    pub fn entity_not_found(entity_type: EntityType, id: impl ToString) -> Self {
        AppError::EntityNotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_and_code().0
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::UnknownEntityType(_) => (StatusCode::INTERNAL_SERVER_ERROR, "unknown_entity_type"),
            AppError::EntityNotFound { .. } | AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::FilterParse(_) => (StatusCode::UNPROCESSABLE_ENTITY, "filter_parse_error"),
            AppError::MethodNotAllowedOnNestedPath { .. } => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
            AppError::UnresolvableNestedPath(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, "backend_error"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
