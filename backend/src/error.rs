//! Error handling for the Irrigation Uniformity Platform
//!
//! Provides consistent error responses in English and Portuguese

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::UniformityError;
use thiserror::Error;

use crate::store::StoreError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Invalid request: {message}")]
    InvalidRequest {
        field: String,
        message: String,
        message_pt: String,
    },

    #[error(transparent)]
    Uniformity(#[from] UniformityError),

    // Lookup errors
    #[error("Target irrigation unit not found: {0}")]
    TargetNotFound(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_pt: String,
    },

    // Persistence errors
    #[error("Operation failed: {0}")]
    OperationFailed(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>, message_pt: impl Into<String>) -> Self {
        AppError::InvalidRequest {
            field: field.into(),
            message: message.into(),
            message_pt: message_pt.into(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<&&'static str> = field_errors.keys().collect();
        fields.sort();

        let field = fields.first().map(|f| f.to_string()).unwrap_or_default();
        let detail = field_errors
            .get(field.as_str())
            .and_then(|errs| errs.first())
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .unwrap_or_else(|| "invalid".to_string());

        AppError::InvalidRequest {
            message: format!("Invalid value for '{}': {}", field, detail),
            message_pt: format!("Valor inválido no campo '{}': {}", field, detail),
            field,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_pt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: msg.clone(),
                    message_pt: "Não autorizado".to_string(),
                    field: None,
                },
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "FORBIDDEN".to_string(),
                    message_en: msg.clone(),
                    message_pt: "Você não tem permissão para esta operação".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidRequest {
                field,
                message,
                message_pt,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_REQUEST".to_string(),
                    message_en: message.clone(),
                    message_pt: message_pt.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::Uniformity(UniformityError::InvalidMeasurement(msg)) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_MEASUREMENT".to_string(),
                    message_en: format!("Invalid measurement: {}", msg),
                    message_pt: format!("Medição inválida: {}", msg),
                    field: None,
                },
            ),
            AppError::Uniformity(UniformityError::EmptyMeasurementSet) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "EMPTY_MEASUREMENT_SET".to_string(),
                    message_en: "At least one flow rate is required".to_string(),
                    message_pt: "Informe ao menos uma vazão".to_string(),
                    field: None,
                },
            ),
            AppError::Uniformity(UniformityError::DivisionByZero) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "DIVISION_BY_ZERO".to_string(),
                    message_en: "Mean flow rate is zero, uniformity is undefined".to_string(),
                    message_pt: "A vazão média é zero, a uniformidade não pode ser calculada"
                        .to_string(),
                    field: None,
                },
            ),
            AppError::TargetNotFound(what) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "TARGET_NOT_FOUND".to_string(),
                    message_en: format!("Irrigation unit {} not found", what),
                    message_pt: format!("Unidade de irrigação {} não encontrada", what),
                    field: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_pt: format!("{} não encontrado(a)", resource),
                    field: None,
                },
            ),
            AppError::Conflict {
                message,
                message_pt,
                ..
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_pt: message_pt.clone(),
                    field: None,
                },
            ),
            AppError::OperationFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "OPERATION_FAILED".to_string(),
                    message_en: "The operation could not be completed".to_string(),
                    message_pt: "Não foi possível concluir a operação".to_string(),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message_en: format!("Configuration error: {}", msg),
                    message_pt: format!("Erro de configuração: {}", msg),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_pt: "Erro interno do servidor".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_pt: "Erro interno do servidor".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
