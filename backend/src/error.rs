//! Error handling for the Warehouse Operations Backend
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// SQLSTATE codes the store raises on serialization failures and deadlocks.
/// Both are safe to retry.
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

/// SQLSTATE for unique-constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Cycle lifecycle errors
    #[error("No counting cycle is open")]
    StageInactive,

    #[error("Stage transition out of order: stage is {current}, requested {requested}")]
    OutOfOrder { current: i16, requested: i16 },

    // Session errors
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Counting errors
    #[error("Item {item_code} is not on the stage {stage} recount list")]
    NotOnRecount { item_code: String, stage: i16 },

    #[error("Item {0} not found in the item master")]
    UnknownItem(String),

    #[error("Location {0} is closed for this session")]
    LocationClosed(String),

    #[error("Location {0} is not closed")]
    NotClosed(String),

    #[error("Invalid quantity: {0}")]
    InvalidQty(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Flat-file errors
    #[error("Item master error: {0}")]
    ItemMaster(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the caller may retry the operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Conflict(_) => true,
            AppError::DatabaseError(e) => sqlstate_of(e)
                .map(|code| RETRYABLE_SQLSTATES.contains(&code.as_str()))
                .unwrap_or(false),
            _ => false,
        }
    }
}

fn sqlstate_of(e: &sqlx::Error) -> Option<String> {
    e.as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.to_string())
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
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let (status, error_detail) = match &self {
            AppError::StageInactive => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "STAGE_INACTIVE".to_string(),
                    message_en: "No counting cycle is currently open".to_string(),
                    message_es: "No hay un ciclo de conteo abierto".to_string(),
                    field: None,
                    retryable,
                },
            ),
            AppError::OutOfOrder { current, requested } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "STAGE_OUT_OF_ORDER".to_string(),
                    message_en: format!(
                        "Stages advance one at a time: current stage is {}, requested {}",
                        current, requested
                    ),
                    message_es: format!(
                        "Las etapas avanzan de una en una: la etapa actual es {}, se pidió {}",
                        current, requested
                    ),
                    field: None,
                    retryable,
                },
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "FORBIDDEN".to_string(),
                    message_en: msg.clone(),
                    message_es: "No tiene permiso para esta operación".to_string(),
                    field: None,
                    retryable,
                },
            ),
            AppError::NotOnRecount { item_code, stage } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "NOT_ON_RECOUNT_LIST".to_string(),
                    message_en: format!(
                        "Item {} is not on the recount list for stage {}",
                        item_code, stage
                    ),
                    message_es: format!(
                        "El artículo {} no está en la lista de reconteo de la etapa {}",
                        item_code, stage
                    ),
                    field: None,
                    retryable,
                },
            ),
            AppError::UnknownItem(code) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "UNKNOWN_ITEM".to_string(),
                    message_en: format!("Item {} not found in the item master", code),
                    message_es: format!("Artículo {} no encontrado en el maestro", code),
                    field: None,
                    retryable,
                },
            ),
            AppError::LocationClosed(location) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "LOCATION_CLOSED".to_string(),
                    message_en: format!("Location {} is closed for this session", location),
                    message_es: format!("La ubicación {} está cerrada en esta sesión", location),
                    field: None,
                    retryable,
                },
            ),
            AppError::NotClosed(location) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "LOCATION_NOT_CLOSED".to_string(),
                    message_en: format!("Location {} is not closed", location),
                    message_es: format!("La ubicación {} no está cerrada", location),
                    field: None,
                    retryable,
                },
            ),
            AppError::InvalidQty(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_QTY".to_string(),
                    message_en: msg.clone(),
                    message_es: "Cantidad inválida".to_string(),
                    field: Some("counted_qty".to_string()),
                    retryable,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_es,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(field.clone()),
                    retryable,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_es: format!("No se encontró {}", resource),
                    field: None,
                    retryable,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: msg.clone(),
                    message_es: "Operación concurrente en conflicto, reintente".to_string(),
                    field: None,
                    retryable,
                },
            ),
            AppError::ItemMaster(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "ITEM_MASTER_ERROR".to_string(),
                    message_en: format!("Item master error: {}", msg),
                    message_es: format!("Error en el maestro de artículos: {}", msg),
                    field: None,
                    retryable,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message_en: format!("Configuration error: {}", msg),
                    message_es: format!("Error de configuración: {}", msg),
                    field: None,
                    retryable,
                },
            ),
            AppError::DatabaseError(e) => {
                let sqlstate = sqlstate_of(e);
                if sqlstate.as_deref() == Some(UNIQUE_VIOLATION)
                    || retryable
                {
                    (
                        StatusCode::CONFLICT,
                        ErrorDetail {
                            code: "CONFLICT".to_string(),
                            message_en: "A concurrent operation conflicted with this request"
                                .to_string(),
                            message_es: "Una operación concurrente entró en conflicto".to_string(),
                            field: None,
                            retryable: true,
                        },
                    )
                } else {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorDetail {
                            code: "DATABASE_ERROR".to_string(),
                            message_en: "A database error occurred".to_string(),
                            message_es: "Ocurrió un error de base de datos".to_string(),
                            field: None,
                            retryable,
                        },
                    )
                }
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                    retryable,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                    retryable,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_retryable() {
        assert!(AppError::Conflict("try again".into()).is_retryable());
        assert!(!AppError::StageInactive.is_retryable());
        assert!(!AppError::NotFound("Session".into()).is_retryable());
    }
}
