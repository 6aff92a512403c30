//! Sistema de manejo de errores
//!
//! Este módulo define la taxonomía de errores del motor de contratos
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ContractStatus;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Violación cross-tenant: la entidad existe pero pertenece a otra
    /// empresa. Hacia afuera se responde como NotFound para no filtrar
    /// datos de otros tenants.
    #[error("Cross-tenant violation: {0}")]
    CrossTenantViolation(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    /// Conflicto de reserva: el rango pedido se solapa con un contrato
    /// ocupante existente. Incluye el contrato y el rango en conflicto
    /// para que el cliente pueda mostrar un mensaje accionable.
    #[error("Booking conflict with contract {contract_number} ({start_date} - {end_date})")]
    BookingConflict {
        contract_id: Uuid,
        contract_number: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },

    #[error("Vehicle not available: {0}")]
    VehicleNotAvailable(String),

    #[error("Driver not eligible: {0}")]
    DriverNotEligible(String),

    #[error("Illegal state transition: {from} -> {to}")]
    IllegalStateTransition {
        from: ContractStatus,
        to: ContractStatus,
    },

    /// Fallo de compare-and-set sobre status: otro caller ganó la carrera.
    #[error("Contract was modified concurrently")]
    ConcurrentModification,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Database Error".to_string(),
                        message: "An error occurred while accessing the database".to_string(),
                        details: None,
                        code: Some("DB_ERROR".to_string()),
                    },
                )
            }

            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: msg,
                    details: None,
                    code: Some("VALIDATION_ERROR".to_string()),
                },
            ),

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: msg,
                    details: None,
                    code: Some("NOT_FOUND".to_string()),
                },
            ),

            // Mismo cuerpo que NotFound: no confirmar que la entidad existe
            // en otro tenant. El detalle queda solo en el log.
            AppError::CrossTenantViolation(msg) => {
                tracing::warn!("Cross-tenant access attempt: {}", msg);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse {
                        error: "Not Found".to_string(),
                        message: "Resource not found".to_string(),
                        details: None,
                        code: Some("NOT_FOUND".to_string()),
                    },
                )
            }

            AppError::InvalidDateRange(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Invalid Date Range".to_string(),
                    message: msg,
                    details: None,
                    code: Some("INVALID_DATE_RANGE".to_string()),
                },
            ),

            AppError::BookingConflict {
                contract_id,
                contract_number,
                start_date,
                end_date,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "Booking Conflict".to_string(),
                    message: format!(
                        "El rango solicitado se solapa con el contrato {} ({} - {})",
                        contract_number, start_date, end_date
                    ),
                    details: Some(json!({
                        "conflicting_contract_id": contract_id,
                        "conflicting_contract_number": contract_number,
                        "conflicting_start_date": start_date,
                        "conflicting_end_date": end_date,
                    })),
                    code: Some("BOOKING_CONFLICT".to_string()),
                },
            ),

            AppError::VehicleNotAvailable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: "Vehicle Not Available".to_string(),
                    message: msg,
                    details: None,
                    code: Some("VEHICLE_NOT_AVAILABLE".to_string()),
                },
            ),

            AppError::DriverNotEligible(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: "Driver Not Eligible".to_string(),
                    message: msg,
                    details: None,
                    code: Some("DRIVER_NOT_ELIGIBLE".to_string()),
                },
            ),

            AppError::IllegalStateTransition { from, to } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "Illegal State Transition".to_string(),
                    message: format!("No se puede pasar un contrato de {} a {}", from, to),
                    details: Some(json!({ "from": from, "to": to })),
                    code: Some("ILLEGAL_STATE_TRANSITION".to_string()),
                },
            ),

            AppError::ConcurrentModification => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "Concurrent Modification".to_string(),
                    message: "The contract was modified by another request, please retry"
                        .to_string(),
                    details: None,
                    code: Some("CONCURRENT_MODIFICATION".to_string()),
                },
            ),

            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: "Forbidden".to_string(),
                    message: msg,
                    details: None,
                    code: Some("FORBIDDEN".to_string()),
                },
            ),

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: "An unexpected error occurred".to_string(),
                        details: None,
                        code: Some("INTERNAL_ERROR".to_string()),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}
