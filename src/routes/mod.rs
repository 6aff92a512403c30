pub mod contract_routes;
pub mod maintenance_routes;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::services::permissions::{Actor, Role};
use crate::utils::errors::AppError;

/// Actor autenticado desde los headers del colaborador de auth
/// (X-Company-Id, X-Role). La emisión del token queda fuera del motor.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let company_id = headers
        .get("x-company-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| AppError::Forbidden("Falta el header X-Company-Id".to_string()))?;

    let role = headers
        .get("x-role")
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .ok_or_else(|| AppError::Forbidden("Header X-Role ausente o inválido".to_string()))?;

    Ok(Actor { company_id, role })
}
