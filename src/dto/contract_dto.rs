//! DTOs del contrato de alquiler

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Assignment, ContractStatus, RentalContract};

/// Assignment pedido dentro del alta o el attach
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub agreed_rate: Decimal,
}

/// Request para crear un contrato
#[derive(Debug, Deserialize, Validate)]
pub struct CreateContractRequest {
    pub client_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[validate(length(max = 50))]
    pub assignments: Vec<AssignmentRequest>,
}

/// Request para transicionar el estado
#[derive(Debug, Deserialize, Validate)]
pub struct TransitionRequest {
    pub target_status: ContractStatus,

    #[validate(length(min = 1, max = 500))]
    pub reason: Option<String>,
}

/// Request para actualizar las fechas del contrato
#[derive(Debug, Deserialize)]
pub struct UpdateDatesRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Response de assignment
#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub agreed_rate: Decimal,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            contract_id: assignment.contract_id,
            vehicle_id: assignment.vehicle_id,
            driver_id: assignment.driver_id,
            agreed_rate: assignment.agreed_rate,
        }
    }
}

/// Response de contrato con los hechos derivados de solo lectura
#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub id: Uuid,
    pub contract_number: String,
    pub client_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ContractStatus,
    pub actual_end_date: Option<String>,
    pub cancellation_reason: Option<String>,
    pub duration_days: i64,
    pub remaining_days: i64,
    pub is_overdue: bool,
    pub is_early_return: bool,
    pub assignments: Vec<AssignmentResponse>,
}

impl ContractResponse {
    pub fn from_parts(contract: RentalContract, assignments: Vec<Assignment>) -> Self {
        let today = Utc::now().date_naive();
        Self {
            id: contract.id,
            contract_number: contract.contract_number.clone(),
            client_id: contract.client_id,
            start_date: contract.start_date,
            end_date: contract.end_date,
            status: contract.status,
            actual_end_date: contract.actual_end_date.map(|d| d.to_rfc3339()),
            cancellation_reason: contract.cancellation_reason.clone(),
            duration_days: contract.duration_days(),
            remaining_days: contract.remaining_days(today),
            is_overdue: contract.status == ContractStatus::Overdue
                || (contract.status == ContractStatus::Active && contract.is_expired(today)),
            is_early_return: contract.is_early_return(),
            assignments: assignments.into_iter().map(AssignmentResponse::from).collect(),
        }
    }
}

/// Request para la purga manual
#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub retention_days: Option<i64>,
}
