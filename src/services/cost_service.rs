//! Colaborador de estimación de costos
//!
//! El detalle de pricing/impuestos vive fuera del motor; acá solo está la
//! seam del colaborador y una implementación estándar: tarifa pactada por
//! día multiplicada por la duración del contrato.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Assignment, RentalContract};
use crate::utils::errors::AppError;

/// Línea de costo por assignment
#[derive(Debug, Clone, Serialize)]
pub struct CostLine {
    pub assignment_id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub agreed_rate: Decimal,
    pub days: i64,
    pub subtotal: Decimal,
}

/// Desglose de costos del contrato
#[derive(Debug, Clone, Serialize)]
pub struct CostBreakdown {
    pub contract_id: Uuid,
    pub contract_number: String,
    pub days: i64,
    pub lines: Vec<CostLine>,
    pub total: Decimal,
}

#[async_trait]
pub trait CostEstimator: Send + Sync {
    async fn estimate(
        &self,
        contract: &RentalContract,
        assignments: &[Assignment],
    ) -> Result<CostBreakdown, AppError>;
}

/// Estimador estándar: agreed_rate × duration_days por assignment.
pub struct FlatRateEstimator;

#[async_trait]
impl CostEstimator for FlatRateEstimator {
    async fn estimate(
        &self,
        contract: &RentalContract,
        assignments: &[Assignment],
    ) -> Result<CostBreakdown, AppError> {
        let days = contract.duration_days();
        let mut lines = Vec::with_capacity(assignments.len());
        let mut total = Decimal::ZERO;

        for assignment in assignments {
            let subtotal = assignment.agreed_rate * Decimal::from(days);
            total += subtotal;
            lines.push(CostLine {
                assignment_id: assignment.id,
                vehicle_id: assignment.vehicle_id,
                driver_id: assignment.driver_id,
                agreed_rate: assignment.agreed_rate,
                days,
                subtotal,
            });
        }

        Ok(CostBreakdown {
            contract_id: contract.id,
            contract_number: contract.contract_number.clone(),
            days,
            lines,
            total,
        })
    }
}
