//! Modelo de Assignment
//!
//! Un assignment vincula un vehículo (y opcionalmente un conductor)
//! a un contrato de alquiler, con la tarifa pactada.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Assignment - mapea a la tabla contract_assignments
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub company_id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub agreed_rate: Decimal,
    pub created_at: DateTime<Utc>,
}
