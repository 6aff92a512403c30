//! Modelo de Vehicle
//!
//! El registro del vehículo pertenece al colaborador de flota; el motor
//! de contratos solo lee su estado y lo cambia en ACTIVE/COMPLETED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum VehicleStatus {
    Available,
    Rented,
    Maintenance,
    Inactive,
}

impl VehicleStatus {
    /// Solo un vehículo AVAILABLE o RENTED puede recibir nuevos assignments;
    /// MAINTENANCE e INACTIVE quedan fuera de servicio para reservas.
    pub fn is_bookable(&self) -> bool {
        matches!(self, Self::Available | Self::Rented)
    }
}

/// Vehicle - mapea a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub company_id: Uuid,
    pub license_plate: String,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
}
