//! Modelo de Driver

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del conductor - mapea al ENUM driver_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "driver_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum DriverStatus {
    Active,
    Suspended,
    Inactive,
}

impl DriverStatus {
    /// Un conductor SUSPENDED o INACTIVE no es elegible para assignments.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Driver - mapea a la tabla drivers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    pub company_id: Uuid,
    pub full_name: String,
    pub status: DriverStatus,
    pub created_at: DateTime<Utc>,
}
