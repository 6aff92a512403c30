//! Modelo de RentalContract
//!
//! Este módulo contiene el contrato de alquiler y su enum de estados.
//! Las relaciones se expresan como ids (foreign keys), sin back-references.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del contrato - mapea al ENUM contract_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "contract_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractStatus {
    Pending,
    Active,
    Overdue,
    Completed,
    Cancelled,
}

impl ContractStatus {
    /// Un estado "ocupante" bloquea el vehículo/conductor para nuevas reservas
    /// solapadas. OVERDUE ocupa: el vehículo todavía no fue devuelto.
    pub fn is_occupying(&self) -> bool {
        matches!(self, Self::Pending | Self::Active | Self::Overdue)
    }

    /// COMPLETED y CANCELLED son terminales: el contrato queda inmutable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Overdue => "OVERDUE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contrato de alquiler - mapea a la tabla rental_contracts
///
/// `start_date`/`end_date` son fechas de calendario, ambas inclusivas.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RentalContract {
    pub id: Uuid,
    pub company_id: Uuid,
    pub client_id: Uuid,
    pub contract_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ContractStatus,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RentalContract {
    /// Duración en días, extremos inclusivos: end - start + 1
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Días restantes hasta end_date (0 si ya venció)
    pub fn remaining_days(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days().max(0)
    }

    /// El contrato venció: hoy es estrictamente posterior a end_date
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.end_date
    }

    /// Devolución anticipada: se completó antes de la fecha pactada
    pub fn is_early_return(&self) -> bool {
        match self.actual_end_date {
            Some(actual) => actual.date_naive() < self.end_date,
            None => false,
        }
    }
}
