//! Capa de persistencia del motor de contratos
//!
//! `RentalStore` es el system of record. Dos backends: PostgreSQL (sqlx)
//! para producción y un arena en memoria para tests y corridas locales.
//!
//! Disciplina de concurrencia (correctness, no optimización): la secuencia
//! "buscar compromisos solapados" -> "insertar assignment" corre dentro de
//! un único scope atómico por backend (Postgres: transacción + row lock
//! sobre el vehículo/conductor; memoria: write lock del arena). El cambio
//! de status usa compare-and-set sobre el valor esperado.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    Assignment, Client, ContractStatus, Driver, RentalContract, Vehicle, VehicleStatus,
};
use crate::services::conflict_guard::Commitment;
use crate::utils::errors::AppError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait RentalStore: Send + Sync {
    /// Contrato por id, con chequeo de tenant (CrossTenantViolation si
    /// existe pero pertenece a otra empresa).
    async fn get_contract(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
    ) -> Result<RentalContract, AppError>;

    async fn assignments_for_contract(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<Assignment>, AppError>;

    async fn get_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Vehicle>, AppError>;
    async fn get_driver(&self, driver_id: Uuid) -> Result<Option<Driver>, AppError>;
    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError>;

    /// Compromisos ocupantes (contratos PENDING/ACTIVE/OVERDUE) del vehículo.
    async fn vehicle_commitments(
        &self,
        company_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError>;

    /// Compromisos ocupantes del conductor.
    async fn driver_commitments(
        &self,
        company_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError>;

    /// Siguiente valor de la secuencia monótona por tenant para el número
    /// de contrato.
    async fn next_contract_sequence(&self, company_id: Uuid) -> Result<i64, AppError>;

    /// Alta atómica de contrato + assignments iniciales. Cada assignment
    /// pasa por el guard dentro del mismo scope que inserta.
    async fn create_contract(
        &self,
        contract: RentalContract,
        assignments: Vec<Assignment>,
    ) -> Result<RentalContract, AppError>;

    /// Inserción guardada de un assignment: re-ejecuta el chequeo de
    /// conflicto dentro del scope atómico antes de escribir.
    async fn insert_assignment(&self, assignment: Assignment) -> Result<Assignment, AppError>;

    /// Cambio de fechas re-validando todos los assignments del contrato
    /// (excluyéndose a sí mismo del chequeo de solapamiento).
    async fn update_contract_dates(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RentalContract, AppError>;

    /// Transición de estado con compare-and-set sobre `expected`. Aplica en
    /// la misma transacción el flip de vehículos, el sello de
    /// actual_end_date y el motivo de cancelación según corresponda.
    /// Devuelve ConcurrentModification si el status cambió desde la lectura.
    #[allow(clippy::too_many_arguments)]
    async fn transition_status(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        expected: ContractStatus,
        target: ContractStatus,
        actual_end_date: Option<DateTime<Utc>>,
        cancellation_reason: Option<String>,
        vehicle_flip: Option<VehicleStatus>,
    ) -> Result<RentalContract, AppError>;

    /// Candidatos del sweep: contratos ACTIVE con end_date anterior a hoy.
    async fn active_contracts_ended_before(
        &self,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<RentalContract>, AppError>;

    /// Purga dura de contratos CANCELLED con deleted_at anterior al corte.
    async fn purge_cancelled_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;

    // Superficie del colaborador de flota (altas de referencia y flip de
    // disponibilidad del vehículo).
    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<(), AppError>;
    async fn insert_driver(&self, driver: Driver) -> Result<(), AppError>;
    async fn insert_client(&self, client: Client) -> Result<(), AppError>;
    async fn set_vehicle_status(
        &self,
        vehicle_id: Uuid,
        status: VehicleStatus,
    ) -> Result<(), AppError>;
}

/// Formato display del número de contrato: secuencia por tenant.
pub fn format_contract_number(sequence: i64) -> String {
    format!("CTR-{:06}", sequence)
}
