//! Backend PostgreSQL
//!
//! Implementación sqlx del RentalStore. La inserción guardada y el
//! compare-and-set de status corren dentro de una transacción; el row lock
//! `SELECT ... FOR UPDATE` sobre el vehículo/conductor serializa la
//! secuencia check-then-commit frente a reservas concurrentes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    Assignment, Client, ContractStatus, Driver, RentalContract, Vehicle, VehicleStatus,
};
use crate::services::conflict_guard::{conflict_error, find_conflict, Commitment};
use crate::utils::errors::AppError;

use super::RentalStore;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Compromisos ocupantes del vehículo, leídos dentro de la transacción
    /// que tiene el row lock.
    async fn vehicle_commitments_tx(
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError> {
        let commitments = sqlx::query_as::<_, Commitment>(
            r#"
            SELECT c.id AS contract_id, c.contract_number, c.start_date, c.end_date
            FROM contract_assignments a
            JOIN rental_contracts c ON c.id = a.contract_id
            WHERE a.company_id = $1
              AND a.vehicle_id = $2
              AND c.status IN ('pending', 'active', 'overdue')
            "#,
        )
        .bind(company_id)
        .bind(vehicle_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(commitments)
    }

    async fn driver_commitments_tx(
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError> {
        let commitments = sqlx::query_as::<_, Commitment>(
            r#"
            SELECT c.id AS contract_id, c.contract_number, c.start_date, c.end_date
            FROM contract_assignments a
            JOIN rental_contracts c ON c.id = a.contract_id
            WHERE a.company_id = $1
              AND a.driver_id = $2
              AND c.status IN ('pending', 'active', 'overdue')
            "#,
        )
        .bind(company_id)
        .bind(driver_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(commitments)
    }

    /// Guard completo de un assignment dentro de la transacción: lock del
    /// vehículo (y conductor), chequeos de tenant/capacidad/elegibilidad y
    /// la misma decisión de solapamiento que usa el chequeo advisory.
    async fn validate_assignment_tx(
        tx: &mut Transaction<'_, Postgres>,
        assignment: &Assignment,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(), AppError> {
        // row lock: serializa reservas concurrentes sobre el mismo vehículo
        let vehicle = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE id = $1 FOR UPDATE",
        )
        .bind(assignment.vehicle_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", assignment.vehicle_id)))?;

        if vehicle.company_id != assignment.company_id {
            return Err(AppError::CrossTenantViolation(format!(
                "vehicle {} belongs to company {}",
                vehicle.id, vehicle.company_id
            )));
        }
        if !vehicle.status.is_bookable() {
            return Err(AppError::VehicleNotAvailable(format!(
                "El vehículo {} está fuera de servicio",
                vehicle.license_plate
            )));
        }

        // un solo assignment por vehículo dentro del contrato
        let (duplicate,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM contract_assignments
                WHERE contract_id = $1 AND vehicle_id = $2 AND id <> $3
            )
            "#,
        )
        .bind(assignment.contract_id)
        .bind(assignment.vehicle_id)
        .bind(assignment.id)
        .fetch_one(&mut **tx)
        .await?;
        if duplicate {
            return Err(AppError::Validation(format!(
                "El vehículo {} ya está asignado a este contrato",
                assignment.vehicle_id
            )));
        }

        let commitments =
            Self::vehicle_commitments_tx(tx, assignment.company_id, assignment.vehicle_id).await?;
        if let Some(hit) = find_conflict(
            &commitments,
            start_date,
            end_date,
            Some(assignment.contract_id),
        ) {
            return Err(conflict_error(hit));
        }

        if let Some(driver_id) = assignment.driver_id {
            let driver = sqlx::query_as::<_, Driver>(
                "SELECT * FROM drivers WHERE id = $1 FOR UPDATE",
            )
            .bind(driver_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Driver {} not found", driver_id)))?;

            if driver.company_id != assignment.company_id {
                return Err(AppError::CrossTenantViolation(format!(
                    "driver {} belongs to company {}",
                    driver.id, driver.company_id
                )));
            }
            if !driver.status.is_eligible() {
                return Err(AppError::DriverNotEligible(format!(
                    "El conductor {} no está habilitado para asignaciones",
                    driver.full_name
                )));
            }

            let commitments =
                Self::driver_commitments_tx(tx, assignment.company_id, driver_id).await?;
            if let Some(hit) = find_conflict(
                &commitments,
                start_date,
                end_date,
                Some(assignment.contract_id),
            ) {
                return Err(conflict_error(hit));
            }
        }

        Ok(())
    }

    async fn insert_assignment_tx(
        tx: &mut Transaction<'_, Postgres>,
        assignment: &Assignment,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO contract_assignments
                (id, contract_id, company_id, vehicle_id, driver_id, agreed_rate, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.contract_id)
        .bind(assignment.company_id)
        .bind(assignment.vehicle_id)
        .bind(assignment.driver_id)
        .bind(assignment.agreed_rate)
        .bind(assignment.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn get_contract_tx(
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        contract_id: Uuid,
    ) -> Result<RentalContract, AppError> {
        let contract = sqlx::query_as::<_, RentalContract>(
            "SELECT * FROM rental_contracts WHERE id = $1 FOR UPDATE",
        )
        .bind(contract_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", contract_id)))?;

        if contract.company_id != company_id {
            return Err(AppError::CrossTenantViolation(format!(
                "contract {} belongs to company {}, caller is {}",
                contract_id, contract.company_id, company_id
            )));
        }
        Ok(contract)
    }

    fn ensure_mutable(contract: &RentalContract) -> Result<(), AppError> {
        if contract.status.is_terminal() {
            return Err(AppError::Validation(format!(
                "El contrato {} está {} y ya no admite cambios",
                contract.contract_number, contract.status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RentalStore for PostgresStore {
    async fn get_contract(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
    ) -> Result<RentalContract, AppError> {
        let contract = sqlx::query_as::<_, RentalContract>(
            "SELECT * FROM rental_contracts WHERE id = $1",
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", contract_id)))?;

        if contract.company_id != company_id {
            return Err(AppError::CrossTenantViolation(format!(
                "contract {} belongs to company {}, caller is {}",
                contract_id, contract.company_id, company_id
            )));
        }
        Ok(contract)
    }

    async fn assignments_for_contract(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<Assignment>, AppError> {
        let assignments = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM contract_assignments WHERE contract_id = $1 ORDER BY created_at",
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    async fn get_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(vehicle_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    async fn get_driver(&self, driver_id: Uuid) -> Result<Option<Driver>, AppError> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
            .bind(driver_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(driver)
    }

    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    async fn vehicle_commitments(
        &self,
        company_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError> {
        let commitments = sqlx::query_as::<_, Commitment>(
            r#"
            SELECT c.id AS contract_id, c.contract_number, c.start_date, c.end_date
            FROM contract_assignments a
            JOIN rental_contracts c ON c.id = a.contract_id
            WHERE a.company_id = $1
              AND a.vehicle_id = $2
              AND c.status IN ('pending', 'active', 'overdue')
            "#,
        )
        .bind(company_id)
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(commitments)
    }

    async fn driver_commitments(
        &self,
        company_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError> {
        let commitments = sqlx::query_as::<_, Commitment>(
            r#"
            SELECT c.id AS contract_id, c.contract_number, c.start_date, c.end_date
            FROM contract_assignments a
            JOIN rental_contracts c ON c.id = a.contract_id
            WHERE a.company_id = $1
              AND a.driver_id = $2
              AND c.status IN ('pending', 'active', 'overdue')
            "#,
        )
        .bind(company_id)
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(commitments)
    }

    async fn next_contract_sequence(&self, company_id: Uuid) -> Result<i64, AppError> {
        // upsert atómico del contador por tenant
        let (value,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO contract_sequences (company_id, current_value)
            VALUES ($1, 1)
            ON CONFLICT (company_id)
            DO UPDATE SET current_value = contract_sequences.current_value + 1
            RETURNING current_value
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }

    async fn create_contract(
        &self,
        contract: RentalContract,
        assignments: Vec<Assignment>,
    ) -> Result<RentalContract, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO rental_contracts
                (id, company_id, client_id, contract_number, start_date, end_date,
                 status, actual_end_date, cancellation_reason, deleted_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(contract.id)
        .bind(contract.company_id)
        .bind(contract.client_id)
        .bind(&contract.contract_number)
        .bind(contract.start_date)
        .bind(contract.end_date)
        .bind(contract.status)
        .bind(contract.actual_end_date)
        .bind(&contract.cancellation_reason)
        .bind(contract.deleted_at)
        .bind(contract.created_at)
        .execute(&mut *tx)
        .await?;

        for assignment in &assignments {
            Self::validate_assignment_tx(&mut tx, assignment, contract.start_date, contract.end_date)
                .await?;
            Self::insert_assignment_tx(&mut tx, assignment).await?;
        }

        tx.commit().await?;
        Ok(contract)
    }

    async fn insert_assignment(&self, assignment: Assignment) -> Result<Assignment, AppError> {
        let mut tx = self.pool.begin().await?;

        let contract =
            Self::get_contract_tx(&mut tx, assignment.company_id, assignment.contract_id).await?;
        Self::ensure_mutable(&contract)?;

        Self::validate_assignment_tx(&mut tx, &assignment, contract.start_date, contract.end_date)
            .await?;
        Self::insert_assignment_tx(&mut tx, &assignment).await?;

        tx.commit().await?;
        Ok(assignment)
    }

    async fn update_contract_dates(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RentalContract, AppError> {
        let mut tx = self.pool.begin().await?;

        let contract = Self::get_contract_tx(&mut tx, company_id, contract_id).await?;
        Self::ensure_mutable(&contract)?;

        let assignments = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM contract_assignments WHERE contract_id = $1",
        )
        .bind(contract_id)
        .fetch_all(&mut *tx)
        .await?;

        for assignment in &assignments {
            Self::validate_assignment_tx(&mut tx, assignment, start_date, end_date).await?;
        }

        let updated = sqlx::query_as::<_, RentalContract>(
            r#"
            UPDATE rental_contracts
            SET start_date = $2, end_date = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(contract_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn transition_status(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        expected: ContractStatus,
        target: ContractStatus,
        actual_end_date: Option<DateTime<Utc>>,
        cancellation_reason: Option<String>,
        vehicle_flip: Option<VehicleStatus>,
    ) -> Result<RentalContract, AppError> {
        let mut tx = self.pool.begin().await?;

        // compare-and-set: solo escribe si el status sigue siendo el esperado
        let updated = sqlx::query_as::<_, RentalContract>(
            r#"
            UPDATE rental_contracts
            SET status = $4,
                actual_end_date = COALESCE($5, actual_end_date),
                cancellation_reason = COALESCE($6, cancellation_reason),
                deleted_at = CASE WHEN $7 THEN NOW() ELSE deleted_at END
            WHERE id = $1 AND company_id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(contract_id)
        .bind(company_id)
        .bind(expected)
        .bind(target)
        .bind(actual_end_date)
        .bind(&cancellation_reason)
        .bind(target == ContractStatus::Cancelled)
        .fetch_optional(&mut *tx)
        .await?;

        let updated = match updated {
            Some(contract) => contract,
            None => {
                // distinguir NotFound / cross-tenant / carrera perdida
                tx.rollback().await?;
                self.get_contract(company_id, contract_id).await?;
                return Err(AppError::ConcurrentModification);
            }
        };

        if let Some(new_status) = vehicle_flip {
            sqlx::query(
                r#"
                UPDATE vehicles
                SET status = $2
                WHERE id IN (SELECT vehicle_id FROM contract_assignments WHERE contract_id = $1)
                "#,
            )
            .bind(contract_id)
            .bind(new_status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn active_contracts_ended_before(
        &self,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<RentalContract>, AppError> {
        let contracts = sqlx::query_as::<_, RentalContract>(
            r#"
            SELECT * FROM rental_contracts
            WHERE status = 'active' AND end_date < $1
            ORDER BY end_date
            LIMIT $2
            "#,
        )
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(contracts)
    }

    async fn purge_cancelled_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM contract_assignments
            WHERE contract_id IN (
                SELECT id FROM rental_contracts
                WHERE status = 'cancelled' AND deleted_at < $1
            )
            "#,
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "DELETE FROM rental_contracts WHERE status = 'cancelled' AND deleted_at < $1",
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, company_id, license_plate, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(vehicle.id)
        .bind(vehicle.company_id)
        .bind(&vehicle.license_plate)
        .bind(vehicle.status)
        .bind(vehicle.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_driver(&self, driver: Driver) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO drivers (id, company_id, full_name, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(driver.id)
        .bind(driver.company_id)
        .bind(&driver.full_name)
        .bind(driver.status)
        .bind(driver.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_client(&self, client: Client) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, company_id, name, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(client.id)
        .bind(client.company_id)
        .bind(&client.name)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_vehicle_status(
        &self,
        vehicle_id: Uuid,
        status: VehicleStatus,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1")
            .bind(vehicle_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Vehicle {} not found", vehicle_id)));
        }
        Ok(())
    }
}
