//! Backend en memoria
//!
//! Arena de registros planos indexados por id, detrás de un único RwLock.
//! Toda mutación toma el write lock, con lo que la secuencia
//! check-then-commit queda serializada sin locks por fila.
//! Lo usan los tests de integración y STORE_BACKEND=memory.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Assignment, Client, ContractStatus, Driver, RentalContract, Vehicle, VehicleStatus,
};
use crate::services::conflict_guard::{conflict_error, find_conflict, Commitment};
use crate::utils::errors::AppError;

use super::RentalStore;

#[derive(Default)]
struct MemoryInner {
    contracts: HashMap<Uuid, RentalContract>,
    assignments: HashMap<Uuid, Assignment>,
    vehicles: HashMap<Uuid, Vehicle>,
    drivers: HashMap<Uuid, Driver>,
    clients: HashMap<Uuid, Client>,
    sequences: HashMap<Uuid, i64>,
}

impl MemoryInner {
    fn contract(&self, company_id: Uuid, contract_id: Uuid) -> Result<&RentalContract, AppError> {
        let contract = self
            .contracts
            .get(&contract_id)
            .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", contract_id)))?;
        if contract.company_id != company_id {
            return Err(AppError::CrossTenantViolation(format!(
                "contract {} belongs to company {}, caller is {}",
                contract_id, contract.company_id, company_id
            )));
        }
        Ok(contract)
    }

    fn assignments_of(&self, contract_id: Uuid) -> Vec<&Assignment> {
        self.assignments
            .values()
            .filter(|a| a.contract_id == contract_id)
            .collect()
    }

    fn commitments<F>(&self, company_id: Uuid, matches: F) -> Vec<Commitment>
    where
        F: Fn(&Assignment) -> bool,
    {
        self.assignments
            .values()
            .filter(|a| a.company_id == company_id && matches(a))
            .filter_map(|a| {
                let contract = self.contracts.get(&a.contract_id)?;
                if contract.status.is_occupying() {
                    Some(Commitment {
                        contract_id: contract.id,
                        contract_number: contract.contract_number.clone(),
                        start_date: contract.start_date,
                        end_date: contract.end_date,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Chequeo completo del guard para un assignment, con el rango del
    /// contrato dado. Se ejecuta bajo el write lock del caller.
    fn validate_assignment(
        &self,
        assignment: &Assignment,
        start_date: NaiveDate,
        end_date: NaiveDate,
        existing_in_contract: &[&Assignment],
    ) -> Result<(), AppError> {
        // un solo assignment por vehículo dentro del contrato
        if existing_in_contract
            .iter()
            .any(|a| a.vehicle_id == assignment.vehicle_id && a.id != assignment.id)
        {
            return Err(AppError::Validation(format!(
                "El vehículo {} ya está asignado a este contrato",
                assignment.vehicle_id
            )));
        }

        let vehicle = self
            .vehicles
            .get(&assignment.vehicle_id)
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

        let vehicle_commitments =
            self.commitments(assignment.company_id, |a| a.vehicle_id == assignment.vehicle_id);
        if let Some(hit) = find_conflict(
            &vehicle_commitments,
            start_date,
            end_date,
            Some(assignment.contract_id),
        ) {
            return Err(conflict_error(hit));
        }

        if let Some(driver_id) = assignment.driver_id {
            let driver = self
                .drivers
                .get(&driver_id)
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

            let driver_commitments =
                self.commitments(assignment.company_id, |a| a.driver_id == Some(driver_id));
            if let Some(hit) = find_conflict(
                &driver_commitments,
                start_date,
                end_date,
                Some(assignment.contract_id),
            ) {
                return Err(conflict_error(hit));
            }
        }

        Ok(())
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

pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RentalStore for MemoryStore {
    async fn get_contract(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
    ) -> Result<RentalContract, AppError> {
        let inner = self.inner.read().await;
        inner.contract(company_id, contract_id).cloned()
    }

    async fn assignments_for_contract(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<Assignment>, AppError> {
        let inner = self.inner.read().await;
        let mut assignments: Vec<Assignment> = inner
            .assignments_of(contract_id)
            .into_iter()
            .cloned()
            .collect();
        assignments.sort_by_key(|a| a.created_at);
        Ok(assignments)
    }

    async fn get_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Vehicle>, AppError> {
        Ok(self.inner.read().await.vehicles.get(&vehicle_id).cloned())
    }

    async fn get_driver(&self, driver_id: Uuid) -> Result<Option<Driver>, AppError> {
        Ok(self.inner.read().await.drivers.get(&driver_id).cloned())
    }

    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.inner.read().await.clients.get(&client_id).cloned())
    }

    async fn vehicle_commitments(
        &self,
        company_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.commitments(company_id, |a| a.vehicle_id == vehicle_id))
    }

    async fn driver_commitments(
        &self,
        company_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.commitments(company_id, |a| a.driver_id == Some(driver_id)))
    }

    async fn next_contract_sequence(&self, company_id: Uuid) -> Result<i64, AppError> {
        let mut inner = self.inner.write().await;
        let seq = inner.sequences.entry(company_id).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn create_contract(
        &self,
        contract: RentalContract,
        assignments: Vec<Assignment>,
    ) -> Result<RentalContract, AppError> {
        let mut inner = self.inner.write().await;

        // valida todo antes de escribir: el alta es todo-o-nada
        let mut accepted: Vec<&Assignment> = Vec::new();
        for assignment in &assignments {
            inner.validate_assignment(
                assignment,
                contract.start_date,
                contract.end_date,
                &accepted,
            )?;
            accepted.push(assignment);
        }

        inner.contracts.insert(contract.id, contract.clone());
        for assignment in assignments {
            inner.assignments.insert(assignment.id, assignment);
        }
        Ok(contract)
    }

    async fn insert_assignment(&self, assignment: Assignment) -> Result<Assignment, AppError> {
        let mut inner = self.inner.write().await;

        let contract = inner.contract(assignment.company_id, assignment.contract_id)?;
        MemoryInner::ensure_mutable(contract)?;
        let (start_date, end_date) = (contract.start_date, contract.end_date);

        let existing = inner.assignments_of(assignment.contract_id);
        inner.validate_assignment(&assignment, start_date, end_date, &existing)?;

        inner.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn update_contract_dates(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RentalContract, AppError> {
        let mut inner = self.inner.write().await;

        let contract = inner.contract(company_id, contract_id)?;
        MemoryInner::ensure_mutable(contract)?;

        // re-valida cada assignment con el rango nuevo, excluyéndose a sí
        // mismo de la búsqueda de conflictos
        let existing: Vec<Assignment> = inner
            .assignments_of(contract_id)
            .into_iter()
            .cloned()
            .collect();
        for assignment in &existing {
            inner.validate_assignment(assignment, start_date, end_date, &[])?;
        }

        let contract = inner
            .contracts
            .get_mut(&contract_id)
            .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", contract_id)))?;
        contract.start_date = start_date;
        contract.end_date = end_date;
        Ok(contract.clone())
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
        let mut inner = self.inner.write().await;

        inner.contract(company_id, contract_id)?;

        let contract = inner
            .contracts
            .get_mut(&contract_id)
            .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", contract_id)))?;

        // compare-and-set: el status tiene que seguir siendo el observado
        if contract.status != expected {
            return Err(AppError::ConcurrentModification);
        }

        contract.status = target;
        if let Some(stamp) = actual_end_date {
            contract.actual_end_date = Some(stamp);
        }
        if let Some(reason) = cancellation_reason {
            contract.cancellation_reason = Some(reason);
        }
        if target == ContractStatus::Cancelled {
            contract.deleted_at = Some(Utc::now());
        }
        let updated = contract.clone();

        if let Some(new_status) = vehicle_flip {
            let vehicle_ids: Vec<Uuid> = inner
                .assignments_of(contract_id)
                .into_iter()
                .map(|a| a.vehicle_id)
                .collect();
            for vehicle_id in vehicle_ids {
                if let Some(vehicle) = inner.vehicles.get_mut(&vehicle_id) {
                    vehicle.status = new_status;
                }
            }
        }

        Ok(updated)
    }

    async fn active_contracts_ended_before(
        &self,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<RentalContract>, AppError> {
        let inner = self.inner.read().await;
        let mut expired: Vec<RentalContract> = inner
            .contracts
            .values()
            .filter(|c| c.status == ContractStatus::Active && c.end_date < today)
            .cloned()
            .collect();
        expired.sort_by_key(|c| c.end_date);
        expired.truncate(limit.max(0) as usize);
        Ok(expired)
    }

    async fn purge_cancelled_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut inner = self.inner.write().await;
        let doomed: Vec<Uuid> = inner
            .contracts
            .values()
            .filter(|c| {
                c.status == ContractStatus::Cancelled
                    && c.deleted_at.map_or(false, |d| d < cutoff)
            })
            .map(|c| c.id)
            .collect();

        for contract_id in &doomed {
            inner.contracts.remove(contract_id);
            inner.assignments.retain(|_, a| a.contract_id != *contract_id);
        }
        Ok(doomed.len() as u64)
    }

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<(), AppError> {
        self.inner.write().await.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    async fn insert_driver(&self, driver: Driver) -> Result<(), AppError> {
        self.inner.write().await.drivers.insert(driver.id, driver);
        Ok(())
    }

    async fn insert_client(&self, client: Client) -> Result<(), AppError> {
        self.inner.write().await.clients.insert(client.id, client);
        Ok(())
    }

    async fn set_vehicle_status(
        &self,
        vehicle_id: Uuid,
        status: VehicleStatus,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let vehicle = inner
            .vehicles
            .get_mut(&vehicle_id)
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", vehicle_id)))?;
        vehicle.status = status;
        Ok(())
    }
}
