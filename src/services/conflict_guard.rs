//! Guardia anti doble reserva
//!
//! Autoridad central contra el double-booking: dado un vehículo o conductor
//! y un rango de fechas, busca compromisos ocupantes existentes y rechaza
//! si alguno se solapa.
//!
//! Los chequeos de este servicio son lecturas advisory (mensajes de error
//! tempranos y accionables). La garantía dura vive en el store: cada backend
//! re-ejecuta `find_conflict` dentro del mismo scope transaccional/lock que
//! inserta el assignment, de modo que dos requests concurrentes no pueden
//! observar ambos "sin conflicto" para rangos solapados.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Driver, Vehicle};
use crate::repositories::RentalStore;
use crate::services::overlap::overlaps;
use crate::utils::errors::AppError;

/// Compromiso ocupante existente: un assignment cuyo contrato está en
/// estado PENDING, ACTIVE u OVERDUE.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Commitment {
    pub contract_id: Uuid,
    pub contract_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Núcleo puro de la decisión: primer compromiso que se solapa con el rango
/// pedido, ignorando el propio contrato (para que actualizar las fechas de
/// un contrato no choque consigo mismo).
pub fn find_conflict<'a>(
    candidates: &'a [Commitment],
    start_date: NaiveDate,
    end_date: NaiveDate,
    exclude_contract_id: Option<Uuid>,
) -> Option<&'a Commitment> {
    candidates.iter().find(|c| {
        Some(c.contract_id) != exclude_contract_id
            && overlaps(c.start_date, c.end_date, start_date, end_date)
    })
}

/// Convierte el compromiso en conflicto en el error de negocio.
pub fn conflict_error(commitment: &Commitment) -> AppError {
    AppError::BookingConflict {
        contract_id: commitment.contract_id,
        contract_number: commitment.contract_number.clone(),
        start_date: commitment.start_date,
        end_date: commitment.end_date,
    }
}

pub struct BookingGuard<'a> {
    store: &'a dyn RentalStore,
}

impl<'a> BookingGuard<'a> {
    pub fn new(store: &'a dyn RentalStore) -> Self {
        Self { store }
    }

    /// Resuelve el vehículo validando tenant y capacidad de reserva.
    pub async fn resolve_vehicle(
        &self,
        company_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<Vehicle, AppError> {
        let vehicle = self
            .store
            .get_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", vehicle_id)))?;

        if vehicle.company_id != company_id {
            return Err(AppError::CrossTenantViolation(format!(
                "vehicle {} belongs to company {}, caller is {}",
                vehicle_id, vehicle.company_id, company_id
            )));
        }

        if !vehicle.status.is_bookable() {
            return Err(AppError::VehicleNotAvailable(format!(
                "El vehículo {} está fuera de servicio",
                vehicle.license_plate
            )));
        }

        Ok(vehicle)
    }

    /// Resuelve el conductor validando tenant y elegibilidad
    /// (SUSPENDED/INACTIVE no pueden ser asignados).
    pub async fn resolve_driver(
        &self,
        company_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Driver, AppError> {
        let driver = self
            .store
            .get_driver(driver_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Driver {} not found", driver_id)))?;

        if driver.company_id != company_id {
            return Err(AppError::CrossTenantViolation(format!(
                "driver {} belongs to company {}, caller is {}",
                driver_id, driver.company_id, company_id
            )));
        }

        if !driver.status.is_eligible() {
            return Err(AppError::DriverNotEligible(format!(
                "El conductor {} no está habilitado para asignaciones",
                driver.full_name
            )));
        }

        Ok(driver)
    }

    /// Chequeo temporal del vehículo contra todos sus compromisos ocupantes.
    pub async fn check_vehicle_available(
        &self,
        company_id: Uuid,
        vehicle_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        exclude_contract_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        self.resolve_vehicle(company_id, vehicle_id).await?;

        let commitments = self.store.vehicle_commitments(company_id, vehicle_id).await?;
        match find_conflict(&commitments, start_date, end_date, exclude_contract_id) {
            Some(hit) => Err(conflict_error(hit)),
            None => Ok(()),
        }
    }

    /// Chequeo temporal + elegibilidad del conductor.
    pub async fn check_driver_available(
        &self,
        company_id: Uuid,
        driver_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        exclude_contract_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        self.resolve_driver(company_id, driver_id).await?;

        let commitments = self.store.driver_commitments(company_id, driver_id).await?;
        match find_conflict(&commitments, start_date, end_date, exclude_contract_id) {
            Some(hit) => Err(conflict_error(hit)),
            None => Ok(()),
        }
    }
}
