//! Aggregate del contrato de alquiler
//!
//! Orquesta la creación del contrato, el alta de assignments (siempre a
//! través del guard), las transiciones de estado y los hechos derivados.
//! Toda mutación del estado compartido pasa por acá; ningún caller escribe
//! campos directo.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Assignment, ContractStatus, RentalContract};
use crate::repositories::{format_contract_number, RentalStore};
use crate::services::audit_service::AuditSink;
use crate::services::conflict_guard::BookingGuard;
use crate::services::cost_service::{CostBreakdown, CostEstimator};
use crate::services::state_machine;
use crate::utils::errors::AppError;

/// Assignment pedido en el alta o el attach
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub agreed_rate: Decimal,
}

/// Comando de creación de contrato
#[derive(Debug, Clone)]
pub struct CreateContract {
    pub client_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assignments: Vec<NewAssignment>,
}

pub struct ContractService {
    store: Arc<dyn RentalStore>,
    audit: Arc<dyn AuditSink>,
    estimator: Arc<dyn CostEstimator>,
}

impl ContractService {
    pub fn new(
        store: Arc<dyn RentalStore>,
        audit: Arc<dyn AuditSink>,
        estimator: Arc<dyn CostEstimator>,
    ) -> Self {
        Self {
            store,
            audit,
            estimator,
        }
    }

    fn validate_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), AppError> {
        if end_date <= start_date {
            return Err(AppError::InvalidDateRange(format!(
                "end_date ({}) debe ser posterior a start_date ({})",
                end_date, start_date
            )));
        }
        Ok(())
    }

    fn validate_rate(agreed_rate: Decimal) -> Result<(), AppError> {
        if agreed_rate < Decimal::ZERO {
            return Err(AppError::Validation(
                "agreed_rate no puede ser negativo".to_string(),
            ));
        }
        Ok(())
    }

    /// Crea un contrato en PENDING con sus assignments iniciales.
    pub async fn create_contract(
        &self,
        company_id: Uuid,
        command: CreateContract,
    ) -> Result<RentalContract, AppError> {
        Self::validate_dates(command.start_date, command.end_date)?;

        let client = self
            .store
            .get_client(command.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Client {} not found", command.client_id)))?;
        if client.company_id != company_id {
            return Err(AppError::CrossTenantViolation(format!(
                "client {} belongs to company {}, caller is {}",
                client.id, client.company_id, company_id
            )));
        }

        // chequeo advisory por assignment: errores tempranos y accionables.
        // La garantía dura la da el store al insertar.
        let guard = BookingGuard::new(self.store.as_ref());
        for requested in &command.assignments {
            Self::validate_rate(requested.agreed_rate)?;
            guard
                .check_vehicle_available(
                    company_id,
                    requested.vehicle_id,
                    command.start_date,
                    command.end_date,
                    None,
                )
                .await?;
            if let Some(driver_id) = requested.driver_id {
                guard
                    .check_driver_available(
                        company_id,
                        driver_id,
                        command.start_date,
                        command.end_date,
                        None,
                    )
                    .await?;
            }
        }

        let sequence = self.store.next_contract_sequence(company_id).await?;
        let now = Utc::now();
        let contract = RentalContract {
            id: Uuid::new_v4(),
            company_id,
            client_id: command.client_id,
            contract_number: format_contract_number(sequence),
            start_date: command.start_date,
            end_date: command.end_date,
            status: ContractStatus::Pending,
            actual_end_date: None,
            cancellation_reason: None,
            deleted_at: None,
            created_at: now,
        };

        let assignments: Vec<Assignment> = command
            .assignments
            .iter()
            .map(|requested| Assignment {
                id: Uuid::new_v4(),
                contract_id: contract.id,
                company_id,
                vehicle_id: requested.vehicle_id,
                driver_id: requested.driver_id,
                agreed_rate: requested.agreed_rate,
                created_at: now,
            })
            .collect();

        let created = self.store.create_contract(contract, assignments).await?;

        self.audit
            .record_event(
                company_id,
                "CONTRACT_CREATED",
                created.id,
                &format!(
                    "Contrato {} creado ({} - {})",
                    created.contract_number, created.start_date, created.end_date
                ),
            )
            .await;

        Ok(created)
    }

    pub async fn get_contract(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
    ) -> Result<(RentalContract, Vec<Assignment>), AppError> {
        let contract = self.store.get_contract(company_id, contract_id).await?;
        let assignments = self.store.assignments_for_contract(contract_id).await?;
        Ok((contract, assignments))
    }

    /// Ata un vehículo (y opcionalmente un conductor) a un contrato
    /// existente. El chequeo de conflicto corre dentro del scope atómico
    /// del store.
    pub async fn attach_assignment(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        requested: NewAssignment,
    ) -> Result<Assignment, AppError> {
        Self::validate_rate(requested.agreed_rate)?;

        // el store repite estos chequeos bajo lock; acá solo garantizamos
        // un NotFound/CrossTenant limpio antes de armar el assignment
        self.store.get_contract(company_id, contract_id).await?;

        let assignment = Assignment {
            id: Uuid::new_v4(),
            contract_id,
            company_id,
            vehicle_id: requested.vehicle_id,
            driver_id: requested.driver_id,
            agreed_rate: requested.agreed_rate,
            created_at: Utc::now(),
        };

        let inserted = self.store.insert_assignment(assignment).await?;

        self.audit
            .record_event(
                company_id,
                "ASSIGNMENT_ATTACHED",
                inserted.id,
                &format!(
                    "Vehículo {} asignado al contrato {}",
                    inserted.vehicle_id, contract_id
                ),
            )
            .await;

        Ok(inserted)
    }

    /// Actualiza el rango de fechas re-validando todos los assignments
    /// (el propio contrato queda excluido del chequeo de solapamiento).
    pub async fn update_dates(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RentalContract, AppError> {
        Self::validate_dates(start_date, end_date)?;
        let updated = self
            .store
            .update_contract_dates(company_id, contract_id, start_date, end_date)
            .await?;

        self.audit
            .record_event(
                company_id,
                "CONTRACT_DATES_UPDATED",
                contract_id,
                &format!("Fechas actualizadas a {} - {}", start_date, end_date),
            )
            .await;

        Ok(updated)
    }

    /// Aplica una transición de estado con compare-and-set. Un fallo por
    /// ConcurrentModification se reintenta una única vez (re-lee y vuelve a
    /// validar); BookingConflict y el resto nunca se reintentan.
    pub async fn transition(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        target: ContractStatus,
        reason: Option<String>,
    ) -> Result<RentalContract, AppError> {
        if state_machine::requires_reason(target)
            && reason.as_deref().map_or(true, |r| r.trim().is_empty())
        {
            return Err(AppError::Validation(
                "La cancelación requiere un motivo".to_string(),
            ));
        }

        let mut contract = self.store.get_contract(company_id, contract_id).await?;

        for attempt in 0..2 {
            state_machine::validate_transition(contract.status, target)?;

            let actual_end_date = state_machine::stamps_actual_end(target).then(Utc::now);
            let vehicle_flip = state_machine::vehicle_flip_on_entry(target);

            match self
                .store
                .transition_status(
                    company_id,
                    contract_id,
                    contract.status,
                    target,
                    actual_end_date,
                    reason.clone(),
                    vehicle_flip,
                )
                .await
            {
                Ok(updated) => {
                    self.audit
                        .record_event(
                            company_id,
                            "CONTRACT_TRANSITION",
                            contract_id,
                            &format!(
                                "Contrato {}: {} -> {}",
                                updated.contract_number, contract.status, target
                            ),
                        )
                        .await;
                    return Ok(updated);
                }
                Err(AppError::ConcurrentModification) if attempt == 0 => {
                    // carrera esperada bajo contención: re-leer y reintentar
                    tracing::debug!(
                        contract_id = %contract_id,
                        "CAS perdido en la transición, reintentando una vez"
                    );
                    contract = self.store.get_contract(company_id, contract_id).await?;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::ConcurrentModification)
    }

    /// Pasa el contrato al colaborador de costos.
    pub async fn estimate_cost(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
    ) -> Result<CostBreakdown, AppError> {
        let (contract, assignments) = self.get_contract(company_id, contract_id).await?;
        self.estimator.estimate(&contract, &assignments).await
    }
}
