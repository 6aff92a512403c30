//! Sweeper de reconciliación
//!
//! Proceso batch recurrente e idempotente con dos tareas:
//! 1. Promote: contratos ACTIVE vencidos (end_date < hoy) pasan a OVERDUE.
//! 2. Purge: borrado duro de contratos CANCELLED más viejos que la ventana
//!    de retención.
//!
//! Cada contrato es su propia transacción: un fallo individual se loguea y
//! el batch sigue; un crash a mitad de corrida deja los ya promovidos en
//! OVERDUE y el resto en ACTIVE, sin corrupción parcial. Re-ejecutar es
//! no-op porque los promovidos dejan de matchear el filtro ACTIVE.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::ContractStatus;
use crate::repositories::RentalStore;
use crate::services::audit_service::AuditSink;
use crate::services::state_machine;
use crate::utils::errors::AppError;

/// Resultado del pase de promoción
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub promoted: u64,
    pub failed: u64,
}

/// Resultado del pase de purga
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PurgeReport {
    pub purged: u64,
}

pub struct OverdueSweeper {
    store: Arc<dyn RentalStore>,
    audit: Arc<dyn AuditSink>,
    batch_size: i64,
}

impl OverdueSweeper {
    pub fn new(store: Arc<dyn RentalStore>, audit: Arc<dyn AuditSink>, batch_size: i64) -> Self {
        Self {
            store,
            audit,
            batch_size,
        }
    }

    /// Promueve a OVERDUE todo contrato ACTIVE cuya end_date ya pasó.
    /// Tolerante a fallos parciales: cada contrato se procesa aislado.
    pub async fn run_overdue_sweep(&self, today: NaiveDate) -> Result<SweepReport, AppError> {
        let candidates = self
            .store
            .active_contracts_ended_before(today, self.batch_size)
            .await?;

        let mut report = SweepReport {
            promoted: 0,
            failed: 0,
        };

        for contract in candidates {
            // ACTIVE -> OVERDUE siempre está en la tabla; el CAS protege
            // contra un complete/cancel que llegue entre el scan y acá
            if let Err(e) = state_machine::validate_transition(contract.status, ContractStatus::Overdue)
            {
                tracing::warn!(contract_id = %contract.id, "candidato inválido en el sweep: {}", e);
                report.failed += 1;
                continue;
            }

            match self
                .store
                .transition_status(
                    contract.company_id,
                    contract.id,
                    ContractStatus::Active,
                    ContractStatus::Overdue,
                    None,
                    None,
                    None,
                )
                .await
            {
                Ok(updated) => {
                    report.promoted += 1;
                    self.audit
                        .record_event(
                            contract.company_id,
                            "CONTRACT_OVERDUE",
                            contract.id,
                            &format!(
                                "Contrato {} vencido el {}, promovido a OVERDUE",
                                updated.contract_number, updated.end_date
                            ),
                        )
                        .await;
                }
                Err(AppError::ConcurrentModification) => {
                    // otro caller lo completó/canceló primero: no es un fallo
                    tracing::debug!(contract_id = %contract.id, "contrato ya salió de ACTIVE, se omite");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(contract_id = %contract.id, "fallo promoviendo contrato: {}", e);
                    self.audit
                        .record_event(
                            contract.company_id,
                            "SWEEP_PROMOTION_FAILED",
                            contract.id,
                            &format!("Fallo promoviendo a OVERDUE: {}", e),
                        )
                        .await;
                }
            }
        }

        tracing::info!(
            promoted = report.promoted,
            failed = report.failed,
            "overdue sweep terminado"
        );
        Ok(report)
    }

    /// Purga contratos CANCELLED con deleted_at más viejo que la ventana de
    /// retención. Best-effort, no es crítico para la correctitud.
    pub async fn run_retention_purge(&self, retention_days: i64) -> Result<PurgeReport, AppError> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let purged = self.store.purge_cancelled_before(cutoff).await?;

        tracing::info!(purged, retention_days, "retention purge terminado");
        Ok(PurgeReport { purged })
    }
}
