//! Controller de mantenimiento
//!
//! Entradas del colaborador de scheduling: disparo manual del sweep y de
//! la purga, detrás del permiso MaintenanceRun.

use std::sync::Arc;

use chrono::Utc;

use crate::services::permissions::{Actor, Permission};
use crate::services::sweeper::{OverdueSweeper, PurgeReport, SweepReport};
use crate::utils::errors::AppError;

pub struct MaintenanceController {
    sweeper: Arc<OverdueSweeper>,
    default_retention_days: i64,
}

impl MaintenanceController {
    pub fn new(sweeper: Arc<OverdueSweeper>, default_retention_days: i64) -> Self {
        Self {
            sweeper,
            default_retention_days,
        }
    }

    pub async fn run_sweep(&self, actor: Actor) -> Result<SweepReport, AppError> {
        actor.ensure_can(Permission::MaintenanceRun)?;
        self.sweeper.run_overdue_sweep(Utc::now().date_naive()).await
    }

    pub async fn run_purge(
        &self,
        actor: Actor,
        retention_days: Option<i64>,
    ) -> Result<PurgeReport, AppError> {
        actor.ensure_can(Permission::MaintenanceRun)?;

        let retention_days = retention_days.unwrap_or(self.default_retention_days);
        if retention_days < 0 {
            return Err(AppError::Validation(
                "retention_days no puede ser negativo".to_string(),
            ));
        }
        self.sweeper.run_retention_purge(retention_days).await
    }
}
