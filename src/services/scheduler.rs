//! Scheduler de proceso
//!
//! Dueño del reloj: loops de intervalo que disparan las entradas del
//! sweeper. El motor no sabe nada de scheduling, solo recibe "hoy".

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::environment::EnvironmentConfig;
use crate::services::sweeper::OverdueSweeper;

/// Lanza los dos loops periódicos: promoción (horaria por default) y purga
/// (diaria por default). Devuelve los handles para quien quiera esperarlos.
pub fn spawn(sweeper: Arc<OverdueSweeper>, config: &EnvironmentConfig) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(2);

    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);
    let promote_sweeper = Arc::clone(&sweeper);
    handles.push(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let today = Utc::now().date_naive();
            match promote_sweeper.run_overdue_sweep(today).await {
                Ok(report) => {
                    if report.promoted > 0 || report.failed > 0 {
                        info!(
                            promoted = report.promoted,
                            failed = report.failed,
                            "sweep programado ejecutado"
                        );
                    }
                }
                // store inalcanzable: se reporta y la próxima corrida se
                // recupera sola, sin intervención manual
                Err(e) => error!("overdue sweep falló por completo: {}", e),
            }
        }
    }));

    let purge_interval = Duration::from_secs(config.purge_interval_secs);
    let retention_days = config.retention_days;
    handles.push(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(purge_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweeper.run_retention_purge(retention_days).await {
                Ok(report) => {
                    if report.purged > 0 {
                        info!(purged = report.purged, "purga programada ejecutada");
                    }
                }
                Err(e) => error!("retention purge falló: {}", e),
            }
        }
    }));

    handles
}
