//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::RentalStore;
use crate::services::audit_service::AuditSink;
use crate::services::contract_service::ContractService;
use crate::services::cost_service::CostEstimator;
use crate::services::sweeper::OverdueSweeper;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RentalStore>,
    pub contracts: Arc<ContractService>,
    pub sweeper: Arc<OverdueSweeper>,
    pub config: EnvironmentConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RentalStore>,
        audit: Arc<dyn AuditSink>,
        estimator: Arc<dyn CostEstimator>,
        config: EnvironmentConfig,
    ) -> Self {
        let contracts = Arc::new(ContractService::new(
            Arc::clone(&store),
            Arc::clone(&audit),
            Arc::clone(&estimator),
        ));
        let sweeper = Arc::new(OverdueSweeper::new(
            Arc::clone(&store),
            audit,
            config.sweep_batch_size,
        ));

        Self {
            store,
            contracts,
            sweeper,
            config,
        }
    }
}
