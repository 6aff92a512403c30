pub mod audit_service;
pub mod conflict_guard;
pub mod contract_service;
pub mod cost_service;
pub mod overlap;
pub mod permissions;
pub mod scheduler;
pub mod state_machine;
pub mod sweeper;
