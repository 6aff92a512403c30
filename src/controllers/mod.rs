pub mod contract_controller;
pub mod maintenance_controller;
