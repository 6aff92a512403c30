pub mod common;
pub mod contract_dto;
