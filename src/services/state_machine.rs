//! Máquina de estados del contrato de alquiler
//!
//! PENDING -> ACTIVE -> COMPLETED
//!                   -> OVERDUE -> COMPLETED
//! PENDING/ACTIVE/OVERDUE -> CANCELLED
//!
//! Cualquier transición fuera de la tabla falla con IllegalStateTransition.
//! La máquina es pura: valida y describe efectos; el store los aplica
//! dentro de la transacción que escribe el nuevo status (CAS sobre status).

use crate::models::{ContractStatus, VehicleStatus};
use crate::utils::errors::AppError;

/// Todos los estados, en orden de ciclo de vida. Útil para tests de clausura.
pub const ALL_STATUSES: [ContractStatus; 5] = [
    ContractStatus::Pending,
    ContractStatus::Active,
    ContractStatus::Overdue,
    ContractStatus::Completed,
    ContractStatus::Cancelled,
];

/// Verifica que la transición (from -> to) esté en la tabla.
pub fn validate_transition(from: ContractStatus, to: ContractStatus) -> Result<(), AppError> {
    use ContractStatus::*;

    let legal = matches!(
        (from, to),
        (Pending, Active)
            | (Active, Overdue)
            | (Active, Completed)
            | (Overdue, Completed)
            | (Pending, Cancelled)
            | (Active, Cancelled)
            | (Overdue, Cancelled)
    );

    if legal {
        Ok(())
    } else {
        Err(AppError::IllegalStateTransition { from, to })
    }
}

/// Efecto colateral sobre los vehículos asignados al entrar al estado destino:
/// ACTIVE compromete los vehículos (RENTED), COMPLETED los libera (AVAILABLE).
/// OVERDUE y CANCELLED no tocan el estado del vehículo.
pub fn vehicle_flip_on_entry(to: ContractStatus) -> Option<VehicleStatus> {
    match to {
        ContractStatus::Active => Some(VehicleStatus::Rented),
        ContractStatus::Completed => Some(VehicleStatus::Available),
        _ => None,
    }
}

/// COMPLETED sella actual_end_date con el instante de la transición.
pub fn stamps_actual_end(to: ContractStatus) -> bool {
    to == ContractStatus::Completed
}

/// La cancelación exige un motivo explícito.
pub fn requires_reason(to: ContractStatus) -> bool {
    to == ContractStatus::Cancelled
}
