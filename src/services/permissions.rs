//! Permisos por rol
//!
//! Tabla inmutable rol -> permisos, construida una sola vez al arranque.
//! Lookup puro y sin estado: no hay mutación después de la carga.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use uuid::Uuid;

use crate::utils::errors::AppError;

/// Roles de usuario dentro de una empresa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Manager,
    Agent,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value.to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "agent" => Some(Role::Agent),
            _ => None,
        }
    }
}

/// Permisos sobre el motor de contratos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ContractRead,
    ContractCreate,
    ContractUpdate,
    ContractTransition,
    AssignmentAttach,
    MaintenanceRun,
}

lazy_static! {
    static ref ROLE_PERMISSIONS: HashMap<Role, HashSet<Permission>> = {
        use Permission::*;

        let mut map = HashMap::new();
        map.insert(
            Role::Admin,
            HashSet::from([
                ContractRead,
                ContractCreate,
                ContractUpdate,
                ContractTransition,
                AssignmentAttach,
                MaintenanceRun,
            ]),
        );
        map.insert(
            Role::Manager,
            HashSet::from([
                ContractRead,
                ContractCreate,
                ContractUpdate,
                ContractTransition,
                AssignmentAttach,
            ]),
        );
        map.insert(Role::Agent, HashSet::from([ContractRead, ContractTransition]));
        map
    };
}

/// Verifica si un rol tiene un permiso específico
pub fn role_can(role: Role, permission: Permission) -> bool {
    ROLE_PERMISSIONS
        .get(&role)
        .map_or(false, |perms| perms.contains(&permission))
}

/// Actor autenticado: empresa + rol. La emisión/validación del token es
/// responsabilidad del colaborador de auth, no del motor.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub company_id: Uuid,
    pub role: Role,
}

impl Actor {
    /// Gate de permisos previo a toda llamada mutadora.
    pub fn ensure_can(&self, permission: Permission) -> Result<(), AppError> {
        if role_can(self.role, permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "El rol {:?} no tiene el permiso {:?}",
                self.role, permission
            )))
        }
    }
}
