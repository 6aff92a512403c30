//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y los knobs
//! operacionales del sweeper.

use std::env;

/// Backend de persistencia seleccionado por STORE_BACKEND
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Intervalo del pase de promoción a OVERDUE (segundos, default 1h)
    pub sweep_interval_secs: u64,
    /// Intervalo del pase de purga (segundos, default 24h)
    pub purge_interval_secs: u64,
    /// Ventana de retención de contratos cancelados (días, default 90)
    pub retention_days: i64,
    /// Tamaño máximo del batch del sweeper, acota la transacción
    pub sweep_batch_size: i64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl EnvironmentConfig {
    pub fn from_env() -> Self {
        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Postgres,
        };

        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 3000),
            store_backend,
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", 3600),
            purge_interval_secs: env_or("PURGE_INTERVAL_SECS", 86400),
            retention_days: env_or("RETENTION_DAYS", 90),
            sweep_batch_size: env_or("SWEEP_BATCH_SIZE", 500),
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
