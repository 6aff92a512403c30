//! Colaborador de auditoría
//!
//! Registro de eventos fire-and-forget: un fallo del sink nunca hace
//! rollback de la operación que lo emitió.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Evento de auditoría registrado por el motor
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub company_id: Uuid,
    pub event_type: String,
    pub entity_id: Uuid,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Fire-and-forget: no devuelve Result a propósito.
    async fn record_event(&self, company_id: Uuid, event_type: &str, entity_id: Uuid, message: &str);
}

/// Sink de producción: escribe al log estructurado.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_event(&self, company_id: Uuid, event_type: &str, entity_id: Uuid, message: &str) {
        tracing::info!(
            target: "audit",
            company_id = %company_id,
            event_type = %event_type,
            entity_id = %entity_id,
            "{}",
            message
        );
    }
}

/// Sink en memoria para tests: acumula los eventos registrados.
pub struct MemoryAuditSink {
    events: tokio::sync::Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self {
            events: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }

    pub async fn count_by_type(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record_event(&self, company_id: Uuid, event_type: &str, entity_id: Uuid, message: &str) {
        self.events.lock().await.push(AuditEvent {
            company_id,
            event_type: event_type.to_string(),
            entity_id,
            message: message.to_string(),
            recorded_at: Utc::now(),
        });
    }
}
