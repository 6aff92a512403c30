use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Json, Router};
use dotenvy::dotenv;
use serde_json::json;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use fleet_rental::config::environment::{EnvironmentConfig, StoreBackend};
use fleet_rental::database;
use fleet_rental::repositories::{MemoryStore, PostgresStore, RentalStore};
use fleet_rental::routes;
use fleet_rental::services::audit_service::TracingAuditSink;
use fleet_rental::services::cost_service::FlatRateEstimator;
use fleet_rental::services::scheduler;
use fleet_rental::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("🚚 Fleet Rental - Motor de contratos de alquiler");
    info!("================================================");

    let config = EnvironmentConfig::from_env();

    // Inicializar el store según el backend configurado
    let store: Arc<dyn RentalStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = match database::create_pool(None).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(e);
                }
            };
            info!("✅ PostgreSQL conectado exitosamente");
            Arc::new(PostgresStore::new(pool))
        }
        StoreBackend::Memory => {
            info!("⚠️  Backend en memoria (solo desarrollo/tests)");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(
        store,
        Arc::new(TracingAuditSink),
        Arc::new(FlatRateEstimator),
        config.clone(),
    );

    // Scheduler: sweep horario + purga diaria (configurables)
    let _scheduler_handles = scheduler::spawn(app_state.sweeper.clone(), &config);
    info!(
        "⏰ Scheduler activo: sweep cada {}s, purga cada {}s (retención {} días)",
        config.sweep_interval_secs, config.purge_interval_secs, config.retention_days
    );

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/contract", routes::contract_routes::create_contract_router())
        .nest(
            "/api/maintenance",
            routes::maintenance_routes::create_maintenance_router(),
        )
        .layer(CorsLayer::very_permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("📄 Endpoints - Contratos:");
    info!("   POST /api/contract - Crear contrato");
    info!("   GET  /api/contract/:id - Obtener contrato");
    info!("   PUT  /api/contract/:id/dates - Actualizar fechas");
    info!("   POST /api/contract/:id/assignment - Asignar vehículo/conductor");
    info!("   POST /api/contract/:id/transition - Transicionar estado");
    info!("   GET  /api/contract/:id/cost - Estimar costo");
    info!("🧹 Endpoints - Mantenimiento:");
    info!("   POST /api/maintenance/sweep - Sweep de vencidos");
    info!("   POST /api/maintenance/purge - Purga de cancelados");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Health check simple
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "service": "fleet-rental",
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
