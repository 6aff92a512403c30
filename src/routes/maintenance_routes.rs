use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};

use crate::controllers::maintenance_controller::MaintenanceController;
use crate::dto::contract_dto::PurgeRequest;
use crate::routes::actor_from_headers;
use crate::services::sweeper::{PurgeReport, SweepReport};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_maintenance_router() -> Router<AppState> {
    Router::new()
        .route("/sweep", post(run_sweep))
        .route("/purge", post(run_purge))
}

async fn run_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepReport>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let controller =
        MaintenanceController::new(state.sweeper.clone(), state.config.retention_days);
    Ok(Json(controller.run_sweep(actor).await?))
}

async fn run_purge(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<PurgeRequest>>,
) -> Result<Json<PurgeReport>, AppError> {
    let actor = actor_from_headers(&headers)?;
    // sin body se usa la ventana de retención configurada
    let retention_days = body.and_then(|Json(request)| request.retention_days);
    let controller =
        MaintenanceController::new(state.sweeper.clone(), state.config.retention_days);
    Ok(Json(controller.run_purge(actor, retention_days).await?))
}
