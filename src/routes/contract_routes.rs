use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::contract_controller::ContractController;
use crate::dto::common::ApiResponse;
use crate::dto::contract_dto::{
    AssignmentRequest, AssignmentResponse, ContractResponse, CreateContractRequest,
    TransitionRequest, UpdateDatesRequest,
};
use crate::routes::actor_from_headers;
use crate::services::cost_service::CostBreakdown;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_contract_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_contract))
        .route("/:id", get(get_contract))
        .route("/:id/dates", put(update_dates))
        .route("/:id/assignment", post(attach_assignment))
        .route("/:id/transition", post(transition))
        .route("/:id/cost", get(estimate_cost))
}

async fn create_contract(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateContractRequest>,
) -> Result<Json<ApiResponse<ContractResponse>>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let controller = ContractController::new(state.contracts.clone());
    Ok(Json(controller.create(actor, request).await?))
}

async fn get_contract(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ContractResponse>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let controller = ContractController::new(state.contracts.clone());
    Ok(Json(controller.get_by_id(actor, id).await?))
}

async fn update_dates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDatesRequest>,
) -> Result<Json<ApiResponse<ContractResponse>>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let controller = ContractController::new(state.contracts.clone());
    Ok(Json(controller.update_dates(actor, id, request).await?))
}

async fn attach_assignment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignmentRequest>,
) -> Result<Json<ApiResponse<AssignmentResponse>>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let controller = ContractController::new(state.contracts.clone());
    Ok(Json(controller.attach_assignment(actor, id, request).await?))
}

async fn transition(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<ApiResponse<ContractResponse>>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let controller = ContractController::new(state.contracts.clone());
    Ok(Json(controller.transition(actor, id, request).await?))
}

async fn estimate_cost(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<CostBreakdown>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let controller = ContractController::new(state.contracts.clone());
    Ok(Json(controller.estimate_cost(actor, id).await?))
}
