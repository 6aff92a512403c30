//! Controller de contratos
//!
//! Gate de permisos + validación de DTOs + llamada al servicio. El tenant
//! sale del actor autenticado, nunca del body.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::common::ApiResponse;
use crate::dto::contract_dto::{
    AssignmentRequest, AssignmentResponse, ContractResponse, CreateContractRequest,
    TransitionRequest, UpdateDatesRequest,
};
use crate::services::contract_service::{ContractService, CreateContract, NewAssignment};
use crate::services::cost_service::CostBreakdown;
use crate::services::permissions::{Actor, Permission};
use crate::utils::errors::AppError;

pub struct ContractController {
    service: Arc<ContractService>,
}

impl ContractController {
    pub fn new(service: Arc<ContractService>) -> Self {
        Self { service }
    }

    pub async fn create(
        &self,
        actor: Actor,
        request: CreateContractRequest,
    ) -> Result<ApiResponse<ContractResponse>, AppError> {
        actor.ensure_can(Permission::ContractCreate)?;
        request.validate()?;

        let command = CreateContract {
            client_id: request.client_id,
            start_date: request.start_date,
            end_date: request.end_date,
            assignments: request.assignments.iter().map(to_new_assignment).collect(),
        };

        let contract = self.service.create_contract(actor.company_id, command).await?;
        let (contract, assignments) = self
            .service
            .get_contract(actor.company_id, contract.id)
            .await?;

        Ok(ApiResponse::success_with_message(
            ContractResponse::from_parts(contract, assignments),
            "Contrato creado exitosamente".to_string(),
        ))
    }

    pub async fn get_by_id(
        &self,
        actor: Actor,
        contract_id: Uuid,
    ) -> Result<ContractResponse, AppError> {
        actor.ensure_can(Permission::ContractRead)?;

        let (contract, assignments) = self
            .service
            .get_contract(actor.company_id, contract_id)
            .await?;
        Ok(ContractResponse::from_parts(contract, assignments))
    }

    pub async fn attach_assignment(
        &self,
        actor: Actor,
        contract_id: Uuid,
        request: AssignmentRequest,
    ) -> Result<ApiResponse<AssignmentResponse>, AppError> {
        actor.ensure_can(Permission::AssignmentAttach)?;

        let assignment = self
            .service
            .attach_assignment(actor.company_id, contract_id, to_new_assignment(&request))
            .await?;

        Ok(ApiResponse::success_with_message(
            AssignmentResponse::from(assignment),
            "Assignment creado exitosamente".to_string(),
        ))
    }

    pub async fn transition(
        &self,
        actor: Actor,
        contract_id: Uuid,
        request: TransitionRequest,
    ) -> Result<ApiResponse<ContractResponse>, AppError> {
        actor.ensure_can(Permission::ContractTransition)?;
        request.validate()?;

        let contract = self
            .service
            .transition(
                actor.company_id,
                contract_id,
                request.target_status,
                request.reason,
            )
            .await?;
        let assignments = self
            .service
            .get_contract(actor.company_id, contract.id)
            .await?
            .1;

        Ok(ApiResponse::success(ContractResponse::from_parts(
            contract,
            assignments,
        )))
    }

    pub async fn update_dates(
        &self,
        actor: Actor,
        contract_id: Uuid,
        request: UpdateDatesRequest,
    ) -> Result<ApiResponse<ContractResponse>, AppError> {
        actor.ensure_can(Permission::ContractUpdate)?;

        let contract = self
            .service
            .update_dates(
                actor.company_id,
                contract_id,
                request.start_date,
                request.end_date,
            )
            .await?;
        let assignments = self
            .service
            .get_contract(actor.company_id, contract.id)
            .await?
            .1;

        Ok(ApiResponse::success(ContractResponse::from_parts(
            contract,
            assignments,
        )))
    }

    pub async fn estimate_cost(
        &self,
        actor: Actor,
        contract_id: Uuid,
    ) -> Result<CostBreakdown, AppError> {
        actor.ensure_can(Permission::ContractRead)?;
        self.service.estimate_cost(actor.company_id, contract_id).await
    }
}

fn to_new_assignment(request: &AssignmentRequest) -> NewAssignment {
    NewAssignment {
        vehicle_id: request.vehicle_id,
        driver_id: request.driver_id,
        agreed_rate: request.agreed_rate,
    }
}
