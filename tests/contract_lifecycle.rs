//! Tests del ciclo de vida del contrato: alta, transiciones con efectos
//! sobre el vehículo, inmutabilidad terminal, sweep idempotente y purga.

mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{activate, add_vehicle, create_contract, d, rate, setup};
use fleet_rental::models::{ContractStatus, VehicleStatus};
use fleet_rental::repositories::RentalStore;
use fleet_rental::services::contract_service::{CreateContract, NewAssignment};
use fleet_rental::utils::errors::AppError;

#[tokio::test]
async fn create_rejects_inverted_or_empty_ranges() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;

    for (start, end) in [("2025-03-10", "2025-03-01"), ("2025-03-10", "2025-03-10")] {
        let err = env
            .service
            .create_contract(
                env.company_id,
                CreateContract {
                    client_id: env.client_id,
                    start_date: d(start),
                    end_date: d(end),
                    assignments: vec![NewAssignment {
                        vehicle_id: vehicle,
                        driver_id: None,
                        agreed_rate: rate(100),
                    }],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDateRange(_)));
    }
}

#[tokio::test]
async fn contract_numbers_are_sequential_per_tenant() {
    let env = setup().await;
    let v1 = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let v2 = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;

    let c1 = create_contract(&env, v1, "2025-03-01", "2025-03-10").await;
    let c2 = create_contract(&env, v2, "2025-04-01", "2025-04-10").await;
    assert_eq!(c1.contract_number, "CTR-000001");
    assert_eq!(c2.contract_number, "CTR-000002");

    // otro tenant arranca su propia secuencia
    let other_company = Uuid::new_v4();
    let other_client = common::add_client(&env.store, other_company).await;
    let other_vehicle = add_vehicle(&env.store, other_company, VehicleStatus::Available).await;
    let foreign = env
        .service
        .create_contract(
            other_company,
            CreateContract {
                client_id: other_client,
                start_date: d("2025-03-01"),
                end_date: d("2025-03-10"),
                assignments: vec![NewAssignment {
                    vehicle_id: other_vehicle,
                    driver_id: None,
                    agreed_rate: rate(100),
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(foreign.contract_number, "CTR-000001");
}

#[tokio::test]
async fn activation_and_completion_flip_vehicle_availability() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;

    // el contrato termina dentro de una semana, así el complete de hoy
    // siempre cae antes de end_date
    let today = Utc::now().date_naive();
    let contract = env
        .service
        .create_contract(
            env.company_id,
            CreateContract {
                client_id: env.client_id,
                start_date: today - Duration::days(2),
                end_date: today + Duration::days(7),
                assignments: vec![NewAssignment {
                    vehicle_id: vehicle,
                    driver_id: None,
                    agreed_rate: rate(100),
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(contract.status, ContractStatus::Pending);

    let active = activate(&env, contract.id).await;
    assert_eq!(active.status, ContractStatus::Active);
    let v = env.store.get_vehicle(vehicle).await.unwrap().unwrap();
    assert_eq!(v.status, VehicleStatus::Rented);

    let completed = env
        .service
        .transition(env.company_id, contract.id, ContractStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(completed.status, ContractStatus::Completed);
    assert!(completed.actual_end_date.is_some());
    // se completó antes de end_date: devolución anticipada
    assert!(completed.is_early_return());

    let v = env.store.get_vehicle(vehicle).await.unwrap().unwrap();
    assert_eq!(v.status, VehicleStatus::Available);
}

#[tokio::test]
async fn illegal_transitions_are_rejected_and_leave_status_unchanged() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let contract = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;

    // PENDING no puede saltar a COMPLETED ni a OVERDUE
    for target in [ContractStatus::Completed, ContractStatus::Overdue] {
        let err = env
            .service
            .transition(env.company_id, contract.id, target, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IllegalStateTransition { .. }));
    }

    let current = env.store.get_contract(env.company_id, contract.id).await.unwrap();
    assert_eq!(current.status, ContractStatus::Pending);
}

#[tokio::test]
async fn cancelling_a_completed_contract_fails() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let contract = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;

    activate(&env, contract.id).await;
    env.service
        .transition(env.company_id, contract.id, ContractStatus::Completed, None)
        .await
        .unwrap();

    let err = env
        .service
        .transition(
            env.company_id,
            contract.id,
            ContractStatus::Cancelled,
            Some("cliente se arrepintió".to_string()),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::IllegalStateTransition {
            from: ContractStatus::Completed,
            to: ContractStatus::Cancelled,
        }
    ));

    let current = env.store.get_contract(env.company_id, contract.id).await.unwrap();
    assert_eq!(current.status, ContractStatus::Completed);
}

#[tokio::test]
async fn cancellation_requires_a_reason() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let contract = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;

    for reason in [None, Some("   ".to_string())] {
        let err = env
            .service
            .transition(env.company_id, contract.id, ContractStatus::Cancelled, reason)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    let cancelled = env
        .service
        .transition(
            env.company_id,
            contract.id,
            ContractStatus::Cancelled,
            Some("vehículo chocado".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, ContractStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("vehículo chocado"));
}

#[tokio::test]
async fn completed_contracts_are_immutable() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let other_vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let contract = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;

    activate(&env, contract.id).await;
    env.service
        .transition(env.company_id, contract.id, ContractStatus::Completed, None)
        .await
        .unwrap();

    // attach falla
    assert!(env
        .service
        .attach_assignment(
            env.company_id,
            contract.id,
            NewAssignment {
                vehicle_id: other_vehicle,
                driver_id: None,
                agreed_rate: rate(90),
            },
        )
        .await
        .is_err());

    // cambio de fechas falla
    assert!(env
        .service
        .update_dates(env.company_id, contract.id, d("2025-03-01"), d("2025-03-20"))
        .await
        .is_err());

    // cualquier transición falla
    for target in [
        ContractStatus::Pending,
        ContractStatus::Active,
        ContractStatus::Overdue,
        ContractStatus::Cancelled,
    ] {
        assert!(env
            .service
            .transition(env.company_id, contract.id, target, Some("x".to_string()))
            .await
            .is_err());
    }
}

#[tokio::test]
async fn sweep_promotes_expired_active_contracts_exactly_once() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;

    let today = Utc::now().date_naive();
    let start = today - Duration::days(10);
    let end = today - Duration::days(1); // venció ayer

    let contract = env
        .service
        .create_contract(
            env.company_id,
            CreateContract {
                client_id: env.client_id,
                start_date: start,
                end_date: end,
                assignments: vec![NewAssignment {
                    vehicle_id: vehicle,
                    driver_id: None,
                    agreed_rate: rate(100),
                }],
            },
        )
        .await
        .unwrap();
    activate(&env, contract.id).await;

    let report = env.sweeper.run_overdue_sweep(today).await.unwrap();
    assert_eq!(report.promoted, 1);
    assert_eq!(report.failed, 0);

    let current = env.store.get_contract(env.company_id, contract.id).await.unwrap();
    assert_eq!(current.status, ContractStatus::Overdue);
    assert_eq!(env.audit.count_by_type("CONTRACT_OVERDUE").await, 1);

    // idempotente: la segunda corrida no promueve nada y no duplica eventos
    let second = env.sweeper.run_overdue_sweep(today).await.unwrap();
    assert_eq!(second.promoted, 0);
    assert_eq!(second.failed, 0);
    assert_eq!(env.audit.count_by_type("CONTRACT_OVERDUE").await, 1);

    // el contrato OVERDUE todavía puede completarse
    let completed = env
        .service
        .transition(env.company_id, contract.id, ContractStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(completed.status, ContractStatus::Completed);
}

#[tokio::test]
async fn sweep_ignores_pending_and_future_contracts() {
    let env = setup().await;
    let today = Utc::now().date_naive();

    // PENDING vencido: no se promueve (nunca arrancó)
    let v1 = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    env.service
        .create_contract(
            env.company_id,
            CreateContract {
                client_id: env.client_id,
                start_date: today - Duration::days(10),
                end_date: today - Duration::days(2),
                assignments: vec![NewAssignment {
                    vehicle_id: v1,
                    driver_id: None,
                    agreed_rate: rate(100),
                }],
            },
        )
        .await
        .unwrap();

    // ACTIVE vigente: tampoco
    let v2 = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let vigente = env
        .service
        .create_contract(
            env.company_id,
            CreateContract {
                client_id: env.client_id,
                start_date: today - Duration::days(1),
                end_date: today + Duration::days(5),
                assignments: vec![NewAssignment {
                    vehicle_id: v2,
                    driver_id: None,
                    agreed_rate: rate(100),
                }],
            },
        )
        .await
        .unwrap();
    activate(&env, vigente.id).await;

    let report = env.sweeper.run_overdue_sweep(today).await.unwrap();
    assert_eq!(report.promoted, 0);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn purge_removes_only_cancelled_contracts_past_retention() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let keeper_vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;

    let doomed = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;
    env.service
        .transition(
            env.company_id,
            doomed.id,
            ContractStatus::Cancelled,
            Some("duplicado".to_string()),
        )
        .await
        .unwrap();

    let keeper = create_contract(&env, keeper_vehicle, "2025-05-01", "2025-05-10").await;

    // con la ventana default de 90 días el cancelado reciente sobrevive
    let report = env.sweeper.run_retention_purge(90).await.unwrap();
    assert_eq!(report.purged, 0);

    // con retención cero se purga; el contrato vivo no se toca
    let report = env.sweeper.run_retention_purge(0).await.unwrap();
    assert_eq!(report.purged, 1);
    assert!(env.store.get_contract(env.company_id, doomed.id).await.is_err());
    assert!(env.store.get_contract(env.company_id, keeper.id).await.is_ok());
}

#[tokio::test]
async fn stale_status_observation_fails_with_concurrent_modification() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let contract = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;
    activate(&env, contract.id).await;

    // un caller que todavía cree que el contrato está PENDING pierde el CAS
    let err = env
        .store
        .transition_status(
            env.company_id,
            contract.id,
            ContractStatus::Pending,
            ContractStatus::Active,
            None,
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConcurrentModification));
}

#[tokio::test]
async fn lost_cas_on_transition_is_retried_once_and_succeeds() {
    let (env, store) = common::setup_with_failing_transitions().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let contract = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;

    // el primer CAS se pierde; el servicio re-lee y reintenta solo
    store.fail_next_transitions(vec![AppError::ConcurrentModification]);
    let active = env
        .service
        .transition(env.company_id, contract.id, ContractStatus::Active, None)
        .await
        .expect("el reintento automático debería pasar");
    assert_eq!(active.status, ContractStatus::Active);
    assert_eq!(store.transition_calls(), 2);

    // el reintento aplicó los efectos de ACTIVE
    let v = env.store.get_vehicle(vehicle).await.unwrap().unwrap();
    assert_eq!(v.status, VehicleStatus::Rented);
}

#[tokio::test]
async fn second_lost_cas_surfaces_concurrent_modification() {
    let (env, store) = common::setup_with_failing_transitions().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let contract = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;

    // dos CAS perdidos seguidos: un único reintento y el error sube al caller
    store.fail_next_transitions(vec![
        AppError::ConcurrentModification,
        AppError::ConcurrentModification,
    ]);
    let err = env
        .service
        .transition(env.company_id, contract.id, ContractStatus::Active, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConcurrentModification));
    assert_eq!(store.transition_calls(), 2);

    let current = env.store.get_contract(env.company_id, contract.id).await.unwrap();
    assert_eq!(current.status, ContractStatus::Pending);
}

#[tokio::test]
async fn sweep_isolates_per_contract_failures() {
    let (env, store) = common::setup_with_failing_transitions().await;
    let today = Utc::now().date_naive();

    // dos contratos ACTIVE vencidos
    for _ in 0..2 {
        let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
        let contract = env
            .service
            .create_contract(
                env.company_id,
                CreateContract {
                    client_id: env.client_id,
                    start_date: today - Duration::days(10),
                    end_date: today - Duration::days(1),
                    assignments: vec![NewAssignment {
                        vehicle_id: vehicle,
                        driver_id: None,
                        agreed_rate: rate(100),
                    }],
                },
            )
            .await
            .unwrap();
        activate(&env, contract.id).await;
    }

    // uno de los dos falla con error de store: el batch sigue con el otro
    store.fail_next_transitions(vec![AppError::Internal("la base se cayó".to_string())]);
    let report = env.sweeper.run_overdue_sweep(today).await.unwrap();
    assert_eq!(report.promoted, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(env.audit.count_by_type("CONTRACT_OVERDUE").await, 1);
    assert_eq!(env.audit.count_by_type("SWEEP_PROMOTION_FAILED").await, 1);

    // la corrida siguiente levanta al que quedó ACTIVE
    let second = env.sweeper.run_overdue_sweep(today).await.unwrap();
    assert_eq!(second.promoted, 1);
    assert_eq!(second.failed, 0);
}

#[tokio::test]
async fn sweep_treats_lost_cas_as_skip_not_failure() {
    let (env, store) = common::setup_with_failing_transitions().await;
    let today = Utc::now().date_naive();

    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let contract = env
        .service
        .create_contract(
            env.company_id,
            CreateContract {
                client_id: env.client_id,
                start_date: today - Duration::days(10),
                end_date: today - Duration::days(1),
                assignments: vec![NewAssignment {
                    vehicle_id: vehicle,
                    driver_id: None,
                    agreed_rate: rate(100),
                }],
            },
        )
        .await
        .unwrap();
    activate(&env, contract.id).await;

    // el contrato salió de ACTIVE entre el scan y el CAS: se omite sin
    // contarlo como fallo
    store.fail_next_transitions(vec![AppError::ConcurrentModification]);
    let report = env.sweeper.run_overdue_sweep(today).await.unwrap();
    assert_eq!(report.promoted, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(env.audit.count_by_type("CONTRACT_OVERDUE").await, 0);

    let second = env.sweeper.run_overdue_sweep(today).await.unwrap();
    assert_eq!(second.promoted, 1);
}

#[tokio::test]
async fn cross_tenant_contract_access_is_rejected() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    let contract = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;

    let intruder = Uuid::new_v4();
    let err = env
        .service
        .get_contract(intruder, contract.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CrossTenantViolation(_)));
}

#[tokio::test]
async fn cost_estimate_uses_agreed_rate_times_duration() {
    let env = setup().await;
    let vehicle = add_vehicle(&env.store, env.company_id, VehicleStatus::Available).await;
    // 10 días inclusivos a 100 por día
    let contract = create_contract(&env, vehicle, "2025-03-01", "2025-03-10").await;

    let breakdown = env
        .service
        .estimate_cost(env.company_id, contract.id)
        .await
        .unwrap();
    assert_eq!(breakdown.days, 10);
    assert_eq!(breakdown.lines.len(), 1);
    assert_eq!(breakdown.total, rate(1000));
}
