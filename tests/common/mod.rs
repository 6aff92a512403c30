#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use fleet_rental::models::{
    Assignment, Client, ContractStatus, Driver, DriverStatus, RentalContract, Vehicle,
    VehicleStatus,
};
use fleet_rental::repositories::{MemoryStore, RentalStore};
use fleet_rental::services::audit_service::MemoryAuditSink;
use fleet_rental::services::conflict_guard::Commitment;
use fleet_rental::services::contract_service::{ContractService, CreateContract, NewAssignment};
use fleet_rental::services::cost_service::FlatRateEstimator;
use fleet_rental::services::sweeper::OverdueSweeper;
use fleet_rental::utils::errors::AppError;

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub service: ContractService,
    pub sweeper: OverdueSweeper,
    pub company_id: Uuid,
    pub client_id: Uuid,
}

pub async fn setup() -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(MemoryAuditSink::new());

    let service = ContractService::new(
        store.clone() as Arc<dyn RentalStore>,
        audit.clone(),
        Arc::new(FlatRateEstimator),
    );
    let sweeper = OverdueSweeper::new(store.clone() as Arc<dyn RentalStore>, audit.clone(), 500);

    let company_id = Uuid::new_v4();
    let client_id = add_client(&store, company_id).await;

    TestEnv {
        store,
        audit,
        service,
        sweeper,
        company_id,
        client_id,
    }
}

/// Decorador de store para tests de contención: devuelve los errores
/// encolados en las próximas llamadas a `transition_status` y delega todo
/// lo demás al arena en memoria.
pub struct FailingTransitionStore {
    inner: Arc<MemoryStore>,
    forced_errors: Mutex<Vec<AppError>>,
    transition_calls: AtomicUsize,
}

impl FailingTransitionStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            forced_errors: Mutex::new(Vec::new()),
            transition_calls: AtomicUsize::new(0),
        }
    }

    /// Encola errores a devolver, en orden, una llamada cada uno.
    pub fn fail_next_transitions(&self, errors: Vec<AppError>) {
        *self.forced_errors.lock().unwrap() = errors;
    }

    pub fn transition_calls(&self) -> usize {
        self.transition_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RentalStore for FailingTransitionStore {
    async fn get_contract(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
    ) -> Result<RentalContract, AppError> {
        self.inner.get_contract(company_id, contract_id).await
    }

    async fn assignments_for_contract(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<Assignment>, AppError> {
        self.inner.assignments_for_contract(contract_id).await
    }

    async fn get_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Vehicle>, AppError> {
        self.inner.get_vehicle(vehicle_id).await
    }

    async fn get_driver(&self, driver_id: Uuid) -> Result<Option<Driver>, AppError> {
        self.inner.get_driver(driver_id).await
    }

    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        self.inner.get_client(client_id).await
    }

    async fn vehicle_commitments(
        &self,
        company_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError> {
        self.inner.vehicle_commitments(company_id, vehicle_id).await
    }

    async fn driver_commitments(
        &self,
        company_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Vec<Commitment>, AppError> {
        self.inner.driver_commitments(company_id, driver_id).await
    }

    async fn next_contract_sequence(&self, company_id: Uuid) -> Result<i64, AppError> {
        self.inner.next_contract_sequence(company_id).await
    }

    async fn create_contract(
        &self,
        contract: RentalContract,
        assignments: Vec<Assignment>,
    ) -> Result<RentalContract, AppError> {
        self.inner.create_contract(contract, assignments).await
    }

    async fn insert_assignment(&self, assignment: Assignment) -> Result<Assignment, AppError> {
        self.inner.insert_assignment(assignment).await
    }

    async fn update_contract_dates(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RentalContract, AppError> {
        self.inner
            .update_contract_dates(company_id, contract_id, start_date, end_date)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn transition_status(
        &self,
        company_id: Uuid,
        contract_id: Uuid,
        expected: ContractStatus,
        target: ContractStatus,
        actual_end_date: Option<DateTime<Utc>>,
        cancellation_reason: Option<String>,
        vehicle_flip: Option<VehicleStatus>,
    ) -> Result<RentalContract, AppError> {
        self.transition_calls.fetch_add(1, Ordering::SeqCst);
        let forced = {
            let mut queue = self.forced_errors.lock().unwrap();
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        };
        if let Some(err) = forced {
            return Err(err);
        }
        self.inner
            .transition_status(
                company_id,
                contract_id,
                expected,
                target,
                actual_end_date,
                cancellation_reason,
                vehicle_flip,
            )
            .await
    }

    async fn active_contracts_ended_before(
        &self,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<RentalContract>, AppError> {
        self.inner.active_contracts_ended_before(today, limit).await
    }

    async fn purge_cancelled_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        self.inner.purge_cancelled_before(cutoff).await
    }

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<(), AppError> {
        self.inner.insert_vehicle(vehicle).await
    }

    async fn insert_driver(&self, driver: Driver) -> Result<(), AppError> {
        self.inner.insert_driver(driver).await
    }

    async fn insert_client(&self, client: Client) -> Result<(), AppError> {
        self.inner.insert_client(client).await
    }

    async fn set_vehicle_status(
        &self,
        vehicle_id: Uuid,
        status: VehicleStatus,
    ) -> Result<(), AppError> {
        self.inner.set_vehicle_status(vehicle_id, status).await
    }
}

/// Como `setup()` pero con el servicio y el sweeper cableados al decorador
/// de fallos; `env.store` sigue apuntando al arena interno para seedear.
pub async fn setup_with_failing_transitions() -> (TestEnv, Arc<FailingTransitionStore>) {
    let inner = Arc::new(MemoryStore::new());
    let failing = Arc::new(FailingTransitionStore::new(inner.clone()));
    let audit = Arc::new(MemoryAuditSink::new());

    let service = ContractService::new(
        failing.clone() as Arc<dyn RentalStore>,
        audit.clone(),
        Arc::new(FlatRateEstimator),
    );
    let sweeper = OverdueSweeper::new(failing.clone() as Arc<dyn RentalStore>, audit.clone(), 500);

    let company_id = Uuid::new_v4();
    let client_id = add_client(&inner, company_id).await;

    (
        TestEnv {
            store: inner,
            audit,
            service,
            sweeper,
            company_id,
            client_id,
        },
        failing,
    )
}

pub fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn rate(value: i64) -> Decimal {
    Decimal::from(value)
}

pub async fn add_client(store: &MemoryStore, company_id: Uuid) -> Uuid {
    let client = Client {
        id: Uuid::new_v4(),
        company_id,
        name: "Transportes del Sur".to_string(),
        created_at: Utc::now(),
    };
    let id = client.id;
    store.insert_client(client).await.unwrap();
    id
}

pub async fn add_vehicle(store: &MemoryStore, company_id: Uuid, status: VehicleStatus) -> Uuid {
    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        company_id,
        license_plate: format!("AB-{}", &Uuid::new_v4().to_string()[..8]),
        status,
        created_at: Utc::now(),
    };
    let id = vehicle.id;
    store.insert_vehicle(vehicle).await.unwrap();
    id
}

pub async fn add_driver(store: &MemoryStore, company_id: Uuid, status: DriverStatus) -> Uuid {
    let driver = Driver {
        id: Uuid::new_v4(),
        company_id,
        full_name: "Marta Ibáñez".to_string(),
        status,
        created_at: Utc::now(),
    };
    let id = driver.id;
    store.insert_driver(driver).await.unwrap();
    id
}

/// Alta de contrato con un único assignment de vehículo (sin conductor).
pub async fn create_contract(
    env: &TestEnv,
    vehicle_id: Uuid,
    start: &str,
    end: &str,
) -> RentalContract {
    env.service
        .create_contract(
            env.company_id,
            CreateContract {
                client_id: env.client_id,
                start_date: d(start),
                end_date: d(end),
                assignments: vec![NewAssignment {
                    vehicle_id,
                    driver_id: None,
                    agreed_rate: rate(100),
                }],
            },
        )
        .await
        .expect("el alta del contrato debería pasar")
}

/// PENDING -> ACTIVE
pub async fn activate(env: &TestEnv, contract_id: Uuid) -> RentalContract {
    env.service
        .transition(env.company_id, contract_id, ContractStatus::Active, None)
        .await
        .expect("la activación debería pasar")
}
