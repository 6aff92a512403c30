pub mod assignment;
pub mod client;
pub mod contract;
pub mod driver;
pub mod vehicle;

pub use assignment::Assignment;
pub use client::Client;
pub use contract::{ContractStatus, RentalContract};
pub use driver::{Driver, DriverStatus};
pub use vehicle::{Vehicle, VehicleStatus};
