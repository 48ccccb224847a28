pub mod client;
pub mod errors;
pub mod types;

pub use client::{RestShipmentApi, ShipmentApi};
pub use errors::ApiError;
pub use types::{ShipmentUpdate, SpecimenInventoryIds, SpecimenQuery, StateChange};
