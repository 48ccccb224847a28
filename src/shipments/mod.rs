// Shipment entity, lifecycle rules and in-flight tracking

pub mod entity;
pub mod errors;
pub mod guard;
pub mod types;

#[cfg(test)]
pub mod mocks;

pub use entity::TrackedShipment;
pub use errors::{DomainViolation, ShipmentError};
pub use guard::{InFlightRegistry, InFlightTicket};
pub use types::{
    parse_inventory_ids, AddShipment, ItemState, LocationInfo, PagedResult, Shipment,
    ShipmentAction, ShipmentSpecimen, ShipmentState, UnknownState,
};
