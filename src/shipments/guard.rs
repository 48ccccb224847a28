use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::shipments::errors::ShipmentError;

/// Shipment ids with a mutating request currently on the wire.
///
/// Shared between every handle that can mutate shipments; a second request
/// for the same id is refused until the first ticket is dropped.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn acquire(&self, shipment_id: &str) -> Result<InFlightTicket, ShipmentError> {
        if !self.lock().insert(shipment_id.to_string()) {
            return Err(ShipmentError::TransitionInProgress {
                shipment_id: shipment_id.to_string(),
            });
        }
        debug!(shipment_id, "Transition ticket acquired");
        Ok(InFlightTicket {
            registry: self.clone(),
            shipment_id: shipment_id.to_string(),
        })
    }

    pub fn is_in_flight(&self, shipment_id: &str) -> bool {
        self.lock().contains(shipment_id)
    }
}

/// Releases its shipment id when dropped
#[derive(Debug)]
pub struct InFlightTicket {
    registry: InFlightRegistry,
    shipment_id: String,
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.shipment_id);
    }
}
