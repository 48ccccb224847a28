use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{ShipmentApi, ShipmentUpdate, SpecimenQuery, StateChange};
use crate::shipments::errors::ShipmentError;
use crate::shipments::guard::InFlightRegistry;
use crate::shipments::types::{
    parse_inventory_ids, AddShipment, ItemState, PagedResult, Shipment, ShipmentAction,
    ShipmentSpecimen, ShipmentState,
};

/// One shipment held by the current view, with a method per transition.
///
/// Every successful call replaces the held [`Shipment`] with the entity the
/// server returned; a failed call leaves it untouched. Each mutating request
/// carries the last known version so the server can reject stale edits.
pub struct TrackedShipment {
    api: Arc<dyn ShipmentApi>,
    in_flight: InFlightRegistry,
    shipment: Shipment,
}

impl std::fmt::Debug for TrackedShipment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedShipment")
            .field("shipment", &self.shipment)
            .finish_non_exhaustive()
    }
}

impl TrackedShipment {
    pub fn new(api: Arc<dyn ShipmentApi>, in_flight: InFlightRegistry, shipment: Shipment) -> Self {
        Self {
            api,
            in_flight,
            shipment,
        }
    }

    pub async fn load(
        api: Arc<dyn ShipmentApi>,
        in_flight: InFlightRegistry,
        id: &str,
    ) -> Result<Self, ShipmentError> {
        let shipment = api.get_shipment(id).await?;
        Ok(Self::new(api, in_flight, shipment))
    }

    /// Create a new shipment on the server; it starts out `Created`
    pub async fn add(
        api: Arc<dyn ShipmentApi>,
        in_flight: InFlightRegistry,
        command: &AddShipment,
    ) -> Result<Self, ShipmentError> {
        let shipment = api.add_shipment(command).await?;
        if shipment.state != ShipmentState::Created {
            return Err(ShipmentError::Protocol(format!(
                "new shipment {} reported state {}",
                shipment.id, shipment.state
            )));
        }
        Ok(Self::new(api, in_flight, shipment))
    }

    pub fn shipment(&self) -> &Shipment {
        &self.shipment
    }

    pub fn id(&self) -> &str {
        &self.shipment.id
    }

    pub fn state(&self) -> ShipmentState {
        self.shipment.state
    }

    pub fn into_shipment(self) -> Shipment {
        self.shipment
    }

    /// Fetch the current server copy, bypassing cached reads
    pub async fn reload(&mut self) -> Result<&Shipment, ShipmentError> {
        self.shipment = self.api.refresh_shipment(&self.shipment.id).await?;
        Ok(&self.shipment)
    }

    /// Reopen a packed or sent shipment so more items can be added
    pub async fn created(&mut self) -> Result<&Shipment, ShipmentError> {
        self.apply(ShipmentAction::Reopen, None).await
    }

    pub async fn pack(&mut self, time_packed: DateTime<Utc>) -> Result<&Shipment, ShipmentError> {
        self.apply(ShipmentAction::Pack, Some(time_packed)).await
    }

    pub async fn send(&mut self, time_sent: DateTime<Utc>) -> Result<&Shipment, ShipmentError> {
        self.apply(ShipmentAction::Send, Some(time_sent)).await
    }

    pub async fn receive(&mut self, time_received: DateTime<Utc>) -> Result<&Shipment, ShipmentError> {
        self.apply(ShipmentAction::Receive, Some(time_received)).await
    }

    pub async fn unpack(&mut self, time_unpacked: DateTime<Utc>) -> Result<&Shipment, ShipmentError> {
        self.apply(ShipmentAction::Unpack, Some(time_unpacked)).await
    }

    /// Only succeeds once no item in the shipment is still `Present`
    pub async fn complete(&mut self, time_completed: DateTime<Utc>) -> Result<&Shipment, ShipmentError> {
        self.apply(ShipmentAction::Complete, Some(time_completed)).await
    }

    pub async fn lose(&mut self) -> Result<&Shipment, ShipmentError> {
        self.apply(ShipmentAction::Lose, None).await
    }

    /// Run a lifecycle transition. Actions that take a time default to now.
    pub async fn apply(
        &mut self,
        action: ShipmentAction,
        time: Option<DateTime<Utc>>,
    ) -> Result<&Shipment, ShipmentError> {
        let state = self.shipment.state;
        if state.is_terminal() {
            return Err(ShipmentError::Terminal { state });
        }
        if !action.is_allowed_from(state) {
            return Err(ShipmentError::InvalidTransition { action, state });
        }

        let time = if action.takes_time() {
            Some(time.unwrap_or_else(Utc::now))
        } else {
            None
        };
        if let Some(time) = time {
            self.shipment.check_time_order(action, time)?;
        }

        if action == ShipmentAction::Complete {
            let present = self.count_items(ItemState::Present).await?;
            if present > 0 {
                return Err(ShipmentError::ItemsStillPresent { count: present });
            }
        }

        let _ticket = self.in_flight.acquire(&self.shipment.id)?;
        let target = action.target_state();
        let change = StateChange::new(self.shipment.version, time);

        let updated = match self.api.change_state(&self.shipment.id, target, &change).await {
            Ok(updated) => updated,
            Err(err) => {
                warn!(
                    shipment_id = %self.shipment.id,
                    action = %action,
                    expected_version = change.expected_version,
                    error = %err,
                    "Shipment transition rejected"
                );
                return Err(err.into());
            }
        };

        if updated.id != self.shipment.id || updated.state != target {
            return Err(ShipmentError::Protocol(format!(
                "{action} on shipment {} returned shipment {} in state {}",
                self.shipment.id, updated.id, updated.state
            )));
        }

        info!(
            shipment_id = %updated.id,
            from = %state,
            to = %updated.state,
            version = updated.version,
            "Shipment transitioned"
        );
        self.shipment = updated;
        Ok(&self.shipment)
    }

    /// Mark the listed specimens as received while unpacking.
    ///
    /// `inventory_ids` is an operator-entered list separated by commas or
    /// whitespace; all ids are sent in one bulk request.
    pub async fn tag_specimens_as_received(&mut self, inventory_ids: &str) -> Result<&Shipment, ShipmentError> {
        self.tag_specimens(ItemState::Received, inventory_ids).await
    }

    pub async fn tag_specimens(
        &mut self,
        item_state: ItemState,
        inventory_ids: &str,
    ) -> Result<&Shipment, ShipmentError> {
        self.require_state(ShipmentState::Unpacked, "tag specimens")?;
        let ids = non_empty_ids(inventory_ids)?;

        let _ticket = self.in_flight.acquire(&self.shipment.id)?;
        let updated = self
            .api
            .tag_specimens(&self.shipment.id, self.shipment.version, item_state, &ids)
            .await?;
        info!(
            shipment_id = %updated.id,
            item_state = %item_state,
            count = ids.len(),
            "Specimens tagged"
        );
        self.shipment = updated;
        Ok(&self.shipment)
    }

    pub async fn add_specimens(&mut self, inventory_ids: &str) -> Result<&Shipment, ShipmentError> {
        self.require_state(ShipmentState::Created, "add specimens")?;
        let ids = non_empty_ids(inventory_ids)?;

        let _ticket = self.in_flight.acquire(&self.shipment.id)?;
        self.shipment = self
            .api
            .add_specimens(&self.shipment.id, self.shipment.version, &ids)
            .await?;
        Ok(&self.shipment)
    }

    pub async fn remove_specimen(&mut self, specimen: &ShipmentSpecimen) -> Result<&Shipment, ShipmentError> {
        self.require_state(ShipmentState::Created, "remove specimens")?;
        {
            let _ticket = self.in_flight.acquire(&self.shipment.id)?;
            self.api
                .remove_specimen(&self.shipment.id, &specimen.id, specimen.version)
                .await?;
        }
        info!(
            shipment_id = %self.shipment.id,
            inventory_id = %specimen.inventory_id,
            "Specimen removed"
        );

        // the removal stands even when the refresh fails
        let refreshed = self.reload().await.map(|_| ());
        if let Err(err) = refreshed {
            warn!(shipment_id = %self.shipment.id, error = %err, "Reload after specimen removal failed");
        }
        Ok(&self.shipment)
    }

    pub async fn update(&mut self, update: ShipmentUpdate) -> Result<&Shipment, ShipmentError> {
        self.require_state(ShipmentState::Created, "edit shipping information")?;

        let _ticket = self.in_flight.acquire(&self.shipment.id)?;
        self.shipment = self
            .api
            .update_shipment(&self.shipment.id, self.shipment.version, &update)
            .await?;
        Ok(&self.shipment)
    }

    pub async fn update_courier_name(&mut self, name: &str) -> Result<&Shipment, ShipmentError> {
        self.update(ShipmentUpdate::CourierName(name.trim().to_string())).await
    }

    pub async fn update_tracking_number(&mut self, number: &str) -> Result<&Shipment, ShipmentError> {
        self.update(ShipmentUpdate::TrackingNumber(number.trim().to_string())).await
    }

    pub async fn update_from_location(&mut self, location_id: &str) -> Result<&Shipment, ShipmentError> {
        self.update(ShipmentUpdate::FromLocation(location_id.to_string())).await
    }

    pub async fn update_to_location(&mut self, location_id: &str) -> Result<&Shipment, ShipmentError> {
        self.update(ShipmentUpdate::ToLocation(location_id.to_string())).await
    }

    /// Delete a shipment that has not been packed yet
    pub async fn remove(self) -> Result<(), ShipmentError> {
        self.require_state(ShipmentState::Created, "remove the shipment")?;
        let _ticket = self.in_flight.acquire(&self.shipment.id)?;
        self.api
            .remove_shipment(&self.shipment.id, self.shipment.version)
            .await?;
        info!(shipment_id = %self.shipment.id, "Shipment removed");
        Ok(())
    }

    pub async fn specimens(&self, query: &SpecimenQuery) -> Result<PagedResult<ShipmentSpecimen>, ShipmentError> {
        Ok(self.api.list_specimens(&self.shipment.id, query).await?)
    }

    /// Number of specimens currently in `item_state`
    pub async fn count_items(&self, item_state: ItemState) -> Result<u32, ShipmentError> {
        let mut query = SpecimenQuery::with_state(item_state).fresh();
        query.limit = 1;
        Ok(self.specimens(&query).await?.total)
    }

    fn require_state(&self, required: ShipmentState, operation: &'static str) -> Result<(), ShipmentError> {
        let state = self.shipment.state;
        if state.is_terminal() {
            return Err(ShipmentError::Terminal { state });
        }
        if state != required {
            return Err(ShipmentError::NotAllowed { operation, state });
        }
        Ok(())
    }
}

fn non_empty_ids(input: &str) -> Result<Vec<String>, ShipmentError> {
    let ids = parse_inventory_ids(input);
    if ids.is_empty() {
        return Err(ShipmentError::InvalidInput(
            "no specimen inventory ids were entered".to_string(),
        ));
    }
    Ok(ids)
}
