// In-memory repository server for unit tests - no network

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::api::{ApiError, ShipmentApi, ShipmentUpdate, SpecimenQuery, StateChange};
use crate::shipments::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Get(String),
    Add(AddShipment),
    Update(ShipmentUpdate),
    ChangeState {
        target: ShipmentState,
        expected_version: u64,
        datetime: Option<DateTime<Utc>>,
    },
    Remove(String),
    ListSpecimens(Option<ItemState>),
    AddSpecimens(Vec<String>),
    RemoveSpecimen(String),
    Tag {
        item_state: ItemState,
        expected_version: u64,
        ids: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct FakeState {
    shipments: HashMap<String, Shipment>,
    items: HashMap<String, Vec<ShipmentSpecimen>>,
    calls: Vec<ApiCall>,
    fail_next: Option<ApiError>,
    fail_on: Option<(ShipmentState, String)>,
    fail_reads: Option<String>,
}

/// Behaves like the repository server: checks versions and timestamp order
#[derive(Debug, Default)]
pub struct FakeShipmentApi {
    state: Mutex<FakeState>,
}

fn at(s: &str) -> DateTime<Utc> {
    s.parse().expect("valid fixture timestamp")
}

/// A shipment fixture whose recorded timestamps match `state`
pub fn shipment_in(state: ShipmentState) -> Shipment {
    let order = [
        ShipmentState::Created,
        ShipmentState::Packed,
        ShipmentState::Sent,
        ShipmentState::Received,
        ShipmentState::Unpacked,
        ShipmentState::Completed,
    ];
    let reached = |step: ShipmentState| {
        let step_index = order.iter().position(|s| *s == step);
        let state_index = match state {
            ShipmentState::Lost => Some(2),
            other => order.iter().position(|s| *s == other),
        };
        step_index <= state_index
    };
    let time_if = |step: ShipmentState, time: &str| reached(step).then(|| at(time));

    Shipment {
        id: format!("SHP-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]),
        version: 0,
        time_added: at("2020-01-01T08:00:00Z"),
        time_modified: None,
        state,
        courier_name: "FedEx".to_string(),
        tracking_number: "TN-0001".to_string(),
        from_location: LocationInfo {
            location_id: "LOC-CGY".to_string(),
            name: "Calgary Biobank".to_string(),
        },
        to_location: LocationInfo {
            location_id: "LOC-EDM".to_string(),
            name: "Edmonton Clinic".to_string(),
        },
        time_packed: time_if(ShipmentState::Packed, "2020-01-01T10:00:00Z"),
        time_sent: time_if(ShipmentState::Sent, "2020-01-02T10:00:00Z"),
        time_received: time_if(ShipmentState::Received, "2020-01-03T10:00:00Z"),
        time_unpacked: time_if(ShipmentState::Unpacked, "2020-01-04T10:00:00Z"),
        time_completed: time_if(ShipmentState::Completed, "2020-01-05T10:00:00Z"),
        specimen_count: 0,
    }
}

fn action_for(target: ShipmentState) -> ShipmentAction {
    match target {
        ShipmentState::Created => ShipmentAction::Reopen,
        ShipmentState::Packed => ShipmentAction::Pack,
        ShipmentState::Sent => ShipmentAction::Send,
        ShipmentState::Received => ShipmentAction::Receive,
        ShipmentState::Unpacked => ShipmentAction::Unpack,
        ShipmentState::Completed => ShipmentAction::Complete,
        ShipmentState::Lost => ShipmentAction::Lose,
    }
}

impl FakeShipmentApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn insert(&self, shipment: Shipment) {
        self.lock().shipments.insert(shipment.id.clone(), shipment);
    }

    pub fn get(&self, id: &str) -> Option<Shipment> {
        self.lock().shipments.get(id).cloned()
    }

    pub fn bump_version(&self, id: &str) {
        if let Some(shipment) = self.lock().shipments.get_mut(id) {
            shipment.version += 1;
        }
    }

    pub fn add_item(&self, shipment_id: &str, inventory_id: &str, state: ItemState) {
        let mut fake = self.lock();
        let items = fake.items.entry(shipment_id.to_string()).or_default();
        let n = items.len();
        items.push(ShipmentSpecimen {
            id: format!("SS-{n}"),
            version: 0,
            shipment_id: shipment_id.to_string(),
            specimen_id: format!("SPC-{inventory_id}"),
            inventory_id: inventory_id.to_string(),
            state,
            location_name: None,
            time_added: at("2020-01-01T09:00:00Z"),
        });
    }

    /// Make the next request fail with `err`
    pub fn fail_next(&self, err: ApiError) {
        self.lock().fail_next = Some(err);
    }

    /// Reject any transition into `target` with the given server message
    pub fn fail_transition_to(&self, target: ShipmentState, message: &str) {
        self.lock().fail_on = Some((target, message.to_string()));
    }

    /// Make every shipment read fail with a server error
    pub fn fail_reads(&self, message: &str) {
        self.lock().fail_reads = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn state_changes(&self) -> Vec<ShipmentState> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::ChangeState { target, .. } => Some(target),
                _ => None,
            })
            .collect()
    }

    fn begin(&self, call: ApiCall) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut fake = self.lock();
        fake.calls.push(call);
        match fake.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(fake),
        }
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::from_response(404, format!("shipment id is invalid: {id}"))
}

fn check_version(shipment: &Shipment, expected_version: u64) -> Result<(), ApiError> {
    if shipment.version != expected_version {
        return Err(ApiError::from_response(
            400,
            "InvalidVersion: expected version doesn't match current version",
        ));
    }
    Ok(())
}

#[async_trait]
impl ShipmentApi for FakeShipmentApi {
    async fn get_shipment(&self, id: &str) -> Result<Shipment, ApiError> {
        let fake = self.begin(ApiCall::Get(id.to_string()))?;
        if let Some(message) = &fake.fail_reads {
            return Err(ApiError::from_response(500, message.clone()));
        }
        fake.shipments.get(id).cloned().ok_or_else(|| not_found(id))
    }

    async fn add_shipment(&self, command: &AddShipment) -> Result<Shipment, ApiError> {
        let mut fake = self.begin(ApiCall::Add(command.clone()))?;
        let mut shipment = shipment_in(ShipmentState::Created);
        shipment.courier_name = command.courier_name.clone();
        shipment.tracking_number = command.tracking_number.clone();
        shipment.from_location.location_id = command.from_location_id.clone();
        shipment.to_location.location_id = command.to_location_id.clone();
        fake.shipments.insert(shipment.id.clone(), shipment.clone());
        Ok(shipment)
    }

    async fn update_shipment(
        &self,
        id: &str,
        expected_version: u64,
        update: &ShipmentUpdate,
    ) -> Result<Shipment, ApiError> {
        let mut fake = self.begin(ApiCall::Update(update.clone()))?;
        let shipment = fake.shipments.get_mut(id).ok_or_else(|| not_found(id))?;
        check_version(shipment, expected_version)?;
        match update {
            ShipmentUpdate::CourierName(name) => shipment.courier_name = name.clone(),
            ShipmentUpdate::TrackingNumber(number) => shipment.tracking_number = number.clone(),
            ShipmentUpdate::FromLocation(location) => shipment.from_location.location_id = location.clone(),
            ShipmentUpdate::ToLocation(location) => shipment.to_location.location_id = location.clone(),
        }
        shipment.version += 1;
        Ok(shipment.clone())
    }

    async fn change_state(
        &self,
        id: &str,
        target: ShipmentState,
        change: &StateChange,
    ) -> Result<Shipment, ApiError> {
        let mut fake = self.begin(ApiCall::ChangeState {
            target,
            expected_version: change.expected_version,
            datetime: change.datetime,
        })?;
        if let Some((failing, message)) = fake.fail_on.clone() {
            if failing == target {
                return Err(ApiError::from_response(400, message));
            }
        }

        let shipment = fake.shipments.get_mut(id).ok_or_else(|| not_found(id))?;
        check_version(shipment, change.expected_version)?;

        let action = action_for(target);
        if !action.is_allowed_from(shipment.state) {
            return Err(ApiError::from_response(
                400,
                format!("InvalidStateTransition: cannot {action} from {}", shipment.state),
            ));
        }
        if let Some(time) = change.datetime {
            if let Err(violation) = shipment.check_time_order(action, time) {
                return Err(ApiError::from_response(
                    400,
                    format!("EntityCriteriaError: {violation}"),
                ));
            }
        }

        match target {
            ShipmentState::Created => {
                shipment.time_packed = None;
                shipment.time_sent = None;
            }
            ShipmentState::Packed => shipment.time_packed = change.datetime,
            ShipmentState::Sent => shipment.time_sent = change.datetime,
            ShipmentState::Received => shipment.time_received = change.datetime,
            ShipmentState::Unpacked => shipment.time_unpacked = change.datetime,
            ShipmentState::Completed => shipment.time_completed = change.datetime,
            ShipmentState::Lost => {}
        }
        shipment.state = target;
        shipment.version += 1;
        shipment.time_modified = Some(Utc::now());
        Ok(shipment.clone())
    }

    async fn remove_shipment(&self, id: &str, expected_version: u64) -> Result<(), ApiError> {
        let mut fake = self.begin(ApiCall::Remove(id.to_string()))?;
        let shipment = fake.shipments.get(id).ok_or_else(|| not_found(id))?;
        check_version(shipment, expected_version)?;
        fake.shipments.remove(id);
        Ok(())
    }

    async fn list_specimens(
        &self,
        id: &str,
        query: &SpecimenQuery,
    ) -> Result<PagedResult<ShipmentSpecimen>, ApiError> {
        let fake = self.begin(ApiCall::ListSpecimens(query.state))?;
        let matching: Vec<ShipmentSpecimen> = fake
            .items
            .get(id)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| query.state.map_or(true, |state| item.state == state))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let offset = query.page.saturating_sub(1) * query.limit;
        Ok(PagedResult {
            total: matching.len() as u32,
            items: matching
                .into_iter()
                .skip(offset as usize)
                .take(query.limit as usize)
                .collect(),
            page: query.page,
            limit: query.limit,
            offset,
        })
    }

    async fn add_specimens(
        &self,
        id: &str,
        expected_version: u64,
        inventory_ids: &[String],
    ) -> Result<Shipment, ApiError> {
        {
            let mut fake = self.begin(ApiCall::AddSpecimens(inventory_ids.to_vec()))?;
            let shipment = fake.shipments.get_mut(id).ok_or_else(|| not_found(id))?;
            check_version(shipment, expected_version)?;
            shipment.version += 1;
            shipment.specimen_count += inventory_ids.len() as u32;
        }
        for inventory_id in inventory_ids {
            self.add_item(id, inventory_id, ItemState::Present);
        }
        self.get(id).ok_or_else(|| not_found(id))
    }

    async fn remove_specimen(
        &self,
        id: &str,
        shipment_specimen_id: &str,
        _expected_version: u64,
    ) -> Result<(), ApiError> {
        let mut fake = self.begin(ApiCall::RemoveSpecimen(shipment_specimen_id.to_string()))?;
        if let Some(items) = fake.items.get_mut(id) {
            items.retain(|item| item.id != shipment_specimen_id);
        }
        if let Some(shipment) = fake.shipments.get_mut(id) {
            shipment.specimen_count = shipment.specimen_count.saturating_sub(1);
            shipment.version += 1;
        }
        Ok(())
    }

    async fn tag_specimens(
        &self,
        id: &str,
        expected_version: u64,
        item_state: ItemState,
        inventory_ids: &[String],
    ) -> Result<Shipment, ApiError> {
        let mut fake = self.begin(ApiCall::Tag {
            item_state,
            expected_version,
            ids: inventory_ids.to_vec(),
        })?;
        let shipment = fake.shipments.get_mut(id).ok_or_else(|| not_found(id))?;
        check_version(shipment, expected_version)?;
        shipment.version += 1;
        if let Some(items) = fake.items.get_mut(id) {
            for item in items.iter_mut() {
                if inventory_ids.contains(&item.inventory_id) {
                    item.state = item_state;
                }
            }
        }
        fake.shipments.get(id).cloned().ok_or_else(|| not_found(id))
    }
}
