use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shipments::types::ItemState;

/// Body of a `shipments/state/{state}/{id}` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub expected_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<DateTime<Utc>>,
}

impl StateChange {
    pub fn new(expected_version: u64, datetime: Option<DateTime<Utc>>) -> Self {
        Self {
            expected_version,
            datetime,
        }
    }
}

/// A single-field edit of a shipment still being prepared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipmentUpdate {
    CourierName(String),
    TrackingNumber(String),
    FromLocation(String),
    ToLocation(String),
}

impl ShipmentUpdate {
    /// Path segment and JSON body for this edit
    pub fn endpoint(&self, expected_version: u64) -> (&'static str, serde_json::Value) {
        match self {
            ShipmentUpdate::CourierName(name) => (
                "courier",
                serde_json::json!({"expectedVersion": expected_version, "courierName": name}),
            ),
            ShipmentUpdate::TrackingNumber(number) => (
                "trackingnumber",
                serde_json::json!({"expectedVersion": expected_version, "trackingNumber": number}),
            ),
            ShipmentUpdate::FromLocation(location_id) => (
                "fromlocation",
                serde_json::json!({"expectedVersion": expected_version, "locationId": location_id}),
            ),
            ShipmentUpdate::ToLocation(location_id) => (
                "tolocation",
                serde_json::json!({"expectedVersion": expected_version, "locationId": location_id}),
            ),
        }
    }
}

/// Body for adding or tagging specimens by inventory id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecimenInventoryIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
    pub specimen_inventory_ids: Vec<String>,
}

/// Paging and filtering for the shipment specimen listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecimenQuery {
    pub state: Option<ItemState>,
    pub page: u32,
    pub limit: u32,
    pub sort: Option<String>,
    /// Serve from the read cache when a copy is held
    pub cacheable: bool,
}

impl Default for SpecimenQuery {
    fn default() -> Self {
        Self {
            state: None,
            page: 1,
            limit: 10,
            sort: None,
            cacheable: true,
        }
    }
}

impl SpecimenQuery {
    pub fn with_state(state: ItemState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// Always ask the server, ignoring cached listings
    pub fn fresh(mut self) -> Self {
        self.cacheable = false;
        self
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(state) = self.state {
            pairs.push(("filter", format!("state::{state}")));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}
