use async_trait::async_trait;
use tracing::info;

use crate::api::errors::ApiError;
use crate::api::types::{ShipmentUpdate, SpecimenInventoryIds, SpecimenQuery, StateChange};
use crate::config::ShippingConfig;
use crate::http::RateLimitedHttpClient;
use crate::session::SessionContext;
use crate::shipments::types::{
    AddShipment, ItemState, PagedResult, Shipment, ShipmentSpecimen, ShipmentState,
};

/// Repository server operations the shipment workflow depends on
#[async_trait]
pub trait ShipmentApi: Send + Sync {
    async fn get_shipment(&self, id: &str) -> Result<Shipment, ApiError>;

    /// Read the shipment from the server, skipping any read cache
    async fn refresh_shipment(&self, id: &str) -> Result<Shipment, ApiError> {
        self.get_shipment(id).await
    }

    async fn add_shipment(&self, command: &AddShipment) -> Result<Shipment, ApiError>;

    async fn update_shipment(
        &self,
        id: &str,
        expected_version: u64,
        update: &ShipmentUpdate,
    ) -> Result<Shipment, ApiError>;

    async fn change_state(
        &self,
        id: &str,
        target: ShipmentState,
        change: &StateChange,
    ) -> Result<Shipment, ApiError>;

    async fn remove_shipment(&self, id: &str, expected_version: u64) -> Result<(), ApiError>;

    async fn list_specimens(
        &self,
        id: &str,
        query: &SpecimenQuery,
    ) -> Result<PagedResult<ShipmentSpecimen>, ApiError>;

    async fn add_specimens(
        &self,
        id: &str,
        expected_version: u64,
        inventory_ids: &[String],
    ) -> Result<Shipment, ApiError>;

    async fn remove_specimen(
        &self,
        id: &str,
        shipment_specimen_id: &str,
        expected_version: u64,
    ) -> Result<(), ApiError>;

    async fn tag_specimens(
        &self,
        id: &str,
        expected_version: u64,
        item_state: ItemState,
        inventory_ids: &[String],
    ) -> Result<Shipment, ApiError>;
}

/// `ShipmentApi` backed by the repository REST endpoints
#[derive(Debug)]
pub struct RestShipmentApi {
    http: RateLimitedHttpClient,
}

impl RestShipmentApi {
    pub fn new(config: &ShippingConfig, session: SessionContext) -> Result<Self, ApiError> {
        Ok(Self {
            http: RateLimitedHttpClient::new(config, session)?,
        })
    }

    pub fn from_http(http: RateLimitedHttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &RateLimitedHttpClient {
        &self.http
    }

    async fn after_write(&self, id: &str) {
        self.http.invalidate_cache_pattern(id).await;
    }
}

#[async_trait]
impl ShipmentApi for RestShipmentApi {
    async fn get_shipment(&self, id: &str) -> Result<Shipment, ApiError> {
        self.http.get(&format!("shipments/{id}"), &[], true).await
    }

    async fn refresh_shipment(&self, id: &str) -> Result<Shipment, ApiError> {
        self.http.invalidate_cache_pattern(id).await;
        self.get_shipment(id).await
    }

    async fn add_shipment(&self, command: &AddShipment) -> Result<Shipment, ApiError> {
        let shipment: Shipment = self.http.post("shipments/", command).await?;
        info!(shipment_id = %shipment.id, "Shipment added");
        Ok(shipment)
    }

    async fn update_shipment(
        &self,
        id: &str,
        expected_version: u64,
        update: &ShipmentUpdate,
    ) -> Result<Shipment, ApiError> {
        let (segment, body) = update.endpoint(expected_version);
        let result = self.http.post(&format!("shipments/{segment}/{id}"), &body).await;
        self.after_write(id).await;
        result
    }

    async fn change_state(
        &self,
        id: &str,
        target: ShipmentState,
        change: &StateChange,
    ) -> Result<Shipment, ApiError> {
        let result = self
            .http
            .post(&format!("shipments/state/{target}/{id}"), change)
            .await;
        self.after_write(id).await;
        result
    }

    async fn remove_shipment(&self, id: &str, expected_version: u64) -> Result<(), ApiError> {
        let result = self
            .http
            .delete(&format!("shipments/{id}/{expected_version}"))
            .await;
        self.after_write(id).await;
        result
    }

    async fn list_specimens(
        &self,
        id: &str,
        query: &SpecimenQuery,
    ) -> Result<PagedResult<ShipmentSpecimen>, ApiError> {
        self.http
            .get(&format!("shipments/specimens/{id}"), &query.to_query_pairs(), query.cacheable)
            .await
    }

    async fn add_specimens(
        &self,
        id: &str,
        expected_version: u64,
        inventory_ids: &[String],
    ) -> Result<Shipment, ApiError> {
        let body = SpecimenInventoryIds {
            expected_version: Some(expected_version),
            specimen_inventory_ids: inventory_ids.to_vec(),
        };
        let result = self.http.post(&format!("shipments/specimens/{id}"), &body).await;
        self.after_write(id).await;
        result
    }

    async fn remove_specimen(
        &self,
        id: &str,
        shipment_specimen_id: &str,
        expected_version: u64,
    ) -> Result<(), ApiError> {
        let result = self
            .http
            .delete(&format!(
                "shipments/specimens/{id}/{shipment_specimen_id}/{expected_version}"
            ))
            .await;
        self.after_write(id).await;
        result
    }

    async fn tag_specimens(
        &self,
        id: &str,
        expected_version: u64,
        item_state: ItemState,
        inventory_ids: &[String],
    ) -> Result<Shipment, ApiError> {
        let body = SpecimenInventoryIds {
            expected_version: Some(expected_version),
            specimen_inventory_ids: inventory_ids.to_vec(),
        };
        let result = self
            .http
            .post(&format!("shipments/specimens/{item_state}/{id}"), &body)
            .await;
        self.after_write(id).await;
        result
    }
}
