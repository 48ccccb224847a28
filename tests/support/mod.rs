//! Repository server mock shared by the integration tests
//!
//! Serves the `{"status": ..., "data": ...}` envelope the repository REST API
//! uses, so the real HTTP client and entity code run end to end.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use specimen_shipping::config::HttpConfig;
use specimen_shipping::http::RateLimitedHttpClient;
use specimen_shipping::{InFlightRegistry, RestShipmentApi, SessionContext, ShipmentApi};

pub const TOKEN: &str = "mock-token";

pub struct RepositoryMock {
    pub server: MockServer,
    pub base_url: String,
}

impl RepositoryMock {
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let base_url = format!("{}/api", server.uri());
        Self { server, base_url }
    }

    pub fn session(&self) -> SessionContext {
        SessionContext::new("tester", Some(TOKEN.to_string()))
    }

    pub fn rest_api(&self) -> RestShipmentApi {
        let http = RateLimitedHttpClient::with_client(
            reqwest::Client::new(),
            &self.base_url,
            &HttpConfig::default(),
            self.session(),
        );
        RestShipmentApi::from_http(http)
    }

    pub fn api(&self) -> Arc<dyn ShipmentApi> {
        Arc::new(self.rest_api())
    }

    pub fn registry(&self) -> InFlightRegistry {
        InFlightRegistry::new()
    }

    /// Mock `GET shipments/{id}`
    pub async fn mock_shipment(&self, shipment: Value) {
        let id = shipment["id"].as_str().unwrap_or_default().to_string();
        Mock::given(method("GET"))
            .and(path(format!("/api/shipments/{id}")))
            .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
            .respond_with(success(shipment))
            .mount(&self.server)
            .await;
    }

    /// Mock a state change, requiring the exact request body
    pub async fn mock_state_change(&self, id: &str, target: &str, body: Value, response: Value) {
        Mock::given(method("POST"))
            .and(path(format!("/api/shipments/state/{target}/{id}")))
            .and(body_json(body))
            .respond_with(success(response))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Fail if any state change reaches the server
    pub async fn forbid_state_changes(&self, id: &str, target: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/api/shipments/state/{target}/{id}")))
            .respond_with(success(Value::Null))
            .expect(0)
            .mount(&self.server)
            .await;
    }
}

pub fn success(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": data}))
}

pub fn failure(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({"status": "error", "message": message}))
}

/// A shipment payload as the repository server returns it
pub fn shipment_json(id: &str, state: &str, version: u64) -> Value {
    json!({
        "id": id,
        "version": version,
        "timeAdded": "2020-01-01T08:00:00Z",
        "state": state,
        "courierName": "FedEx",
        "trackingNumber": "TN-0001",
        "fromLocationInfo": {"locationId": "LOC-CGY", "name": "Calgary Biobank"},
        "toLocationInfo": {"locationId": "LOC-EDM", "name": "Edmonton Clinic"},
        "specimenCount": 3
    })
}

/// `shipment_json` with extra fields merged in
pub fn shipment_with(id: &str, state: &str, version: u64, extra: Value) -> Value {
    let mut shipment = shipment_json(id, state, version);
    if let (Some(target), Some(extra)) = (shipment.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
    shipment
}
