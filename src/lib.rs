// Specimen Shipping Library - biobank shipment workflow tracking
// This exposes the core components for the CLI, testing and integration

pub mod api;
pub mod cli;
pub mod config;
pub mod http;
pub mod observability;
pub mod session;
pub mod shipments;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use api::{ApiError, RestShipmentApi, ShipmentApi};
pub use config::ShippingConfig;
pub use http::RateLimitedHttpClient;
pub use observability::{ApiMetrics, ApiStats, OperationTimer};
pub use session::SessionContext;
pub use shipments::{
    DomainViolation, InFlightRegistry, ItemState, Shipment, ShipmentAction, ShipmentError,
    ShipmentState, TrackedShipment,
};
pub use telemetry::{create_shipment_span, generate_correlation_id, init_telemetry};
pub use workflows::{
    ActionOutcome, Notification, Notifier, Progress, ShipmentController, ShipmentView,
    SkipDialog, SkipTarget, UnpackPhase, UserAction, WorkflowTracker,
};
