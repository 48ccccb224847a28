use crate::config::ShippingConfig;
use crate::telemetry::generate_correlation_id;

/// Who is acting and how they authenticate, passed explicitly to the API
/// client and controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub operator: String,
    pub token: Option<String>,
    pub correlation_id: String,
}

impl SessionContext {
    pub fn new(operator: impl Into<String>, token: Option<String>) -> Self {
        Self {
            operator: operator.into(),
            token,
            correlation_id: generate_correlation_id(),
        }
    }

    /// Build a session from configuration, falling back to the OS user name
    pub fn from_config(config: &ShippingConfig) -> Self {
        let operator = config
            .ui
            .operator
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "operator".to_string());
        Self::new(operator, config.server.token.clone())
    }

    pub fn span(&self, operation: &str, shipment_id: Option<&str>) -> tracing::Span {
        crate::telemetry::create_shipment_span(
            operation,
            shipment_id,
            &self.operator,
            &self.correlation_id,
        )
    }
}
