use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::config::{HttpConfig, ShippingConfig};
use crate::observability::ApiMetrics;
use crate::session::SessionContext;

/// Rate-limited HTTP client for the repository REST API.
///
/// Unwraps the server's `{"status": ..., "data"|"message": ...}` envelope and
/// caches read responses until a write touches the same resource.
#[derive(Debug)]
pub struct RateLimitedHttpClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionContext,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    cache: Cache<String, Value>,
    metrics: Arc<ApiMetrics>,
}

impl RateLimitedHttpClient {
    pub fn new(config: &ShippingConfig, session: SessionContext) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.timeout_seconds))
            .build()
            .map_err(|source| ApiError::Transport {
                url: config.server.base_url.clone(),
                source,
            })?;

        Ok(Self::with_client(http, &config.server.base_url, &config.http, session))
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        http_config: &HttpConfig,
        session: SessionContext,
    ) -> Self {
        let per_second = NonZeroU32::new(http_config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(http_config.burst_capacity).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        let cache = Cache::builder()
            .max_capacity(http_config.cache_capacity)
            .time_to_live(Duration::from_secs(http_config.cache_ttl_seconds))
            .build();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            cache,
            metrics: Arc::new(ApiMetrics::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn metrics(&self) -> &ApiMetrics {
        &self.metrics
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| ApiError::Decode(format!("invalid url {raw}: {e}")))
    }

    /// GET a resource, serving from cache when `cacheable` and present
    pub async fn get<T>(&self, path: &str, query: &[(&str, String)], cacheable: bool) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let cache_key = url.to_string();

        if cacheable {
            if let Some(cached) = self.cache.get(&cache_key).await {
                debug!("Cache hit for key: {}", cache_key);
                self.metrics.record_cache_hit();
                return Ok(serde_json::from_value(cached)?);
            }
            self.metrics.record_cache_miss();
        }

        let data = self.execute(Method::GET, url, None::<&()>).await?;
        if cacheable {
            self.cache.insert(cache_key, data.clone()).await;
        }
        Ok(serde_json::from_value(data)?)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let data = self.execute(Method::POST, url, Some(body)).await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path)?;
        self.execute(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    async fn execute<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;
        self.metrics.record_request();

        let url_text = url.to_string();
        debug!(method = %method, url = %url_text, "Sending repository API request");

        let mut request: RequestBuilder = self
            .http
            .request(method.clone(), url)
            .header("X-Correlation-Id", &self.session.correlation_id);
        if let Some(token) = &self.session.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| {
            self.metrics.record_error();
            ApiError::Transport { url: url_text.clone(), source }
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|source| {
            self.metrics.record_error();
            ApiError::Transport { url: url_text.clone(), source }
        })?;

        let envelope: Option<Value> = serde_json::from_str(&text).ok();
        let outcome = envelope.as_ref().and_then(|v| v.get("status")).and_then(Value::as_str);

        match (outcome, envelope.as_ref()) {
            (Some("success"), Some(envelope)) if status.is_success() => {
                Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
            }
            _ if status.is_success() && envelope.is_none() => {
                self.metrics.record_error();
                Err(ApiError::Decode(format!("{method} {url_text} returned a non-JSON body")))
            }
            _ => {
                self.metrics.record_error();
                let message = envelope
                    .as_ref()
                    .and_then(|v| v.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
                let err = ApiError::from_response(status.as_u16(), message);
                if matches!(err, ApiError::VersionConflict { .. }) {
                    self.metrics.record_version_conflict();
                }
                warn!(method = %method, url = %url_text, status = status.as_u16(), error = %err, "Repository API request failed");
                Err(err)
            }
        }
    }

    /// Clear cache (useful for testing or after bulk write operations)
    pub async fn clear_cache(&self) {
        self.cache.invalidate_all();
        info!("HTTP client cache cleared");
    }

    /// Invalidate cached responses whose URL contains `pattern`
    pub async fn invalidate_cache_pattern(&self, pattern: &str) {
        let keys_to_remove: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| key.contains(pattern))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        for key in keys_to_remove {
            self.cache.invalidate(&key).await;
        }

        debug!("Invalidated cache entries matching pattern: {}", pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RateLimitedHttpClient {
        RateLimitedHttpClient::with_client(
            reqwest::Client::new(),
            &server.uri(),
            &HttpConfig::default(),
            SessionContext::new("tester", Some("mock-token".to_string())),
        )
    }

    #[tokio::test]
    async fn test_success_envelope_is_unwrapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shipments/S1"))
            .and(header("authorization", "Bearer mock-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"value": 7}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let data: Value = client.get("shipments/S1", &[], false).await.unwrap();
        assert_eq!(data, json!({"value": 7}));
    }

    #[tokio::test]
    async fn test_cached_reads_skip_the_network_until_invalidated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shipments/S1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": 1
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let _: u32 = client.get("shipments/S1", &[], true).await.unwrap();
        let _: u32 = client.get("shipments/S1", &[], true).await.unwrap();
        assert_eq!(client.metrics().get_stats().cache_hits, 1);

        client.invalidate_cache_pattern("S1").await;
        let _: u32 = client.get("shipments/S1", &[], true).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_envelope_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shipments/state/sent/S1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "error",
                "message": "EntityCriteriaError: TimeSentBeforePacked"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/shipments/state/packed/S1"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "status": "error",
                "message": "expected version doesn't match current version"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .post::<_, Value>("shipments/state/sent/S1", &json!({"expectedVersion": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 400, .. }));

        let err = client
            .post::<_, Value>("shipments/state/packed/S1", &json!({"expectedVersion": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::VersionConflict { .. }));

        let stats = client.metrics().get_stats();
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.version_conflicts, 1);
    }

    #[tokio::test]
    async fn test_non_json_success_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shipments/S1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get::<Value>("shipments/S1", &[], false).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
