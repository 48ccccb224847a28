use anyhow::Result;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for the shipping client
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShippingConfig {
    /// Repository server connection
    pub server: ServerConfig,
    /// Outgoing request throttling and read caching
    pub http: HttpConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Operator-facing defaults
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the repository REST API
    pub base_url: String,
    /// API token (can be set via env var)
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Sustained request rate
    pub requests_per_second: u32,
    /// Burst capacity
    pub burst_capacity: u32,
    /// How long read responses stay cached
    pub cache_ttl_seconds: u64,
    /// Maximum cached responses
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON lines instead of human readable output
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    /// Rows per page when listing shipment specimens
    pub page_size: u32,
    /// Operator name recorded in the session context
    pub operator: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/api".to_string(),
            token: None, // Will be read from env var or .shipping-rc
            timeout_seconds: 30,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_capacity: 20,
            cache_ttl_seconds: 60,
            cache_capacity: 500,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            operator: None,
        }
    }
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            http: HttpConfig::default(),
            observability: ObservabilityConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl ShippingConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (shipping.toml, .shipping-rc)
    /// 3. Environment variables (prefixed with SHIPPING_, nested with `__`)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("shipping.toml").exists() {
            builder = builder.add_source(File::with_name("shipping"));
        }

        if Path::new(".shipping-rc").exists() {
            builder = builder.add_source(
                File::with_name(".shipping-rc").format(config::FileFormat::Toml),
            );
        }

        Self::layered(builder, None)
    }

    /// Load an explicit TOML file, layered over defaults and under env vars
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_file_with_env(path.as_ref(), None)
    }

    fn load_file_with_env(path: &Path, env: Option<Map<String, String>>) -> Result<Self> {
        let builder =
            Config::builder().add_source(File::from(path).format(config::FileFormat::Toml));
        Self::layered(builder, env)
    }

    /// Apply the `SHIPPING_*` layer and the token fallback on top of `builder`.
    /// `env` replaces the process environment when given.
    fn layered(builder: ConfigBuilder<DefaultState>, env: Option<Map<String, String>>) -> Result<Self> {
        let token_fallback = match &env {
            Some(vars) => vars.get("SHIPPING_API_TOKEN").cloned(),
            None => std::env::var("SHIPPING_API_TOKEN").ok(),
        };

        let mut shipping_config: ShippingConfig = builder
            .add_source(
                Environment::with_prefix("SHIPPING")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        if shipping_config.server.token.is_none() {
            shipping_config.server.token = token_fallback;
        }

        Ok(shipping_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists, returning the path that was read.
    /// Runs before logging is set up, so callers report it afterwards.
    pub fn load_env_file() -> Result<Option<PathBuf>> {
        if Path::new(".env").exists() {
            return Ok(Some(dotenvy::dotenv()?));
        }
        Ok(None)
    }
}
