use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub razorpay: RazorpayConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub environment: String,
    /// Browser origin allowed to call the API with credentials.
    pub client_url: String,
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
    /// Requests each client may make to /api/v1 per window. Zero disables the limit.
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_retries: u32,
    pub retry_interval_secs: u64,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub session_duration_hours: i64,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RazorpayConfig {
    #[serde(default)]
    pub enabled: bool,
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_razorpay_api")]
    pub api_base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaProvider {
    #[default]
    Local,
    Cloudinary,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    #[serde(default)]
    pub provider: MediaProvider,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    pub cloudinary: Option<CloudinaryConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_razorpay_api() -> String {
    "https://api.razorpay.com/v1".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key_id: None,
            key_secret: None,
            currency: default_currency(),
            api_base_url: default_razorpay_api(),
            max_retries: default_max_retries(),
            timeout_secs: default_gateway_timeout(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            provider: MediaProvider::Local,
            uploads_dir: default_uploads_dir(),
            cloudinary: None,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("server.environment", "development")?
            .set_default("server.client_url", "http://localhost:5173")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.body_limit_bytes", 10 * 1024)?
            .set_default("server.rate_limit_requests", 100)?
            .set_default("server.rate_limit_window_secs", 15 * 60)?
            .set_default("database.url", "sqlite://lectern.db")?
            .set_default("database.max_connections", 10)?
            .set_default("database.connect_retries", 3)?
            .set_default("database.retry_interval_secs", 5)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("auth.session_duration_hours", 24)?
            .set_default("razorpay.enabled", false)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with LECTERN__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("LECTERN").separator("__"))

            .build()?;

        config.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("production")
    }

    /// Key id and secret, when payments are switched on and fully configured.
    pub fn razorpay_credentials(&self) -> Option<(String, String)> {
        if !self.razorpay.enabled {
            return None;
        }
        match (&self.razorpay.key_id, &self.razorpay.key_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.clone(), secret.clone()))
            }
            _ => None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
                environment: "development".to_string(),
                client_url: "http://localhost:5173".to_string(),
                request_timeout_secs: 30,
                body_limit_bytes: 10 * 1024,
                rate_limit_requests: 100,
                rate_limit_window_secs: 15 * 60,
            },
            database: DatabaseConfig {
                url: "sqlite://lectern.db".to_string(),
                max_connections: 10,
                connect_retries: 3,
                retry_interval_secs: 5,
                acquire_timeout_secs: 5,
            },
            auth: AuthConfig {
                session_duration_hours: 24,
                secure_cookies: false,
            },
            razorpay: RazorpayConfig::default(),
            media: MediaConfig::default(),
        }
    }
}
