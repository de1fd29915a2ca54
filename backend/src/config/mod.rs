use config::{Config, ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;
use std::fmt;

/// Settings read from the environment (and `.env`) at startup.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_pool_size: u32,
    pub access_token_secret: String,
    pub store_id: String,
    pub store_password: String,
    pub is_live: bool,
    pub server_url: String,
    pub client_url: String,
    pub payment_secret_key: Option<String>,
    pub currency: String,
    pub port: u16,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env file if present
        Self::from_source(Environment::default().try_parsing(true))
    }

    pub fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Self = Config::builder()
            .set_default("db_pool_size", 10)?
            .set_default("is_live", false)?
            .set_default("server_url", "http://localhost:5000")?
            .set_default("client_url", "https://happytotrip.web.app")?
            .set_default("currency", "BDT")?
            .set_default("port", 5000)?
            .add_source(source)
            .build()?
            .try_deserialize()?;

        if config.db_pool_size == 0 {
            return Err(ConfigError::Message(
                "DB_POOL_SIZE must be at least 1".into(),
            ));
        }
        Ok(config)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }
}

// Credentials stay out of the startup log.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &redact_url(&self.database_url))
            .field("db_pool_size", &self.db_pool_size)
            .field("access_token_secret", &"<redacted>")
            .field("store_id", &self.store_id)
            .field("store_password", &"<redacted>")
            .field("is_live", &self.is_live)
            .field("server_url", &self.server_url)
            .field("client_url", &self.client_url)
            .field(
                "payment_secret_key",
                &self.payment_secret_key.as_ref().map(|_| "<redacted>"),
            )
            .field("currency", &self.currency)
            .field("port", &self.port)
            .finish()
    }
}

fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://<redacted>{}", &url[..scheme], &url[at..])
        }
        _ => url.to_string(),
    }
}
