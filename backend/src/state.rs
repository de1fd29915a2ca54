use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::gateway::{CardGateway, CheckoutGateway, SslCommerzClient, StripeClient};
use crate::store::{MemoryStore, PgStore, Store, StoreError, StoreResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub checkout: Arc<dyn CheckoutGateway>,
    pub cards: Option<Arc<dyn CardGateway>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        checkout: Arc<dyn CheckoutGateway>,
        cards: Option<Arc<dyn CardGateway>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            checkout,
            cards,
        }
    }

    /// Connects the configured store and builds the gateway clients.
    pub async fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn Store> = if config.uses_memory_store() {
            log::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        } else {
            let url = config.database_url.clone();
            let size = config.db_pool_size;
            let pg = tokio::task::spawn_blocking(move || PgStore::connect(&url, size))
                .await
                .map_err(|e| StoreError::Migration(format!("startup task failed: {}", e)))??;
            Arc::new(pg)
        };

        let checkout = Arc::new(SslCommerzClient::new(
            &config.store_id,
            &config.store_password,
            config.is_live,
        ));
        let cards = config.payment_secret_key.as_deref().map(|key| {
            Arc::new(StripeClient::new(key)) as Arc<dyn CardGateway>
        });
        if cards.is_none() {
            log::warn!("PAYMENT_SECRET_KEY not set, card payments are disabled");
        }

        Ok(Self::new(config, store, checkout, cards))
    }

    /// Runs blocking store work off the async workers.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&dyn Store) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| AppError::Internal(format!("store task failed: {}", e)))?
            .map_err(AppError::from)
    }

    pub fn cards(&self) -> Result<&dyn CardGateway, AppError> {
        self.cards
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("card payments are not configured".into()))
    }
}
