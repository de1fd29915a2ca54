//! Outbound payment providers.
//!
//! [`CheckoutGateway`] covers the hosted-checkout flow (session init and
//! server-to-server validation of a callback), [`CardGateway`] the card
//! payment-intent flow. Handlers only see the traits; the concrete clients
//! are built from [`AppConfig`](crate::config::AppConfig) at startup.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

mod sslcommerz;
mod stripe;

pub use sslcommerz::SslCommerzClient;
pub use stripe::{is_intent_id, StripeClient};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("gateway declined the request: {0}")]
    Declined(String),

    #[error("unexpected gateway response: {0}")]
    Unexpected(String),
}

/// Everything the hosted checkout needs to open a session for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub total_amount: f64,
    pub currency: String,
    pub tran_id: String,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub ipn_url: String,
    pub product_name: String,
    pub product_category: String,
    pub customer: Contact,
    pub shipping: Contact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postcode: String,
    pub country: String,
}

impl CheckoutRequest {
    /// Flattened form fields in the gateway's naming.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let c = &self.customer;
        let s = &self.shipping;
        vec![
            ("total_amount", format!("{:.2}", self.total_amount)),
            ("currency", self.currency.clone()),
            ("tran_id", self.tran_id.clone()),
            ("success_url", self.success_url.clone()),
            ("fail_url", self.fail_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("ipn_url", self.ipn_url.clone()),
            ("shipping_method", "Courier".into()),
            ("num_of_item", "1".into()),
            ("product_name", self.product_name.clone()),
            ("product_category", self.product_category.clone()),
            ("product_profile", "general".into()),
            ("cus_name", c.name.clone()),
            ("cus_email", c.email.clone()),
            ("cus_add1", c.address.clone()),
            ("cus_city", c.city.clone()),
            ("cus_state", c.city.clone()),
            ("cus_postcode", c.postcode.clone()),
            ("cus_country", c.country.clone()),
            ("cus_phone", c.phone.clone()),
            ("ship_name", s.name.clone()),
            ("ship_add1", s.address.clone()),
            ("ship_city", s.city.clone()),
            ("ship_state", s.city.clone()),
            ("ship_postcode", s.postcode.clone()),
            ("ship_country", s.country.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub gateway_url: String,
    pub session_key: Option<String>,
}

/// Result of asking the gateway about a `val_id` it handed to a callback.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ValidatedPayment {
    pub status: String,
    #[serde(default)]
    pub tran_id: String,
    #[serde(default)]
    pub val_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub currency: String,
}

impl ValidatedPayment {
    pub fn is_valid(&self) -> bool {
        matches!(self.status.as_str(), "VALID" | "VALIDATED")
    }

    pub fn amount_value(&self) -> Option<f64> {
        self.amount.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaymentIntent {
    /// Object type tag; `payment_intent` for a genuine intent.
    #[serde(default)]
    pub object: String,
    pub id: String,
    pub client_secret: Option<String>,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn open_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError>;
    async fn validate(&self, val_id: &str) -> Result<ValidatedPayment, GatewayError>;
}

#[async_trait]
pub trait CardGateway: Send + Sync {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, GatewayError>;
    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;
}

/// Turns a non-2xx response into [`GatewayError::Status`], otherwise decodes JSON.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, GatewayError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}
