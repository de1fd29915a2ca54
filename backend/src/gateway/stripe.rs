use async_trait::async_trait;

use super::{read_json, CardGateway, GatewayError, PaymentIntent};

const API_URL: &str = "https://api.stripe.com";
const INTENT_OBJECT: &str = "payment_intent";

/// Whether `id` looks like a payment intent id (`pi_` followed by
/// alphanumerics), which also keeps it a single URL path segment.
pub fn is_intent_id(id: &str) -> bool {
    id.strip_prefix("pi_")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn checked(intent: PaymentIntent) -> Result<PaymentIntent, GatewayError> {
    if intent.object != INTENT_OBJECT {
        return Err(GatewayError::Unexpected(format!(
            "expected a {} but got {:?}",
            INTENT_OBJECT, intent.object
        )));
    }
    Ok(intent)
}

/// Card payment intents through the Stripe REST API.
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self::with_client(reqwest::Client::new(), API_URL, secret_key)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str, secret_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[async_trait]
impl CardGateway for StripeClient {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.base_url);
        log::debug!("POST {} amount={} {}", url, amount, currency);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount.to_string()),
                ("currency", currency.to_string()),
                ("payment_method_types[]", "card".to_string()),
            ])
            .send()
            .await?;
        checked(read_json(resp).await?)
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        if !is_intent_id(id) {
            return Err(GatewayError::Declined(format!(
                "{:?} is not a payment intent id",
                id
            )));
        }
        let url = format!("{}/v1/payment_intents/{}", self.base_url, id);
        log::debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let intent = checked(read_json(resp).await?)?;
        if intent.id != id {
            return Err(GatewayError::Unexpected(format!(
                "asked for intent {} but got {}",
                id, intent.id
            )));
        }
        Ok(intent)
    }
}
