use async_trait::async_trait;
use serde::Deserialize;

use super::{read_json, CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError, ValidatedPayment};

const SANDBOX_URL: &str = "https://sandbox.sslcommerz.com";
const LIVE_URL: &str = "https://securepay.sslcommerz.com";

#[derive(Deserialize)]
struct InitResponse {
    status: String,
    #[serde(default)]
    failedreason: Option<String>,
    #[serde(default)]
    sessionkey: Option<String>,
    #[serde(rename = "GatewayPageURL", default)]
    gateway_page_url: Option<String>,
}

/// Hosted-checkout client for SSLCommerz.
pub struct SslCommerzClient {
    http: reqwest::Client,
    base_url: String,
    store_id: String,
    store_password: String,
}

impl SslCommerzClient {
    pub fn new(store_id: &str, store_password: &str, is_live: bool) -> Self {
        let base_url = if is_live { LIVE_URL } else { SANDBOX_URL };
        Self::with_client(reqwest::Client::new(), base_url, store_id, store_password)
    }

    /// Use a pre-built client against an explicit base URL.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        store_id: &str,
        store_password: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            store_id: store_id.to_string(),
            store_password: store_password.to_string(),
        }
    }
}

#[async_trait]
impl CheckoutGateway for SslCommerzClient {
    async fn open_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/gwprocess/v4/api.php", self.base_url);
        log::debug!("POST {} for {}", url, request.tran_id);

        let mut form = request.form_fields();
        form.push(("store_id", self.store_id.clone()));
        form.push(("store_passwd", self.store_password.clone()));

        let resp = self.http.post(&url).form(&form).send().await?;
        let init: InitResponse = read_json(resp).await?;

        if init.status == "SUCCESS" {
            if let Some(gateway_url) = init.gateway_page_url.filter(|url| !url.is_empty()) {
                return Ok(CheckoutSession {
                    gateway_url,
                    session_key: init.sessionkey,
                });
            }
        }

        Err(GatewayError::Declined(
            init.failedreason
                .filter(|reason| !reason.is_empty())
                .unwrap_or(init.status),
        ))
    }

    async fn validate(&self, val_id: &str) -> Result<ValidatedPayment, GatewayError> {
        let url = format!("{}/validator/api/validationserverAPI.php", self.base_url);
        log::debug!("GET {} for {}", url, val_id);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("val_id", val_id),
                ("store_id", self.store_id.as_str()),
                ("store_passwd", self.store_password.as_str()),
                ("v", "1"),
                ("format", "json"),
            ])
            .send()
            .await?;
        read_json(resp).await
    }
}
