use async_trait::async_trait;
use common::config::PaymentConfig;
use orders::error::{OrderError, OrderResult};
use orders::payment::{Charge, PaymentProvider, Refund};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

/// HTTP adapter for the hosted payment API. Amounts cross the wire in the
/// configured currency; charge and refund ids come back from the provider
/// and are stored verbatim on the order.
pub struct RestPaymentProvider {
    client: Client,
    config: PaymentConfig,
}

impl RestPaymentProvider {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> OrderResult<T> {
        let url = format!("{}/{}", self.config.api_url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OrderError::PaymentProvider(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, path, "Payment provider rejected request");
            return Err(OrderError::PaymentProvider(format!(
                "{path} returned {status}: {detail}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| OrderError::PaymentProvider(format!("invalid {path} response: {e}")))
    }
}

#[async_trait]
impl PaymentProvider for RestPaymentProvider {
    async fn create_charge(&self, amount: f64, source: &str) -> OrderResult<Charge> {
        debug!(amount, "Creating charge");
        self.post_json(
            "charges",
            json!({
                "amount": amount,
                "currency": self.config.currency,
                "source": source,
            }),
        )
        .await
    }

    async fn refund(&self, charge_id: &str, amount: f64, reason: &str) -> OrderResult<Refund> {
        debug!(charge_id, amount, "Requesting refund");
        self.post_json(
            "refunds",
            json!({
                "charge": charge_id,
                "amount": amount,
                "reason": reason,
            }),
        )
        .await
    }
}
