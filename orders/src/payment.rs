use crate::error::OrderResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub id: String,
    pub charge_id: String,
    pub amount: f64,
    pub status: String,
}

/// Seam to the external payment provider. The service only ever talks to
/// this trait; the concrete adapter lives in the application crate and the
/// tests mock it.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_charge(&self, amount: f64, source: &str) -> OrderResult<Charge>;

    async fn refund(&self, charge_id: &str, amount: f64, reason: &str) -> OrderResult<Refund>;
}
