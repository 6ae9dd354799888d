use crate::model::{ModelId, OrderStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeNotice {
    pub order_id: ModelId,
    pub user_id: ModelId,
    pub new_status: OrderStatus,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn order_status_changed(
        &self,
        notice: &StatusChangeNotice,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Single best-effort attempt after the transaction has committed. Failures
/// are logged and dropped; there is no retry or queue.
pub async fn notify_status_change(sender: &dyn NotificationSender, notice: StatusChangeNotice) {
    if let Err(e) = sender.order_status_changed(&notice).await {
        warn!(
            order_id = notice.order_id,
            status = %notice.new_status,
            error = %e,
            "Failed to dispatch status-change notification"
        );
    }
}
