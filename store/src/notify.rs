use async_trait::async_trait;
use common::config::NotificationConfig;
use orders::notify::{NotificationSender, StatusChangeNotice};
use reqwest::Client;
use serde_json::json;
use std::error::Error;
use tracing::{debug, info};

/// Posts status-change notices to the mail API. Templating happens on the
/// mail service side; this adapter only supplies the variables.
pub struct MailApiNotifier {
    client: Client,
    config: NotificationConfig,
}

impl MailApiNotifier {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl NotificationSender for MailApiNotifier {
    async fn order_status_changed(
        &self,
        notice: &StatusChangeNotice,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let body = json!({
            "from": self.config.from_address,
            "template": "order-status-changed",
            "variables": {
                "orderId": notice.order_id,
                "userId": notice.user_id,
                "status": notice.new_status.to_string(),
            },
        });

        let response = self
            .client
            .post(format!("{}/messages", self.config.api_url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("mail API returned {status}: {detail}").into());
        }

        debug!(order_id = notice.order_id, "Status-change notification sent");
        Ok(())
    }
}

/// Used when notifications are disabled in config; still records the event
/// in the logs so the behavior is observable in development.
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn order_status_changed(
        &self,
        notice: &StatusChangeNotice,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        info!(
            order_id = notice.order_id,
            user_id = notice.user_id,
            status = %notice.new_status,
            "Order status changed (notifications disabled)"
        );
        Ok(())
    }
}
