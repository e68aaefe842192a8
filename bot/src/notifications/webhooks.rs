//! Per-channel webhook resolution with a single-flight cache.

use std::collections::HashMap;
use std::sync::Arc;

use platform::{ChannelId, Gateway, GatewayError, Webhook};
use tokio::sync::Mutex;

pub const WEBHOOK_NAME: &str = "twitch-notifications";

/// Resolves the bot-owned webhook for a channel, creating it on first
/// use. The cache lock is held across the list/create round trip so
/// two concurrent misses for one channel cannot both create a webhook.
pub struct WebhookCache {
    gateway: Arc<dyn Gateway>,
    cache: Mutex<HashMap<ChannelId, Webhook>>,
}

impl WebhookCache {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_create(&self, channel: ChannelId) -> Result<Webhook, GatewayError> {
        let mut cache = self.cache.lock().await;
        if let Some(webhook) = cache.get(&channel) {
            return Ok(webhook.clone());
        }

        let existing = self
            .gateway
            .list_webhooks(channel)
            .await?
            .into_iter()
            .find(|w| w.name == WEBHOOK_NAME);
        let webhook = match existing {
            Some(webhook) => webhook,
            None => {
                let webhook = self.gateway.create_webhook(channel, WEBHOOK_NAME).await?;
                tracing::info!(%channel, webhook = %webhook.id, "created notification webhook");
                webhook
            }
        };
        cache.insert(channel, webhook.clone());
        Ok(webhook)
    }

    /// Drop a cached entry, e.g. after an execution failed because the
    /// webhook was deleted out of band.
    pub async fn invalidate(&self, channel: ChannelId) {
        self.cache.lock().await.remove(&channel);
    }
}
