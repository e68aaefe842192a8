use std::collections::HashMap;

use super::*;
use crate::AppToken;
use crate::api::models::ChannelInfo;

impl HelixClient {
    /// Fetch channel metadata for the given broadcaster ids, keyed by
    /// lowercase broadcaster login.
    pub async fn get_channel_info(
        &self,
        token: &AppToken,
        broadcaster_ids: &[String],
    ) -> Result<HashMap<String, ChannelInfo>, TwitchError> {
        if broadcaster_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let urls = batched_urls("channels", "broadcaster_id", broadcaster_ids)?;
        let data: Vec<ChannelInfo> = self.fetch_batched(urls, token).await?;
        Ok(data
            .into_iter()
            .map(|c| (c.broadcaster_login.to_lowercase(), c))
            .collect())
    }
}
