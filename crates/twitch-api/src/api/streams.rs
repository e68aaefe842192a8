use std::collections::HashMap;

use super::*;
use crate::AppToken;
use crate::api::models::StreamData;

impl HelixClient {
    /// Fetch live-stream data for the given logins, keyed by lowercase
    /// login. Streamers that are offline are absent from the map.
    pub async fn get_streams(
        &self,
        token: &AppToken,
        logins: &[String],
    ) -> Result<HashMap<String, StreamData>, TwitchError> {
        if logins.is_empty() {
            return Ok(HashMap::new());
        }

        let urls = batched_urls("streams", "user_login", logins)?;
        let data: Vec<StreamData> = self.fetch_batched(urls, token).await?;
        Ok(data
            .into_iter()
            .map(|s| (s.user_login.to_lowercase(), s))
            .collect())
    }
}
