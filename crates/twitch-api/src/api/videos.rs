use url::Url;

use super::*;
use crate::AppToken;
use crate::api::models::VideoData;

impl HelixClient {
    /// Most recent archived VOD for a user, or `None` if the user has
    /// no visible videos.
    pub async fn get_last_vod(
        &self,
        token: &AppToken,
        user_id: &str,
    ) -> Result<Option<VideoData>, TwitchError> {
        let mut url = Url::parse(&format!("{HELIX_BASE}/videos"))?;
        url.query_pairs_mut()
            .append_pair("user_id", user_id)
            .append_pair("type", "archive")
            .append_pair("first", "1");

        let data: Vec<VideoData> = self.fetch_batched(vec![url], token).await?;
        Ok(data.into_iter().next())
    }
}
