use std::collections::HashMap;

use super::*;
use crate::AppToken;
use crate::api::models::GameData;

impl HelixClient {
    /// Fetch game metadata by exact name, keyed by lowercase name.
    pub async fn get_games(
        &self,
        token: &AppToken,
        names: &[String],
    ) -> Result<HashMap<String, GameData>, TwitchError> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let urls = batched_urls("games", "name", names)?;
        let data: Vec<GameData> = self.fetch_batched(urls, token).await?;
        Ok(data
            .into_iter()
            .map(|g| (g.name.to_lowercase(), g))
            .collect())
    }
}
