use std::collections::HashMap;

use super::*;
use crate::AppToken;
use crate::api::models::UserData;

impl HelixClient {
    /// Fetch user profiles for the given logins, keyed by lowercase
    /// login.
    pub async fn get_users(
        &self,
        token: &AppToken,
        logins: &[String],
    ) -> Result<HashMap<String, UserData>, TwitchError> {
        if logins.is_empty() {
            return Ok(HashMap::new());
        }

        let urls = batched_urls("users", "login", logins)?;
        let data: Vec<UserData> = self.fetch_batched(urls, token).await?;
        Ok(data
            .into_iter()
            .map(|u| (u.login.to_lowercase(), u))
            .collect())
    }
}
