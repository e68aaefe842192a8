//! Stream-status reconciliation.
//!
//! Each tick fetches one batched snapshot of Twitch state for every
//! watched streamer, then drives each persisted watch toward that
//! snapshot: a going-live transition posts a fresh announcement, an
//! ongoing stream edits the existing card in place, a gone-offline
//! transition rewrites the card into a VOD pointer. The persisted
//! `message_status` column decides transitions; card content is never
//! parsed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use platform::{
    ChannelCapability, ChannelId, Gateway, GatewayError, GuildId, Message, MessageId, Presence,
    RoleId, WebhookPayload,
};
use store::{Database, MessageStatus, StreamWatch};
use twitch_api::api::models::{ChannelInfo, GameData, StreamData, UserData, VideoData};
use twitch_api::{AppToken, TwitchClient};

use crate::error::{BotError, BotResult};
use crate::notifications::card;
use crate::notifications::webhooks::WebhookCache;
use crate::scheduler::TickOutcome;

/// Guilds processed concurrently per tick.
const GUILD_CONCURRENCY: usize = 10;

/// One tick's view of Twitch state, keyed by lowercase login (streams,
/// users, channels) or lowercase game name.
pub(crate) struct Snapshot {
    pub(crate) streams: HashMap<String, StreamData>,
    pub(crate) users: HashMap<String, UserData>,
    pub(crate) games: HashMap<String, GameData>,
    pub(crate) channels: HashMap<String, ChannelInfo>,
}

pub struct Notifier {
    gateway: Arc<dyn Gateway>,
    db: Database,
    twitch: Option<TwitchClient>,
    webhooks: WebhookCache,
}

impl Notifier {
    pub fn new(gateway: Arc<dyn Gateway>, db: Database, twitch: Option<TwitchClient>) -> Self {
        let webhooks = WebhookCache::new(gateway.clone());
        Self {
            gateway,
            db,
            twitch,
            webhooks,
        }
    }

    /// Start watching a streamer in a channel. Re-adding an existing
    /// watch updates its notification role and keeps the status card.
    pub async fn add_watch(
        &self,
        guild: GuildId,
        channel: ChannelId,
        streamer_login: &str,
        notify_role: RoleId,
    ) -> BotResult<String> {
        let login = streamer_login.trim().to_lowercase();
        if login.is_empty() {
            return Err(BotError::validation("streamer name must not be empty"));
        }
        match self.gateway.channel_capability(channel).await? {
            ChannelCapability::Post { .. } => {}
            ChannelCapability::Unsupported(kind) => {
                return Err(BotError::Precondition(format!(
                    "{} cannot host stream notifications ({kind})",
                    channel.mention()
                )));
            }
        }
        if let Some(twitch) = &self.twitch {
            let token = twitch.tokens.app_token().await?;
            let users = twitch.api.get_users(&token, &[login.clone()]).await?;
            if !users.contains_key(&login) {
                return Err(BotError::validation(format!(
                    "no Twitch user named {login}"
                )));
            }
        }

        self.db.upsert_watch(guild, channel, &login, notify_role)?;
        tracing::info!(%guild, %channel, %login, role = %notify_role, "added stream watch");
        Ok(format!(
            "now posting stream notifications for {login} in {}",
            channel.mention()
        ))
    }

    /// Stop watching a streamer and remove its status card.
    pub async fn remove_watch(
        &self,
        guild: GuildId,
        channel: ChannelId,
        streamer_login: &str,
    ) -> BotResult<String> {
        let login = streamer_login.trim().to_lowercase();
        let watch = self.db.find_watch(guild, channel, &login)?.ok_or_else(|| {
            BotError::validation(format!(
                "no stream notification for {login} in {}",
                channel.mention()
            ))
        })?;

        if let Some(message_id) = watch.message_id {
            if let Err(err) = self.gateway.delete_message(channel, message_id).await {
                tracing::warn!(%login, %message_id, error = %err, "failed to delete status card");
            }
        }
        self.db.delete_watch(guild, channel, &login)?;
        tracing::info!(%guild, %channel, %login, "removed stream watch");
        Ok(format!(
            "stopped stream notifications for {login} in {}",
            channel.mention()
        ))
    }

    /// Human-readable listing of every watch in the guild.
    pub fn list_watches_text(&self, guild: GuildId) -> BotResult<String> {
        let watches = self.db.list_watches(guild)?;
        if watches.is_empty() {
            return Ok("no stream notifications configured".to_string());
        }
        let lines: Vec<String> = watches
            .iter()
            .map(|w| {
                format!(
                    "{} {} (notifies {})",
                    w.channel_id.mention(),
                    w.streamer_login,
                    w.notify_role_id.mention()
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    /// One poll tick over the given guilds.
    pub async fn check_all(&self, guilds: &[GuildId]) -> TickOutcome {
        let Some(twitch) = &self.twitch else {
            return TickOutcome::NoCredentials;
        };
        let token = match twitch.tokens.app_token().await {
            Ok(token) => token,
            Err(err) => return TickOutcome::Failed(format!("token refresh failed: {err}")),
        };

        let mut by_guild = Vec::new();
        let mut logins = HashSet::new();
        for &guild in guilds {
            let watches = match self.db.list_watches(guild) {
                Ok(watches) => watches,
                Err(err) => {
                    tracing::error!(%guild, error = %err, "failed to load watches");
                    continue;
                }
            };
            for watch in &watches {
                logins.insert(watch.streamer_login.to_lowercase());
            }
            if !watches.is_empty() {
                by_guild.push((guild, watches));
            }
        }

        // No early return for an empty watch set: the presence update
        // in apply_snapshot must still run so removing the last watch
        // clears a stale "watching" status. Empty logins produce no
        // upstream requests.
        let logins: Vec<String> = logins.into_iter().collect();
        let snapshot = match self.fetch_snapshot(twitch, &token, &logins).await {
            Ok(snapshot) => snapshot,
            Err(err) => return TickOutcome::Failed(format!("snapshot fetch failed: {err}")),
        };

        self.apply_snapshot(by_guild, &snapshot, Some(&token)).await
    }

    async fn fetch_snapshot(
        &self,
        twitch: &TwitchClient,
        token: &AppToken,
        logins: &[String],
    ) -> Result<Snapshot, twitch_api::TwitchError> {
        let streams = twitch.api.get_streams(token, logins).await?;
        let users = twitch.api.get_users(token, logins).await?;

        let game_names: Vec<String> = streams
            .values()
            .map(|s| s.game_name.clone())
            .filter(|name| !name.is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let games = twitch.api.get_games(token, &game_names).await?;

        let user_ids: Vec<String> = users.values().map(|u| u.id.clone()).collect();
        let channels = twitch.api.get_channel_info(token, &user_ids).await?;

        Ok(Snapshot {
            streams,
            users,
            games,
            channels,
        })
    }

    /// Drive every watch toward the snapshot and update presence.
    pub(crate) async fn apply_snapshot(
        &self,
        by_guild: Vec<(GuildId, Vec<StreamWatch>)>,
        snapshot: &Snapshot,
        token: Option<&AppToken>,
    ) -> TickOutcome {
        self.update_presence(snapshot).await;

        let mut watches = 0;
        let mut live = 0;
        for (_, guild_watches) in &by_guild {
            watches += guild_watches.len();
            live += guild_watches
                .iter()
                .filter(|w| snapshot.streams.contains_key(&w.streamer_login.to_lowercase()))
                .count();
        }

        for chunk in by_guild.chunks(GUILD_CONCURRENCY) {
            let tasks = chunk
                .iter()
                .map(|(guild, guild_watches)| self.process_guild(*guild, guild_watches, snapshot, token));
            join_all(tasks).await;
        }

        TickOutcome::Completed { watches, live }
    }

    async fn process_guild(
        &self,
        guild: GuildId,
        watches: &[StreamWatch],
        snapshot: &Snapshot,
        token: Option<&AppToken>,
    ) {
        for watch in watches {
            if let Err(err) = self.update_status_message(watch, snapshot, token).await {
                tracing::error!(
                    %guild,
                    channel = %watch.channel_id,
                    login = %watch.streamer_login,
                    error = %err,
                    "status card update failed"
                );
            }
        }
    }

    /// The bot presence reflects the overall live set. The pick among
    /// multiple live streamers is deterministic (lowest login) so
    /// repeated ticks do not flap.
    async fn update_presence(&self, snapshot: &Snapshot) {
        let mut lives: Vec<&StreamData> = snapshot.streams.values().collect();
        lives.sort_by(|a, b| a.user_login.cmp(&b.user_login));

        let presence = match lives.as_slice() {
            [] => Presence::Idle,
            [only] => Presence::Watching(only.user_name.clone()),
            [first, rest @ ..] => {
                Presence::Watching(format!("{} and {} more", first.user_name, rest.len()))
            }
        };
        if let Err(err) = self.gateway.set_presence(presence).await {
            tracing::warn!(error = %err, "failed to update presence");
        }
    }

    async fn update_status_message(
        &self,
        watch: &StreamWatch,
        snapshot: &Snapshot,
        token: Option<&AppToken>,
    ) -> BotResult<()> {
        let login = watch.streamer_login.to_lowercase();
        let prior = self.prior_message(watch).await?;

        match snapshot.streams.get(&login) {
            Some(stream) => self.apply_live(watch, &login, stream, snapshot, prior).await,
            None => self.apply_offline(watch, &login, snapshot, prior, token).await,
        }
    }

    async fn apply_live(
        &self,
        watch: &StreamWatch,
        login: &str,
        stream: &StreamData,
        snapshot: &Snapshot,
        prior: Option<Message>,
    ) -> BotResult<()> {
        let user = snapshot.users.get(login);
        let content = card::online_content(login, watch.notify_role_id);
        let embed = match user {
            Some(user) => Some(card::online_embed(stream, user, snapshot.games.get(&stream.game_name.to_lowercase()))),
            None => None,
        };

        if watch.message_status == Some(MessageStatus::Live) {
            if let Some(prior) = &prior {
                // Still live: edit the existing announcement in place
                // so title/game changes show without a second ping.
                if !card::needs_edit(prior, &content, embed.as_ref()) {
                    return Ok(());
                }
                let payload = WebhookPayload {
                    username: None,
                    avatar_url: None,
                    content: content.clone(),
                    embed: embed.clone(),
                };
                if self
                    .webhook_edit(watch.channel_id, prior.id, payload)
                    .await?
                    .is_some()
                {
                    tracing::debug!(login, "refreshed live card");
                    return Ok(());
                }
                // The card or its webhook is gone; fall through and
                // announce fresh.
                tracing::warn!(login, "live card unreachable, reposting");
            }
        }

        // Going live (or the old card vanished): a fresh announcement
        // so the channel gets a notification.
        let payload = WebhookPayload {
            username: user.map(|u| u.display_name.clone()),
            avatar_url: user.and_then(|u| {
                if u.profile_image_url.is_empty() {
                    None
                } else {
                    Some(u.profile_image_url.clone())
                }
            }),
            content,
            embed,
        };
        let message = self.webhook_execute(watch.channel_id, payload).await?;
        tracing::info!(login, channel = %watch.channel_id, "posted live announcement");

        if let ChannelCapability::Post { publishable: true } =
            self.gateway.channel_capability(watch.channel_id).await?
        {
            if let Err(err) = self
                .gateway
                .publish_message(watch.channel_id, message.id)
                .await
            {
                tracing::warn!(login, error = %err, "failed to publish announcement");
            }
        }

        self.db.update_watch_message(
            watch.guild_id,
            watch.channel_id,
            &watch.streamer_login,
            Some(message.id),
            Some(MessageStatus::Live),
        )?;

        // The superseded card, live or offline, goes away.
        if let Some(prior) = prior {
            if prior.id != message.id {
                if let Err(err) = self.gateway.delete_message(watch.channel_id, prior.id).await {
                    tracing::warn!(login, message = %prior.id, error = %err, "failed to delete superseded card");
                }
            }
        }
        Ok(())
    }

    async fn apply_offline(
        &self,
        watch: &StreamWatch,
        login: &str,
        snapshot: &Snapshot,
        prior: Option<Message>,
        token: Option<&AppToken>,
    ) -> BotResult<()> {
        // Offline card already in place; it is not refreshed until the
        // next live transition.
        if watch.message_status == Some(MessageStatus::Offline) && prior.is_some() {
            return Ok(());
        }

        let Some(channel_info) = snapshot.channels.get(login) else {
            tracing::warn!(login, "no channel metadata, skipping offline card");
            return Ok(());
        };

        let vod = self.last_vod(&channel_info.broadcaster_id, token).await;
        let content = card::offline_content(login, channel_info, vod.as_ref());

        // A `None` embed clears the live embed from the edited card.
        let payload = WebhookPayload {
            username: None,
            avatar_url: None,
            content,
            embed: None,
        };
        let edited = match &prior {
            Some(prior) => self.webhook_edit(watch.channel_id, prior.id, payload.clone()).await?,
            None => None,
        };
        let message = match edited {
            Some(message) => message,
            None => self.webhook_execute(watch.channel_id, payload).await?,
        };
        tracing::info!(login, channel = %watch.channel_id, "posted offline card");

        self.db.update_watch_message(
            watch.guild_id,
            watch.channel_id,
            &watch.streamer_login,
            Some(message.id),
            Some(MessageStatus::Offline),
        )?;

        if let Some(prior) = prior {
            if prior.id != message.id {
                if let Err(err) = self.gateway.delete_message(watch.channel_id, prior.id).await {
                    tracing::warn!(login, message = %prior.id, error = %err, "failed to delete superseded card");
                }
            }
        }
        Ok(())
    }

    /// Post through the channel's cached webhook, retrying once with a
    /// freshly resolved webhook when the cached one was deleted out of
    /// band.
    async fn webhook_execute(
        &self,
        channel: ChannelId,
        payload: WebhookPayload,
    ) -> BotResult<Message> {
        let webhook = self.webhooks.get_or_create(channel).await?;
        match self.gateway.execute_webhook(&webhook, payload.clone()).await {
            Ok(message) => Ok(message),
            Err(GatewayError::NotFound(_)) => {
                tracing::warn!(%channel, "cached webhook is gone, resolving a fresh one");
                self.webhooks.invalidate(channel).await;
                let webhook = self.webhooks.get_or_create(channel).await?;
                Ok(self.gateway.execute_webhook(&webhook, payload).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Edit a card through the channel's cached webhook. `None` means
    /// the card or its webhook is gone; the cache entry is dropped and
    /// the caller posts a fresh card instead.
    async fn webhook_edit(
        &self,
        channel: ChannelId,
        message: MessageId,
        payload: WebhookPayload,
    ) -> BotResult<Option<Message>> {
        let webhook = self.webhooks.get_or_create(channel).await?;
        match self
            .gateway
            .edit_webhook_message(&webhook, message, payload)
            .await
        {
            Ok(message) => Ok(Some(message)),
            Err(GatewayError::NotFound(_)) => {
                self.webhooks.invalidate(channel).await;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn prior_message(&self, watch: &StreamWatch) -> BotResult<Option<Message>> {
        let Some(message_id) = watch.message_id else {
            return Ok(None);
        };
        match self.gateway.get_message(watch.channel_id, message_id).await {
            Ok(message) => Ok(Some(message)),
            Err(GatewayError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn last_vod(&self, user_id: &str, token: Option<&AppToken>) -> Option<VideoData> {
        let twitch = self.twitch.as_ref()?;
        let token = token?;
        match twitch.api.get_last_vod(token, user_id).await {
            Ok(vod) => vod,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "VOD lookup failed");
                None
            }
        }
    }
}
