//! Tracked streamers and their status-card messages.

use platform::{ChannelId, GuildId, MessageId, RoleId};
use rusqlite::{OptionalExtension, Row, params};

use crate::{Database, StoreError};

/// Persisted classification of the current status card. Stored
/// explicitly instead of being inferred from message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Live,
    Offline,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Live => "live",
            MessageStatus::Offline => "offline",
        }
    }

    fn from_db(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "live" => Ok(MessageStatus::Live),
            "offline" => Ok(MessageStatus::Offline),
            other => Err(StoreError::InvalidData(format!(
                "unknown message status {other:?}"
            ))),
        }
    }
}

/// One tracked streamer for a guild channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamWatch {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub streamer_login: String,
    pub notify_role_id: RoleId,
    /// The single status card currently representing this streamer in
    /// the channel, together with how it was last styled.
    pub message_id: Option<MessageId>,
    pub message_status: Option<MessageStatus>,
}

fn watch_from_row(row: &Row<'_>) -> Result<(StreamWatch, Option<String>), rusqlite::Error> {
    Ok((
        StreamWatch {
            guild_id: GuildId::from_db(row.get(0)?),
            channel_id: ChannelId::from_db(row.get(1)?),
            streamer_login: row.get(2)?,
            notify_role_id: RoleId::from_db(row.get(3)?),
            message_id: row.get::<_, Option<i64>>(4)?.map(MessageId::from_db),
            message_status: None,
        },
        row.get(5)?,
    ))
}

fn finish(pair: (StreamWatch, Option<String>)) -> Result<StreamWatch, StoreError> {
    let (mut watch, status) = pair;
    watch.message_status = status.as_deref().map(MessageStatus::from_db).transpose()?;
    Ok(watch)
}

const WATCH_COLUMNS: &str =
    "guild_id, channel_id, streamer_login, notify_role_id, message_id, message_status";

impl Database {
    /// Insert or update a watch. An existing status card and its
    /// classification survive role changes.
    pub fn upsert_watch(
        &self,
        guild: GuildId,
        channel: ChannelId,
        streamer_login: &str,
        notify_role: RoleId,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO stream_watches (guild_id, channel_id, streamer_login, notify_role_id)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(guild_id, channel_id, streamer_login)
                 DO UPDATE SET notify_role_id = ?4",
                params![guild.as_db(), channel.as_db(), streamer_login, notify_role.as_db()],
            )?;
            Ok(())
        })
    }

    pub fn delete_watch(
        &self,
        guild: GuildId,
        channel: ChannelId,
        streamer_login: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM stream_watches
                 WHERE guild_id = ?1 AND channel_id = ?2 AND streamer_login = ?3",
                params![guild.as_db(), channel.as_db(), streamer_login],
            )?;
            Ok(())
        })
    }

    pub fn find_watch(
        &self,
        guild: GuildId,
        channel: ChannelId,
        streamer_login: &str,
    ) -> Result<Option<StreamWatch>, StoreError> {
        let pair = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WATCH_COLUMNS} FROM stream_watches
                 WHERE guild_id = ?1 AND channel_id = ?2 AND streamer_login = ?3"
            ))?;
            let pair = stmt
                .query_row(
                    params![guild.as_db(), channel.as_db(), streamer_login],
                    watch_from_row,
                )
                .optional()?;
            Ok(pair)
        })?;
        pair.map(finish).transpose()
    }

    pub fn list_watches(&self, guild: GuildId) -> Result<Vec<StreamWatch>, StoreError> {
        let pairs = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WATCH_COLUMNS} FROM stream_watches
                 WHERE guild_id = ?1 ORDER BY channel_id, streamer_login"
            ))?;
            let rows = stmt.query_map([guild.as_db()], watch_from_row)?;
            let mut pairs = Vec::new();
            for row in rows {
                pairs.push(row?);
            }
            Ok(pairs)
        })?;
        pairs.into_iter().map(finish).collect()
    }

    /// Record the current status card for a watch.
    pub fn update_watch_message(
        &self,
        guild: GuildId,
        channel: ChannelId,
        streamer_login: &str,
        message: Option<MessageId>,
        status: Option<MessageStatus>,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE stream_watches SET message_id = ?4, message_status = ?5
                 WHERE guild_id = ?1 AND channel_id = ?2 AND streamer_login = ?3",
                params![
                    guild.as_db(),
                    channel.as_db(),
                    streamer_login,
                    message.map(MessageId::as_db),
                    status.map(MessageStatus::as_str),
                ],
            )?;
            Ok(())
        })
    }
}
