//! Role-chooser panels and their reaction-to-role mappings.

use platform::{ChannelId, GuildId, MessageId, ReactionKey, RoleId};
use rusqlite::{OptionalExtension, Row, params};

use crate::{Database, StoreError};

/// One reaction-role panel: a message in a channel plus its mapping,
/// identified by (guild, channel, section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePanel {
    pub panel_id: i64,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub section: String,
    pub description: Option<String>,
    /// Backing message; created lazily on first reconciliation.
    pub message_id: Option<MessageId>,
}

fn panel_from_row(row: &Row<'_>) -> Result<RolePanel, rusqlite::Error> {
    Ok(RolePanel {
        panel_id: row.get(0)?,
        guild_id: GuildId::from_db(row.get(1)?),
        channel_id: ChannelId::from_db(row.get(2)?),
        section: row.get(3)?,
        description: row.get(4)?,
        message_id: row.get::<_, Option<i64>>(5)?.map(MessageId::from_db),
    })
}

const PANEL_COLUMNS: &str =
    "panel_id, guild_id, channel_id, section, description, message_id";

impl Database {
    pub fn find_panel(
        &self,
        guild: GuildId,
        channel: ChannelId,
        section: &str,
    ) -> Result<Option<RolePanel>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PANEL_COLUMNS} FROM role_panels
                 WHERE guild_id = ?1 AND channel_id = ?2 AND section = ?3"
            ))?;
            let panel = stmt
                .query_row(
                    params![guild.as_db(), channel.as_db(), section],
                    panel_from_row,
                )
                .optional()?;
            Ok(panel)
        })
    }

    /// Find the panel for (guild, channel, section), creating the row
    /// if it does not exist. Insert and read-back run under a single
    /// connection lock, so concurrent callers for the same section
    /// converge on one row.
    pub fn find_or_create_panel(
        &self,
        guild: GuildId,
        channel: ChannelId,
        section: &str,
    ) -> Result<RolePanel, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO role_panels (guild_id, channel_id, section)
                 VALUES (?1, ?2, ?3)",
                params![guild.as_db(), channel.as_db(), section],
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {PANEL_COLUMNS} FROM role_panels
                 WHERE guild_id = ?1 AND channel_id = ?2 AND section = ?3"
            ))?;
            let panel = stmt.query_row(
                params![guild.as_db(), channel.as_db(), section],
                panel_from_row,
            )?;
            Ok(panel)
        })
    }

    pub fn update_panel_message(
        &self,
        panel_id: i64,
        message: Option<MessageId>,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE role_panels SET message_id = ?2 WHERE panel_id = ?1",
                params![panel_id, message.map(MessageId::as_db)],
            )?;
            Ok(())
        })
    }

    /// Rename a section in place. Uniqueness of the new name must be
    /// checked by the caller before mutating.
    pub fn rename_panel_section(&self, panel_id: i64, section: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE role_panels SET section = ?2 WHERE panel_id = ?1",
                params![panel_id, section],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("panel {panel_id}")));
            }
            Ok(())
        })
    }

    /// Delete a panel row; its mappings cascade.
    pub fn delete_panel(&self, panel_id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM role_panels WHERE panel_id = ?1", [panel_id])?;
            Ok(())
        })
    }

    pub fn list_panels_in_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<Vec<RolePanel>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PANEL_COLUMNS} FROM role_panels
                 WHERE guild_id = ?1 AND channel_id = ?2 ORDER BY panel_id"
            ))?;
            let rows = stmt.query_map(params![guild.as_db(), channel.as_db()], panel_from_row)?;
            let mut panels = Vec::new();
            for row in rows {
                panels.push(row?);
            }
            Ok(panels)
        })
    }

    pub fn list_all_panels(&self, guild: GuildId) -> Result<Vec<RolePanel>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PANEL_COLUMNS} FROM role_panels
                 WHERE guild_id = ?1 ORDER BY panel_id"
            ))?;
            let rows = stmt.query_map([guild.as_db()], panel_from_row)?;
            let mut panels = Vec::new();
            for row in rows {
                panels.push(row?);
            }
            Ok(panels)
        })
    }

    /// Insert a mapping; returns false (and leaves the store untouched)
    /// if the reaction key is already mapped within the panel.
    pub fn insert_mapping(
        &self,
        panel_id: i64,
        key: &ReactionKey,
        role: RoleId,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO role_mappings (panel_id, reaction, role_id)
                 VALUES (?1, ?2, ?3)",
                params![panel_id, key.mention(), role.as_db()],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn delete_mapping(&self, panel_id: i64, key: &ReactionKey) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM role_mappings WHERE panel_id = ?1 AND reaction = ?2",
                params![panel_id, key.mention()],
            )?;
            Ok(())
        })
    }

    pub fn list_mappings(&self, panel_id: i64) -> Result<Vec<(ReactionKey, RoleId)>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT reaction, role_id FROM role_mappings
                 WHERE panel_id = ?1 ORDER BY reaction",
            )?;
            let rows = stmt.query_map([panel_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut mappings = Vec::new();
            for row in rows {
                let (raw, role) = row?;
                let key = raw
                    .parse::<ReactionKey>()
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                mappings.push((key, RoleId::from_db(role)));
            }
            Ok(mappings)
        })
    }
}
