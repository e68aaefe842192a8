//! Per-user timezone configuration.

use platform::{GuildId, UserId};
use rusqlite::{OptionalExtension, params};

use crate::{Database, StoreError};

impl Database {
    pub fn set_timezone(
        &self,
        guild: GuildId,
        user: UserId,
        timezone: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_timezones (guild_id, user_id, timezone) VALUES (?1, ?2, ?3)
                 ON CONFLICT(guild_id, user_id) DO UPDATE SET timezone = ?3",
                params![guild.as_db(), user.as_db(), timezone],
            )?;
            Ok(())
        })
    }

    pub fn get_timezone(&self, guild: GuildId, user: UserId) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT timezone FROM user_timezones WHERE guild_id = ?1 AND user_id = ?2")?;
            let zone = stmt
                .query_row(params![guild.as_db(), user.as_db()], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?;
            Ok(zone)
        })
    }
}
