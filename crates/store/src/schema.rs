//! Table definitions.

use rusqlite::Connection;

use crate::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS role_panels (
    panel_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    guild_id    INTEGER NOT NULL,
    channel_id  INTEGER NOT NULL,
    section     TEXT    NOT NULL,
    description TEXT,
    message_id  INTEGER,
    UNIQUE(guild_id, channel_id, section)
);

CREATE TABLE IF NOT EXISTS role_mappings (
    panel_id INTEGER NOT NULL REFERENCES role_panels(panel_id) ON DELETE CASCADE,
    reaction TEXT    NOT NULL,
    role_id  INTEGER NOT NULL,
    PRIMARY KEY(panel_id, reaction)
);

CREATE TABLE IF NOT EXISTS stream_watches (
    guild_id       INTEGER NOT NULL,
    channel_id     INTEGER NOT NULL,
    streamer_login TEXT    NOT NULL,
    notify_role_id INTEGER NOT NULL,
    message_id     INTEGER,
    message_status TEXT CHECK(message_status IN ('live', 'offline')),
    PRIMARY KEY(guild_id, channel_id, streamer_login)
);

CREATE TABLE IF NOT EXISTS user_timezones (
    guild_id INTEGER NOT NULL,
    user_id  INTEGER NOT NULL,
    timezone TEXT    NOT NULL,
    PRIMARY KEY(guild_id, user_id)
);
";

pub(crate) fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
