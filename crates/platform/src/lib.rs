//! Chat-platform gateway contract.
//!
//! The bot core never talks to the chat platform directly; it consumes
//! the [`Gateway`] trait defined here. A production adapter bridges it
//! to the real client library, tests use an in-memory fake.

pub mod gateway;
pub mod reaction;

pub use async_trait::async_trait;
pub use gateway::{Gateway, ReactionEvent, ReactionEventKind};
pub use reaction::ReactionKey;

use chrono::{DateTime, Utc};

macro_rules! snowflake_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u64);

            impl $name {
                /// SQLite-friendly representation.
                pub fn as_db(self) -> i64 {
                    self.0 as i64
                }

                pub fn from_db(raw: i64) -> Self {
                    Self(raw as u64)
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

snowflake_id!(GuildId, ChannelId, MessageId, RoleId, UserId, WebhookId);

impl RoleId {
    pub fn mention(self) -> String {
        format!("<@&{}>", self.0)
    }
}

impl UserId {
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

impl ChannelId {
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub display_name: String,
    pub roles: Vec<RoleId>,
}

/// A message as observed through the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub content: String,
    pub embeds: Vec<Embed>,
    pub suppress_notifications: bool,
    /// Distinct reaction emojis currently present on the message.
    pub reactions: Vec<ReactionKey>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embed {
    pub author: Option<EmbedAuthor>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub content: String,
    pub suppress_notifications: bool,
}

/// Per-channel posting capability. A webhook token is an execution
/// secret; handles must not be shared across channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Webhook {
    pub id: WebhookId,
    pub channel_id: ChannelId,
    pub name: String,
    pub token: String,
}

/// Payload for webhook execution/edits. A `None` embed on an edit
/// clears any existing embeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookPayload {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub content: String,
    pub embed: Option<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Watching(String),
    Idle,
}

/// Whether a channel can host bot-posted status messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCapability {
    /// Messages can be posted; `publishable` channels additionally
    /// support crossposting to followers.
    Post { publishable: bool },
    Unsupported(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("missing permission: {0}")]
    Forbidden(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("transport error: {0}")]
    Transport(String),
}
