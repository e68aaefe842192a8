//! The consumed gateway trait.
//!
//! Every method is a remote call that can fail or rate-limit; callers
//! decide per call site whether a failure is fatal or skippable.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    ChannelCapability, ChannelId, GatewayError, GuildId, Member, Message, MessageId, NewMessage,
    Presence, ReactionKey, Role, RoleId, UserId, Webhook, WebhookPayload,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionEventKind {
    Added,
    Removed,
}

/// A single reaction add/remove on a subscribed message.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub kind: ReactionEventKind,
    pub user_id: UserId,
    pub key: ReactionKey,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// The bot's own account id; used to ignore self-inflicted events.
    fn current_user_id(&self) -> UserId;

    async fn list_guilds(&self) -> Result<Vec<GuildId>, GatewayError>;

    async fn channel_capability(
        &self,
        channel: ChannelId,
    ) -> Result<ChannelCapability, GatewayError>;

    async fn create_message(
        &self,
        channel: ChannelId,
        message: NewMessage,
    ) -> Result<Message, GatewayError>;

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: String,
    ) -> Result<Message, GatewayError>;

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), GatewayError>;

    async fn get_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<Message, GatewayError>;

    /// Add the bot's own reaction; adding an already-present reaction
    /// is a no-op upstream.
    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        key: &ReactionKey,
    ) -> Result<(), GatewayError>;

    /// Remove every reaction with this emoji from the message.
    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        key: &ReactionKey,
    ) -> Result<(), GatewayError>;

    async fn list_reactors(
        &self,
        channel: ChannelId,
        message: MessageId,
        key: &ReactionKey,
    ) -> Result<Vec<UserId>, GatewayError>;

    async fn get_role(&self, guild: GuildId, role: RoleId) -> Result<Option<Role>, GatewayError>;

    async fn get_member(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Option<Member>, GatewayError>;

    async fn grant_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), GatewayError>;

    async fn revoke_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), GatewayError>;

    async fn list_webhooks(&self, channel: ChannelId) -> Result<Vec<Webhook>, GatewayError>;

    async fn create_webhook(
        &self,
        channel: ChannelId,
        name: &str,
    ) -> Result<Webhook, GatewayError>;

    async fn execute_webhook(
        &self,
        webhook: &Webhook,
        payload: WebhookPayload,
    ) -> Result<Message, GatewayError>;

    async fn edit_webhook_message(
        &self,
        webhook: &Webhook,
        message: MessageId,
        payload: WebhookPayload,
    ) -> Result<Message, GatewayError>;

    /// Crosspost a message in a publishable channel.
    async fn publish_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), GatewayError>;

    async fn set_presence(&self, presence: Presence) -> Result<(), GatewayError>;

    /// Long-lived reaction event feed scoped to one message. The feed
    /// ends when the sender side is dropped; consumers additionally
    /// race it against their own cancellation token.
    async fn subscribe_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<mpsc::Receiver<ReactionEvent>, GatewayError>;
}
