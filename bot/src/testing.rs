//! In-memory gateway fake for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use platform::{
    ChannelCapability, ChannelId, Embed, Gateway, GatewayError, GuildId, Member, Message,
    MessageId, NewMessage, Presence, ReactionEvent, ReactionKey, Role, RoleId, UserId, Webhook,
    WebhookId, WebhookPayload, async_trait,
};
use tokio::sync::mpsc;

pub(crate) const FAKE_SELF: UserId = UserId(1);

#[derive(Default)]
pub(crate) struct FakeState {
    pub guilds: Vec<GuildId>,
    pub channels: HashMap<ChannelId, ChannelCapability>,
    pub messages: HashMap<(ChannelId, MessageId), Message>,
    pub reactors: HashMap<(MessageId, ReactionKey), Vec<UserId>>,
    pub roles: HashMap<RoleId, Role>,
    pub members: HashMap<UserId, Member>,
    pub webhooks: HashMap<ChannelId, Vec<Webhook>>,
    pub presence: Option<Presence>,
    pub subscriptions: HashMap<MessageId, Vec<mpsc::Sender<ReactionEvent>>>,
    /// Channels whose gateway calls fail with a transport error.
    pub failing_channels: HashSet<ChannelId>,
    pub deleted: Vec<MessageId>,
    pub edits: usize,
    pub webhook_creates: usize,
    pub webhook_executes: usize,
    pub webhook_edits: usize,
    pub publishes: usize,
    next_id: u64,
}

impl FakeState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

pub(crate) struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState::default()),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_channel(&self, channel: ChannelId, capability: ChannelCapability) {
        self.state().channels.insert(channel, capability);
    }

    pub fn add_role(&self, role: Role) {
        self.state().roles.insert(role.id, role);
    }

    pub fn add_member(&self, member: Member) {
        self.state().members.insert(member.user_id, member);
    }

    pub fn set_reactors(&self, message: MessageId, key: ReactionKey, users: Vec<UserId>) {
        self.state().reactors.insert((message, key), users);
    }

    pub fn put_message(&self, message: Message) {
        self.state()
            .messages
            .insert((message.channel_id, message.id), message);
    }

    pub fn message(&self, channel: ChannelId, id: MessageId) -> Option<Message> {
        self.state().messages.get(&(channel, id)).cloned()
    }

    pub fn messages_in(&self, channel: ChannelId) -> Vec<Message> {
        let state = self.state();
        let mut messages: Vec<Message> = state
            .messages
            .values()
            .filter(|m| m.channel_id == channel)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.id);
        messages
    }

    pub fn member_roles(&self, user: UserId) -> Vec<RoleId> {
        self.state()
            .members
            .get(&user)
            .map(|m| m.roles.clone())
            .unwrap_or_default()
    }

    /// Push a reaction event to every live subscriber of the message.
    pub fn emit_reaction(&self, message: MessageId, event: ReactionEvent) {
        let senders = self
            .state()
            .subscriptions
            .get(&message)
            .cloned()
            .unwrap_or_default();
        for sender in senders {
            let _ = sender.try_send(event.clone());
        }
    }

    pub fn subscriber_count(&self, message: MessageId) -> usize {
        self.state()
            .subscriptions
            .get(&message)
            .map(|s| s.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    fn check_channel(&self, state: &FakeState, channel: ChannelId) -> Result<(), GatewayError> {
        if state.failing_channels.contains(&channel) {
            return Err(GatewayError::Transport("injected failure".to_string()));
        }
        Ok(())
    }

    fn check_webhook(&self, state: &FakeState, webhook: &Webhook) -> Result<(), GatewayError> {
        let known = state
            .webhooks
            .get(&webhook.channel_id)
            .is_some_and(|hooks| hooks.iter().any(|w| w.id == webhook.id));
        if !known {
            return Err(GatewayError::NotFound(format!("webhook {}", webhook.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    fn current_user_id(&self) -> UserId {
        FAKE_SELF
    }

    async fn list_guilds(&self) -> Result<Vec<GuildId>, GatewayError> {
        Ok(self.state().guilds.clone())
    }

    async fn channel_capability(
        &self,
        channel: ChannelId,
    ) -> Result<ChannelCapability, GatewayError> {
        let state = self.state();
        self.check_channel(&state, channel)?;
        Ok(state
            .channels
            .get(&channel)
            .cloned()
            .unwrap_or(ChannelCapability::Unsupported("unknown channel".to_string())))
    }

    async fn create_message(
        &self,
        channel: ChannelId,
        message: NewMessage,
    ) -> Result<Message, GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, channel)?;
        let id = MessageId(state.next_id());
        let created = Message {
            id,
            channel_id: channel,
            content: message.content,
            embeds: vec![],
            suppress_notifications: message.suppress_notifications,
            reactions: vec![],
        };
        state.messages.insert((channel, id), created.clone());
        Ok(created)
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: String,
    ) -> Result<Message, GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, channel)?;
        state.edits += 1;
        let stored = state
            .messages
            .get_mut(&(channel, message))
            .ok_or_else(|| GatewayError::NotFound(format!("message {message}")))?;
        stored.content = content;
        Ok(stored.clone())
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, channel)?;
        state
            .messages
            .remove(&(channel, message))
            .ok_or_else(|| GatewayError::NotFound(format!("message {message}")))?;
        state.deleted.push(message);
        Ok(())
    }

    async fn get_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<Message, GatewayError> {
        let state = self.state();
        self.check_channel(&state, channel)?;
        state
            .messages
            .get(&(channel, message))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("message {message}")))
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        key: &ReactionKey,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, channel)?;
        let stored = state
            .messages
            .get_mut(&(channel, message))
            .ok_or_else(|| GatewayError::NotFound(format!("message {message}")))?;
        if !stored.reactions.contains(key) {
            stored.reactions.push(key.clone());
        }
        let reactors = state.reactors.entry((message, key.clone())).or_default();
        if !reactors.contains(&FAKE_SELF) {
            reactors.push(FAKE_SELF);
        }
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        key: &ReactionKey,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, channel)?;
        if let Some(stored) = state.messages.get_mut(&(channel, message)) {
            stored.reactions.retain(|k| k != key);
        }
        state.reactors.remove(&(message, key.clone()));
        Ok(())
    }

    async fn list_reactors(
        &self,
        channel: ChannelId,
        message: MessageId,
        key: &ReactionKey,
    ) -> Result<Vec<UserId>, GatewayError> {
        let state = self.state();
        self.check_channel(&state, channel)?;
        Ok(state
            .reactors
            .get(&(message, key.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_role(&self, _guild: GuildId, role: RoleId) -> Result<Option<Role>, GatewayError> {
        Ok(self.state().roles.get(&role).cloned())
    }

    async fn get_member(
        &self,
        _guild: GuildId,
        user: UserId,
    ) -> Result<Option<Member>, GatewayError> {
        Ok(self.state().members.get(&user).cloned())
    }

    async fn grant_role(
        &self,
        _guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        let member = state
            .members
            .get_mut(&user)
            .ok_or_else(|| GatewayError::NotFound(format!("member {user}")))?;
        if !member.roles.contains(&role) {
            member.roles.push(role);
        }
        Ok(())
    }

    async fn revoke_role(
        &self,
        _guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        let member = state
            .members
            .get_mut(&user)
            .ok_or_else(|| GatewayError::NotFound(format!("member {user}")))?;
        member.roles.retain(|r| *r != role);
        Ok(())
    }

    async fn list_webhooks(&self, channel: ChannelId) -> Result<Vec<Webhook>, GatewayError> {
        let state = self.state();
        self.check_channel(&state, channel)?;
        Ok(state.webhooks.get(&channel).cloned().unwrap_or_default())
    }

    async fn create_webhook(
        &self,
        channel: ChannelId,
        name: &str,
    ) -> Result<Webhook, GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, channel)?;
        state.webhook_creates += 1;
        let webhook = Webhook {
            id: WebhookId(state.next_id()),
            channel_id: channel,
            name: name.to_string(),
            token: format!("token-{channel}"),
        };
        state
            .webhooks
            .entry(channel)
            .or_default()
            .push(webhook.clone());
        Ok(webhook)
    }

    async fn execute_webhook(
        &self,
        webhook: &Webhook,
        payload: WebhookPayload,
    ) -> Result<Message, GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, webhook.channel_id)?;
        self.check_webhook(&state, webhook)?;
        state.webhook_executes += 1;
        let id = MessageId(state.next_id());
        let message = Message {
            id,
            channel_id: webhook.channel_id,
            content: payload.content,
            embeds: payload.embed.into_iter().collect::<Vec<Embed>>(),
            suppress_notifications: false,
            reactions: vec![],
        };
        state
            .messages
            .insert((webhook.channel_id, id), message.clone());
        Ok(message)
    }

    async fn edit_webhook_message(
        &self,
        webhook: &Webhook,
        message: MessageId,
        payload: WebhookPayload,
    ) -> Result<Message, GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, webhook.channel_id)?;
        self.check_webhook(&state, webhook)?;
        state.webhook_edits += 1;
        let stored = state
            .messages
            .get_mut(&(webhook.channel_id, message))
            .ok_or_else(|| GatewayError::NotFound(format!("message {message}")))?;
        stored.content = payload.content;
        stored.embeds = payload.embed.into_iter().collect();
        Ok(stored.clone())
    }

    async fn publish_message(
        &self,
        channel: ChannelId,
        _message: MessageId,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, channel)?;
        state.publishes += 1;
        Ok(())
    }

    async fn set_presence(&self, presence: Presence) -> Result<(), GatewayError> {
        self.state().presence = Some(presence);
        Ok(())
    }

    async fn subscribe_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<mpsc::Receiver<ReactionEvent>, GatewayError> {
        let mut state = self.state();
        self.check_channel(&state, channel)?;
        let (tx, rx) = mpsc::channel(16);
        state.subscriptions.entry(message).or_default().push(tx);
        Ok(rx)
    }
}
