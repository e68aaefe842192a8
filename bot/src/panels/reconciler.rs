//! Panel reconciliation: converge the channel message, its reaction
//! set, and member roles onto the persisted mapping.

use std::collections::HashMap;
use std::sync::Arc;

use platform::{
    ChannelCapability, ChannelId, Gateway, GatewayError, GuildId, Message, NewMessage, ReactionKey,
    Role, RoleId,
};
use store::{Database, RolePanel};

use crate::error::{BotError, BotResult};
use crate::panels::render::render_panel;
use crate::panels::watcher::WatcherRegistry;

pub struct PanelReconciler {
    gateway: Arc<dyn Gateway>,
    db: Database,
    watchers: WatcherRegistry,
}

impl PanelReconciler {
    pub fn new(gateway: Arc<dyn Gateway>, db: Database) -> Self {
        let watchers = WatcherRegistry::new(gateway.clone());
        Self {
            gateway,
            db,
            watchers,
        }
    }

    /// Map a reaction to a role in a panel, creating the panel on first
    /// use, then reconcile and (re)start the watcher.
    pub async fn add_mapping(
        &self,
        guild: GuildId,
        channel: ChannelId,
        section: &str,
        key: ReactionKey,
        role: RoleId,
    ) -> BotResult<String> {
        self.ensure_postable(channel).await?;

        let panel = self.db.find_or_create_panel(guild, channel, section)?;
        if !self.db.insert_mapping(panel.panel_id, &key, role)? {
            return Err(BotError::validation(format!(
                "{} is already mapped in section {section}",
                key.mention()
            )));
        }
        tracing::info!(
            panel_id = panel.panel_id,
            %guild,
            %channel,
            section,
            reaction = %key.mention(),
            role = %role,
            "added role mapping"
        );

        self.reconcile_and_watch(&panel).await?;
        Ok(format!(
            "added {} to section {section} in {}",
            key.mention(),
            channel.mention()
        ))
    }

    /// Remove a reaction mapping. Members who chose the role through
    /// this reaction lose it; a panel whose last mapping goes away is
    /// deleted along with its message and watcher.
    pub async fn remove_mapping(
        &self,
        guild: GuildId,
        channel: ChannelId,
        section: &str,
        key: ReactionKey,
    ) -> BotResult<String> {
        let panel = self
            .db
            .find_panel(guild, channel, section)?
            .ok_or_else(|| {
                BotError::validation(format!(
                    "no role selection section {section} in {}",
                    channel.mention()
                ))
            })?;
        let mappings = self.db.list_mappings(panel.panel_id)?;
        let Some((_, role)) = mappings.iter().find(|(k, _)| *k == key) else {
            return Err(BotError::validation(format!(
                "{} is not mapped in section {section}",
                key.mention()
            )));
        };
        let role = *role;

        // Revoke from current reactors before the reaction disappears
        // from the message, while the reactor list is still queryable.
        if let Some(message_id) = panel.message_id {
            self.revoke_from_reactors(guild, channel, message_id, &key, role)
                .await;
        }

        self.db.delete_mapping(panel.panel_id, &key)?;
        tracing::info!(
            panel_id = panel.panel_id,
            %guild,
            %channel,
            section,
            reaction = %key.mention(),
            "removed role mapping"
        );

        if self.db.list_mappings(panel.panel_id)?.is_empty() {
            self.watchers.cancel(panel.panel_id);
            if let Some(message_id) = panel.message_id {
                if let Err(err) = self.gateway.delete_message(channel, message_id).await {
                    tracing::warn!(panel_id = panel.panel_id, error = %err, "failed to delete empty panel message");
                }
            }
            self.db.delete_panel(panel.panel_id)?;
            return Ok(format!(
                "removed role section {section} from {}",
                channel.mention()
            ));
        }

        self.reconcile_and_watch(&panel).await?;
        Ok(format!("removed {} from section {section}", key.mention()))
    }

    /// Rename a section. The new name must be free within the channel.
    pub async fn rename_section(
        &self,
        guild: GuildId,
        channel: ChannelId,
        section: &str,
        new_section: &str,
    ) -> BotResult<String> {
        let panel = self
            .db
            .find_panel(guild, channel, section)?
            .ok_or_else(|| {
                BotError::validation(format!(
                    "no role selection section {section} in {}",
                    channel.mention()
                ))
            })?;
        if self.db.find_panel(guild, channel, new_section)?.is_some() {
            return Err(BotError::validation(format!(
                "section {new_section} already exists in {}",
                channel.mention()
            )));
        }

        self.db.rename_panel_section(panel.panel_id, new_section)?;
        let panel = RolePanel {
            section: new_section.to_string(),
            ..panel
        };
        self.reconcile_and_watch(&panel).await?;
        Ok(format!("renamed section {section} to {new_section}"))
    }

    /// Human-readable listing of every panel in the guild.
    pub fn list_panels(&self, guild: GuildId) -> BotResult<String> {
        let panels = self.db.list_all_panels(guild)?;
        if panels.is_empty() {
            return Ok("no role selection sections configured".to_string());
        }
        let mut lines = Vec::new();
        for panel in panels {
            let mut header = format!("{} **{}**", panel.channel_id.mention(), panel.section);
            if let Some(description) = &panel.description {
                header.push_str(&format!(": {description}"));
            }
            lines.push(header);
            for (key, role) in self.db.list_mappings(panel.panel_id)? {
                lines.push(format!("  {} {}", key.mention(), role.mention()));
            }
        }
        Ok(lines.join("\n"))
    }

    /// Reconcile every panel in the guild, typically at startup. A
    /// failing panel is logged and skipped; the rest still converge.
    pub async fn reconcile_all(&self, guild: GuildId) {
        let panels = match self.db.list_all_panels(guild) {
            Ok(panels) => panels,
            Err(err) => {
                tracing::error!(%guild, error = %err, "failed to load panels");
                return;
            }
        };
        for panel in panels {
            if let Err(err) = self.reconcile_and_watch(&panel).await {
                tracing::error!(
                    panel_id = panel.panel_id,
                    %guild,
                    section = panel.section,
                    error = %err,
                    "panel reconciliation failed"
                );
            }
        }
    }

    /// Converge one panel, then point its watcher at the (possibly new)
    /// message and mapping.
    pub async fn reconcile_and_watch(&self, panel: &RolePanel) -> BotResult<()> {
        let (message, mapping) = self.reconcile(panel).await?;
        self.watchers
            .start(
                panel.panel_id,
                panel.guild_id,
                panel.channel_id,
                message.id,
                mapping,
            )
            .await?;
        Ok(())
    }

    async fn reconcile(
        &self,
        panel: &RolePanel,
    ) -> BotResult<(Message, HashMap<ReactionKey, RoleId>)> {
        self.ensure_postable(panel.channel_id).await?;
        let message = self.get_or_create_message(panel).await?;

        let mappings = self.db.list_mappings(panel.panel_id)?;
        let resolved = self.resolve_roles(panel.guild_id, &mappings).await?;

        // Message content.
        let content = render_panel(&panel.section, &resolved, message.suppress_notifications);
        if message.content != content {
            self.gateway
                .edit_message(panel.channel_id, message.id, content)
                .await?;
            tracing::debug!(panel_id = panel.panel_id, "updated panel text");
        }

        // Reaction set: drop stale emojis first so a removed mapping
        // can never race a fresh self-reaction.
        let wanted: HashMap<ReactionKey, RoleId> =
            mappings.iter().cloned().collect();
        for present in &message.reactions {
            if !wanted.contains_key(present) {
                if let Err(err) = self
                    .gateway
                    .remove_reaction(panel.channel_id, message.id, present)
                    .await
                {
                    tracing::warn!(panel_id = panel.panel_id, reaction = %present.mention(), error = %err, "failed to remove stale reaction");
                }
            }
        }
        for (key, _) in &mappings {
            if !message.reactions.contains(key) {
                if let Err(err) = self
                    .gateway
                    .add_reaction(panel.channel_id, message.id, key)
                    .await
                {
                    tracing::warn!(panel_id = panel.panel_id, reaction = %key.mention(), error = %err, "failed to seed reaction");
                }
            }
        }

        // Grant pass: reactions added while the bot was away.
        self.grant_missed_roles(panel, message.id, &wanted).await;

        Ok((message, wanted))
    }

    async fn ensure_postable(&self, channel: ChannelId) -> BotResult<()> {
        match self.gateway.channel_capability(channel).await? {
            ChannelCapability::Post { .. } => Ok(()),
            ChannelCapability::Unsupported(kind) => Err(BotError::Precondition(format!(
                "{} cannot host a role selection ({kind})",
                channel.mention()
            ))),
        }
    }

    /// Fetch the panel's backing message, creating a placeholder when
    /// none exists yet or the recorded one was deleted out from under
    /// us.
    async fn get_or_create_message(&self, panel: &RolePanel) -> BotResult<Message> {
        if let Some(message_id) = panel.message_id {
            match self.gateway.get_message(panel.channel_id, message_id).await {
                Ok(message) => return Ok(message),
                // Someone deleted the panel message; fall through and
                // recreate it.
                Err(GatewayError::NotFound(_)) => {
                    tracing::warn!(panel_id = panel.panel_id, %message_id, "panel message is gone, recreating");
                }
                Err(err) => return Err(err.into()),
            }
        }
        let message = self
            .gateway
            .create_message(
                panel.channel_id,
                NewMessage {
                    content: format!("placeholder for section {}", panel.section),
                    suppress_notifications: true,
                },
            )
            .await?;
        self.db
            .update_panel_message(panel.panel_id, Some(message.id))?;
        tracing::info!(panel_id = panel.panel_id, message = %message.id, "created panel message");
        Ok(message)
    }

    async fn resolve_roles(
        &self,
        guild: GuildId,
        mappings: &[(ReactionKey, RoleId)],
    ) -> BotResult<Vec<(ReactionKey, Role)>> {
        let mut resolved = Vec::with_capacity(mappings.len());
        for (key, role_id) in mappings {
            let role = self
                .gateway
                .get_role(guild, *role_id)
                .await?
                .unwrap_or_else(|| Role {
                    id: *role_id,
                    name: "unknown role".to_string(),
                });
            resolved.push((key.clone(), role));
        }
        Ok(resolved)
    }

    async fn grant_missed_roles(
        &self,
        panel: &RolePanel,
        message: platform::MessageId,
        mapping: &HashMap<ReactionKey, RoleId>,
    ) {
        let self_id = self.gateway.current_user_id();
        for (key, &role) in mapping {
            let reactors = match self
                .gateway
                .list_reactors(panel.channel_id, message, key)
                .await
            {
                Ok(reactors) => reactors,
                Err(err) => {
                    tracing::warn!(panel_id = panel.panel_id, reaction = %key.mention(), error = %err, "failed to list reactors");
                    continue;
                }
            };
            for user in reactors {
                if user == self_id {
                    continue;
                }
                let member = match self.gateway.get_member(panel.guild_id, user).await {
                    Ok(Some(member)) => member,
                    Ok(None) => continue,
                    Err(err) => {
                        tracing::warn!(panel_id = panel.panel_id, %user, error = %err, "failed to fetch member");
                        continue;
                    }
                };
                if member.roles.contains(&role) {
                    continue;
                }
                match self.gateway.grant_role(panel.guild_id, user, role).await {
                    Ok(()) => {
                        tracing::info!(panel_id = panel.panel_id, %user, %role, "granted role during reconciliation");
                    }
                    Err(err) => {
                        tracing::warn!(panel_id = panel.panel_id, %user, %role, error = %err, "failed to grant role");
                    }
                }
            }
        }
    }

    async fn revoke_from_reactors(
        &self,
        guild: GuildId,
        channel: ChannelId,
        message: platform::MessageId,
        key: &ReactionKey,
        role: RoleId,
    ) {
        let self_id = self.gateway.current_user_id();
        let reactors = match self.gateway.list_reactors(channel, message, key).await {
            Ok(reactors) => reactors,
            Err(err) => {
                tracing::warn!(reaction = %key.mention(), error = %err, "failed to list reactors for revocation");
                return;
            }
        };
        for user in reactors {
            if user == self_id {
                continue;
            }
            if let Err(err) = self.gateway.revoke_role(guild, user, role).await {
                tracing::warn!(%user, %role, error = %err, "failed to revoke role");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn watchers(&self) -> &WatcherRegistry {
        &self.watchers
    }
}
