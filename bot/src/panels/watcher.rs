//! Live reaction watchers, one task per reconciled panel.
//!
//! The registry owns every running watcher and guarantees at most one
//! per panel id: starting a replacement cancels the previous task
//! before the new subscription goes live, so a stale watcher can never
//! act on an outdated mapping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use platform::{
    ChannelId, Gateway, GuildId, MessageId, ReactionEvent, ReactionEventKind, ReactionKey, RoleId,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct WatcherHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

pub struct WatcherRegistry {
    gateway: Arc<dyn Gateway>,
    handles: Mutex<HashMap<i64, WatcherHandle>>,
}

impl WatcherRegistry {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or restart) the watcher for a panel. The previous watcher
    /// for the same panel is cancelled before the new subscription is
    /// opened.
    pub async fn start(
        &self,
        panel_id: i64,
        guild: GuildId,
        channel: ChannelId,
        message: MessageId,
        mapping: HashMap<ReactionKey, RoleId>,
    ) -> Result<(), platform::GatewayError> {
        if let Some(old) = self.take_handle(panel_id) {
            old.token.cancel();
            old.task.abort();
        }

        let rx = self.gateway.subscribe_reactions(channel, message).await?;
        let token = CancellationToken::new();

        let gateway = self.gateway.clone();
        let loop_token = token.clone();
        let task = tokio::spawn(async move {
            watch_loop(gateway, loop_token, panel_id, guild, mapping, rx).await;
        });

        let displaced = {
            let mut handles = match self.handles.lock() {
                Ok(handles) => handles,
                Err(poisoned) => poisoned.into_inner(),
            };
            handles.insert(panel_id, WatcherHandle { token, task })
        };
        // A racing start() for the same panel may have slipped in while
        // we were subscribing; the newest insert wins.
        if let Some(old) = displaced {
            old.token.cancel();
            old.task.abort();
        }
        Ok(())
    }

    /// Stop the watcher for a panel, if one is running.
    pub fn cancel(&self, panel_id: i64) {
        if let Some(old) = self.take_handle(panel_id) {
            old.token.cancel();
            old.task.abort();
            tracing::debug!(panel_id, "cancelled reaction watcher");
        }
    }

    fn take_handle(&self, panel_id: i64) -> Option<WatcherHandle> {
        let mut handles = match self.handles.lock() {
            Ok(handles) => handles,
            Err(poisoned) => poisoned.into_inner(),
        };
        handles.remove(&panel_id)
    }

    #[cfg(test)]
    pub fn active_watchers(&self) -> Vec<i64> {
        let handles = match self.handles.lock() {
            Ok(handles) => handles,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut ids: Vec<i64> = handles.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Drop for WatcherRegistry {
    fn drop(&mut self) {
        let handles = match self.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in handles.into_values() {
            handle.token.cancel();
            handle.task.abort();
        }
    }
}

async fn watch_loop(
    gateway: Arc<dyn Gateway>,
    token: CancellationToken,
    panel_id: i64,
    guild: GuildId,
    mapping: HashMap<ReactionKey, RoleId>,
    mut rx: mpsc::Receiver<ReactionEvent>,
) {
    let self_id = gateway.current_user_id();
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => {
                tracing::trace!(panel_id, "watcher loop cancelled");
                return;
            }
            event = rx.recv() => match event {
                Some(event) => event,
                None => {
                    tracing::debug!(panel_id, "reaction feed closed, watcher exiting");
                    return;
                }
            },
        };

        if event.user_id == self_id {
            continue;
        }
        let Some(&role) = mapping.get(&event.key) else {
            // Unmapped emoji; reconciliation clears those from the
            // message, an in-flight event is just ignored.
            continue;
        };

        let result = match event.kind {
            ReactionEventKind::Added => gateway.grant_role(guild, event.user_id, role).await,
            ReactionEventKind::Removed => gateway.revoke_role(guild, event.user_id, role).await,
        };
        match (&result, event.kind) {
            (Ok(()), ReactionEventKind::Added) => {
                tracing::info!(panel_id, user = %event.user_id, role = %role, "granted role via reaction");
            }
            (Ok(()), ReactionEventKind::Removed) => {
                tracing::info!(panel_id, user = %event.user_id, role = %role, "revoked role via reaction");
            }
            (Err(err), _) => {
                tracing::warn!(panel_id, user = %event.user_id, role = %role, error = %err, "role update failed");
            }
        }
    }
}
