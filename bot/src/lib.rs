//! Herald keeps a chat guild converged with its configuration:
//! reaction-role panels stay in sync with their persisted mappings,
//! and watched Twitch streamers get live/offline status cards posted
//! through channel webhooks.
//!
//! The crate is gateway-agnostic: it consumes the [`platform::Gateway`]
//! trait and an adapter binary wires in the real chat client.

pub mod config;
pub mod error;
pub mod localtime;
pub mod notifications;
pub mod panels;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use anyhow::Context;
use platform::Gateway;
use store::Database;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use twitch_api::TwitchClient;

pub use config::BotConfig;
pub use error::{BotError, BotResult};
pub use localtime::LocalTime;
pub use notifications::Notifier;
pub use panels::PanelReconciler;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

/// Run the bot against a gateway until ctrl-c: reconcile every panel
/// once at startup, then poll stream status until shutdown.
pub async fn run(gateway: Arc<dyn Gateway>, config: BotConfig) -> anyhow::Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("opening database at {}", config.database_path.display()))?;
    let twitch = config.twitch.clone().map(TwitchClient::new);

    let panels = Arc::new(PanelReconciler::new(gateway.clone(), db.clone()));
    let notifier = Arc::new(Notifier::new(gateway.clone(), db.clone(), twitch));

    let guilds = gateway.list_guilds().await.context("listing guilds")?;
    tracing::info!(guilds = guilds.len(), "starting up");
    for guild in &guilds {
        panels.reconcile_all(*guild).await;
    }

    let shutdown = CancellationToken::new();
    let poll_notifier = notifier.clone();
    let poll_gateway = gateway.clone();
    let poll = tokio::spawn(scheduler::run_poll_loop(
        config.poll_interval,
        shutdown.clone(),
        move || {
            let notifier = poll_notifier.clone();
            let gateway = poll_gateway.clone();
            async move {
                match gateway.list_guilds().await {
                    Ok(guilds) => notifier.check_all(&guilds).await,
                    Err(err) => scheduler::TickOutcome::Failed(format!("guild listing failed: {err}")),
                }
            }
        },
    ));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutting down");
    shutdown.cancel();
    poll.await.context("joining poll loop")?;
    Ok(())
}
