//! Error taxonomy for bot operations.
//!
//! Validation and not-found failures carry user-facing text and never
//! mutate state; precondition failures abort only the affected
//! panel/watch; everything else is an upstream error that per-item
//! loops catch and log at their boundary.

use platform::GatewayError;
use store::StoreError;
use twitch_api::TwitchError;

pub type BotResult<T> = Result<T, BotError>;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Rejected input (duplicate section, unknown reaction key, ...).
    #[error("{0}")]
    Validation(String),

    /// A referenced panel/watch/message no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// The target channel cannot host this feature at all.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Twitch(#[from] TwitchError),
}

impl BotError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        BotError::Validation(message.into())
    }

    /// Short, actionable text for the invoking command. Upstream
    /// errors are deliberately not echoed verbatim.
    pub fn user_message(&self) -> String {
        match self {
            BotError::Validation(msg) | BotError::Precondition(msg) => msg.clone(),
            BotError::NotFound(what) => format!("could not find {what}"),
            BotError::Gateway(_) | BotError::Store(_) | BotError::Twitch(_) => {
                "something went wrong, try again later".to_string()
            }
        }
    }
}
