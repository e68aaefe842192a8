//! Stream-status notifications: per-streamer status cards posted via
//! channel webhooks, reconciled against live Twitch data on a poll
//! schedule.

mod card;
mod reconciler;
mod webhooks;

pub use reconciler::Notifier;
pub use webhooks::WebhookCache;
