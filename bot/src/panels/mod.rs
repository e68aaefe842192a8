//! Reaction-role panels: persisted role choosers rendered as channel
//! messages, kept converged by the reconciler and served live by
//! per-panel reaction watchers.

mod reconciler;
mod render;
mod watcher;

pub use reconciler::PanelReconciler;
pub use render::render_panel;
pub use watcher::WatcherRegistry;
