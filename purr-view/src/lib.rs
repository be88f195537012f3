//! purr-view - clipboard history synchronization and presentation engine
//!
//! Merges capture events from an external clipboard monitor into a
//! deduplicated, newest-first history, derives filtered views from it, picks a
//! renderer per entry and drives single selection over a virtualized list with
//! a numeric quick-jump overlay.
//!
//! The monitor itself (OS hooks, hashing, persistence, classification) is a
//! collaborator reached through the traits in [`service`].

pub mod config;
pub mod content_detection;
pub mod engine;
pub mod interface;
pub mod metadata;
pub mod models;
pub mod renderer;
pub mod selection;
pub mod service;
pub mod store;
pub mod view;
pub mod viewport;

pub use config::EngineConfig;
pub use engine::{HistoryEngine, VisibleRow};
pub use interface::*;
pub use models::Entry;
pub use renderer::{select_renderer, Renderer};
pub use service::{ClipboardService, FileImageResolver, ImageResolver};
pub use store::{HistoryStore, StoreEvent, SubscriptionId};
pub use view::{derive_view, TypeFilter};
pub use viewport::compute_visible_range;
