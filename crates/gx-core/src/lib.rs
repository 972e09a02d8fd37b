//! ghostx/crates/gx-core/src/lib.rs
//!
//! The central domain logic and interface definitions for GhostX: the
//! annotation store, the feed observer, the per-entity widget, the dashboard
//! and the session that ties identity, group and settings together.

pub mod analysis;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod memory;
pub mod models;
pub mod session;
pub mod store;
pub mod traits;
pub mod widget;

// Re-exporting for easier access in other crates
pub use dashboard::{Dashboard, FeedSummary, KindStats};
pub use error::*;
pub use feed::{CardOutcome, EntityCard, EntityIdStrategy, FeedObserver, NodeId, Visibility};
pub use memory::MemoryBackend;
pub use models::*;
pub use session::{Session, SessionSnapshot};
pub use store::AnnotationStore;
pub use traits::*;
pub use widget::{AnnotationWidget, CharBudget, IndexedRecord, WidgetView};
