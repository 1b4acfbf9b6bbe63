//! Tag Tree
//!
//! Hierarchical tag engine: builds a forest from flat tag records, linearizes
//! it for paged display, resolves drag-and-drop into reparent or reorder
//! writes, cascades favorite and pinned flags, and keeps every surface in step
//! through a typed sync bus. Persistence lives in the `tag-store` crate.

pub mod bus;
pub mod config;
pub mod dnd;
pub mod hierarchy;
pub mod linearize;
pub mod manager;
pub mod propagation;
pub mod reparent;
pub mod search;
pub mod view;

pub use bus::{SyncBus, SyncEvent, Subscription, TagAction, Topic};
pub use config::{ConfigError, TagTreeConfig};
pub use dnd::{DragSession, DropIntent, Release};
pub use hierarchy::{Hierarchy, HierarchyNode};
pub use linearize::{flatten, LinearNode, Pager};
pub use manager::{Outcome, Rejection, TagManager};
pub use propagation::{CascadeAttribute, CascadeReport, CascadeScope};
pub use reparent::{NoOpReason, ReparentAction};
pub use view::TagPanel;

pub use tag_store;
