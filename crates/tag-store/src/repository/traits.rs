//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! Implementations can use SQLite, in-memory, etc.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{DomainError, DomainResult, Entity, NewTag, TagColor, TagId, TagPatch, TagRecord};

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Create a new entity. The returned entity carries the assigned id.
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: T::Id) -> DomainResult<Option<T>>;

    /// List all entities
    async fn list(&self) -> DomainResult<Vec<T>>;

    /// Update an existing entity. Fails with `NotFound` if it does not exist.
    async fn update(&self, entity: &T) -> DomainResult<T>;

    /// Delete entity by ID. Fails with `NotFound` if it does not exist.
    async fn delete(&self, id: T::Id) -> DomainResult<()>;
}

/// Name-keyed side tables: the color map and the persisted favorites set
#[async_trait]
pub trait TagAttributeOperations: Send + Sync {
    async fn load_colors(&self) -> DomainResult<BTreeMap<String, TagColor>>;

    async fn save_color(&self, name: &str, color: &TagColor) -> DomainResult<()>;

    async fn remove_color(&self, name: &str) -> DomainResult<()>;

    /// Move a color entry to a new name, if one exists
    async fn rename_color(&self, old_name: &str, new_name: &str) -> DomainResult<()>;

    async fn load_favorites(&self) -> DomainResult<BTreeSet<String>>;

    /// Replace the persisted favorites set
    async fn save_favorites(&self, names: &BTreeSet<String>) -> DomainResult<()>;
}

/// Trait for tag positioning operations
#[async_trait]
pub trait TagPositioningOperations: Send + Sync {
    /// Sort order for a newly appended tag (current maximum + 1)
    async fn next_sort_order(&self) -> DomainResult<i32>;
}

/// Slot after the current maximum sort order, 0 for an empty table
pub(crate) fn slot_after(max: Option<i32>) -> DomainResult<i32> {
    match max {
        None => Ok(0),
        Some(m) => m.checked_add(1).ok_or_else(|| {
            DomainError::Conflict("No sort order left after the last tag; reorder tags first".to_string())
        }),
    }
}

/// Everything `CachedTagStore` needs from a storage backend
pub trait TagBackend:
    Repository<TagRecord> + TagAttributeOperations + TagPositioningOperations
{
}

impl<T> TagBackend for T where
    T: Repository<TagRecord> + TagAttributeOperations + TagPositioningOperations
{
}

/// How a delete treats notes that carry the tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Remove the tag only
    #[default]
    TagOnly,
    /// Also strip the tag from every note
    DetachFromNotes,
    /// Also delete every note carrying the tag
    WithNotes,
}

/// Persistence adapter: the sole writer of authoritative tag state
///
/// Reads (`get_tags`, `get_tag_colors`, `favorite_names`) are served from a
/// cache; `load_from_database` refreshes it from storage.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Create a tag. Rejects case-insensitive duplicate names with `Validation`.
    async fn add_tag(&self, tag: NewTag) -> DomainResult<TagRecord>;

    /// Apply a partial update. Returns `false` when the id does not exist.
    async fn update_tag(&self, id: TagId, patch: TagPatch) -> DomainResult<bool>;

    /// Delete a tag and its derived entries. Returns `false` when the id does not exist.
    async fn delete_tag(&self, id: TagId) -> DomainResult<bool> {
        self.delete_tag_with(id, DeleteMode::TagOnly).await
    }

    async fn delete_tag_with(&self, id: TagId, mode: DeleteMode) -> DomainResult<bool>;

    /// Cached tags, ordered by `(sort_order, id)`
    async fn get_tags(&self) -> DomainResult<Vec<TagRecord>>;

    async fn get_tag(&self, id: TagId) -> DomainResult<Option<TagRecord>> {
        Ok(self.get_tags().await?.into_iter().find(|t| t.id == id))
    }

    async fn get_tag_colors(&self) -> DomainResult<BTreeMap<String, TagColor>>;

    async fn set_tag_color(&self, name: &str, color: TagColor) -> DomainResult<()>;

    /// Force a cache refresh from storage
    async fn load_from_database(&self) -> DomainResult<()>;

    /// Persisted favorites read model
    async fn favorite_names(&self) -> DomainResult<BTreeSet<String>>;

    /// Recompute the favorites read model from the per-tag flags
    async fn rebuild_favorite_names(&self) -> DomainResult<BTreeSet<String>>;
}
