//! In-Memory Tag Repository
//!
//! Backend with the same semantics as the SQLite repository, used by tests
//! and by hosts without a database. Supports write-failure injection.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

use super::traits::{slot_after, Repository, TagAttributeOperations, TagPositioningOperations};
use crate::domain::{name_key, DomainError, DomainResult, TagColor, TagId, TagRecord};

#[derive(Default)]
struct MemoryState {
    tags: BTreeMap<TagId, TagRecord>,
    next_id: u32,
    colors: BTreeMap<String, TagColor>,
    favorites: BTreeSet<String>,
    /// Record writes allowed before failures start. `None` means unlimited.
    writes_remaining: Option<usize>,
    offline: bool,
}

impl MemoryState {
    fn check_online(&self) -> DomainResult<()> {
        if self.offline {
            return Err(DomainError::Persistence("Simulated storage outage".to_string()));
        }
        Ok(())
    }

    fn take_write(&mut self) -> DomainResult<()> {
        self.check_online()?;
        match self.writes_remaining {
            Some(0) => Err(DomainError::Persistence("Simulated write error".to_string())),
            Some(ref mut n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check_unique(&self, name: &str, except: Option<TagId>) -> DomainResult<()> {
        let key = name_key(name);
        let clash = self
            .tags
            .values()
            .any(|t| Some(t.id) != except && name_key(&t.name) == key);
        if clash {
            return Err(DomainError::Validation(format!("tag '{}' already exists", name)));
        }
        Ok(())
    }

    fn color_key(&self, name: &str) -> Option<String> {
        let key = name_key(name);
        self.colors.keys().find(|k| name_key(k) == key).cloned()
    }
}

/// Tag repository kept entirely in memory
#[derive(Default)]
pub struct MemoryTagRepository {
    state: Mutex<MemoryState>,
}

impl MemoryTagRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with records, keeping their ids
    pub fn with_tags(tags: impl IntoIterator<Item = TagRecord>) -> Self {
        let mut state = MemoryState::default();
        for tag in tags {
            state.next_id = state.next_id.max(tag.id.0);
            state.tags.insert(tag.id, tag);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Let `n` more record writes succeed, then fail every following one
    pub async fn fail_writes_after(&self, n: usize) {
        self.state.lock().await.writes_remaining = Some(n);
    }

    /// Stop injecting write failures
    pub async fn clear_write_failures(&self) {
        self.state.lock().await.writes_remaining = None;
    }

    /// Fail every operation, reads included
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Overwrite a stored record without any checks, as another client would
    pub async fn put_raw(&self, tag: TagRecord) {
        let mut state = self.state.lock().await;
        state.next_id = state.next_id.max(tag.id.0);
        state.tags.insert(tag.id, tag);
    }
}

#[async_trait]
impl Repository<TagRecord> for MemoryTagRepository {
    async fn create(&self, entity: &TagRecord) -> DomainResult<TagRecord> {
        let mut state = self.state.lock().await;
        state.check_unique(&entity.name, None)?;
        state.take_write()?;

        state.next_id += 1;
        let mut tag = entity.clone();
        tag.id = TagId(state.next_id);
        state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn find_by_id(&self, id: TagId) -> DomainResult<Option<TagRecord>> {
        let state = self.state.lock().await;
        state.check_online()?;
        Ok(state.tags.get(&id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<TagRecord>> {
        let state = self.state.lock().await;
        state.check_online()?;
        let mut tags: Vec<TagRecord> = state.tags.values().cloned().collect();
        tags.sort_by_key(|t| (t.sort_order, t.id));
        Ok(tags)
    }

    async fn update(&self, entity: &TagRecord) -> DomainResult<TagRecord> {
        let mut state = self.state.lock().await;
        if !state.tags.contains_key(&entity.id) {
            return Err(DomainError::NotFound(format!("Tag {} not found", entity.id)));
        }
        state.check_unique(&entity.name, Some(entity.id))?;
        state.take_write()?;
        state.tags.insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn delete(&self, id: TagId) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        if !state.tags.contains_key(&id) {
            return Err(DomainError::NotFound(format!("Tag {} not found", id)));
        }
        state.take_write()?;
        state.tags.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl TagAttributeOperations for MemoryTagRepository {
    async fn load_colors(&self) -> DomainResult<BTreeMap<String, TagColor>> {
        let state = self.state.lock().await;
        state.check_online()?;
        Ok(state.colors.clone())
    }

    async fn save_color(&self, name: &str, color: &TagColor) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        state.check_online()?;
        if let Some(existing) = state.color_key(name) {
            state.colors.remove(&existing);
        }
        state.colors.insert(name.to_string(), color.clone());
        Ok(())
    }

    async fn remove_color(&self, name: &str) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        state.check_online()?;
        if let Some(existing) = state.color_key(name) {
            state.colors.remove(&existing);
        }
        Ok(())
    }

    async fn rename_color(&self, old_name: &str, new_name: &str) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        state.check_online()?;
        let Some(old_key) = state.color_key(old_name) else {
            return Ok(());
        };
        let Some(color) = state.colors.remove(&old_key) else {
            return Ok(());
        };
        if let Some(stale) = state.color_key(new_name) {
            state.colors.remove(&stale);
        }
        state.colors.insert(new_name.to_string(), color);
        Ok(())
    }

    async fn load_favorites(&self) -> DomainResult<BTreeSet<String>> {
        let state = self.state.lock().await;
        state.check_online()?;
        Ok(state.favorites.clone())
    }

    async fn save_favorites(&self, names: &BTreeSet<String>) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        state.check_online()?;
        state.favorites = names.clone();
        Ok(())
    }
}

#[async_trait]
impl TagPositioningOperations for MemoryTagRepository {
    async fn next_sort_order(&self) -> DomainResult<i32> {
        let state = self.state.lock().await;
        state.check_online()?;
        slot_after(state.tags.values().map(|t| t.sort_order).max())
    }
}
