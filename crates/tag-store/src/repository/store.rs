//! Cached Tag Store
//!
//! `TagStore` implementation over any `TagBackend`. Validates input, keeps the
//! color map and favorites read model in step with the records, forwards
//! name-keyed side effects to the remote tag API before writing locally, and
//! serves reads from a cache that `load_from_database` replaces wholesale.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::remote::RemoteTagApi;
use super::traits::{DeleteMode, TagBackend, TagStore};
use crate::domain::{
    name_key, validate_tag_name, DomainError, DomainResult, NewTag, TagColor, TagId, TagPatch,
    TagRecord, TagValidationError,
};

#[derive(Default)]
struct Cache {
    tags: Vec<TagRecord>,
    colors: BTreeMap<String, TagColor>,
    favorites: BTreeSet<String>,
    loaded: bool,
}

impl Cache {
    fn upsert(&mut self, tag: TagRecord) {
        match self.tags.iter_mut().find(|t| t.id == tag.id) {
            Some(slot) => *slot = tag,
            None => self.tags.push(tag),
        }
        self.tags.sort_by_key(|t| (t.sort_order, t.id));
    }

    fn remove_color(&mut self, name: &str) {
        let key = name_key(name);
        self.colors.retain(|k, _| name_key(k) != key);
    }
}

/// Persistence adapter over a storage backend
pub struct CachedTagStore<R> {
    repo: Arc<R>,
    remote: Option<Arc<dyn RemoteTagApi>>,
    cache: Mutex<Cache>,
}

/// Failures of the remote call are always storage failures from our side
fn remote_failure(e: DomainError) -> DomainError {
    match e {
        DomainError::Persistence(_) => e,
        other => DomainError::Persistence(other.to_string()),
    }
}

impl<R: TagBackend> CachedTagStore<R> {
    pub fn new(repo: R) -> Self {
        Self::from_arc(Arc::new(repo))
    }

    pub fn from_arc(repo: Arc<R>) -> Self {
        Self {
            repo,
            remote: None,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Send name-keyed side effects to a remote before each local write
    pub fn with_remote(mut self, remote: Arc<dyn RemoteTagApi>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// The underlying backend
    pub fn repository(&self) -> &R {
        &self.repo
    }

    async fn ensure_loaded(&self) -> DomainResult<()> {
        if !self.cache.lock().await.loaded {
            self.load_from_database().await?;
        }
        Ok(())
    }

    async fn check_unique(&self, name: &str, except: Option<TagId>) -> DomainResult<()> {
        let key = name_key(name);
        let clash = self
            .repo
            .list()
            .await?
            .into_iter()
            .any(|t| Some(t.id) != except && name_key(&t.name) == key);
        if clash {
            return Err(TagValidationError::DuplicateName(name.to_string()).into());
        }
        Ok(())
    }

    async fn remote_delete(&self, name: &str, mode: DeleteMode) -> DomainResult<()> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };
        match mode {
            DeleteMode::TagOnly => remote
                .delete_tag(name)
                .await
                .map_err(remote_failure)?
                .into_result("delete tag"),
            DeleteMode::DetachFromNotes => {
                remote
                    .remove_tag_from_all_notes(name)
                    .await
                    .map_err(remote_failure)?
                    .into_result("remove tag from notes")?;
                remote
                    .delete_tag(name)
                    .await
                    .map_err(remote_failure)?
                    .into_result("delete tag")
            }
            DeleteMode::WithNotes => remote
                .delete_tag_and_notes(name)
                .await
                .map_err(remote_failure)?
                .into_result("delete tag and notes"),
        }
    }
}

#[async_trait]
impl<R: TagBackend> TagStore for CachedTagStore<R> {
    async fn add_tag(&self, tag: NewTag) -> DomainResult<TagRecord> {
        let name = validate_tag_name(&tag.name)?;
        self.check_unique(&name, None).await?;
        if let Some(parent_id) = tag.parent_id {
            if self.repo.find_by_id(parent_id).await?.is_none() {
                return Err(DomainError::NotFound(format!("Parent tag {} not found", parent_id)));
            }
        }

        if let Some(remote) = &self.remote {
            remote
                .create_tag(&name)
                .await
                .map_err(remote_failure)?
                .into_result("create tag")?;
        }

        let mut record = TagRecord::new(0, name);
        record.color = tag.color.clone().unwrap_or_default();
        record.parent_id = tag.parent_id;
        record.sort_order = self.repo.next_sort_order().await?;

        let created = self.repo.create(&record).await?;
        if let Some(color) = &tag.color {
            self.repo.save_color(&created.name, color).await?;
        }
        log::info!("Created tag '{}' ({})", created.name, created.id);

        let mut cache = self.cache.lock().await;
        if let Some(color) = tag.color {
            cache.colors.insert(created.name.clone(), color);
        }
        cache.upsert(created.clone());
        Ok(created)
    }

    async fn update_tag(&self, id: TagId, patch: TagPatch) -> DomainResult<bool> {
        let Some(current) = self.repo.find_by_id(id).await? else {
            log::debug!("Update skipped: tag {} not found", id);
            return Ok(false);
        };
        if patch.parent_id == Some(Some(id)) {
            return Err(TagValidationError::SelfParent.into());
        }

        let mut patch = patch;
        let mut renamed_from = None;
        if let Some(raw) = &patch.name {
            let name = validate_tag_name(raw)?;
            if name != current.name {
                self.check_unique(&name, Some(id)).await?;
                if let Some(remote) = &self.remote {
                    remote
                        .rename_tag(&current.name, &name)
                        .await
                        .map_err(remote_failure)?
                        .into_result("rename tag")?;
                }
                renamed_from = Some(current.name.clone());
            }
            patch.name = Some(name);
        }

        let mut updated = current;
        patch.apply(&mut updated);
        match self.repo.update(&updated).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        }

        if let Some(old_name) = &renamed_from {
            self.repo.rename_color(old_name, &updated.name).await?;
            log::info!("Renamed tag '{}' to '{}'", old_name, updated.name);
        }
        if let Some(color) = &patch.color {
            self.repo.save_color(&updated.name, color).await?;
        }

        {
            let mut cache = self.cache.lock().await;
            if let Some(old_name) = &renamed_from {
                let key = name_key(old_name);
                let moved: Vec<_> = cache
                    .colors
                    .iter()
                    .filter(|(k, _)| name_key(k) == key)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                for (k, v) in moved {
                    cache.colors.remove(&k);
                    cache.colors.insert(updated.name.clone(), v);
                }
            }
            if let Some(color) = &patch.color {
                cache.remove_color(&updated.name);
                cache.colors.insert(updated.name.clone(), color.clone());
            }
            cache.upsert(updated);
        }

        if patch.affects_favorites() {
            self.rebuild_favorite_names().await?;
        }
        Ok(true)
    }

    async fn delete_tag_with(&self, id: TagId, mode: DeleteMode) -> DomainResult<bool> {
        let Some(current) = self.repo.find_by_id(id).await? else {
            log::debug!("Delete skipped: tag {} not found", id);
            return Ok(false);
        };

        self.remote_delete(&current.name, mode).await?;

        match self.repo.delete(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        }
        self.repo.remove_color(&current.name).await?;
        log::info!("Deleted tag '{}' ({}) mode={:?}", current.name, id, mode);

        {
            let mut cache = self.cache.lock().await;
            cache.tags.retain(|t| t.id != id);
            cache.remove_color(&current.name);
        }
        self.rebuild_favorite_names().await?;
        Ok(true)
    }

    async fn get_tags(&self) -> DomainResult<Vec<TagRecord>> {
        self.ensure_loaded().await?;
        Ok(self.cache.lock().await.tags.clone())
    }

    async fn get_tag_colors(&self) -> DomainResult<BTreeMap<String, TagColor>> {
        self.ensure_loaded().await?;
        Ok(self.cache.lock().await.colors.clone())
    }

    async fn set_tag_color(&self, name: &str, color: TagColor) -> DomainResult<()> {
        let key = name_key(name);
        let owner = self
            .repo
            .list()
            .await?
            .into_iter()
            .find(|t| name_key(&t.name) == key);

        // Colors are keyed by the tag's stored spelling when the tag exists
        let stored_name = owner.as_ref().map_or_else(|| name.to_string(), |t| t.name.clone());
        self.repo.save_color(&stored_name, &color).await?;

        let mut updated = None;
        if let Some(mut tag) = owner {
            if tag.color != color {
                tag.color = color.clone();
                updated = Some(self.repo.update(&tag).await?);
            }
        }

        let mut cache = self.cache.lock().await;
        cache.remove_color(name);
        cache.colors.insert(stored_name, color);
        if let Some(tag) = updated {
            cache.upsert(tag);
        }
        Ok(())
    }

    async fn load_from_database(&self) -> DomainResult<()> {
        let tags = self.repo.list().await?;
        let colors = self.repo.load_colors().await?;
        {
            let mut cache = self.cache.lock().await;
            cache.tags = tags;
            cache.tags.sort_by_key(|t| (t.sort_order, t.id));
            cache.colors = colors;
            cache.loaded = true;
        }
        self.rebuild_favorite_names().await?;
        log::debug!("Tag cache refreshed from storage");
        Ok(())
    }

    async fn favorite_names(&self) -> DomainResult<BTreeSet<String>> {
        self.ensure_loaded().await?;
        Ok(self.cache.lock().await.favorites.clone())
    }

    async fn rebuild_favorite_names(&self) -> DomainResult<BTreeSet<String>> {
        let names: BTreeSet<String> = self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|t| t.is_favorite)
            .map(|t| t.name)
            .collect();

        if self.repo.load_favorites().await? != names {
            self.repo.save_favorites(&names).await?;
            log::debug!("Favorites read model rebuilt: {} tags", names.len());
        }
        self.cache.lock().await.favorites = names.clone();
        Ok(names)
    }
}
