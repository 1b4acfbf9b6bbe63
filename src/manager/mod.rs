//! Tag Manager
//!
//! Entry point for every tag mutation. Each operation writes through the
//! store, settles the result and publishes what changed on the sync bus.
//! Structural edits (join, detach, dissolve, delete) refetch from storage
//! before publishing so surfaces see authoritative state.
//!
//! Validation, not-found and structural rejections are resolved here and come
//! back as `Outcome::Rejected`. Only persistence failures are returned as `Err`.

use std::sync::Arc;

use tag_store::{
    DeleteMode, DomainError, DomainResult, NewTag, TagColor, TagId, TagPatch, TagRecord, TagStore,
};

use crate::bus::{SyncBus, SyncEvent, TagAction};
use crate::config::TagTreeConfig;
use crate::dnd::Release;
use crate::hierarchy::Hierarchy;
use crate::propagation::{self, CascadeAttribute, CascadeReport};
use crate::reparent::{self, NoOpReason, ReparentAction};
use crate::view::TagPanel;


/// Why a mutation was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Invalid(String),
    NotFound(String),
    Conflict(String),
    Structural(NoOpReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(v) => Some(v),
            Outcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Applied(_) => None,
            Outcome::Rejected(r) => Some(r),
        }
    }
}

/// Resolve local error kinds into a rejection; let persistence failures through
fn settle<T>(op: &'static str, result: DomainResult<T>) -> DomainResult<Outcome<T>> {
    match result {
        Ok(value) => Ok(Outcome::Applied(value)),
        Err(DomainError::Validation(msg)) => {
            tracing::info!(op, "rejected: {}", msg);
            Ok(Outcome::Rejected(Rejection::Invalid(msg)))
        }
        Err(DomainError::NotFound(msg)) => {
            tracing::info!(op, "skipped: {}", msg);
            Ok(Outcome::Rejected(Rejection::NotFound(msg)))
        }
        Err(DomainError::Conflict(msg)) => {
            tracing::info!(op, "conflict: {}", msg);
            Ok(Outcome::Rejected(Rejection::Conflict(msg)))
        }
        Err(e) => {
            tracing::error!(op, "{}", e);
            Err(e)
        }
    }
}

fn not_found(id: TagId) -> DomainError {
    DomainError::NotFound(format!("Tag {} not found", id))
}

pub struct TagManager<S: ?Sized> {
    store: Arc<S>,
    bus: SyncBus,
    config: TagTreeConfig,
}

impl<S: TagStore + ?Sized> TagManager<S> {
    pub fn new(store: Arc<S>, bus: SyncBus, config: TagTreeConfig) -> Self {
        Self { store, bus, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn bus(&self) -> &SyncBus {
        &self.bus
    }

    pub fn config(&self) -> &TagTreeConfig {
        &self.config
    }

    /// Fresh panel configured like this manager
    pub fn new_panel(&self) -> TagPanel {
        TagPanel::new(&self.config)
    }

    // ========================
    // Helpers
    // ========================

    async fn current(&self, id: TagId) -> DomainResult<TagRecord> {
        self.store.get_tag(id).await?.ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: TagId, patch: TagPatch) -> DomainResult<()> {
        if self.store.update_tag(id, patch).await? {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    /// Current records for `ids`, in the given order
    async fn fresh(&self, ids: &[TagId]) -> DomainResult<Vec<TagRecord>> {
        let tags = self.store.get_tags().await?;
        Ok(ids
            .iter()
            .filter_map(|id| tags.iter().find(|t| t.id == *id).cloned())
            .collect())
    }

    async fn publish_records(&self, ids: &[TagId], action: TagAction) -> DomainResult<()> {
        for tag in self.fresh(ids).await? {
            self.bus.publish(SyncEvent::tags_changed(action.clone(), &tag));
        }
        Ok(())
    }

    async fn publish_colors(&self) -> DomainResult<()> {
        let colors = self.store.get_tag_colors().await?;
        self.bus.publish(SyncEvent::colors(colors));
        Ok(())
    }

    async fn publish_favorites(&self) -> DomainResult<()> {
        let names = self.store.favorite_names().await?;
        self.bus.publish(SyncEvent::favorites(names));
        Ok(())
    }

    // ========================
    // Mutations
    // ========================

    /// Create a tag. Creating under a parent marks that parent as a parent.
    pub async fn create_tag(&self, tag: NewTag) -> DomainResult<Outcome<TagRecord>> {
        settle("create_tag", self.create_inner(tag).await)
    }

    async fn create_inner(&self, tag: NewTag) -> DomainResult<TagRecord> {
        let has_color = tag.color.is_some();
        let created = self.store.add_tag(tag).await?;

        if let Some(parent_id) = created.parent_id {
            let parent = self.current(parent_id).await?;
            if !parent.is_parent {
                self.update(parent_id, TagPatch::default().is_parent(true)).await?;
                self.publish_records(&[parent_id], TagAction::Update).await?;
            }
        }

        self.bus.publish(SyncEvent::tags_changed(TagAction::Add, &created));
        if has_color {
            self.publish_colors().await?;
        }
        Ok(created)
    }

    pub async fn rename_tag(&self, id: TagId, name: &str) -> DomainResult<Outcome<TagRecord>> {
        settle("rename_tag", self.rename_inner(id, name).await)
    }

    async fn rename_inner(&self, id: TagId, name: &str) -> DomainResult<TagRecord> {
        let previous = self.current(id).await?.name;
        self.update(id, TagPatch::default().name(name)).await?;
        let renamed = self.current(id).await?;

        self.bus.publish(SyncEvent::tags_changed(
            TagAction::Rename { previous },
            &renamed,
        ));
        self.publish_colors().await?;
        self.publish_favorites().await?;
        Ok(renamed)
    }

    pub async fn recolor_tag(&self, id: TagId, color: TagColor) -> DomainResult<Outcome<TagRecord>> {
        settle("recolor_tag", self.recolor_inner(id, color).await)
    }

    async fn recolor_inner(&self, id: TagId, color: TagColor) -> DomainResult<TagRecord> {
        let tag = self.current(id).await?;
        self.store.set_tag_color(&tag.name, color).await?;
        let updated = self.current(id).await?;

        self.bus.publish(SyncEvent::tags_changed(TagAction::Update, &updated));
        self.publish_colors().await?;
        Ok(updated)
    }

    /// Delete a tag. Its children are detached first, each as its own write.
    pub async fn delete_tag(&self, id: TagId, mode: DeleteMode) -> DomainResult<Outcome<()>> {
        settle("delete_tag", self.delete_inner(id, mode).await)
    }

    async fn delete_inner(&self, id: TagId, mode: DeleteMode) -> DomainResult<()> {
        let tag = self.current(id).await?;
        let children: Vec<TagId> = self
            .store
            .get_tags()
            .await?
            .into_iter()
            .filter(|t| t.parent_id == Some(id))
            .map(|t| t.id)
            .collect();

        for child in &children {
            self.update(*child, TagPatch::default().parent(None)).await?;
        }
        if !self.store.delete_tag_with(id, mode).await? {
            return Err(not_found(id));
        }
        self.store.load_from_database().await?;

        self.bus.publish(SyncEvent::tag_deleted(&tag));
        self.publish_records(&children, TagAction::Move).await?;
        self.publish_favorites().await?;
        self.publish_colors().await?;
        tracing::info!(tag = %id, detached = children.len(), "tag deleted");
        Ok(())
    }

    /// Mark a tag as a container for children
    pub async fn promote_to_parent(&self, id: TagId) -> DomainResult<Outcome<TagRecord>> {
        settle("promote_to_parent", self.promote_inner(id).await)
    }

    async fn promote_inner(&self, id: TagId) -> DomainResult<TagRecord> {
        let tag = self.current(id).await?;
        if tag.is_parent {
            return Ok(tag);
        }
        self.update(id, TagPatch::default().is_parent(true)).await?;
        let promoted = self.current(id).await?;
        self.bus.publish(SyncEvent::tags_changed(TagAction::Update, &promoted));
        Ok(promoted)
    }

    /// Detach every direct child, then clear the parent flag
    pub async fn dissolve(&self, id: TagId) -> DomainResult<Outcome<TagRecord>> {
        settle("dissolve", self.dissolve_inner(id).await)
    }

    async fn dissolve_inner(&self, id: TagId) -> DomainResult<TagRecord> {
        let tag = self.current(id).await?;
        if !tag.is_parent {
            return Err(DomainError::Validation(format!("Tag '{}' is not a parent", tag.name)));
        }
        let children: Vec<TagId> = self
            .store
            .get_tags()
            .await?
            .into_iter()
            .filter(|t| t.parent_id == Some(id))
            .map(|t| t.id)
            .collect();

        for child in &children {
            self.update(*child, TagPatch::default().parent(None)).await?;
        }
        self.update(id, TagPatch::default().is_parent(false)).await?;
        self.store.load_from_database().await?;

        self.publish_records(&children, TagAction::Move).await?;
        let dissolved = self.current(id).await?;
        self.bus.publish(SyncEvent::tags_changed(TagAction::Update, &dissolved));
        Ok(dissolved)
    }

    /// Resolve and apply dropping `active` onto `over`
    pub async fn drop_tag(&self, active: TagId, over: TagId) -> DomainResult<Outcome<ReparentAction>> {
        settle("drop_tag", self.drop_inner(active, over).await).map(|outcome| match outcome {
            Outcome::Applied(ReparentAction::NoOp(reason)) => {
                Outcome::Rejected(Rejection::Structural(reason))
            }
            other => other,
        })
    }

    async fn drop_inner(&self, active: TagId, over: TagId) -> DomainResult<ReparentAction> {
        let tags = self.store.get_tags().await?;
        let find = |id: TagId| tags.iter().find(|t| t.id == id).cloned().ok_or_else(|| not_found(id));
        let active_tag = find(active)?;
        let over_tag = find(over)?;
        let hierarchy = Hierarchy::build(&tags);

        let action = reparent::resolve(&active_tag, &over_tag, &hierarchy);
        match action {
            ReparentAction::JoinAsChild(parent) => {
                self.update(active, TagPatch::default().parent(Some(parent))).await?;
                self.store.load_from_database().await?;
                self.publish_records(&[active], TagAction::Move).await?;
            }
            ReparentAction::Detach => {
                self.update(active, TagPatch::default().parent(None)).await?;
                self.store.load_from_database().await?;
                self.publish_records(&[active], TagAction::Move).await?;
            }
            ReparentAction::ReorderSiblings => {
                let writes = reparent::plan_reorder(active, over, &hierarchy);
                for write in &writes {
                    self.update(write.id, TagPatch::default().sort_order(write.sort_order))
                        .await?;
                }
                let ids: Vec<TagId> = writes.iter().map(|w| w.id).collect();
                self.publish_records(&ids, TagAction::Reorder).await?;
            }
            ReparentAction::NoOp(reason) => {
                tracing::debug!(%active, %over, ?reason, "drop ignored");
            }
        }
        Ok(action)
    }

    /// Hand a finished pointer gesture to the resolver. Only drops write;
    /// clicks, cancels and idle releases return `None`.
    pub async fn apply_release(
        &self,
        release: Release,
    ) -> DomainResult<Option<Outcome<ReparentAction>>> {
        match release {
            Release::Drop(intent) => self.drop_tag(intent.active, intent.over).await.map(Some),
            Release::Click(_) | Release::Cancelled | Release::Idle => Ok(None),
        }
    }

    pub async fn toggle_favorite(&self, id: TagId) -> DomainResult<Outcome<CascadeReport>> {
        settle(
            "toggle_favorite",
            self.toggle_inner(id, CascadeAttribute::Favorite).await,
        )
    }

    pub async fn toggle_pinned(&self, id: TagId) -> DomainResult<Outcome<CascadeReport>> {
        settle(
            "toggle_pinned",
            self.toggle_inner(id, CascadeAttribute::Pinned).await,
        )
    }

    async fn toggle_inner(&self, id: TagId, attribute: CascadeAttribute) -> DomainResult<CascadeReport> {
        let tags = self.store.get_tags().await?;
        let tag = tags.iter().find(|t| t.id == id).cloned().ok_or_else(|| not_found(id))?;
        let hierarchy = Hierarchy::build(&tags);

        let result =
            propagation::toggle(self.store.as_ref(), &tag, attribute, &hierarchy, self.config.cascade)
                .await;

        let written = match &result {
            Ok(report) => report.updated.clone(),
            // Publish what did get written before reporting the failure
            Err(_) => {
                let mut ids = vec![id];
                ids.extend(propagation::cascade_targets(&tag, &hierarchy, self.config.cascade));
                ids
            }
        };
        if let Err(e) = self.publish_records(&written, TagAction::Update).await {
            tracing::warn!(tag = %id, "could not publish toggle result: {}", e);
        }
        if attribute == CascadeAttribute::Favorite {
            if let Err(e) = self.publish_favorites().await {
                tracing::warn!(tag = %id, "could not publish favorites: {}", e);
            }
        }
        result
    }

    /// Select a tag as the note filter, or clear it
    pub fn select_tag(&self, name: Option<&str>) {
        self.bus.publish(SyncEvent::filter(name.map(str::to_string)));
    }

    /// Reload from storage and publish the derived maps
    pub async fn refresh(&self) -> DomainResult<()> {
        self.store.load_from_database().await?;
        self.publish_colors().await?;
        self.publish_favorites().await?;
        Ok(())
    }
}
