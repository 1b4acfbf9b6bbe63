//! Attribute Propagation
//!
//! Toggling favorite or pinned on a parent tag writes the same value to its
//! children. Each write is its own persistence call; a failure stops the
//! cascade and leaves the records written so far as they are.

use serde::{Deserialize, Serialize};
use tag_store::{DomainError, DomainResult, TagId, TagPatch, TagRecord, TagStore};

use crate::hierarchy::Hierarchy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeAttribute {
    Favorite,
    Pinned,
}

impl CascadeAttribute {
    pub fn get(self, tag: &TagRecord) -> bool {
        match self {
            CascadeAttribute::Favorite => tag.is_favorite,
            CascadeAttribute::Pinned => tag.is_pinned,
        }
    }

    pub fn patch(self, value: bool) -> TagPatch {
        match self {
            CascadeAttribute::Favorite => TagPatch::default().favorite(value),
            CascadeAttribute::Pinned => TagPatch::default().pinned(value),
        }
    }
}

/// How far a toggle on a parent reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CascadeScope {
    /// Only records whose parent is the toggled tag
    #[default]
    DirectChildren,
    /// Every descendant
    Subtree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    pub value: bool,
    /// Written ids, toggled tag first
    pub updated: Vec<TagId>,
}

/// Records that inherit the new value. Empty unless `tag` is a parent.
pub fn cascade_targets(tag: &TagRecord, hierarchy: &Hierarchy, scope: CascadeScope) -> Vec<TagId> {
    if !tag.is_parent {
        return Vec::new();
    }
    match scope {
        CascadeScope::DirectChildren => hierarchy.children(tag.id).map(|n| n.id()).collect(),
        CascadeScope::Subtree => hierarchy.descendants(tag.id),
    }
}

/// Flip `attribute` on `tag` and cascade the new value.
///
/// `tag` should be the current record; the new value is its negation.
pub async fn toggle<S>(
    store: &S,
    tag: &TagRecord,
    attribute: CascadeAttribute,
    hierarchy: &Hierarchy,
    scope: CascadeScope,
) -> DomainResult<CascadeReport>
where
    S: TagStore + ?Sized,
{
    let value = !attribute.get(tag);
    if !store.update_tag(tag.id, attribute.patch(value)).await? {
        return Err(DomainError::NotFound(format!("Tag {} not found", tag.id)));
    }

    let targets = cascade_targets(tag, hierarchy, scope);
    let mut updated = Vec::with_capacity(targets.len() + 1);
    updated.push(tag.id);

    for child in &targets {
        match store.update_tag(*child, attribute.patch(value)).await {
            Ok(true) => updated.push(*child),
            Ok(false) => tracing::debug!(tag = %child, "cascade target vanished, skipping"),
            Err(e) => {
                tracing::error!(
                    tag = %tag.id,
                    failed = %child,
                    updated = updated.len(),
                    "cascade stopped: {}",
                    e
                );
                return Err(DomainError::Persistence(format!(
                    "{:?} cascade from tag {} stopped after {} of {} records: {}",
                    attribute,
                    tag.id,
                    updated.len(),
                    targets.len() + 1,
                    e
                )));
            }
        }
    }

    tracing::debug!(tag = %tag.id, ?attribute, value, count = updated.len(), "cascade applied");
    Ok(CascadeReport { value, updated })
}
