//! Tag Entity
//!
//! A tag is one node of the user's tag tree. The tree is stored flat:
//! each record names at most one parent through `parent_id`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::color::TagColor;
use super::entity::Entity;

/// Unique identifier of a tag (SQLite rowid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub u32);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for TagId {
    fn from(id: u32) -> Self {
        TagId(id)
    }
}

/// A persisted tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub id: TagId,
    /// Unique per user, compared case-insensitively
    pub name: String,
    pub color: TagColor,
    /// Parent tag, if any. A dangling reference is shown as a root.
    pub parent_id: Option<TagId>,
    /// Explicit container flag. Only set by promote or by a child joining,
    /// never derived from the current child count.
    pub is_parent: bool,
    pub is_pinned: bool,
    pub is_favorite: bool,
    pub sort_order: i32,
}

impl TagRecord {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: TagId(id),
            name: name.into(),
            color: TagColor::default(),
            parent_id: None,
            is_parent: false,
            is_pinned: false,
            is_favorite: false,
            sort_order: 0,
        }
    }

    pub fn with_color(mut self, color: TagColor) -> Self {
        self.color = color;
        self
    }

    pub fn child_of(mut self, parent: TagId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn as_parent(mut self) -> Self {
        self.is_parent = true;
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl Entity for TagRecord {
    type Id = TagId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Fields accepted when creating a tag. Everything else takes its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTag {
    pub name: String,
    #[serde(default)]
    pub color: Option<TagColor>,
    #[serde(default)]
    pub parent_id: Option<TagId>,
}

impl NewTag {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn color(mut self, color: TagColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn parent(mut self, parent: TagId) -> Self {
        self.parent_id = Some(parent);
        self
    }
}

/// Partial update of a tag. `None` leaves the field untouched.
///
/// `parent_id: Some(None)` detaches the tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<TagColor>,
    pub parent_id: Option<Option<TagId>>,
    pub is_parent: Option<bool>,
    pub is_pinned: Option<bool>,
    pub is_favorite: Option<bool>,
    pub sort_order: Option<i32>,
}

impl TagPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn color(mut self, color: TagColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn parent(mut self, parent: Option<TagId>) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn is_parent(mut self, value: bool) -> Self {
        self.is_parent = Some(value);
        self
    }

    pub fn pinned(mut self, value: bool) -> Self {
        self.is_pinned = Some(value);
        self
    }

    pub fn favorite(mut self, value: bool) -> Self {
        self.is_favorite = Some(value);
        self
    }

    pub fn sort_order(mut self, value: i32) -> Self {
        self.sort_order = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == TagPatch::default()
    }

    /// Whether applying this patch can change the favorites read model
    pub fn affects_favorites(&self) -> bool {
        self.name.is_some() || self.is_favorite.is_some()
    }

    pub fn apply(&self, record: &mut TagRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(color) = &self.color {
            record.color = color.clone();
        }
        if let Some(parent_id) = self.parent_id {
            record.parent_id = parent_id;
        }
        if let Some(v) = self.is_parent {
            record.is_parent = v;
        }
        if let Some(v) = self.is_pinned {
            record.is_pinned = v;
        }
        if let Some(v) = self.is_favorite {
            record.is_favorite = v;
        }
        if let Some(v) = self.sort_order {
            record.sort_order = v;
        }
    }
}
