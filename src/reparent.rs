//! Reparent Resolver
//!
//! Decides what dropping one tag onto another means. Rules are checked in
//! order and the first match wins:
//!
//! 1. `over` is a parent and not already `active`'s parent: join it.
//! 2. `active` has a parent and `over` is a root or not a parent: detach.
//! 3. Both share a parent (or are both roots): reorder the sibling group.
//! 4. Anything else is ignored.

use tag_store::{TagId, TagRecord};

use crate::hierarchy::Hierarchy;
use crate::linearize::display_order;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparentAction {
    JoinAsChild(TagId),
    Detach,
    ReorderSiblings,
    NoOp(NoOpReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    SameTag,
    /// `over` sits below `active`
    WouldCreateCycle,
    NoMatchingRule,
}

impl ReparentAction {
    /// Actions that change the tree shape and need a refetch afterwards
    pub fn is_structural(&self) -> bool {
        matches!(self, ReparentAction::JoinAsChild(_) | ReparentAction::Detach)
    }
}

pub fn resolve(active: &TagRecord, over: &TagRecord, hierarchy: &Hierarchy) -> ReparentAction {
    if active.id == over.id {
        return ReparentAction::NoOp(NoOpReason::SameTag);
    }

    if over.is_parent && active.parent_id != Some(over.id) {
        if hierarchy.is_descendant(over.id, active.id) {
            return ReparentAction::NoOp(NoOpReason::WouldCreateCycle);
        }
        return ReparentAction::JoinAsChild(over.id);
    }

    if active.parent_id.is_some() && (over.parent_id.is_none() || !over.is_parent) {
        return ReparentAction::Detach;
    }

    if active.parent_id == over.parent_id {
        return ReparentAction::ReorderSiblings;
    }

    ReparentAction::NoOp(NoOpReason::NoMatchingRule)
}

/// New sort order for one sibling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortWrite {
    pub id: TagId,
    pub sort_order: i32,
}

/// Sort order writes that move `active` to the slot `over` occupies in the
/// displayed sibling group. Only changed records are returned.
pub fn plan_reorder(active: TagId, over: TagId, hierarchy: &Hierarchy) -> Vec<SortWrite> {
    let Some(active_node) = hierarchy.get(active) else {
        return Vec::new();
    };
    let group = match active_node.parent {
        Some(parent) => display_order(hierarchy.children(parent)),
        None => display_order(hierarchy.roots()),
    };

    let mut ids: Vec<TagId> = group.iter().map(|n| n.id()).collect();
    let (Some(from), Some(to)) = (
        ids.iter().position(|id| *id == active),
        ids.iter().position(|id| *id == over),
    ) else {
        return Vec::new();
    };
    if from == to {
        return Vec::new();
    }
    let moved = ids.remove(from);
    ids.insert(to, moved);

    // Reuse the group's own slots; spread them out if they collide
    let mut slots: Vec<i32> = group.iter().map(|n| n.record.sort_order).collect();
    slots.sort_unstable();
    if slots.windows(2).any(|w| w[0] == w[1]) {
        // Shift down so the last slot still fits in i32
        let len = slots.len() as i32;
        let base = slots.first().copied().unwrap_or(0).min(i32::MAX - (len - 1));
        slots = (0..len).map(|i| base + i).collect();
    }

    ids.into_iter()
        .zip(slots)
        .filter(|(id, slot)| {
            hierarchy
                .get(*id)
                .is_some_and(|n| n.record.sort_order != *slot)
        })
        .map(|(id, sort_order)| SortWrite { id, sort_order })
        .collect()
}
