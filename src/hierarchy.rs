//! Hierarchy Builder
//!
//! Turns the flat tag list into a forest. Nodes live in an id-keyed arena and
//! refer to their children by id; the whole structure is rebuilt from records
//! on every pass and never patched in place.

use std::collections::{HashMap, HashSet};

use tag_store::{TagId, TagRecord};

/// A tag placed in the tree
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub record: TagRecord,
    /// Children in input order
    pub children: Vec<TagId>,
    /// Parent this node was attached under. `None` for roots, including
    /// records whose `parent_id` was dangling.
    pub parent: Option<TagId>,
    pub level: usize,
}

impl HierarchyNode {
    fn new(record: TagRecord) -> Self {
        Self {
            record,
            children: Vec::new(),
            parent: None,
            level: 0,
        }
    }

    pub fn id(&self) -> TagId {
        self.record.id
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: HashMap<TagId, HierarchyNode>,
    roots: Vec<TagId>,
}

impl Hierarchy {
    /// Build the forest from a flat record list.
    ///
    /// Every record lands exactly once: under its parent when `parent_id`
    /// resolves to another record in the list, otherwise as a root. Duplicate
    /// ids keep the first occurrence. Records caught in a parent cycle are
    /// broken out as roots.
    pub fn build(records: &[TagRecord]) -> Self {
        let mut nodes: HashMap<TagId, HierarchyNode> = HashMap::with_capacity(records.len());
        let mut order: Vec<TagId> = Vec::with_capacity(records.len());
        for record in records {
            if nodes.contains_key(&record.id) {
                tracing::warn!(tag = %record.id, "duplicate tag id in list, keeping first");
                continue;
            }
            order.push(record.id);
            nodes.insert(record.id, HierarchyNode::new(record.clone()));
        }

        let mut roots = Vec::new();
        for id in &order {
            let parent = nodes[id]
                .record
                .parent_id
                .filter(|p| p != id && nodes.contains_key(p));
            match parent {
                Some(p) => {
                    if let Some(parent_node) = nodes.get_mut(&p) {
                        parent_node.children.push(*id);
                    }
                    if let Some(node) = nodes.get_mut(id) {
                        node.parent = Some(p);
                    }
                }
                None => {
                    if let Some(missing) = nodes[id].record.parent_id.filter(|p| p != id) {
                        tracing::debug!(tag = %id, parent = %missing, "parent missing, showing as root");
                    }
                    roots.push(*id);
                }
            }
        }

        let mut hierarchy = Self { nodes, roots };
        let mut placed = HashSet::with_capacity(order.len());
        for root in hierarchy.roots.clone() {
            hierarchy.assign_levels(root, 0, &mut placed);
        }

        // Anything not reached from a root sits on a parent cycle
        for id in &order {
            if placed.contains(id) {
                continue;
            }
            tracing::warn!(tag = %id, "parent cycle detected, promoting tag to root");
            if let Some(parent) = hierarchy.nodes.get(id).and_then(|n| n.parent) {
                if let Some(parent_node) = hierarchy.nodes.get_mut(&parent) {
                    parent_node.children.retain(|c| c != id);
                }
            }
            if let Some(node) = hierarchy.nodes.get_mut(id) {
                node.parent = None;
            }
            hierarchy.roots.push(*id);
            hierarchy.assign_levels(*id, 0, &mut placed);
        }

        hierarchy
    }

    fn assign_levels(&mut self, id: TagId, level: usize, placed: &mut HashSet<TagId>) {
        if !placed.insert(id) {
            return;
        }
        let children = match self.nodes.get_mut(&id) {
            Some(node) => {
                node.level = level;
                node.children.clone()
            }
            None => return,
        };
        for child in children {
            self.assign_levels(child, level + 1, placed);
        }
    }

    pub fn get(&self, id: TagId) -> Option<&HierarchyNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn root_ids(&self) -> &[TagId] {
        &self.roots
    }

    pub fn roots(&self) -> impl Iterator<Item = &HierarchyNode> + '_ {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn children(&self, id: TagId) -> impl Iterator<Item = &HierarchyNode> + '_ {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|c| self.nodes.get(c))
    }

    /// Whether `candidate` sits somewhere below `ancestor`
    pub fn is_descendant(&self, candidate: TagId, ancestor: TagId) -> bool {
        let mut current = self.nodes.get(&candidate).and_then(|n| n.parent);
        let mut hops = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// All ids below `id`, depth-first
    pub fn descendants(&self, id: TagId) -> Vec<TagId> {
        let mut out = Vec::new();
        let mut stack: Vec<TagId> = self
            .nodes
            .get(&id)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            if next == id || out.contains(&next) {
                continue;
            }
            out.push(next);
            if let Some(node) = self.nodes.get(&next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
