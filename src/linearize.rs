//! Tree Linearizer
//!
//! Flattens the forest into the ordered list of rows a tag panel renders,
//! honouring the expand set, and pages through that list.

use std::collections::HashSet;

use tag_store::{TagId, TagRecord};

use crate::hierarchy::{Hierarchy, HierarchyNode};

/// One visible row
#[derive(Debug, Clone, PartialEq)]
pub struct LinearNode {
    pub record: TagRecord,
    pub level: usize,
    pub has_children: bool,
    pub expanded: bool,
}

impl LinearNode {
    pub fn id(&self) -> TagId {
        self.record.id
    }
}

/// Pinned tags first, otherwise keep the incoming order
pub(crate) fn display_order<'a>(nodes: impl Iterator<Item = &'a HierarchyNode>) -> Vec<&'a HierarchyNode> {
    let mut group: Vec<&HierarchyNode> = nodes.collect();
    group.sort_by_key(|n| !n.record.is_pinned);
    group
}

/// Depth-first linearization. Roots are always emitted; children only when
/// their parent is in `expanded`.
pub fn flatten(hierarchy: &Hierarchy, expanded: &HashSet<TagId>) -> Vec<LinearNode> {
    fn collect<'a>(
        group: Vec<&'a HierarchyNode>,
        level: usize,
        hierarchy: &'a Hierarchy,
        expanded: &HashSet<TagId>,
        seen: &mut HashSet<TagId>,
        out: &mut Vec<LinearNode>,
    ) {
        for node in group {
            if !seen.insert(node.id()) {
                continue;
            }
            let is_expanded = expanded.contains(&node.id());
            out.push(LinearNode {
                record: node.record.clone(),
                level,
                has_children: node.has_children(),
                expanded: is_expanded,
            });
            if is_expanded && node.has_children() {
                let children = display_order(hierarchy.children(node.id()));
                collect(children, level + 1, hierarchy, expanded, seen, out);
            }
        }
    }

    let mut out = Vec::with_capacity(hierarchy.len());
    let mut seen = HashSet::with_capacity(hierarchy.len());
    collect(
        display_order(hierarchy.roots()),
        0,
        hierarchy,
        expanded,
        &mut seen,
        &mut out,
    );
    out
}

/// Page counter over a linearization. Growth is monotonic until `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page_size: usize,
    page: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of rows visible out of `total`
    pub fn visible_len(&self, total: usize) -> usize {
        total.min(self.page.saturating_mul(self.page_size))
    }

    /// The first `page * page_size` items
    pub fn window<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.visible_len(items.len())]
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.visible_len(total) < total
    }

    /// Request the next page. Returns false when everything is already shown.
    pub fn load_more(&mut self, total: usize) -> bool {
        if !self.has_more(total) {
            return false;
        }
        self.page += 1;
        true
    }

    /// Start a new session at page 1
    pub fn reset(&mut self) {
        self.page = 1;
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: u32, parent: Option<u32>) -> TagRecord {
        let mut t = TagRecord::new(id, format!("Tag {}", id));
        t.parent_id = parent.map(TagId);
        t
    }

    fn pinned(mut t: TagRecord) -> TagRecord {
        t.is_pinned = true;
        t
    }

    fn ids(rows: &[LinearNode]) -> Vec<u32> {
        rows.iter().map(|r| r.id().0).collect()
    }

    #[test]
    fn test_collapsed_shows_only_roots() {
        let records = vec![tag(1, None), tag(2, Some(1)), tag(3, None), pinned(tag(4, None))];
        let h = Hierarchy::build(&records);
        let rows = flatten(&h, &HashSet::new());
        assert_eq!(ids(&rows), vec![4, 1, 3]);
        assert!(rows.iter().all(|r| r.level == 0));
        assert!(rows[1].has_children);
        assert!(!rows[1].expanded);
    }

    #[test]
    fn test_expanded_children_follow_parent() {
        let records = vec![
            tag(1, None),
            tag(2, Some(1)),
            tag(3, Some(1)),
            tag(5, Some(2)),
            tag(4, None),
        ];
        let h = Hierarchy::build(&records);
        let expanded: HashSet<TagId> = [TagId(1)].into_iter().collect();
        let rows = flatten(&h, &expanded);

        // 5 stays hidden because 2 is collapsed
        assert_eq!(ids(&rows), vec![1, 2, 3, 4]);
        assert_eq!(rows[1].level, 1);
    }

    #[test]
    fn test_nested_expansion() {
        let records = vec![tag(1, None), tag(2, Some(1)), tag(3, Some(2)), tag(4, Some(1))];
        let h = Hierarchy::build(&records);
        let expanded: HashSet<TagId> = [TagId(1), TagId(2)].into_iter().collect();
        let rows = flatten(&h, &expanded);
        assert_eq!(ids(&rows), vec![1, 2, 3, 4]);
        assert_eq!(rows.iter().map(|r| r.level).collect::<Vec<_>>(), vec![0, 1, 2, 1]);
    }

    #[test]
    fn test_child_of_collapsed_grandparent_hidden() {
        let records = vec![tag(1, None), tag(2, Some(1)), tag(3, Some(2))];
        let h = Hierarchy::build(&records);
        let expanded: HashSet<TagId> = [TagId(2)].into_iter().collect();
        assert_eq!(ids(&flatten(&h, &expanded)), vec![1]);
    }

    #[test]
    fn test_pinned_first_is_stable_within_siblings() {
        let records = vec![
            tag(1, None),
            tag(2, Some(1)),
            pinned(tag(3, Some(1))),
            tag(4, Some(1)),
            pinned(tag(5, Some(1))),
        ];
        let h = Hierarchy::build(&records);
        let expanded: HashSet<TagId> = [TagId(1)].into_iter().collect();
        assert_eq!(ids(&flatten(&h, &expanded)), vec![1, 3, 5, 2, 4]);
    }

    #[test]
    fn test_pager_grows_monotonically() {
        let items: Vec<u32> = (0..7).collect();
        let mut pager = Pager::new(3);
        assert_eq!(pager.window(&items), &[0, 1, 2]);
        assert!(pager.load_more(items.len()));
        assert_eq!(pager.window(&items).len(), 6);
        assert!(pager.load_more(items.len()));
        assert_eq!(pager.window(&items).len(), 7);
        assert!(!pager.has_more(items.len()));
        assert!(!pager.load_more(items.len()));
        assert_eq!(pager.page(), 3);

        pager.reset();
        assert_eq!(pager.window(&items).len(), 3);
    }

    #[test]
    fn test_pager_zero_size_clamped() {
        let pager = Pager::new(0);
        assert_eq!(pager.page_size(), 1);
    }
}
