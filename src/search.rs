//! Search Filter
//!
//! Selects the records to show for a search term. The result is a subset of
//! the flat list in its original order and goes through the same
//! build/flatten pipeline as the unfiltered list.

use std::collections::HashSet;

use tag_store::{TagId, TagRecord};

/// Records matching `term`, plus the direct children of matching parents and
/// the parents of matching children. A blank term keeps everything.
pub fn filter(records: &[TagRecord], term: &str) -> Vec<TagRecord> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return records.to_vec();
    }

    let matched: Vec<&TagRecord> = records
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&term))
        .collect();

    let mut include: HashSet<TagId> = matched.iter().map(|r| r.id).collect();
    let matching_parents: HashSet<TagId> = matched
        .iter()
        .filter(|r| r.is_parent)
        .map(|r| r.id)
        .collect();

    for record in records {
        if record.parent_id.is_some_and(|p| matching_parents.contains(&p)) {
            include.insert(record.id);
        }
    }
    for record in &matched {
        if let Some(parent) = record.parent_id {
            include.insert(parent);
        }
    }

    records
        .iter()
        .filter(|r| include.contains(&r.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<TagRecord> {
        vec![
            TagRecord::new(1, "Projects").as_parent(),
            TagRecord::new(2, "Alpha").child_of(TagId(1)).as_parent(),
            TagRecord::new(3, "Beta").child_of(TagId(1)),
            TagRecord::new(4, "Alpha docs").child_of(TagId(2)),
            TagRecord::new(5, "Inbox"),
            TagRecord::new(6, "Gamma").child_of(TagId(2)),
        ]
    }

    fn ids(records: &[TagRecord]) -> Vec<u32> {
        records.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn test_blank_term_keeps_all() {
        assert_eq!(filter(&fixture(), "  ").len(), 6);
    }

    #[test]
    fn test_parent_match_pulls_direct_children_only() {
        let result = filter(&fixture(), "proj");
        // 4 and 6 are grandchildren of Projects
        assert_eq!(ids(&result), vec![1, 2, 3]);
    }

    #[test]
    fn test_child_match_pulls_parent() {
        let result = filter(&fixture(), "BETA");
        assert_eq!(ids(&result), vec![1, 3]);
    }

    #[test]
    fn test_matching_child_that_is_parent() {
        // Alpha matches: its parent Projects and its children 4 and 6 come along
        let result = filter(&fixture(), "alpha");
        assert_eq!(ids(&result), vec![1, 2, 4, 6]);
    }

    #[test]
    fn test_non_parent_match_does_not_pull_children() {
        let records = vec![
            TagRecord::new(1, "Plain"),
            TagRecord::new(2, "Child").child_of(TagId(1)),
        ];
        assert_eq!(ids(&filter(&records, "plain")), vec![1]);
    }

    #[test]
    fn test_no_match() {
        assert!(filter(&fixture(), "zzz").is_empty());
    }
}
