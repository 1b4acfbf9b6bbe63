//! Tag Panel
//!
//! One UI surface showing tags. Holds a soft-consistency copy of the tag list
//! plus its own expand set, search term, pager and selection, and turns them
//! into the rows the rendering host draws.
//!
//! Bus events are applied last-write-wins per tag id. Records stay ordered by
//! `(sort_order, id)`, so the rows do not depend on event arrival order.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tag_store::{name_key, DomainResult, TagColor, TagId, TagRecord, TagStore};

use crate::bus::{Subscription, SyncBus, SyncEvent, TagAction};
use crate::config::TagTreeConfig;
use crate::hierarchy::Hierarchy;
use crate::linearize::{flatten, LinearNode, Pager};
use crate::search;

#[derive(Debug, Clone)]
pub struct TagPanel {
    records: Vec<TagRecord>,
    /// Ids deleted since the last full refresh
    tombstones: HashSet<TagId>,
    colors: BTreeMap<String, TagColor>,
    favorites: BTreeSet<String>,
    expanded: HashSet<TagId>,
    search: String,
    pager: Pager,
    selected: Option<String>,
    default_color: TagColor,
    expand_on_search: bool,
    rows: Vec<LinearNode>,
}

impl TagPanel {
    pub fn new(config: &TagTreeConfig) -> Self {
        Self {
            records: Vec::new(),
            tombstones: HashSet::new(),
            colors: BTreeMap::new(),
            favorites: BTreeSet::new(),
            expanded: HashSet::new(),
            search: String::new(),
            pager: Pager::new(config.page_size),
            selected: None,
            default_color: config.default_color.clone(),
            expand_on_search: config.expand_on_search,
            rows: Vec::new(),
        }
    }

    // ========================
    // Data
    // ========================

    /// Replace the whole tag list, e.g. after a refetch
    pub fn replace_records(&mut self, mut records: Vec<TagRecord>) {
        records.sort_by_key(|t| (t.sort_order, t.id));
        self.records = records;
        self.tombstones.clear();
        self.rebuild();
    }

    /// Re-read everything from the store
    pub async fn refresh<S>(&mut self, store: &S) -> DomainResult<()>
    where
        S: TagStore + ?Sized,
    {
        let records = store.get_tags().await?;
        self.colors = store.get_tag_colors().await?;
        self.favorites = store.favorite_names().await?;
        self.replace_records(records);
        Ok(())
    }

    /// Apply one bus event
    pub fn apply(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::TagsChanged(change) => {
                if change.action == TagAction::Delete {
                    self.tombstones.insert(change.tag_id);
                    self.records.retain(|t| t.id != change.tag_id);
                    self.expanded.remove(&change.tag_id);
                } else if let Some(tag) = &change.tag {
                    if self.tombstones.contains(&tag.id) {
                        tracing::debug!(tag = %tag.id, "ignoring update for deleted tag");
                        return;
                    }
                    self.upsert(tag.clone());
                } else {
                    return;
                }
            }
            SyncEvent::TagColorsChanged(payload) => {
                self.colors = payload.colors.clone();
            }
            SyncEvent::FavoriteTagsUpdated(payload) => {
                self.favorites = payload.favorite_tags.iter().cloned().collect();
            }
            SyncEvent::TagFilterChanged(payload) => {
                self.selected = payload.selected_tag.clone();
                return;
            }
        }
        self.rebuild();
    }

    fn upsert(&mut self, tag: TagRecord) {
        match self.records.iter_mut().find(|t| t.id == tag.id) {
            Some(slot) => *slot = tag,
            None => self.records.push(tag),
        }
        self.records.sort_by_key(|t| (t.sort_order, t.id));
    }

    fn rebuild(&mut self) {
        let searching = !self.search.trim().is_empty();
        let filtered = search::filter(&self.records, &self.search);
        let hierarchy = Hierarchy::build(&filtered);

        self.rows = if searching && self.expand_on_search {
            let mut expanded = self.expanded.clone();
            expanded.extend(filtered.iter().filter(|t| t.is_parent).map(|t| t.id));
            flatten(&hierarchy, &expanded)
        } else {
            flatten(&hierarchy, &self.expanded)
        };
    }

    // ========================
    // Rendering host surface
    // ========================

    /// Rows to render: the first `page * page_size` of the linearization
    pub fn visible(&self) -> &[LinearNode] {
        self.pager.window(&self.rows)
    }

    /// Full linearization, ignoring pagination
    pub fn rows(&self) -> &[LinearNode] {
        &self.rows
    }

    pub fn has_more(&self) -> bool {
        self.pager.has_more(self.rows.len())
    }

    /// The last visible row scrolled into view
    pub fn load_more(&mut self) -> bool {
        self.pager.load_more(self.rows.len())
    }

    pub fn toggle_expanded(&mut self, id: TagId) -> bool {
        let now_expanded = if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        };
        self.rebuild();
        now_expanded
    }

    pub fn expand_all(&mut self) {
        self.expanded = self.records.iter().map(|t| t.id).collect();
        self.rebuild();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
        self.rebuild();
    }

    pub fn is_expanded(&self, id: TagId) -> bool {
        self.expanded.contains(&id)
    }

    /// Set the search term. A changed term starts a new pagination session.
    pub fn set_search(&mut self, term: &str) {
        if term == self.search {
            return;
        }
        self.search = term.to_string();
        self.pager.reset();
        self.rebuild();
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    /// Color to draw for a tag: color map entry, then the record's own
    /// color, then the configured default
    pub fn resolved_color(&self, tag: &TagRecord) -> TagColor {
        let key = name_key(&tag.name);
        if let Some(color) = self.colors.iter().find(|(k, _)| name_key(k) == key).map(|(_, c)| c) {
            return color.clone();
        }
        if tag.color != TagColor::default() {
            return tag.color.clone();
        }
        self.default_color.clone()
    }

    /// Select a tag as the note filter (or clear it) and return the event to publish
    pub fn select(&mut self, name: Option<&str>) -> SyncEvent {
        self.selected = name.map(str::to_string);
        SyncEvent::filter(self.selected.clone())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    // ========================
    // Read access
    // ========================

    pub fn records(&self) -> &[TagRecord] {
        &self.records
    }

    pub fn record(&self, id: TagId) -> Option<&TagRecord> {
        self.records.iter().find(|t| t.id == id)
    }

    pub fn favorites(&self) -> &BTreeSet<String> {
        &self.favorites
    }

    pub fn colors(&self) -> &BTreeMap<String, TagColor> {
        &self.colors
    }

    /// Hierarchy of the unfiltered tag list
    pub fn hierarchy(&self) -> Hierarchy {
        Hierarchy::build(&self.records)
    }
}

/// Keep a shared panel in step with every event on `bus`
pub fn attach(panel: Arc<Mutex<TagPanel>>, bus: &SyncBus) -> Subscription {
    bus.subscribe_all(move |event| {
        panel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(event);
    })
}
