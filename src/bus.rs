//! Sync Bus
//!
//! Typed in-process publish/subscribe that keeps tag surfaces consistent.
//! Each topic has exactly one payload type. Handlers run synchronously inside
//! `publish`, in subscription order; async consumers can also take a
//! broadcast stream of every event.
//!
//! No ordering holds between topics for one logical change, so consumers must
//! converge whatever order events arrive in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::broadcast;

use tag_store::{TagColor, TagId, TagRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    TagsChanged,
    TagColorsChanged,
    FavoriteTagsUpdated,
    TagFilterChanged,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::TagsChanged,
        Topic::TagColorsChanged,
        Topic::FavoriteTagsUpdated,
        Topic::TagFilterChanged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::TagsChanged => "tagsChanged",
            Topic::TagColorsChanged => "tagColorsChanged",
            Topic::FavoriteTagsUpdated => "favoriteTagsUpdated",
            Topic::TagFilterChanged => "tagFilterChanged",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the tag named in a `tagsChanged` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagAction {
    Add,
    Update,
    Rename { previous: String },
    Delete,
    Move,
    Reorder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsChanged {
    pub action: TagAction,
    pub tag_id: TagId,
    pub tag_name: String,
    /// Fresh record after the write. `None` for deletions.
    pub tag: Option<TagRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagColorsChanged {
    pub colors: BTreeMap<String, TagColor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteTagsUpdated {
    pub favorite_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFilterChanged {
    pub selected_tag: Option<String>,
}

/// One event on the bus; serializes as `{ "topic": ..., "payload": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload", rename_all = "camelCase")]
pub enum SyncEvent {
    TagsChanged(TagsChanged),
    TagColorsChanged(TagColorsChanged),
    FavoriteTagsUpdated(FavoriteTagsUpdated),
    TagFilterChanged(TagFilterChanged),
}

impl SyncEvent {
    pub fn topic(&self) -> Topic {
        match self {
            SyncEvent::TagsChanged(_) => Topic::TagsChanged,
            SyncEvent::TagColorsChanged(_) => Topic::TagColorsChanged,
            SyncEvent::FavoriteTagsUpdated(_) => Topic::FavoriteTagsUpdated,
            SyncEvent::TagFilterChanged(_) => Topic::TagFilterChanged,
        }
    }

    pub fn tags_changed(action: TagAction, tag: &TagRecord) -> Self {
        SyncEvent::TagsChanged(TagsChanged {
            action,
            tag_id: tag.id,
            tag_name: tag.name.clone(),
            tag: Some(tag.clone()),
        })
    }

    pub fn tag_deleted(tag: &TagRecord) -> Self {
        SyncEvent::TagsChanged(TagsChanged {
            action: TagAction::Delete,
            tag_id: tag.id,
            tag_name: tag.name.clone(),
            tag: None,
        })
    }

    pub fn colors(colors: BTreeMap<String, TagColor>) -> Self {
        SyncEvent::TagColorsChanged(TagColorsChanged { colors })
    }

    pub fn favorites(names: impl IntoIterator<Item = String>) -> Self {
        SyncEvent::FavoriteTagsUpdated(FavoriteTagsUpdated {
            favorite_tags: names.into_iter().collect(),
        })
    }

    pub fn filter(selected_tag: Option<String>) -> Self {
        SyncEvent::TagFilterChanged(TagFilterChanged { selected_tag })
    }
}

type Handler = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

struct Entry {
    id: u64,
    /// `None` receives every topic
    topic: Option<Topic>,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

type SharedRegistry = Arc<Mutex<Registry>>;

fn lock(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable handle to one bus
#[derive(Clone)]
pub struct SyncBus {
    registry: SharedRegistry,
    stream: broadcast::Sender<SyncEvent>,
}

impl SyncBus {
    /// `capacity` bounds the broadcast stream; slow stream readers lag
    pub fn new(capacity: usize) -> Self {
        let (stream, _) = broadcast::channel(capacity.max(1));
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            stream,
        }
    }

    /// Deliver `event` to every matching handler, then to the stream.
    /// Returns the number of handlers invoked.
    pub fn publish(&self, event: SyncEvent) -> usize {
        let topic = event.topic();
        let handlers: Vec<Handler> = lock(&self.registry)
            .entries
            .iter()
            .filter(|e| e.topic.map_or(true, |t| t == topic))
            .map(|e| Arc::clone(&e.handler))
            .collect();

        tracing::trace!(%topic, handlers = handlers.len(), "publish");
        for handler in &handlers {
            handler(&event);
        }
        // No stream readers is fine
        let _ = self.stream.send(event);
        handlers.len()
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.register(Some(topic), Arc::new(handler))
    }

    /// Handler for every topic
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    fn register(&self, topic: Option<Topic>, handler: Handler) -> Subscription {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push(Entry { id, topic, handler });
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Receiver of every event published from now on
    pub fn stream(&self) -> broadcast::Receiver<SyncEvent> {
        self.stream.subscribe()
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).entries.len()
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Registration guard. Dropping it unsubscribes the handler.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    /// Keep the handler registered for the lifetime of the bus
    pub fn detach(mut self) {
        self.registry = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.retain(|e| e.id != self.id);
        }
    }
}
