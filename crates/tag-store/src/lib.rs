//! Tag Store
//!
//! Tag domain model plus the persistence adapter that is the sole writer of
//! authoritative tag state. Backends are SQLite (`SqliteTagRepository`) and
//! in-memory (`MemoryTagRepository`); `CachedTagStore` layers validation, the
//! color map, the favorites read model and the optional remote tag API on top.

pub mod domain;
pub mod repository;

pub use domain::{
    name_key, DomainError, DomainResult, Entity, NewTag, PresetColor, TagColor, TagId, TagPatch,
    TagRecord,
};
pub use repository::{
    init_db, CachedTagStore, DbState, DeleteMode, MemoryTagRepository, RemoteResponse,
    RemoteTagApi, Repository, SqliteTagRepository, TagAttributeOperations, TagBackend,
    TagPositioningOperations, TagStore,
};
