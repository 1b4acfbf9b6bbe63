//! Repository Layer
//!
//! Data access abstractions and implementations.

mod db;
mod memory;
mod remote;
mod store;
mod tag;
mod traits;

#[cfg(test)]
mod tests;

pub use db::{init_db, DbState, SharedConnection};
pub use memory::MemoryTagRepository;
pub use remote::{RemoteResponse, RemoteTagApi};
pub use store::CachedTagStore;
pub use tag::SqliteTagRepository;
pub use traits::{
    DeleteMode, Repository, TagAttributeOperations, TagBackend, TagPositioningOperations,
    TagStore,
};
