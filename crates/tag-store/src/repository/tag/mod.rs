//! Tag Repository Module
//!
//! SQLite tag repository split into specialized sub-modules:
//! - tag_repo: Core CRUD operations
//! - tag_attributes: color map and favorites set
//! - tag_positioning: sort order management

mod tag_attributes;
mod tag_positioning;
mod tag_repo;

pub use tag_repo::SqliteTagRepository;
