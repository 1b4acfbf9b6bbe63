//! Domain Layer
//!
//! Contains the tag entity and core abstractions.
//! This layer has no storage dependencies beyond error conversion.

mod color;
mod entity;
mod tag;
mod validation;

pub use color::{PresetColor, TagColor};
pub use entity::{DomainError, DomainResult, Entity};
pub use tag::{NewTag, TagId, TagPatch, TagRecord};
pub use validation::{name_key, validate_tag_name, TagValidationError, MAX_TAG_NAME_LEN};
