//! Remote Tag API
//!
//! Name-keyed operations on the note service that owns tag usage.
//! Every call answers with `{ success, message }`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl RemoteResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// `Persistence` error carrying the remote message when `success` is false
    pub fn into_result(self, action: &str) -> DomainResult<()> {
        if self.success {
            Ok(())
        } else if self.message.is_empty() {
            Err(DomainError::Persistence(format!("{} failed", action)))
        } else {
            Err(DomainError::Persistence(format!("{} failed: {}", action, self.message)))
        }
    }
}

/// Remote side effects of tag mutations, keyed by exact tag name
#[async_trait]
pub trait RemoteTagApi: Send + Sync {
    async fn create_tag(&self, name: &str) -> DomainResult<RemoteResponse>;

    async fn rename_tag(&self, old_name: &str, new_name: &str) -> DomainResult<RemoteResponse>;

    async fn delete_tag(&self, name: &str) -> DomainResult<RemoteResponse>;

    async fn remove_tag_from_all_notes(&self, name: &str) -> DomainResult<RemoteResponse>;

    async fn delete_tag_and_notes(&self, name: &str) -> DomainResult<RemoteResponse>;
}
