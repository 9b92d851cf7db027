//! Read access to alert rules and user profiles

pub mod memory;

use crate::alerts::AlertRule;

pub use memory::InMemoryStore;

/// Source of the current rule set
#[async_trait::async_trait]
pub trait RuleStore: Send + Sync {
    /// Full snapshot of all persisted rules
    async fn list_all_rules(&self) -> Result<Vec<AlertRule>, StoreError>;
}

/// Resolves user display names for email salutations
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn display_name(&self, owner_id: &str) -> Result<Option<String>, StoreError>;
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
