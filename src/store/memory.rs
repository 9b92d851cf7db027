//! In-memory rule and user store, optionally seeded from a JSON file

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{RuleStore, StoreError, UserDirectory};
use crate::alerts::AlertRule;

/// User profile entry in a seed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
}

/// Seed file layout
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rules: RwLock<HashMap<String, AlertRule>>,
    users: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load users and rules from a JSON seed file
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        let seed: SeedFile = serde_json::from_str(&content)?;

        let store = Self::new();
        for user in seed.users {
            store.insert_user(user.id, user.name);
        }
        for rule in seed.rules {
            store.insert_rule(rule);
        }
        Ok(store)
    }

    /// Insert or replace a rule, returning the previous version
    pub fn insert_rule(&self, rule: AlertRule) -> Option<AlertRule> {
        let mut rules = self.rules.write();
        rules.insert(rule.id.clone(), rule)
    }

    pub fn remove_rule(&self, id: &str) -> Option<AlertRule> {
        let mut rules = self.rules.write();
        rules.remove(id)
    }

    /// Rules sorted by ID
    pub fn rules(&self) -> Vec<AlertRule> {
        let rules = self.rules.read();
        let mut list: Vec<AlertRule> = rules.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub fn insert_user(&self, id: impl Into<String>, name: impl Into<String>) {
        let mut users = self.users.write();
        users.insert(id.into(), name.into());
    }
}

#[async_trait::async_trait]
impl RuleStore for InMemoryStore {
    async fn list_all_rules(&self) -> Result<Vec<AlertRule>, StoreError> {
        Ok(self.rules())
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryStore {
    async fn display_name(&self, owner_id: &str) -> Result<Option<String>, StoreError> {
        let users = self.users.read();
        Ok(users
            .get(owner_id)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string))
    }
}
