use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identifier of a tracked entity, normally its ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id: String = id.into();
        let uppercase_id = id.trim().to_uppercase();
        if uppercase_id.is_empty() {
            return Err(anyhow!("Entity id cannot be empty"));
        }
        let starts_alphanumeric = uppercase_id
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphanumeric());
        if !starts_alphanumeric
            || !uppercase_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(anyhow!(
                "Entity id must contain only alphanumeric characters, dots or hyphens: {}",
                id
            ));
        }
        Ok(EntityId(uppercase_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        EntityId::new(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        EntityId::new(s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Parses a comma separated entity list, dropping blanks and repeated ids.
pub fn parse_entity_list(raw: &str) -> Result<Vec<EntityId>> {
    let mut entities = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = EntityId::new(part)?;
        if !entities.contains(&id) {
            entities.push(id);
        }
    }
    Ok(entities)
}

/// Batch-level cancellation flag shared between the caller and running workers.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
