use anyhow::{anyhow, Result};
use std::collections::HashMap;

use super::{DocumentStore, RawDocument};
use crate::core::types::EntityId;

#[derive(Debug, Default, Clone)]
struct EntityDocuments {
    filings: Vec<RawDocument>,
    facts: Vec<RawDocument>,
}

/// Document store held entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryDocumentStore {
    entities: HashMap<EntityId, EntityDocuments>,
    unavailable: HashMap<EntityId, String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filing(
        &mut self,
        entity: &EntityId,
        name: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> &mut Self {
        let locator = format!("memory://{}/filings/{}", entity, name);
        self.entities
            .entry(entity.clone())
            .or_default()
            .filings
            .push(RawDocument::new(name, locator, bytes));
        self
    }

    pub fn add_fact_document(
        &mut self,
        entity: &EntityId,
        name: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> &mut Self {
        let locator = format!("memory://{}/company_concepts/{}", entity, name);
        self.entities
            .entry(entity.clone())
            .or_default()
            .facts
            .push(RawDocument::new(name, locator, bytes));
        self
    }

    /// Makes every lookup for `entity` fail with `reason`.
    pub fn mark_unavailable(&mut self, entity: &EntityId, reason: &str) -> &mut Self {
        self.unavailable.insert(entity.clone(), reason.to_string());
        self
    }

    fn documents(&self, entity: &EntityId) -> Result<Option<&EntityDocuments>> {
        if let Some(reason) = self.unavailable.get(entity) {
            return Err(anyhow!("Documents for {} are unavailable: {}", entity, reason));
        }
        Ok(self.entities.get(entity))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn filing_documents(&self, entity: &EntityId) -> Result<Vec<RawDocument>> {
        Ok(self
            .documents(entity)?
            .map(|docs| docs.filings.clone())
            .unwrap_or_default())
    }

    fn fact_documents(&self, entity: &EntityId) -> Result<Vec<RawDocument>> {
        Ok(self
            .documents(entity)?
            .map(|docs| docs.facts.clone())
            .unwrap_or_default())
    }
}
