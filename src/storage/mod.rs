use anyhow::Result;

use crate::core::types::EntityId;

pub mod fs;
pub mod memory;

pub use self::fs::FsDocumentStore;
pub use self::memory::MemoryDocumentStore;

/// A raw, fully materialized document handed to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// File name, used for the naming convention and classification.
    pub name: String,
    /// Where the document came from; opaque to the core.
    pub locator: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(
        name: impl Into<String>,
        locator: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Source of raw filing and fact documents for an entity.
///
/// Acquisition (scraping, downloading) happens before the store is consulted;
/// implementations only hand back what is already available.
pub trait DocumentStore: Send + Sync {
    /// Narrative filing documents. An entity the store knows nothing about
    /// yields an empty list.
    fn filing_documents(&self, entity: &EntityId) -> Result<Vec<RawDocument>>;

    /// Structured fact documents (JSON).
    fn fact_documents(&self, entity: &EntityId) -> Result<Vec<RawDocument>>;
}
