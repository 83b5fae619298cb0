use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::types::EntityId;

// Per-entity layout below the data directory
pub const FILINGS_DIR: &str = "filings";
pub const CONCEPTS_DIR: &str = "company_concepts";

pub fn entity_dir(root: &Path, entity: &EntityId) -> PathBuf {
    root.join(entity.as_str())
}

pub fn filings_dir(root: &Path, entity: &EntityId) -> PathBuf {
    entity_dir(root, entity).join(FILINGS_DIR)
}

pub fn concepts_dir(root: &Path, entity: &EntityId) -> PathBuf {
    entity_dir(root, entity).join(CONCEPTS_DIR)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("Failed to create directory {:?}", path))?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}
