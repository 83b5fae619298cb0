use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::{DocumentStore, RawDocument};
use crate::core::types::EntityId;
use crate::edgar::filing::MARKUP_EXTENSIONS;
use crate::utils::dirs;

/// Reads documents from `<root>/<ENTITY>/filings` and
/// `<root>/<ENTITY>/company_concepts`, recursing into subdirectories.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn is_markup_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| MARKUP_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn is_fact_file(name: &str) -> bool {
    name.starts_with("CIK") && name.to_lowercase().ends_with(".json")
}

fn collect_files(dir: &Path, accept: fn(&str) -> bool, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list directory {:?}", dir))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&path, accept, found)?;
        } else if file_type.is_file() {
            let accepted = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, accept);
            if accepted {
                found.push(path);
            }
        }
    }
    Ok(())
}

fn read_documents(dir: &Path, accept: fn(&str) -> bool) -> Result<Vec<RawDocument>> {
    if !dir.is_dir() {
        log::debug!("No document directory at {:?}", dir);
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    collect_files(dir, accept, &mut paths)?;
    paths.sort();

    let documents = paths
        .into_iter()
        .filter_map(|path| match fs::read(&path) {
            Ok(bytes) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Some(RawDocument::new(name, path.display().to_string(), bytes))
            }
            Err(e) => {
                log::warn!("Skipping unreadable document {:?}: {}", path, e);
                None
            }
        })
        .collect();
    Ok(documents)
}

impl DocumentStore for FsDocumentStore {
    fn filing_documents(&self, entity: &EntityId) -> Result<Vec<RawDocument>> {
        read_documents(&dirs::filings_dir(&self.root, entity), is_markup_file)
    }

    fn fact_documents(&self, entity: &EntityId) -> Result<Vec<RawDocument>> {
        read_documents(&dirs::concepts_dir(&self.root, entity), is_fact_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_reads_markup_and_fact_documents_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let entity = EntityId::new("ACME").unwrap();
        let filings = dirs::filings_dir(dir.path(), &entity);
        let concepts = dirs::concepts_dir(dir.path(), &entity);

        write(&filings.join("accession_2_2024-04-01.htm"), "<p>b</p>");
        write(&filings.join("nested/accession_1_2024-01-01.HTML"), "<p>a</p>");
        write(&filings.join("R1.xml"), "<xml/>");
        write(&concepts.join("CIK0000001234.json"), "{}");
        write(&concepts.join("notes.json"), "{}");

        let store = FsDocumentStore::new(dir.path());
        let docs = store.filing_documents(&entity).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["accession_2_2024-04-01.htm", "accession_1_2024-01-01.HTML"]);
        assert_eq!(docs[0].bytes, b"<p>b</p>");
        assert_eq!(docs[0].size(), 8);
        assert!(docs[1].locator.ends_with("accession_1_2024-01-01.HTML"));

        let facts = store.fact_documents(&entity).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].name, "CIK0000001234.json");
    }

    #[test]
    fn test_missing_directories_yield_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let entity = EntityId::new("NONE").unwrap();
        assert!(store.filing_documents(&entity).unwrap().is_empty());
        assert!(store.fact_documents(&entity).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_document_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let entity = EntityId::new("ACME").unwrap();
        let filings = dirs::filings_dir(dir.path(), &entity);
        let locked = filings.join("accession_1_2024-01-01.htm");
        write(&locked, "<p>a</p>");
        write(&filings.join("accession_2_2024-04-01.htm"), "<p>b</p>");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop a privileged user.
        if fs::read(&locked).is_ok() {
            return;
        }

        let store = FsDocumentStore::new(dir.path());
        let docs = store.filing_documents(&entity).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["accession_2_2024-04-01.htm"]);
    }
}
