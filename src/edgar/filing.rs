use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::report::ReportType;
use crate::core::config::DATE_FORMAT;
use crate::core::types::EntityId;

pub const ACCESSION_PREFIX: &str = "accession_";
pub const MARKUP_EXTENSIONS: &[&str] = &["htm", "html"];

/// One narrative filing with its extracted text. Never modified after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    pub entity_id: EntityId,
    pub accession_id: String,
    pub filing_date: NaiveDate,
    pub source_path: String,
    pub raw_size: u64,
    pub content: String,
    pub filing_type: ReportType,
}

impl Filing {
    pub fn content_length(&self) -> usize {
        self.content.len()
    }
}

/// Parts encoded in a filing document name: `accession_<accession-id>_<filing-date>.htm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingName {
    pub accession_id: String,
    pub raw_date: String,
}

impl FilingName {
    pub fn parse(filename: &str) -> Result<Self> {
        let path = Path::new(filename);
        let stem = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if MARKUP_EXTENSIONS.contains(&ext.to_lowercase().as_str()) => path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow!("Filing name is not valid UTF-8: {}", filename))?,
            Some(ext) => {
                return Err(anyhow!(
                    "Filing name {} has extension '{}', expected one of {:?}",
                    filename,
                    ext,
                    MARKUP_EXTENSIONS
                ))
            }
            None => return Err(anyhow!("Filing name {} has no extension", filename)),
        };

        let rest = stem.strip_prefix(ACCESSION_PREFIX).ok_or_else(|| {
            anyhow!(
                "Filing name {} does not start with '{}'",
                filename,
                ACCESSION_PREFIX
            )
        })?;

        let (accession_id, raw_date) = rest
            .rsplit_once('_')
            .ok_or_else(|| anyhow!("Filing name {} has no filing date part", filename))?;

        if accession_id.is_empty() || raw_date.is_empty() {
            return Err(anyhow!(
                "Filing name {} has an empty accession id or filing date",
                filename
            ));
        }

        Ok(Self {
            accession_id: accession_id.to_string(),
            raw_date: raw_date.to_string(),
        })
    }

    /// `None` when the date part is not a valid `YYYY-MM-DD` date.
    pub fn filing_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.raw_date, DATE_FORMAT).ok()
    }
}
