use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::ops::AddAssign;
use std::sync::Arc;

use super::filing::{Filing, FilingName};
use super::parsing::facts::{filter_filed_within, parse_fact_document, sort_facts, FinancialFact};
use super::parsing::text::extract_document;
use super::report::{classify, ReportType};
use crate::core::config::{DateRange, PipelineConfig};
use crate::core::types::{Cancellation, EntityId};
use crate::storage::{DocumentStore, RawDocument};
use crate::utils::pool::WorkerPool;
use crate::utils::progress::ProgressTracker;

/// Why an entity contributes nothing to pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NoDataReason {
    /// The store holds no filing documents for the entity.
    NoFilingDocuments,
    /// Documents exist, but every one was skipped or filtered out.
    NoEligibleFilings,
    /// The store could not list the entity's documents.
    StoreUnavailable(String),
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::NoFilingDocuments => write!(f, "no filing documents found"),
            NoDataReason::NoEligibleFilings => write!(f, "no eligible filings"),
            NoDataReason::StoreUnavailable(reason) => {
                write!(f, "document store unavailable: {}", reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EntityStatus {
    Loaded,
    NoData(NoDataReason),
}

/// Counters describing what happened to the documents of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub discovered: usize,
    pub loaded: usize,
    pub skipped_names: usize,
    pub invalid_dates: usize,
    pub out_of_range: usize,
    pub filtered_types: usize,
    pub duplicates: usize,
    pub extraction_failures: usize,
    pub facts: usize,
}

impl AddAssign<&LoadStats> for LoadStats {
    fn add_assign(&mut self, other: &LoadStats) {
        self.discovered += other.discovered;
        self.loaded += other.loaded;
        self.skipped_names += other.skipped_names;
        self.invalid_dates += other.invalid_dates;
        self.out_of_range += other.out_of_range;
        self.filtered_types += other.filtered_types;
        self.duplicates += other.duplicates;
        self.extraction_failures += other.extraction_failures;
        self.facts += other.facts;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityLoad {
    pub entity_id: EntityId,
    pub status: EntityStatus,
    pub stats: LoadStats,
}

/// Everything one entity contributed to a load.
#[derive(Debug, Clone)]
pub struct EntityBatch {
    pub load: EntityLoad,
    pub filings: Vec<Arc<Filing>>,
    pub facts: Vec<FinancialFact>,
}

/// Result of [`FilingRepository::load`]. Filings and facts are concatenated
/// entity by entity in request order; filings of one entity are newest first.
#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub facts: Vec<FinancialFact>,
    pub filings: Vec<Arc<Filing>>,
    pub entities: Vec<EntityLoad>,
    pub stats: LoadStats,
}

impl LoadedData {
    fn push(&mut self, batch: EntityBatch) {
        self.stats += &batch.load.stats;
        self.filings.extend(batch.filings);
        self.facts.extend(batch.facts);
        self.entities.push(batch.load);
    }

    pub fn status_of(&self, entity: &EntityId) -> Option<&EntityStatus> {
        self.entities
            .iter()
            .find(|load| &load.entity_id == entity)
            .map(|load| &load.status)
    }
}

#[derive(Debug, Clone, Default)]
struct LoadFilter {
    date_range: Option<DateRange>,
    report_types: Vec<ReportType>,
}

impl LoadFilter {
    fn accepts_type(&self, report_type: &ReportType) -> bool {
        self.report_types.is_empty() || self.report_types.contains(report_type)
    }
}

struct EntityLoader {
    store: Arc<dyn DocumentStore>,
    filter: LoadFilter,
}

impl EntityLoader {
    fn load(&self, entity: &EntityId) -> Result<EntityBatch> {
        let mut stats = LoadStats::default();

        let facts = self.load_facts(entity)?;
        stats.facts = facts.len();

        let documents = match self.store.filing_documents(entity) {
            Ok(documents) => documents,
            Err(e) => {
                log::warn!("Failed to list filing documents for {}: {:#}", entity, e);
                let reason = NoDataReason::StoreUnavailable(e.to_string());
                return Ok(EntityBatch {
                    load: EntityLoad {
                        entity_id: entity.clone(),
                        status: EntityStatus::NoData(reason),
                        stats,
                    },
                    filings: Vec::new(),
                    facts,
                });
            }
        };

        stats.discovered = documents.len();
        if documents.is_empty() {
            log::warn!("No filing documents found for {}", entity);
        }

        let mut seen = HashSet::new();
        let mut filings = Vec::new();
        for document in documents {
            if let Some(filing) = self.load_filing(entity, document, &mut seen, &mut stats) {
                filings.push(filing);
            }
        }

        filings.sort_by(|a, b| {
            b.filing_date
                .cmp(&a.filing_date)
                .then_with(|| b.accession_id.cmp(&a.accession_id))
        });
        stats.loaded = filings.len();

        let status = if stats.discovered == 0 {
            EntityStatus::NoData(NoDataReason::NoFilingDocuments)
        } else if filings.is_empty() {
            log::warn!(
                "None of the {} filing documents for {} are eligible",
                stats.discovered,
                entity
            );
            EntityStatus::NoData(NoDataReason::NoEligibleFilings)
        } else {
            EntityStatus::Loaded
        };

        log::info!(
            "Loaded {} of {} filings and {} facts for {}",
            stats.loaded,
            stats.discovered,
            stats.facts,
            entity
        );

        Ok(EntityBatch {
            load: EntityLoad {
                entity_id: entity.clone(),
                status,
                stats,
            },
            filings: filings.into_iter().map(Arc::new).collect(),
            facts,
        })
    }

    fn load_filing(
        &self,
        entity: &EntityId,
        document: RawDocument,
        seen: &mut HashSet<String>,
        stats: &mut LoadStats,
    ) -> Option<Filing> {
        let name = match FilingName::parse(&document.name) {
            Ok(name) => name,
            Err(e) => {
                log::warn!("Skipping {}: {}", document.locator, e);
                stats.skipped_names += 1;
                return None;
            }
        };

        let Some(filing_date) = name.filing_date() else {
            log::warn!(
                "Skipping {}: unparseable filing date '{}'",
                document.locator,
                name.raw_date
            );
            stats.invalid_dates += 1;
            return None;
        };

        if let Some(range) = &self.filter.date_range {
            if !range.contains(filing_date) {
                log::debug!("Skipping {}: filed {} outside range", document.locator, filing_date);
                stats.out_of_range += 1;
                return None;
            }
        }

        let extraction = extract_document(&document.bytes);
        if let Some(warning) = &extraction.warning {
            log::warn!("Text extraction failed for {}: {}", document.locator, warning);
            stats.extraction_failures += 1;
        }

        let filing_type = classify(&extraction.text, &document.name);
        if !self.filter.accepts_type(&filing_type) {
            log::debug!("Skipping {}: report type {} not requested", document.locator, filing_type);
            stats.filtered_types += 1;
            return None;
        }

        if !seen.insert(name.accession_id.clone()) {
            log::warn!(
                "Skipping {}: accession {} already loaded for {}",
                document.locator,
                name.accession_id,
                entity
            );
            stats.duplicates += 1;
            return None;
        }

        log::debug!(
            "Extracted {} characters from {} ({})",
            extraction.text.len(),
            document.locator,
            filing_type
        );

        Some(Filing {
            entity_id: entity.clone(),
            accession_id: name.accession_id,
            filing_date,
            raw_size: document.size(),
            source_path: document.locator,
            content: extraction.text,
            filing_type,
        })
    }

    fn load_facts(&self, entity: &EntityId) -> Result<Vec<FinancialFact>> {
        let documents = match self.store.fact_documents(entity) {
            Ok(documents) => documents,
            Err(e) => {
                log::warn!("Failed to list fact documents for {}: {:#}", entity, e);
                return Ok(Vec::new());
            }
        };

        let mut facts = Vec::new();
        for document in documents {
            let parsed = parse_fact_document(entity, &document.bytes).with_context(|| {
                format!("Failed to parse fact document {} for {}", document.locator, entity)
            })?;
            log::debug!("Parsed {} facts from {}", parsed.len(), document.locator);
            facts.extend(parsed);
        }

        if let Some(range) = &self.filter.date_range {
            facts = filter_filed_within(facts, range);
        }
        sort_facts(&mut facts);
        Ok(facts)
    }
}

/// Loads and indexes the filings and facts of a set of entities.
pub struct FilingRepository {
    loader: Arc<EntityLoader>,
    pool: WorkerPool,
    cancellation: Cancellation,
    progress: ProgressTracker,
}

impl FilingRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            loader: Arc::new(EntityLoader {
                store,
                filter: LoadFilter::default(),
            }),
            pool: WorkerPool::default(),
            cancellation: Cancellation::new(),
            progress: ProgressTracker::hidden("Loading filings"),
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &PipelineConfig) -> Self {
        let filter = LoadFilter {
            date_range: config.date_range,
            report_types: config.report_types.clone(),
        };
        Self {
            loader: Arc::new(EntityLoader { store, filter }),
            pool: WorkerPool::new(config.workers),
            cancellation: Cancellation::new(),
            progress: ProgressTracker::hidden("Loading filings"),
        }
    }

    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    /// Loads one entity synchronously.
    pub fn load_entity(&self, entity: &EntityId) -> Result<EntityBatch> {
        self.loader.load(entity)
    }

    /// Loads every requested entity on the worker pool.
    ///
    /// Entity-level problems are reported through [`EntityStatus`]; only an
    /// unreadable fact document or a cancelled run returns an error.
    pub async fn load(&self, entities: &[EntityId]) -> Result<LoadedData> {
        let mut requested: Vec<EntityId> = Vec::with_capacity(entities.len());
        for entity in entities {
            if !requested.contains(entity) {
                requested.push(entity.clone());
            }
        }
        let total = requested.len();

        self.progress.start_progress(total as u64);
        let loader = self.loader.clone();
        let cancellation = self.cancellation.clone();
        let progress = self.progress.clone();
        let outcomes = self
            .pool
            .map_ordered(requested, move |entity| {
                if cancellation.is_cancelled() {
                    return Ok(None);
                }
                progress.update_message(entity.as_str());
                let batch = loader.load(&entity);
                progress.increment(1);
                batch.map(Some)
            })
            .await?;
        self.progress.finish();

        let mut data = LoadedData::default();
        let mut skipped = 0;
        for outcome in outcomes {
            match outcome? {
                Some(batch) => data.push(batch),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            return Err(anyhow!(
                "Load cancelled: {} of {} entities were not processed",
                skipped,
                total
            ));
        }

        log::info!(
            "Loaded {} filings and {} facts for {} entities",
            data.filings.len(),
            data.facts.len(),
            data.entities.len()
        );
        Ok(data)
    }
}
