use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use indicatif::MultiProgress;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::config::PipelineConfig;
use crate::core::types::{Cancellation, EntityId};
use crate::diff::engine::{compare, ComparisonResult};
use crate::diff::pairing::{pair, FilingPair};
use crate::edgar::parsing::facts::FinancialFact;
use crate::edgar::repository::{
    EntityLoad, EntityStatus, FilingRepository, LoadStats, NoDataReason,
};
use crate::storage::{DocumentStore, FsDocumentStore};
use crate::utils::pool::WorkerPool;
use crate::utils::progress::ProgressTracker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReportOutcome {
    NoData(NoDataReason),
    Compared(ComparisonResult),
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportOutcome::NoData(reason) => write!(f, "No data: {}", reason),
            ReportOutcome::Compared(result) => write!(f, "{}", result),
        }
    }
}

/// One row of the final report, one per requested entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub entity_id: EntityId,
    pub latest_accession: Option<String>,
    pub latest_date: Option<NaiveDate>,
    pub previous_accession: Option<String>,
    pub previous_date: Option<NaiveDate>,
    pub outcome: ReportOutcome,
}

impl DiffReport {
    fn no_data(entity_id: EntityId, reason: NoDataReason) -> Self {
        Self {
            entity_id,
            latest_accession: None,
            latest_date: None,
            previous_accession: None,
            previous_date: None,
            outcome: ReportOutcome::NoData(reason),
        }
    }

    fn compared(pair: &FilingPair, result: ComparisonResult) -> Self {
        Self {
            entity_id: pair.latest.entity_id.clone(),
            latest_accession: Some(pair.latest.accession_id.clone()),
            latest_date: Some(pair.latest.filing_date),
            previous_accession: pair.previous.as_ref().map(|f| f.accession_id.clone()),
            previous_date: pair.previous.as_ref().map(|f| f.filing_date),
            outcome: ReportOutcome::Compared(result),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self.outcome, ReportOutcome::NoData(_))
    }

    pub fn comparison(&self) -> Option<&ComparisonResult> {
        match &self.outcome {
            ReportOutcome::Compared(result) => Some(result),
            ReportOutcome::NoData(_) => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match &self.outcome {
            ReportOutcome::NoData(_) => "no_data",
            ReportOutcome::Compared(result) => result.label(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub reports: Vec<DiffReport>,
    pub facts: Vec<FinancialFact>,
    pub entities: Vec<EntityLoad>,
    pub stats: LoadStats,
}

/// Load, pair and compare in one run.
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    cancellation: Cancellation,
    multi_progress: Option<Arc<MultiProgress>>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cancellation: Cancellation::new(),
            multi_progress: None,
        }
    }

    /// Pipeline reading from the configured data directory.
    pub fn for_data_dir(config: &PipelineConfig) -> Self {
        Self::new(Arc::new(FsDocumentStore::new(&config.data_dir)))
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_progress(mut self, multi_progress: Arc<MultiProgress>) -> Self {
        self.multi_progress = Some(multi_progress);
        self
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    pub async fn run(&self, config: &PipelineConfig) -> Result<PipelineOutput> {
        log::info!(
            "Running filing comparison for {} entities with {} workers",
            config.entities.len(),
            config.workers
        );

        let repository = FilingRepository::from_config(self.store.clone(), config)
            .with_cancellation(self.cancellation.clone())
            .with_progress(ProgressTracker::new(
                self.multi_progress.as_ref(),
                "Loading filings",
            ));
        let data = repository.load(&config.entities).await?;

        let mut pairs = pair(&data.filings);
        let comparable: Vec<FilingPair> = data
            .entities
            .iter()
            .filter_map(|load| pairs.remove(&load.entity_id))
            .collect();

        let progress = ProgressTracker::new(self.multi_progress.as_ref(), "Comparing filings");
        progress.start_progress(comparable.len() as u64);
        let total = comparable.len();
        let cancellation = self.cancellation.clone();
        let tracker = progress.clone();
        let outcomes = WorkerPool::new(config.workers)
            .map_ordered(comparable, move |pair| {
                if cancellation.is_cancelled() {
                    return None;
                }
                tracker.update_message(pair.entity_id().as_str());
                let result = compare(&pair);
                tracker.increment(1);
                Some((pair, result))
            })
            .await?;
        progress.finish();

        let mut compared = HashMap::new();
        for (pair, result) in outcomes.into_iter().flatten() {
            compared.insert(pair.entity_id().clone(), (pair, result));
        }
        if compared.len() < total {
            return Err(anyhow!(
                "Comparison cancelled: {} of {} entities were not compared",
                total - compared.len(),
                total
            ));
        }

        let reports: Vec<DiffReport> = data
            .entities
            .iter()
            .map(|load| match compared.remove(&load.entity_id) {
                Some((pair, result)) => DiffReport::compared(&pair, result),
                None => DiffReport::no_data(load.entity_id.clone(), no_data_reason(load)),
            })
            .collect();

        let changed = reports
            .iter()
            .filter(|r| r.comparison().map_or(false, ComparisonResult::has_changes))
            .count();
        log::info!(
            "Compared {} entities: {} with changes, {} without data",
            reports.len(),
            changed,
            reports.iter().filter(|r| r.is_no_data()).count()
        );

        Ok(PipelineOutput {
            reports,
            facts: data.facts,
            entities: data.entities,
            stats: data.stats,
        })
    }
}

fn no_data_reason(load: &EntityLoad) -> NoDataReason {
    match &load.status {
        EntityStatus::NoData(reason) => reason.clone(),
        EntityStatus::Loaded => NoDataReason::NoEligibleFilings,
    }
}
