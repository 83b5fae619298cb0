use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use std::str::FromStr;

use super::types::{parse_entity_list, EntityId};
use crate::edgar::report::ReportType;

pub const DEFAULT_DATA_DIR: &str = "sec_data";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar range used to filter filings and facts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(anyhow!(
                "Start date {} must be before or equal to end date {}",
                start,
                end
            ));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))
}

pub fn parse_report_types(raw: &str) -> Result<Vec<ReportType>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ReportType::from_str(s).map_err(|e| anyhow!(e)))
        .collect()
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Immutable settings for one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub entities: Vec<EntityId>,
    pub data_dir: PathBuf,
    pub date_range: Option<DateRange>,
    /// Empty means every report type is kept.
    pub report_types: Vec<ReportType>,
    pub workers: usize,
}

impl PipelineConfig {
    pub fn new(entities: Vec<EntityId>, data_dir: impl Into<PathBuf>) -> Self {
        let mut unique = Vec::with_capacity(entities.len());
        for entity in entities {
            if !unique.contains(&entity) {
                unique.push(entity);
            }
        }
        Self {
            entities: unique,
            data_dir: data_dir.into(),
            date_range: None,
            report_types: Vec::new(),
            workers: default_workers(),
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = Some(date_range);
        self
    }

    pub fn with_report_types(mut self, report_types: Vec<ReportType>) -> Self {
        self.report_types = report_types;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let tickers = std::env::var("FILING_DELTA_TICKERS")
            .map_err(|_| anyhow!("FILING_DELTA_TICKERS environment variable not set"))?;
        let entities = parse_entity_list(&tickers)?;

        let data_dir = PathBuf::from(
            std::env::var("FILING_DELTA_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
        );

        let mut config = Self::new(entities, data_dir);

        let start = std::env::var("FILING_DELTA_START_DATE").ok();
        let end = std::env::var("FILING_DELTA_END_DATE").ok();
        match (start, end) {
            (Some(start), Some(end)) => {
                config = config.with_date_range(DateRange::parse(&start, &end)?);
            }
            (Some(start), None) => {
                let today = Local::now().date_naive();
                config = config.with_date_range(DateRange::new(parse_date(&start)?, today)?);
            }
            (None, Some(_)) => {
                return Err(anyhow!(
                    "FILING_DELTA_END_DATE is set without FILING_DELTA_START_DATE"
                ));
            }
            (None, None) => {}
        }

        if let Ok(forms) = std::env::var("FILING_DELTA_FORMS") {
            config = config.with_report_types(parse_report_types(&forms)?);
        }

        if let Ok(workers) = std::env::var("FILING_DELTA_WORKERS") {
            let workers = workers
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid FILING_DELTA_WORKERS value: {}", workers))?;
            config = config.with_workers(workers);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let range = DateRange::parse("2024-01-01", "2024-06-30").unwrap();
        assert!(range.contains(date("2024-01-01")));
        assert!(range.contains(date("2024-06-30")));
        assert!(!range.contains(date("2023-12-31")));
        assert!(!range.contains(date("2024-07-01")));
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        assert!(DateRange::parse("2024-06-01", "2024-01-01").is_err());
        assert!(DateRange::parse("2024-13-01", "2024-12-01").is_err());
    }

    #[test]
    fn test_config_dedups_entities_and_clamps_workers() {
        let entities = vec![
            EntityId::new("ACME").unwrap(),
            EntityId::new("INIT").unwrap(),
            EntityId::new("acme").unwrap(),
        ];
        let config = PipelineConfig::new(entities, "data").with_workers(0);
        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_report_type_filter() {
        let config = PipelineConfig::new(vec![], DEFAULT_DATA_DIR);
        assert!(config.report_types.is_empty());

        let types = parse_report_types("10-q, 10-K").unwrap();
        let config = config.with_report_types(types);
        assert_eq!(
            config.report_types,
            vec![ReportType::Form10Q, ReportType::Form10K]
        );

        assert!(parse_report_types("10-K,8-K").is_err());
    }
}
