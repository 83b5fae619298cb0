use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::core::config::DATE_FORMAT;
use crate::edgar::parsing::facts::{group_by_unit, unit_table_name, FinancialFact};
use crate::pipeline::{DiffReport, ReportOutcome};
use crate::utils::dirs;

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    entity_id: &'a str,
    status: &'a str,
    latest_accession: &'a str,
    latest_date: String,
    previous_accession: &'a str,
    previous_date: String,
    added: usize,
    removed: usize,
    comparison: String,
}

impl<'a> From<&'a DiffReport> for ReportRow<'a> {
    fn from(report: &'a DiffReport) -> Self {
        let format_date = |date: Option<chrono::NaiveDate>| {
            date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
        };
        let (added, removed) = match &report.outcome {
            ReportOutcome::Compared(result) => (result.added().len(), result.removed().len()),
            ReportOutcome::NoData(_) => (0, 0),
        };
        ReportRow {
            entity_id: report.entity_id.as_str(),
            status: report.status(),
            latest_accession: report.latest_accession.as_deref().unwrap_or_default(),
            latest_date: format_date(report.latest_date),
            previous_accession: report.previous_accession.as_deref().unwrap_or_default(),
            previous_date: format_date(report.previous_date),
            added,
            removed,
            comparison: report.outcome.to_string(),
        }
    }
}

fn create_writer(path: &Path) -> Result<csv::Writer<File>> {
    dirs::ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    Ok(WriterBuilder::new().has_headers(true).from_writer(file))
}

/// Writes one row per report, in report order.
pub fn write_reports_csv(path: &Path, reports: &[DiffReport]) -> Result<()> {
    let mut writer = create_writer(path)?;
    for report in reports {
        writer.serialize(ReportRow::from(report))?;
    }
    writer.flush()?;
    log::info!("Wrote {} report rows to {:?}", reports.len(), path);
    Ok(())
}

pub fn write_facts_csv(path: &Path, facts: &[FinancialFact]) -> Result<()> {
    write_fact_rows(path, facts.iter())?;
    log::info!("Wrote {} facts to {:?}", facts.len(), path);
    Ok(())
}

fn write_fact_rows<'a>(path: &Path, facts: impl Iterator<Item = &'a FinancialFact>) -> Result<()> {
    let mut writer = create_writer(path)?;
    for fact in facts {
        writer.serialize(fact)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one `facts_<unit>.csv` per unit into `dir` and returns the paths written.
pub fn write_facts_by_unit(dir: &Path, facts: &[FinancialFact]) -> Result<Vec<PathBuf>> {
    dirs::ensure_dir(dir)?;
    let mut written = Vec::new();
    for (unit, group) in group_by_unit(facts) {
        let path = dir.join(format!("facts_{}.csv", unit_table_name(&unit)));
        write_fact_rows(&path, group.into_iter())?;
        log::debug!("Wrote facts for unit {} to {:?}", unit, path);
        written.push(path);
    }
    Ok(written)
}
