use anyhow::{Context, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::{DateRange, DATE_FORMAT};
use crate::core::types::EntityId;

/// One structured numeric disclosure. `None` marks a value the source omitted
/// or that could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialFact {
    pub entity_id: EntityId,
    pub taxonomy: String,
    pub concept: String,
    pub unit: String,
    pub value: Option<f64>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub accession_id: Option<String>,
    pub fiscal_year: Option<i32>,
    pub fiscal_period: Option<String>,
    pub form: Option<String>,
    pub filed_date: Option<NaiveDate>,
    pub frame: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FactRecord {
    val: Option<f64>,
    start: Option<String>,
    end: Option<String>,
    accn: Option<String>,
    fy: Option<i32>,
    fp: Option<String>,
    form: Option<String>,
    filed: Option<String>,
    frame: Option<String>,
}

type UnitRecords = BTreeMap<String, Vec<FactRecord>>;

// companyconcept layout: one concept per document
#[derive(Debug, Deserialize)]
struct ConceptDocument {
    taxonomy: String,
    tag: String,
    #[serde(default)]
    units: UnitRecords,
}

#[derive(Debug, Deserialize)]
struct ConceptUnits {
    #[serde(default)]
    units: UnitRecords,
}

// companyfacts layout: taxonomy -> concept -> units
#[derive(Debug, Deserialize)]
struct CompanyFactsDocument {
    facts: BTreeMap<String, BTreeMap<String, ConceptUnits>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FactDocument {
    Concept(ConceptDocument),
    CompanyFacts(CompanyFactsDocument),
}

fn coerce_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
}

fn push_unit_records(
    facts: &mut Vec<FinancialFact>,
    entity_id: &EntityId,
    taxonomy: &str,
    concept: &str,
    units: UnitRecords,
) {
    for (unit, records) in units {
        for record in records {
            facts.push(FinancialFact {
                entity_id: entity_id.clone(),
                taxonomy: taxonomy.to_string(),
                concept: concept.to_string(),
                unit: unit.clone(),
                value: record.val,
                period_start: coerce_date(record.start),
                period_end: coerce_date(record.end),
                accession_id: record.accn,
                fiscal_year: record.fy,
                fiscal_period: record.fp,
                form: record.form,
                filed_date: coerce_date(record.filed),
                frame: record.frame,
            });
        }
    }
}

/// Flattens one fact document into rows.
///
/// Accepts both the single-concept layout and the full company-facts layout.
/// A document matching neither is an error for the whole load.
pub fn parse_fact_document(entity_id: &EntityId, raw: &[u8]) -> Result<Vec<FinancialFact>> {
    let document: FactDocument = serde_json::from_slice(raw)
        .context("Fact document matches neither the company concept nor the company facts layout")?;

    let mut facts = Vec::new();
    match document {
        FactDocument::Concept(concept) => push_unit_records(
            &mut facts,
            entity_id,
            &concept.taxonomy,
            &concept.tag,
            concept.units,
        ),
        FactDocument::CompanyFacts(company) => {
            for (taxonomy, concepts) in company.facts {
                for (concept, concept_units) in concepts {
                    push_unit_records(
                        &mut facts,
                        entity_id,
                        &taxonomy,
                        &concept,
                        concept_units.units,
                    );
                }
            }
        }
    }

    Ok(facts)
}

/// Canonical order: taxonomy, concept, then period end with unknown ends last.
pub fn sort_facts(facts: &mut [FinancialFact]) {
    facts.sort_by(|a, b| {
        a.taxonomy
            .cmp(&b.taxonomy)
            .then_with(|| a.concept.cmp(&b.concept))
            .then_with(|| a.period_end.is_none().cmp(&b.period_end.is_none()))
            .then_with(|| a.period_end.cmp(&b.period_end))
    });
}

/// Keeps facts filed inside `range`; facts without a filed date are dropped.
pub fn filter_filed_within(facts: Vec<FinancialFact>, range: &DateRange) -> Vec<FinancialFact> {
    facts
        .into_iter()
        .filter(|fact| fact.filed_date.map_or(false, |date| range.contains(date)))
        .collect()
}

/// Derived per-unit view over a fact sequence, keeping row order inside each group.
pub fn group_by_unit(facts: &[FinancialFact]) -> BTreeMap<String, Vec<&FinancialFact>> {
    facts
        .iter()
        .into_group_map_by(|fact| fact.unit.clone())
        .into_iter()
        .collect()
}

/// File-safe name for a unit group, e.g. `USD/shares` -> `USD_per_shares`.
pub fn unit_table_name(unit: &str) -> String {
    unit.replace('/', "_per_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
