use std::collections::HashMap;
use std::sync::Arc;

use crate::core::types::EntityId;
use crate::edgar::filing::Filing;

/// The most recent filing of an entity and, when one exists, the filing before it.
#[derive(Debug, Clone)]
pub struct FilingPair {
    pub latest: Arc<Filing>,
    pub previous: Option<Arc<Filing>>,
}

impl FilingPair {
    pub fn entity_id(&self) -> &EntityId {
        &self.latest.entity_id
    }
}

/// Groups `filings` by entity and keeps the first two of each group.
///
/// Input must already be newest first per entity, as produced by the
/// repository. Entities without filings are absent from the result.
pub fn pair(filings: &[Arc<Filing>]) -> HashMap<EntityId, FilingPair> {
    let mut pairs: HashMap<EntityId, FilingPair> = HashMap::new();
    for filing in filings {
        match pairs.get_mut(&filing.entity_id) {
            None => {
                pairs.insert(
                    filing.entity_id.clone(),
                    FilingPair {
                        latest: filing.clone(),
                        previous: None,
                    },
                );
            }
            Some(pair) if pair.previous.is_none() => pair.previous = Some(filing.clone()),
            Some(_) => {}
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::report::ReportType;
    use chrono::NaiveDate;

    fn filing(entity: &str, accession: &str, date: &str) -> Arc<Filing> {
        Arc::new(Filing {
            entity_id: EntityId::new(entity).unwrap(),
            accession_id: accession.to_string(),
            filing_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            source_path: format!("{}.htm", accession),
            raw_size: 0,
            content: String::new(),
            filing_type: ReportType::Other,
        })
    }

    #[test]
    fn test_no_filings_no_pairs() {
        assert!(pair(&[]).is_empty());
    }

    #[test]
    fn test_single_filing_has_no_previous() {
        let pairs = pair(&[filing("ACME", "1", "2024-01-01")]);
        let acme = &pairs[&EntityId::new("ACME").unwrap()];
        assert_eq!(acme.latest.accession_id, "1");
        assert!(acme.previous.is_none());
    }

    #[test]
    fn test_first_two_per_entity_are_kept() {
        let filings = vec![
            filing("ACME", "3", "2024-07-01"),
            filing("ACME", "2", "2024-04-01"),
            filing("ACME", "1", "2024-01-01"),
            filing("BETA", "b1", "2023-05-05"),
        ];
        let pairs = pair(&filings);
        assert_eq!(pairs.len(), 2);

        let acme = &pairs[&EntityId::new("ACME").unwrap()];
        assert_eq!(acme.latest.accession_id, "3");
        assert_eq!(acme.previous.as_ref().unwrap().accession_id, "2");
        assert_eq!(acme.entity_id().as_str(), "ACME");

        let beta = &pairs[&EntityId::new("BETA").unwrap()];
        assert_eq!(beta.latest.accession_id, "b1");
        assert!(beta.previous.is_none());
    }
}
