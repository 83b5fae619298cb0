use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(try_from = "String", into = "String")]
pub enum ReportType {
    Form10K,
    Form10Q,
    Other,
}

/// Markers tested by [`classify`], in precedence order.
///
/// Annual reports are checked before quarterly ones: a 10-Q that quotes an
/// annual figure mentions "10-K" too, but a filing carrying the annual
/// marker is treated as the annual report.
const CLASSIFICATION_ORDER: [ReportType; 2] = [ReportType::Form10K, ReportType::Form10Q];

/// Labels a filing from its extracted content and its file name.
pub fn classify(content: &str, filename: &str) -> ReportType {
    for candidate in CLASSIFICATION_ORDER {
        let marker = candidate.marker();
        if content.contains(marker) || filename.contains(marker) {
            return candidate;
        }
    }
    ReportType::Other
}

impl ReportType {
    pub fn marker(&self) -> &'static str {
        match self {
            ReportType::Form10K => "10-K",
            ReportType::Form10Q => "10-Q",
            ReportType::Other => "Other",
        }
    }

    pub fn list_types() -> &'static str {
        &REPORT_TYPES
    }
}

impl TryFrom<String> for ReportType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ReportType::from_str(&s)
    }
}

impl From<ReportType> for String {
    fn from(report_type: ReportType) -> Self {
        report_type.to_string()
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.marker())
    }
}

pub static REPORT_TYPES: Lazy<String> = Lazy::new(|| {
    ReportType::iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<ReportType, String> {
        match s.trim().to_uppercase().as_str() {
            "10-K" => Ok(ReportType::Form10K),
            "10-Q" => Ok(ReportType::Form10Q),
            "OTHER" => Ok(ReportType::Other),
            _ => Err(format!(
                "Unknown report type '{}', expected one of: {}",
                s,
                ReportType::list_types()
            )),
        }
    }
}
