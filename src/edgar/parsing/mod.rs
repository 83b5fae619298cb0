pub mod facts;
pub mod text;

pub use facts::{parse_fact_document, FinancialFact};
pub use text::{extract_document, extract_text, Extraction};
