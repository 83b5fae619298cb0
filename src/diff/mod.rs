pub mod engine;
pub mod pairing;

pub use engine::{compare, diff_texts, ComparisonResult, DiffLine};
pub use pairing::{pair, FilingPair};
