pub mod core;
pub mod diff;
pub mod edgar;
pub mod export;
pub mod pipeline;
pub mod storage;
pub mod utils;

// Re-exports
pub use crate::core::{Cancellation, DateRange, EntityId, PipelineConfig};
pub use diff::{ComparisonResult, DiffLine, FilingPair};
pub use edgar::{Filing, FilingRepository, ReportType};
pub use pipeline::{DiffReport, Pipeline, PipelineOutput, ReportOutcome};
pub use storage::{DocumentStore, FsDocumentStore, MemoryDocumentStore, RawDocument};
pub use utils::progress::ProgressTracker;
