pub mod config;
pub mod types;

pub use config::{DateRange, PipelineConfig};
pub use types::{Cancellation, EntityId};
