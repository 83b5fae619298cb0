pub mod filing;
pub mod parsing;
pub mod report;
pub mod repository;

pub use filing::{Filing, FilingName};
pub use report::{classify, ReportType};
pub use repository::{
    EntityLoad, EntityStatus, FilingRepository, LoadStats, LoadedData, NoDataReason,
};
