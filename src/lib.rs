pub mod aggregate;
pub mod audit;
pub mod authors;
pub mod classify;
pub mod cli;
pub mod config;
pub mod discover;
pub mod error;
pub mod git;
pub mod model;
pub mod repos;
pub mod scan;
pub mod sink;
pub mod util;

pub use aggregate::{aggregate, Aggregation};
pub use classify::classify;
pub use config::{ClassificationConfig, DedupPolicy, HolidayWindow};
pub use error::{AuditError, Result};
pub use model::{Category, CommitEvent, DayCounters, RepositoryReport};
