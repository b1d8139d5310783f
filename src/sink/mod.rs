pub mod sql_file;
pub mod sqlite;

pub use sql_file::{render_sql, SqlFileSink};
pub use sqlite::SqliteSink;

use crate::error::Result;
use crate::model::RepositoryReport;

pub const TABLE: &str = "app_working_days";

/// Durable destination for repository reports.
///
/// Writing a report replaces whatever was previously stored for the same
/// repository.
pub trait ReportSink {
    fn name(&self) -> &str;

    fn write(&mut self, report: &RepositoryReport) -> Result<()>;
}
