use super::{ReportSink, TABLE};
use crate::error::{AuditError, Result};
use crate::model::RepositoryReport;
use crate::util::{file_stem, sql_quote};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes one `<repository>.sql` script per repository.
///
/// Two repositories whose ids sanitise to the same file name are refused
/// rather than letting the second overwrite the first.
pub struct SqlFileSink {
    dir: PathBuf,
    written: HashMap<PathBuf, String>,
}

impl SqlFileSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            written: HashMap::new(),
        }
    }

    pub fn path_for(&self, repository: &str) -> PathBuf {
        self.dir.join(format!("{}.sql", file_stem(repository)))
    }

    fn write_file(&self, report: &RepositoryReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&report.repository);
        std::fs::write(&path, render_sql(report))?;
        Ok(path)
    }
}

impl ReportSink for SqlFileSink {
    fn name(&self) -> &str {
        "sql"
    }

    fn write(&mut self, report: &RepositoryReport) -> Result<()> {
        let target = self.path_for(&report.repository);
        let owner = self
            .written
            .entry(target.clone())
            .or_insert_with(|| report.repository.clone());
        if *owner != report.repository {
            return Err(AuditError::sink_write(
                &report.repository,
                format!("{} already holds the report for {owner}", target.display()),
            ));
        }

        let path = self
            .write_file(report)
            .map_err(|e| AuditError::sink_write(&report.repository, e))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Render a script that replaces every stored row for the repository.
pub fn render_sql(report: &RepositoryReport) -> String {
    let repository = sql_quote(&report.repository);
    let mut sql = format!("DELETE FROM {TABLE} WHERE repository = {repository};\n");

    if report.is_empty() {
        return sql;
    }

    sql.push_str(&format!(
        "INSERT INTO {TABLE}(repository, working_date, weekend, after_hours, holidays) VALUES\n"
    ));
    let values: Vec<String> = report
        .rows()
        .map(|row| {
            format!(
                "({}, {}, {}, {}, {})",
                repository,
                sql_quote(&row.date),
                row.weekend,
                row.off_hours,
                row.holiday
            )
        })
        .collect();
    sql.push_str(&values.join(",\n"));
    sql.push_str(
        "\nON CONFLICT (repository, working_date) DO UPDATE SET \
         weekend = excluded.weekend, after_hours = excluded.after_hours, holidays = excluded.holidays;\n",
    );
    sql
}
