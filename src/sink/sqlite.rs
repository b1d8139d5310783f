use super::{ReportSink, TABLE};
use crate::error::{AuditError, Result};
use crate::model::{ReportRow, RepositoryReport, SCHEMA_VERSION};
use rusqlite::{params, Connection};
use std::path::Path;

/// Keeps every repository's rows in a single SQLite table keyed by
/// `(repository, working_date)`.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        let mut sink = Self { conn };
        sink.initialize()?;
        Ok(sink)
    }

    fn initialize(&mut self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {TABLE} (
                repository TEXT NOT NULL,
                working_date TEXT NOT NULL,
                weekend INTEGER NOT NULL,
                after_hours INTEGER NOT NULL,
                holidays INTEGER NOT NULL,
                PRIMARY KEY (repository, working_date)
            );
            "
        ))?;
        self.check_schema_version()?;
        Ok(())
    }

    fn check_schema_version(&mut self) -> Result<()> {
        let user_version: i64 = self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?;

        if user_version == 0 {
            let set_stmt = format!("PRAGMA user_version = {SCHEMA_VERSION};");
            self.conn.execute_batch(&set_stmt)?;
        } else if user_version != SCHEMA_VERSION as i64 {
            return Err(AuditError::Config(format!(
                "Report database schema mismatch: expected {}, found {}",
                SCHEMA_VERSION, user_version
            )));
        }

        Ok(())
    }

    fn replace(&mut self, report: &RepositoryReport) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            &format!("DELETE FROM {TABLE} WHERE repository = ?"),
            params![report.repository],
        )?;

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {TABLE} (repository, working_date, weekend, after_hours, holidays)
                 VALUES (?, ?, ?, ?, ?)"
            ))?;
            for row in report.rows() {
                insert.execute(params![
                    row.repository,
                    row.date,
                    row.weekend,
                    row.off_hours,
                    row.holiday
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn rows(&self, repository: &str) -> Result<Vec<ReportRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT repository, working_date, weekend, after_hours, holidays
             FROM {TABLE} WHERE repository = ? ORDER BY working_date"
        ))?;
        let rows = stmt
            .query_map(params![repository], |row| {
                Ok(ReportRow {
                    repository: row.get(0)?,
                    date: row.get(1)?,
                    weekend: row.get(2)?,
                    off_hours: row.get(3)?,
                    holiday: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl ReportSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write(&mut self, report: &RepositoryReport) -> Result<()> {
        self.replace(report)
            .map_err(|e| AuditError::sink_write(&report.repository, e))
    }
}
