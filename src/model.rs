use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: u32 = 1;

/// One visit of a commit through one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub repository: String,
    pub branch: String,
    pub commit_id: String,
    pub author_email: String,
    /// `None` when the author signature had no usable timestamp.
    pub authored_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Holiday,
    Weekend,
    OffHours,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCounters {
    pub weekend: u32,
    pub off_hours: u32,
    pub holiday: u32,
}

impl DayCounters {
    pub fn record(&mut self, category: Category) {
        match category {
            Category::Holiday => self.holiday += 1,
            Category::Weekend => self.weekend += 1,
            Category::OffHours => self.off_hours += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.weekend + self.off_hours + self.holiday
    }

    pub fn add(&mut self, other: &DayCounters) {
        self.weekend += other.weekend;
        self.off_hours += other.off_hours;
        self.holiday += other.holiday;
    }
}

/// Per-date counters for one repository and one audited author.
///
/// Dates are `YYYY-MM-DD` strings in the configured time zone. The map is
/// ordered only so that serialized output is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryReport {
    pub repository: String,
    pub author: String,
    pub days: BTreeMap<String, DayCounters>,
}

impl RepositoryReport {
    pub fn new(repository: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            author: author.into(),
            days: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, date: String, category: Category) {
        self.days.entry(date).or_default().record(category);
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn totals(&self) -> DayCounters {
        let mut totals = DayCounters::default();
        for counters in self.days.values() {
            totals.add(counters);
        }
        totals
    }

    pub fn rows(&self) -> impl Iterator<Item = ReportRow> + '_ {
        self.days.iter().map(move |(date, c)| ReportRow {
            repository: self.repository.clone(),
            date: date.clone(),
            weekend: c.weekend,
            off_hours: c.off_hours,
            holiday: c.holiday,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub repository: String,
    pub date: String,
    pub weekend: u32,
    pub off_hours: u32,
    pub holiday: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOutput {
    pub repository: String,
    pub path: String,
    pub commits_seen: usize,
    pub duplicates_skipped: usize,
    pub malformed: usize,
    pub totals: DayCounters,
    pub days: Vec<ReportRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryFailure {
    pub repository: String,
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub root: String,
    pub author: String,
    pub target_year: i32,
    pub time_zone: String,
    pub repositories: Vec<RepositoryOutput>,
    pub failures: Vec<RepositoryFailure>,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorEntry {
    pub author: String,
    pub commits: usize,
    pub repositories: usize,
}
