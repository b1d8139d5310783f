use crate::error::{AuditError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_OFFICE_START: u32 = 9;
pub const DEFAULT_OFFICE_END: u32 = 19;

/// How commits reachable from several branches are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// Count each commit id once per repository.
    #[default]
    Commit,
    /// Count every branch visit, so history shared by several branches is
    /// counted once per branch that reaches it.
    PerBranch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolidayWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl HolidayWindow {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self> {
        if start > end {
            return Err(AuditError::Config(format!(
                "holiday window starts ({start}) after it ends ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Both bounds are exclusive.
    pub fn contains(&self, instant: &DateTime<Tz>) -> bool {
        *instant > self.start && *instant < self.end
    }
}

/// Read-only settings shared by every repository in a run.
#[derive(Debug, Clone)]
pub struct ClassificationConfig {
    pub time_zone: Tz,
    pub target_year: i32,
    pub holiday: Option<HolidayWindow>,
    pub off_hours_start: u32,
    pub off_hours_end: u32,
    pub target_author: String,
    pub dedup: DedupPolicy,
}

impl ClassificationConfig {
    pub fn new(time_zone: Tz, target_year: i32, target_author: impl Into<String>) -> Self {
        Self {
            time_zone,
            target_year,
            holiday: None,
            off_hours_start: DEFAULT_OFFICE_START,
            off_hours_end: DEFAULT_OFFICE_END,
            target_author: target_author.into(),
            dedup: DedupPolicy::default(),
        }
    }

    pub fn with_holiday(mut self, holiday: HolidayWindow) -> Self {
        self.holiday = Some(holiday);
        self
    }

    pub fn with_office_hours(mut self, start: u32, end: u32) -> Self {
        self.off_hours_start = start;
        self.off_hours_end = end;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_author.trim().is_empty() {
            return Err(AuditError::Config("target author must not be empty".into()));
        }
        if self.off_hours_start > 23 || self.off_hours_end > 23 {
            return Err(AuditError::Config(format!(
                "office hours must be within 0..=23, got {}..{}",
                self.off_hours_start, self.off_hours_end
            )));
        }
        if self.off_hours_start >= self.off_hours_end {
            return Err(AuditError::Config(format!(
                "office start hour {} must be before end hour {}",
                self.off_hours_start, self.off_hours_end
            )));
        }
        Ok(())
    }

    pub fn from_file_config(file: FileConfig) -> Result<Self> {
        let tz_name = file.time_zone.as_deref().unwrap_or("UTC");
        let time_zone: Tz = tz_name
            .parse()
            .map_err(|_| AuditError::Config(format!("unknown time zone '{tz_name}'")))?;

        let target_year = file.target_year.unwrap_or_else(|| Utc::now().year());

        let target_author = file
            .author
            .ok_or_else(|| AuditError::Config("no target author given (use --author)".into()))?;

        let holiday = match file.holiday {
            Some(HolidaySection { start: Some(s), end: Some(e) }) => {
                let start = parse_local_timestamp(&s, time_zone, Bound::Start)?;
                let end = parse_local_timestamp(&e, time_zone, Bound::End)?;
                Some(HolidayWindow::new(start, end)?)
            }
            Some(HolidaySection { start: None, end: None }) | None => None,
            Some(_) => {
                return Err(AuditError::Config(
                    "holiday window needs both a start and an end".into(),
                ))
            }
        };

        let office = file.office_hours.unwrap_or_default();
        let config = Self {
            time_zone,
            target_year,
            holiday,
            off_hours_start: office.start.unwrap_or(DEFAULT_OFFICE_START),
            off_hours_end: office.end.unwrap_or(DEFAULT_OFFICE_END),
            target_author,
            dedup: file.dedup.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Raw settings as they appear in a TOML file or on the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub time_zone: Option<String>,
    pub target_year: Option<i32>,
    pub author: Option<String>,
    pub dedup: Option<DedupPolicy>,
    pub holiday: Option<HolidaySection>,
    pub office_hours: Option<OfficeHoursSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HolidaySection {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OfficeHoursSection {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Values set in `other` win.
    pub fn overlay(self, other: FileConfig) -> FileConfig {
        let holiday = match (self.holiday, other.holiday) {
            (Some(base), Some(over)) => Some(HolidaySection {
                start: over.start.or(base.start),
                end: over.end.or(base.end),
            }),
            (base, over) => over.or(base),
        };
        let office_hours = match (self.office_hours, other.office_hours) {
            (Some(base), Some(over)) => Some(OfficeHoursSection {
                start: over.start.or(base.start),
                end: over.end.or(base.end),
            }),
            (base, over) => over.or(base),
        };
        FileConfig {
            time_zone: other.time_zone.or(self.time_zone),
            target_year: other.target_year.or(self.target_year),
            author: other.author.or(self.author),
            dedup: other.dedup.or(self.dedup),
            holiday,
            office_hours,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Parse a wall-clock timestamp in `tz`. A bare date expands to the first or
/// last second of that day depending on `bound`.
pub fn parse_local_timestamp(input: &str, tz: Tz, bound: Bound) -> Result<DateTime<Tz>> {
    let input = input.trim();

    // RFC3339 carries its own offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&tz));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d").ok().map(|date| {
                let time = match bound {
                    Bound::Start => NaiveTime::MIN,
                    Bound::End => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
                };
                date.and_time(time)
            })
        })
        .ok_or_else(|| AuditError::InvalidDate(format!("cannot parse '{input}'")))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| AuditError::InvalidDate(format!("'{input}' does not exist in {tz}")))
}
