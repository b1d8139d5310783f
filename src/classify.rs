use crate::config::ClassificationConfig;
use crate::model::Category;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Classify one authoring instant.
///
/// Checks run in a fixed order and the first match wins: target year, then
/// holiday window, then weekend, then the office-hours band. An instant
/// outside the target year is never classified.
pub fn classify(authored_at: DateTime<Utc>, config: &ClassificationConfig) -> Option<Category> {
    classify_local(&authored_at.with_timezone(&config.time_zone), config)
}

pub fn classify_local(local: &DateTime<Tz>, config: &ClassificationConfig) -> Option<Category> {
    if local.year() != config.target_year {
        return None;
    }

    if config.holiday.is_some_and(|window| window.contains(local)) {
        return Some(Category::Holiday);
    }

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return Some(Category::Weekend);
    }

    // both boundary hours count as outside the office
    let hour = local.hour();
    if hour >= config.off_hours_end || hour <= config.off_hours_start {
        return Some(Category::OffHours);
    }

    None
}

/// Calendar date of `authored_at` in the configured zone, as `YYYY-MM-DD`.
pub fn local_date_key(authored_at: DateTime<Utc>, config: &ClassificationConfig) -> String {
    authored_at
        .with_timezone(&config.time_zone)
        .format("%Y-%m-%d")
        .to_string()
}
