use crate::classify::{classify, local_date_key};
use crate::config::{ClassificationConfig, DedupPolicy};
use crate::model::{CommitEvent, RepositoryReport};
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

/// Everything one repository pass produces.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub report: RepositoryReport,
    /// Every author identity encountered, with the number of distinct commits.
    pub authors: BTreeMap<String, usize>,
    pub commits_seen: usize,
    pub duplicates_skipped: usize,
    pub malformed: usize,
}

/// Accumulates one repository's commit events as they arrive.
pub struct Aggregator<'c> {
    config: &'c ClassificationConfig,
    report: RepositoryReport,
    authors: BTreeMap<String, usize>,
    seen: HashSet<String>,
    commits_seen: usize,
    duplicates_skipped: usize,
    malformed: usize,
}

impl<'c> Aggregator<'c> {
    pub fn new(repository: &str, config: &'c ClassificationConfig) -> Self {
        Self {
            config,
            report: RepositoryReport::new(repository, config.target_author.clone()),
            authors: BTreeMap::new(),
            seen: HashSet::new(),
            commits_seen: 0,
            duplicates_skipped: 0,
            malformed: 0,
        }
    }

    pub fn push(&mut self, event: CommitEvent) {
        let config = self.config;
        let first_visit = self.seen.insert(event.commit_id.clone());
        if first_visit {
            self.commits_seen += 1;
            *self.authors.entry(event.author_email.clone()).or_insert(0) += 1;
        } else if config.dedup == DedupPolicy::Commit {
            self.duplicates_skipped += 1;
            return;
        }

        if event.author_email != config.target_author {
            return;
        }

        let Some(authored_at) = event.authored_at else {
            if first_visit {
                self.malformed += 1;
            }
            return;
        };

        let Some(category) = classify(authored_at, config) else {
            return;
        };

        trace!(commit = %event.commit_id, branch = %event.branch, ?category, "classified");
        self.report.record(local_date_key(authored_at, config), category);
    }

    pub fn finish(self) -> Aggregation {
        Aggregation {
            report: self.report,
            authors: self.authors,
            commits_seen: self.commits_seen,
            duplicates_skipped: self.duplicates_skipped,
            malformed: self.malformed,
        }
    }
}

pub fn aggregate<I>(repository: &str, events: I, config: &ClassificationConfig) -> Aggregation
where
    I: IntoIterator<Item = CommitEvent>,
{
    let mut aggregator = Aggregator::new(repository, config);
    for event in events {
        aggregator.push(event);
    }
    aggregator.finish()
}

/// Like [`aggregate`], but stops at the first error from the event source.
pub fn try_aggregate<I, E>(
    repository: &str,
    events: I,
    config: &ClassificationConfig,
) -> Result<Aggregation, E>
where
    I: IntoIterator<Item = Result<CommitEvent, E>>,
{
    let mut aggregator = Aggregator::new(repository, config);
    for event in events {
        aggregator.push(event?);
    }
    Ok(aggregator.finish())
}
