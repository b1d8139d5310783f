use crate::aggregate::{try_aggregate, Aggregation};
use crate::config::ClassificationConfig;
use crate::discover::find_repositories;
use crate::error::Result;
use crate::git::GitRepo;
use crate::model::{AuditOutput, RepositoryFailure, RepositoryOutput, SCHEMA_VERSION};
use crate::sink::ReportSink;
use crate::util::repository_id;
use chrono::Utc;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span};

#[derive(Debug, Clone)]
pub struct RepositoryOutcome {
    pub path: PathBuf,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorTally {
    pub commits: usize,
    pub repositories: usize,
}

#[derive(Debug)]
pub struct AuditRun {
    pub root: PathBuf,
    pub outcomes: Vec<RepositoryOutcome>,
    pub failures: Vec<RepositoryFailure>,
    pub authors: BTreeMap<String, AuthorTally>,
    pub elapsed: Duration,
}

impl AuditRun {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn to_output(&self, config: &ClassificationConfig) -> AuditOutput {
        AuditOutput {
            version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            root: self.root.to_string_lossy().to_string(),
            author: config.target_author.clone(),
            target_year: config.target_year,
            time_zone: config.time_zone.name().to_string(),
            repositories: self
                .outcomes
                .iter()
                .map(|o| RepositoryOutput {
                    repository: o.aggregation.report.repository.clone(),
                    path: o.path.to_string_lossy().to_string(),
                    commits_seen: o.aggregation.commits_seen,
                    duplicates_skipped: o.aggregation.duplicates_skipped,
                    malformed: o.aggregation.malformed,
                    totals: o.aggregation.report.totals(),
                    days: o.aggregation.report.rows().collect(),
                })
                .collect(),
            failures: self.failures.clone(),
            authors: self.authors.keys().cloned().collect(),
        }
    }
}

/// Open one repository and aggregate every commit reachable from its branches.
///
/// `repository` is the identifier its report is stored under.
pub fn audit_repository(
    path: &Path,
    repository: &str,
    config: &ClassificationConfig,
) -> Result<RepositoryOutcome> {
    let _span = info_span!("repository", name = %repository).entered();

    let repo = GitRepo::open(path)?;
    let events = repo.commit_events(repository, config.dedup)?;
    debug!(path = %repo.path().display(), "walking branches");

    let aggregation = try_aggregate(repository, events, config)?;
    info!(
        commits = aggregation.commits_seen,
        duplicates = aggregation.duplicates_skipped,
        days = aggregation.report.days.len(),
        "aggregated"
    );

    Ok(RepositoryOutcome {
        path: path.to_path_buf(),
        aggregation,
    })
}

/// Audit every repository under `root` in parallel.
///
/// A repository that cannot be read is recorded as a failure and does not
/// stop the others.
pub fn run_audit(root: &Path, config: &ClassificationConfig, show_progress: bool) -> Result<AuditRun> {
    let started = Instant::now();
    let repositories = find_repositories(root)?;
    info!("Found {} repositories under {}", repositories.len(), root.display());

    let pb = progress_bar(repositories.len() as u64, show_progress);

    let results: Vec<(PathBuf, String, Result<RepositoryOutcome>)> = repositories
        .par_iter()
        .progress_with(pb.clone())
        .map(|path| {
            let repository = repository_id(root, path);
            let result = audit_repository(path, &repository, config);
            (path.clone(), repository, result)
        })
        .collect();

    pb.finish_and_clear();

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    for (path, repository, result) in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!("Failed to audit {}: {e}", path.display());
                failures.push(RepositoryFailure {
                    repository,
                    path: path.to_string_lossy().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    let authors = merge_authors(outcomes.iter().map(|o| &o.aggregation.authors));

    Ok(AuditRun {
        root: root.to_path_buf(),
        outcomes,
        failures,
        authors,
        elapsed: started.elapsed(),
    })
}

/// Hand every successful report to each sink, recording write failures.
pub fn write_reports(run: &mut AuditRun, sinks: &mut [Box<dyn ReportSink>]) {
    for outcome in &run.outcomes {
        let report = &outcome.aggregation.report;
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.write(report) {
                error!("{} sink: {e}", sink.name());
                run.failures.push(RepositoryFailure {
                    repository: report.repository.clone(),
                    path: outcome.path.to_string_lossy().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

pub fn merge_authors<'a, I>(partials: I) -> BTreeMap<String, AuthorTally>
where
    I: IntoIterator<Item = &'a BTreeMap<String, usize>>,
{
    let mut merged: BTreeMap<String, AuthorTally> = BTreeMap::new();
    for partial in partials {
        for (author, commits) in partial {
            let tally = merged.entry(author.clone()).or_default();
            tally.commits += commits;
            tally.repositories += 1;
        }
    }
    merged
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} repositories")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::aggregate::aggregate;
    use crate::model::{CommitEvent, RepositoryReport};
    use chrono_tz::UTC;
    use pretty_assertions::assert_eq;

    #[test]
    fn author_sets_merge_across_repositories() {
        let a = BTreeMap::from([("x@example.com".to_string(), 2), ("y@example.com".to_string(), 1)]);
        let b = BTreeMap::from([("x@example.com".to_string(), 3)]);
        let merged = merge_authors([&a, &b]);
        assert_eq!(merged["x@example.com"].commits, 5);
        assert_eq!(merged["x@example.com"].repositories, 2);
        assert_eq!(merged["y@example.com"].repositories, 1);
    }

    struct FailingSink;

    impl ReportSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn write(&mut self, report: &RepositoryReport) -> Result<()> {
            Err(AuditError::sink_write(&report.repository, "disk full"))
        }
    }

    #[test]
    fn sink_failures_are_recorded_without_touching_reports() {
        let config = ClassificationConfig::new(UTC, 2024, "dev@example.com");
        let aggregation = aggregate("widgets", Vec::<CommitEvent>::new(), &config);
        let mut run = AuditRun {
            root: PathBuf::from("/src"),
            outcomes: vec![RepositoryOutcome {
                path: PathBuf::from("/src/widgets"),
                aggregation,
            }],
            failures: Vec::new(),
            authors: BTreeMap::new(),
            elapsed: Duration::ZERO,
        };
        let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(FailingSink)];
        write_reports(&mut run, &mut sinks);

        assert!(!run.is_clean());
        assert_eq!(run.failures[0].repository, "widgets");
        assert_eq!(run.outcomes.len(), 1);
    }

    #[test]
    fn unreadable_repositories_become_failures() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken/.git");
        std::fs::create_dir_all(broken.join("objects")).unwrap();
        std::fs::write(broken.join("HEAD"), "garbage").unwrap();

        let config = ClassificationConfig::new(UTC, 2024, "dev@example.com");
        let run = run_audit(dir.path(), &config, false).unwrap();
        assert!(run.outcomes.is_empty());
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].repository, "broken");
    }

    #[test]
    fn nested_failures_are_named_relative_to_the_root() {
        let dir = tempfile::tempdir().unwrap();
        for team in ["team-a", "team-b"] {
            let broken = dir.path().join(team).join("api/.git");
            std::fs::create_dir_all(broken.join("objects")).unwrap();
            std::fs::write(broken.join("HEAD"), "garbage").unwrap();
        }

        let config = ClassificationConfig::new(UTC, 2024, "dev@example.com");
        let run = run_audit(dir.path(), &config, false).unwrap();
        let mut names: Vec<&str> = run.failures.iter().map(|f| f.repository.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["team-a/api", "team-b/api"]);
    }
}
