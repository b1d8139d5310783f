use crate::audit::{merge_authors, AuthorTally};
use crate::cli::CommonArgs;
use crate::discover::find_repositories;
use crate::git::GitRepo;
use crate::model::AuthorEntry;
use crate::config::DedupPolicy;
use crate::util::repository_id;
use anyhow::{bail, Context};
use console::style;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::error;

pub fn exec(common: &CommonArgs, root: PathBuf, json: bool) -> anyhow::Result<()> {
    let repositories = find_repositories(&root)
        .with_context(|| format!("Failed to scan {}", root.display()))?;

    let results: Vec<_> = repositories
        .par_iter()
        .map(|path| (path, authors_in(&repository_id(&root, path), path)))
        .collect();

    let mut partials = Vec::new();
    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(authors) => partials.push(authors),
            Err(e) => {
                error!("Failed to read {}: {e}", path.display());
                failed += 1;
            }
        }
    }
    let authors = merge_authors(partials.iter());

    if json {
        let entries: Vec<AuthorEntry> = authors
            .into_iter()
            .map(|(author, AuthorTally { commits, repositories })| AuthorEntry {
                author,
                commits,
                repositories,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        output_table(&authors, common.quiet);
    }

    if failed > 0 {
        bail!("{failed} repository error(s)");
    }
    Ok(())
}

/// Distinct commits per author email in one repository.
fn authors_in(repository: &str, path: &Path) -> crate::error::Result<BTreeMap<String, usize>> {
    let repo = GitRepo::open(path)?;
    let mut authors = BTreeMap::new();
    for event in repo.commit_events(repository, DedupPolicy::Commit)? {
        let event = event?;
        *authors.entry(event.author_email).or_insert(0) += 1;
    }
    Ok(authors)
}

fn output_table(authors: &BTreeMap<String, AuthorTally>, quiet: bool) {
    if !quiet {
        println!(
            "{:<50} {:>8} {:>6}",
            style("Author").bold(),
            style("Commits").bold(),
            style("Repos").bold()
        );
    }
    for (author, tally) in authors {
        println!("{:<50} {:>8} {:>6}", author, tally.commits, tally.repositories);
    }
}
