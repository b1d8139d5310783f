use crate::discover::find_repositories;
use crate::util::repository_id;
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct RepoEntry {
    repository: String,
    path: String,
}

pub fn exec(root: PathBuf, json: bool) -> anyhow::Result<()> {
    let repositories = find_repositories(&root)
        .with_context(|| format!("Failed to scan {}", root.display()))?;

    if json {
        let entries: Vec<RepoEntry> = repositories
            .iter()
            .map(|p| RepoEntry {
                repository: repository_id(&root, p),
                path: p.to_string_lossy().to_string(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for path in &repositories {
            println!("{:<30} {}", repository_id(&root, path), path.display());
        }
    }
    Ok(())
}
