use crate::config::DedupPolicy;
use crate::error::{AuditError, Result};
use crate::model::CommitEvent;
use chrono::{DateTime, Utc};
use gix::{ObjectId, Repository};
use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open the repository at `path`, which may be a work tree or a git directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let repo = gix::open(&path).map_err(|e| AuditError::repository_access(&path, e))?;
        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn access_error(&self, err: impl Display) -> AuditError {
        AuditError::repository_access(&self.path, err)
    }

    /// Local branches with the commit their tip points at, sorted by name.
    pub fn branches(&self) -> Result<Vec<(String, ObjectId)>> {
        let platform = self.repo.references().map_err(|e| self.access_error(e))?;
        let iter = platform
            .local_branches()
            .map_err(|e| self.access_error(e))?;

        let mut branches = Vec::new();
        for reference in iter {
            let mut reference = reference.map_err(|e| self.access_error(e))?;
            let name = reference.name().shorten().to_string();
            let id = reference
                .peel_to_id_in_place()
                .map_err(|e| self.access_error(format!("cannot resolve branch {name}: {e}")))?;
            branches.push((name, id.detach()));
        }
        branches.sort();
        Ok(branches)
    }

    /// Lazily walk every branch and yield one event per commit visit.
    ///
    /// With [`DedupPolicy::Commit`] each commit is yielded once, and history
    /// already covered by an earlier branch is not walked again. With
    /// [`DedupPolicy::PerBranch`] a commit appears once per branch that
    /// reaches it.
    pub fn commit_events(&self, repository: &str, dedup: DedupPolicy) -> Result<CommitEvents<'_>> {
        Ok(CommitEvents {
            repo: self,
            repository: repository.to_string(),
            branches: self.branches()?.into_iter(),
            walked_tips: Vec::new(),
            current: None,
            seen: (dedup == DedupPolicy::Commit).then(HashSet::new),
            failed: false,
        })
    }
}

/// Iterator returned by [`GitRepo::commit_events`]. Ends after the first error.
pub struct CommitEvents<'repo> {
    repo: &'repo GitRepo,
    repository: String,
    branches: std::vec::IntoIter<(String, ObjectId)>,
    walked_tips: Vec<ObjectId>,
    current: Option<(String, gix::revision::Walk<'repo>)>,
    seen: Option<HashSet<ObjectId>>,
    failed: bool,
}

impl CommitEvents<'_> {
    fn fail(&mut self, err: impl Display) -> Option<Result<CommitEvent>> {
        self.failed = true;
        Some(Err(self.repo.access_error(err)))
    }

    /// Start walking the next branch. Returns `false` once all are done.
    fn next_branch(&mut self) -> std::result::Result<bool, String> {
        let Some((branch, tip)) = self.branches.next() else {
            return Ok(false);
        };

        let mut platform = self.repo.repo.rev_walk([tip]);
        if self.seen.is_some() {
            platform = platform.with_hidden(self.walked_tips.iter().copied());
        }
        self.walked_tips.push(tip);

        let walk = platform
            .all()
            .map_err(|e| format!("cannot walk branch {branch}: {e}"))?;
        debug!(branch = %branch, "walking branch");
        self.current = Some((branch, walk));
        Ok(true)
    }
}

impl Iterator for CommitEvents<'_> {
    type Item = Result<CommitEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let mut exhausted = false;
            if let Some((branch, walk)) = &mut self.current {
                match walk.next() {
                    Some(Ok(info)) => {
                        if let Some(seen) = &mut self.seen {
                            if !seen.insert(info.id) {
                                continue;
                            }
                        }
                        match info.object() {
                            Ok(commit) => {
                                return Some(Ok(commit_event(&self.repository, branch, &commit)))
                            }
                            Err(e) => {
                                let message = format!("cannot read commit on {branch}: {e}");
                                return self.fail(message);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        let message = format!("history walk of {branch} failed: {e}");
                        return self.fail(message);
                    }
                    None => exhausted = true,
                }
            }
            if exhausted {
                self.current = None;
            }

            match self.next_branch() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(message) => return self.fail(message),
            }
        }
    }
}

fn commit_event(repository: &str, branch: &str, commit: &gix::Commit<'_>) -> CommitEvent {
    let commit_id = commit.id.to_string();
    let (author_email, authored_at) = match commit.author() {
        Ok(author) => {
            let authored_at = match author.time() {
                Ok(time) => timestamp(time.seconds),
                Err(e) => {
                    warn!(commit = %commit_id, "unparseable author time: {e}");
                    None
                }
            };
            (author.email.to_string(), authored_at)
        }
        Err(e) => {
            warn!(commit = %commit_id, "cannot decode author: {e}");
            (String::new(), None)
        }
    };

    CommitEvent {
        repository: repository.to_string(),
        branch: branch.to_string(),
        commit_id,
        author_email,
        authored_at,
    }
}

/// Zero and out-of-range timestamps carry no usable time.
fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds == 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0)
}
