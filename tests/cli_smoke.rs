use assert_cmd::prelude::*;
use offhours::sink::SqliteSink;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const ME: &str = "me@example.com";
const OTHER: &str = "other@example.com";

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    assert!(Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn init_git_repo(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    git(dir, &["init"]);
    git(dir, &["config", "user.email", "you@example.com"]);
    git(dir, &["config", "user.name", "Your Name"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

fn commit_at(dir: &Path, email: &str, date: &str) {
    assert!(Command::new("git")
        .args(["commit", "--allow-empty", "-m", &format!("work at {date}")])
        .env("GIT_AUTHOR_NAME", "Someone")
        .env("GIT_AUTHOR_EMAIL", email)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

/// A repository whose whole history is reachable from two branches.
fn sample_repo(dir: &Path) {
    init_git_repo(dir);
    commit_at(dir, ME, "2023-03-04T03:00:00+01:00");
    commit_at(dir, ME, "2024-03-02T14:00:00+01:00");
    commit_at(dir, ME, "2024-03-05T11:00:00+01:00");
    commit_at(dir, ME, "2024-03-05T19:30:00+01:00");
    commit_at(dir, OTHER, "2024-03-09T12:00:00+01:00");
    commit_at(dir, ME, "2024-07-22T08:00:00+02:00");
    git(dir, &["branch", "feature"]);
}

fn audit_cmd(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("offhours").unwrap();
    cmd.current_dir(root).args([
        "--author",
        ME,
        "--tz",
        "Europe/Madrid",
        "--year",
        "2024",
        "--holiday-start",
        "2024-07-15",
        "--holiday-end",
        "2024-08-02",
    ]);
    cmd
}

fn day<'a>(repo: &'a serde_json::Value, date: &str) -> Option<&'a serde_json::Value> {
    repo["days"].as_array().unwrap().iter().find(|d| d["date"] == date)
}

#[test]
fn scan_json_classifies_each_kind_once() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let root = dir.path().join("src");
    sample_repo(&root.join("widgets"));
    let sql_dir = dir.path().join("sql");

    let out = audit_cmd(dir.path())
        .args(["scan", "--json", "--sql-dir"])
        .arg(&sql_dir)
        .arg(&root)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    let repos = v["repositories"].as_array().unwrap();
    assert_eq!(repos.len(), 1);
    let repo = &repos[0];
    assert_eq!(repo["repository"], "widgets");
    assert_eq!(repo["days"].as_array().unwrap().len(), 3);

    let weekend = day(repo, "2024-03-02").unwrap();
    assert_eq!((weekend["weekend"].as_u64(), weekend["off_hours"].as_u64()), (Some(1), Some(0)));

    let evening = day(repo, "2024-03-05").unwrap();
    assert_eq!(evening["off_hours"].as_u64(), Some(1));

    let holiday = day(repo, "2024-07-22").unwrap();
    assert_eq!(
        (holiday["holiday"].as_u64(), holiday["off_hours"].as_u64()),
        (Some(1), Some(0))
    );

    assert!(day(repo, "2024-03-09").is_none());
    // history shared by both branches is walked once
    assert_eq!(repo["commits_seen"].as_u64(), Some(6));

    let authors: Vec<&str> = v["authors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a.as_str())
        .collect();
    assert_eq!(authors, vec![ME, OTHER]);

    let sql = fs::read_to_string(sql_dir.join("widgets.sql")).unwrap();
    assert!(sql.starts_with("DELETE FROM app_working_days WHERE repository = 'widgets';"));
    assert!(sql.contains("('widgets', '2024-03-02', 1, 0, 0)"));
}

#[test]
fn per_branch_counting_visits_shared_commits_twice() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    sample_repo(&dir.path().join("widgets"));

    let out = audit_cmd(dir.path())
        .args(["--dedup", "per-branch", "scan", "--json", "--no-sql"])
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let repo = &v["repositories"][0];
    assert_eq!(day(repo, "2024-03-02").unwrap()["weekend"].as_u64(), Some(2));
    assert!(!dir.path().join("sql").exists());
}

#[test]
fn broken_repository_fails_without_hiding_the_others() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    sample_repo(&dir.path().join("widgets"));
    let broken = dir.path().join("broken/.git");
    fs::create_dir_all(broken.join("objects")).unwrap();
    fs::write(broken.join("HEAD"), "not a ref").unwrap();

    let out = audit_cmd(dir.path())
        .args(["scan", "--json", "--no-sql"])
        .arg(dir.path())
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["repositories"].as_array().unwrap().len(), 1);
    assert_eq!(v["failures"][0]["repository"], "broken");
}

#[test]
fn same_named_repositories_keep_separate_reports() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let root = dir.path().join("src");
    let team_a = root.join("team-a/api");
    let team_b = root.join("team-b/api");
    init_git_repo(&team_a);
    commit_at(&team_a, ME, "2024-03-02T14:00:00+01:00");
    init_git_repo(&team_b);
    commit_at(&team_b, ME, "2024-03-09T14:00:00+01:00");
    let sql_dir = dir.path().join("sql");
    let db = dir.path().join("report.db");

    let out = audit_cmd(dir.path())
        .args(["scan", "--json", "--sql-dir"])
        .arg(&sql_dir)
        .arg("--sqlite")
        .arg(&db)
        .arg(&root)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let mut ids: Vec<&str> = v["repositories"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["repository"].as_str())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["team-a/api", "team-b/api"]);

    let a = fs::read_to_string(sql_dir.join("team-a_api.sql")).unwrap();
    let b = fs::read_to_string(sql_dir.join("team-b_api.sql")).unwrap();
    assert!(a.contains("('team-a/api', '2024-03-02', 1, 0, 0)"));
    assert!(b.contains("('team-b/api', '2024-03-09', 1, 0, 0)"));

    let sink = SqliteSink::open(&db).unwrap();
    assert_eq!(sink.rows("team-a/api").unwrap().len(), 1);
    assert_eq!(sink.rows("team-b/api").unwrap()[0].date, "2024-03-09");
}

#[test]
fn sqlite_sink_replaces_rows_on_rerun() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    sample_repo(&dir.path().join("widgets"));
    let db = dir.path().join("out/report.db");

    for _ in 0..2 {
        audit_cmd(dir.path())
            .args(["-q", "scan", "--no-sql", "--sqlite"])
            .arg(&db)
            .arg(dir.path())
            .assert()
            .success();
    }

    let sink = SqliteSink::open(&db).unwrap();
    let rows = sink.rows("widgets").unwrap();
    let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-03-02", "2024-03-05", "2024-07-22"]);
}

#[test]
fn authors_and_repos_list_what_was_found() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    sample_repo(&dir.path().join("widgets"));

    let out = Command::cargo_bin("offhours")
        .unwrap()
        .args(["authors", "--json"])
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let entries = v.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["author"], ME);
    assert_eq!(entries[0]["commits"].as_u64(), Some(5));
    assert_eq!(entries[1]["author"], OTHER);

    let out = Command::cargo_bin("offhours")
        .unwrap()
        .args(["repos", "--json"])
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v[0]["repository"], "widgets");
}

#[test]
fn scan_without_author_is_rejected() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("offhours")
        .unwrap()
        .args(["scan", "--no-sql"])
        .arg(dir.path())
        .assert()
        .failure();
}
