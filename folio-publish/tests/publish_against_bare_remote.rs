//! Publish sequence against real repositories: a bare "upstream" and a
//! working clone standing in for the site checkout.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use folio_core::{CommitResult, GitRunner, SystemGit};
use folio_publish::{PublishOrchestrator, PublishStep};
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "test-user"]);
    git(dir, &["config", "user.email", "test@example.com"]);
}

/// Returns (tempdir guard, upstream path, site checkout path).
fn upstream_and_clone() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let upstream = tmp.path().join("upstream.git");
    let seed = tmp.path().join("seed");
    let site = tmp.path().join("site");

    std::fs::create_dir_all(&upstream).expect("mkdir upstream");
    git(&upstream, &["init", "--bare", "--initial-branch=main"]);

    std::fs::create_dir_all(&seed).expect("mkdir seed");
    git(&seed, &["init", "--initial-branch=main"]);
    configure_identity(&seed);
    std::fs::write(seed.join("README.md"), "site\n").expect("readme");
    git(&seed, &["add", "-A"]);
    git(&seed, &["commit", "-m", "initial"]);
    git(&seed, &["remote", "add", "origin", upstream.to_str().expect("utf8")]);
    git(&seed, &["push", "-u", "origin", "main"]);

    git(
        tmp.path(),
        &["clone", upstream.to_str().expect("utf8"), site.to_str().expect("utf8")],
    );
    configure_identity(&site);
    (tmp, upstream, site)
}

#[test]
fn publish_pushes_commit_and_returns_short_hash() {
    let (_tmp, upstream, site) = upstream_and_clone();
    std::fs::create_dir_all(site.join("content")).expect("mkdir content");
    std::fs::write(site.join("content/profile.json"), "{\"name\":\"Ada\"}\n").expect("write");

    let publisher = PublishOrchestrator::new(Arc::new(SystemGit::new(&site)));
    let result = publisher.publish("Update profile").expect("publish");

    let hash = match result {
        CommitResult::Committed(hash) => hash,
        other => panic!("expected a commit, got {other:?}"),
    };
    let upstream_head = git(&upstream, &["rev-parse", "--short", "HEAD"]);
    assert_eq!(hash.as_str(), upstream_head.trim());

    let subject = git(&upstream, &["log", "-1", "--format=%s"]);
    assert_eq!(subject.trim(), "Update profile");
}

#[test]
fn publish_twice_is_idempotent() {
    let (_tmp, upstream, site) = upstream_and_clone();
    std::fs::write(site.join("about.md"), "About\n").expect("write");

    let publisher = PublishOrchestrator::new(Arc::new(SystemGit::new(&site)));
    assert!(matches!(
        publisher.publish("Add about page").expect("first publish"),
        CommitResult::Committed(_)
    ));
    let count_after_first = git(&upstream, &["rev-list", "--count", "HEAD"]);

    assert_eq!(
        publisher.publish("Add about page").expect("second publish"),
        CommitResult::NoChanges
    );
    assert_eq!(
        git(&upstream, &["rev-list", "--count", "HEAD"]),
        count_after_first
    );
}

#[test]
fn publish_rebases_onto_upstream_changes() {
    let (tmp, upstream, site) = upstream_and_clone();

    // Someone else pushes first.
    let other = tmp.path().join("other");
    git(
        tmp.path(),
        &["clone", upstream.to_str().expect("utf8"), other.to_str().expect("utf8")],
    );
    configure_identity(&other);
    std::fs::write(other.join("cv.md"), "CV\n").expect("write");
    git(&other, &["add", "-A"]);
    git(&other, &["commit", "-m", "other change"]);
    git(&other, &["push"]);

    std::fs::write(site.join("blog.md"), "Post\n").expect("write");
    let site_git = SystemGit::new(&site);
    let publisher = PublishOrchestrator::new(Arc::new(site_git.clone()));
    publisher.publish("Add post").expect("publish");

    let log = site_git.run(&["log", "--format=%s"]).expect("log");
    let subjects: Vec<&str> = log.lines().collect();
    assert_eq!(subjects, ["Add post", "other change", "initial"]);
}

#[test]
fn missing_upstream_fails_at_pull_with_git_output() {
    let (_tmp, upstream, site) = upstream_and_clone();
    std::fs::remove_dir_all(&upstream).expect("remove upstream");
    std::fs::write(site.join("about.md"), "About\n").expect("write");

    let publisher = PublishOrchestrator::new(Arc::new(SystemGit::new(&site)));
    let err = publisher.publish("msg").expect_err("pull must fail without upstream");
    assert_eq!(err.step(), Some(PublishStep::Pull));
    assert!(err.to_string().contains("git pull --rebase failed"), "got: {err}");
}
