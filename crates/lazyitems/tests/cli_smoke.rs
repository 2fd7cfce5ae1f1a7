use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn help_displays_usage() {
    Command::cargo_bin("lazyitems")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn eval_prints_remaining_items() {
    let dir = tempdir().expect("tempdir");
    let directives = dir.path().join("project.toml");
    fs::write(
        &directives,
        r#"
[[item]]
type = "Compile"
include = "a.cs;b.cs;c.cs"

[[item]]
type = "Compile"
remove = "b.cs"
"#,
    )
    .expect("write directives");

    Command::cargo_bin("lazyitems")
        .expect("binary exists")
        .env("HOME", dir.path())
        .arg("eval")
        .arg(&directives)
        .assert()
        .success()
        .stdout(predicate::str::contains("Compile: a.cs"))
        .stdout(predicate::str::contains("Compile: c.cs"))
        .stdout(predicate::str::contains("b.cs").not());
}

#[test]
fn eval_rejects_metadata_match_on_literals() {
    let dir = tempdir().expect("tempdir");
    let directives = dir.path().join("project.toml");
    fs::write(
        &directives,
        r#"
[[item]]
type = "Compile"
remove = "a.cs"
match_on_metadata = ["Link"]
"#,
    )
    .expect("write directives");

    Command::cargo_bin("lazyitems")
        .expect("binary exists")
        .env("HOME", dir.path())
        .arg("eval")
        .arg(&directives)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "MatchOnMetadataIsRestrictedToReferencedItems",
        ));
}

#[test]
fn eval_expands_globs_for_relative_directive_path() {
    let dir = tempdir().expect("tempdir");
    let project = dir.path().join("proj");
    fs::create_dir_all(project.join("sub")).expect("create project");
    fs::write(project.join("a.txt"), "").expect("write a.txt");
    fs::write(project.join("sub/b.txt"), "").expect("write b.txt");
    fs::write(
        project.join("project.toml"),
        r#"
[[item]]
type = "Content"
include = "*.txt"
"#,
    )
    .expect("write directives");

    Command::cargo_bin("lazyitems")
        .expect("binary exists")
        .env("HOME", dir.path())
        .current_dir(dir.path())
        .arg("eval")
        .arg("proj/project.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Content: a.txt"));

    Command::cargo_bin("lazyitems")
        .expect("binary exists")
        .env("HOME", dir.path())
        .current_dir(dir.path())
        .arg("eval")
        .arg("proj/project.toml")
        .arg("--project-dir")
        .arg("proj/sub")
        .assert()
        .success()
        .stdout(predicate::str::contains("Content: b.txt"))
        .stdout(predicate::str::contains("a.txt").not());
}
