use assert_cmd::prelude::*;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn vbk(dir: &Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("vbk");
    let mut cmd = Command::new(bin);
    cmd.current_dir(dir).env_remove("VBK_LOG");
    cmd
}

fn created_id(stdout: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Backup created: "))
        .expect("create prints the new version id")
        .trim()
        .to_string()
}

#[test]
fn no_command_is_a_usage_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    vbk(temp.path())
        .assert()
        .code(64)
        .stderr(predicate::str::contains("requires at least one command"));
    Ok(())
}

#[test]
fn create_list_restore_delete() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let project = temp.child("project");
    project.create_dir_all()?;
    project.child("a.txt").write_str("alpha")?;
    project.child(".git").create_dir_all()?;
    project.child(".git/config").write_str("[core]")?;

    let output = vbk(project.path()).args(["create", "-m", "first cut"]).output()?;
    assert!(output.status.success());
    let id = created_id(&output.stdout);
    assert!(id.starts_with("v001_"));

    project.child("config.json").assert(predicate::path::exists());
    temp.child("project_backups")
        .child(format!("project_{id}_first_cut.zip"))
        .assert(predicate::path::exists());

    vbk(project.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()).and(predicate::str::contains("first cut")));

    vbk(project.path())
        .args(["info", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("format: zip"));

    project.child("a.txt").write_str("changed")?;
    project.child("extra.txt").write_str("new")?;
    vbk(project.path())
        .args(["restore", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Restored version {id}.")));
    project.child("a.txt").assert("alpha");
    project.child("extra.txt").assert(predicate::path::missing());
    project.child(".git").assert(predicate::path::missing());
    project.child("config.json").assert(predicate::path::exists());

    vbk(project.path())
        .args(["delete", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Deleted version {id}.")));
    vbk(project.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found."));
    Ok(())
}

#[test]
fn restore_unknown_version_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let project = temp.child("project");
    project.create_dir_all()?;
    project.child("a.txt").write_str("alpha")?;

    vbk(project.path())
        .args(["restore", "v999_20990101_000000"])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Version not found: v999_20990101_000000"));
    project.child("a.txt").assert("alpha");
    Ok(())
}

#[test]
fn info_unknown_version_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let project = temp.child("project");
    project.create_dir_all()?;

    vbk(project.path())
        .args(["info", "v042_20990101_000000"])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Version not found: v042_20990101_000000"));
    Ok(())
}

#[test]
fn config_sets_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let tool = temp.child("tool");
    tool.create_dir_all()?;
    let project = temp.child("project");
    project.create_dir_all()?;
    project.child("main.rs").write_str("fn main() {}")?;

    vbk(tool.path())
        .args(["config", "--source", "../project", "--backup", "../store"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backup_dir:"));
    temp.child("store").assert(predicate::path::is_dir());

    let document = fs::read_to_string(tool.child("config.json").path())?;
    assert!(document.contains("\"source_dir\""));
    assert!(document.contains("store"));
    assert!(!document.contains(".."));

    let output = vbk(tool.path()).arg("create").output()?;
    assert!(output.status.success());
    let id = created_id(&output.stdout);
    temp.child("store")
        .child(format!("project_{id}.zip"))
        .assert(predicate::path::exists());
    Ok(())
}

#[test]
fn create_with_prune_applies_limit() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let project = temp.child("project");
    project.create_dir_all()?;
    project.child("a.txt").write_str("alpha")?;
    vbk(project.path()).arg("config").assert().success();
    project
        .child("config.json")
        .write_str(r#"{ "max_backups": 1, "compression": false }"#)?;

    let first = created_id(&vbk(project.path()).arg("create").output()?.stdout);
    vbk(project.path())
        .args(["create", "--prune"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Deleted version {first}.")));

    temp.child("project_backups")
        .child(format!("project_{first}"))
        .assert(predicate::path::missing());
    Ok(())
}
