use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn command(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("results-push").expect("Binary exists");
    cmd.current_dir(cwd)
        .env_remove("RESULTS_PUSH_REGISTRY")
        .env_remove("RESULTS_PUSH_BUCKET")
        .env("RUST_LOG", "info");
    cmd
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).unwrap().next().is_none()
}

#[test]
fn push_with_invalid_target_fails_before_touching_anything() {
    let cwd = tempdir().unwrap();

    command(cwd.path())
        .arg("push")
        .arg("foo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'foo'"))
        .stderr(predicate::str::contains("possible values: gcs, docent, all"));

    assert!(is_empty_dir(cwd.path()), "no files may be created");
}

#[test]
fn push_with_invalid_modifier_fails() {
    let cwd = tempdir().unwrap();

    command(cwd.path())
        .args(["push", "docent", "everything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("new-only"));

    assert!(is_empty_dir(cwd.path()));
}

#[test]
fn push_without_registry_reports_read_error() {
    let cwd = tempdir().unwrap();

    command(cwd.path())
        .args(["push", "docent", "--registry"])
        .arg(cwd.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read registry"));
}

#[cfg(unix)]
#[test]
fn push_docent_new_only_ingests_new_models_and_records_ids() {
    let root = tempdir().unwrap();
    let base = root.path();
    fs::create_dir_all(base.join("trajs/fresh_traj")).unwrap();
    fs::create_dir_all(base.join("trajs/done_traj")).unwrap();
    fs::create_dir_all(base.join("reports")).unwrap();
    fs::write(
        base.join("reports/fresh.report.json"),
        r#"{"summary": {"total_instances": 10, "score": 0.5}}"#,
    )
    .unwrap();
    fs::write(
        base.join("models.json"),
        r#"{
  "done": {
    "trajs_dir": "done_traj",
    "logs_dir": "done.run",
    "report_file": "done.report.json",
    "docent_id": "1111-2222"
  },
  "fresh": {
    "trajs_dir": "fresh_traj",
    "logs_dir": "fresh.run",
    "report_file": "fresh.report.json"
  }
}
"#,
    )
    .unwrap();

    let config = format!(
        r#"
registry: "{base}/models.json"
trajectories:
  candidates: ["{base}/trajs"]
logs_root: "{base}/logs"
reports_root: "{base}/reports"
ingest:
  program: sh
  args: ["-c", "echo \"Successfully ingested to collection: 0123-abcd\"", "ingest"]
reports:
  destination: "{base}/results/reports"
  manifest: "{base}/results/manifest.json"
"#,
        base = base.display()
    );
    fs::write(base.join("push.yaml"), config).unwrap();

    command(base)
        .args(["push", "docent", "new-only", "--config"])
        .arg(base.join("push.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "fresh: https://docent.transluce.org/dashboard/0123-abcd",
        ))
        .stdout(predicate::str::contains("done: already ingested (1111-2222)"));

    let registry: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(base.join("models.json")).unwrap()).unwrap();
    assert_eq!(registry["fresh"]["docent_id"], "0123-abcd");
    assert_eq!(registry["done"]["docent_id"], "1111-2222");

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(base.join("results/manifest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        manifest["models"]["fresh"]["docent_url"],
        "https://docent.transluce.org/dashboard/0123-abcd"
    );
    assert!(base.join("results/reports/fresh.json").is_file());
}

#[test]
fn push_docent_ignores_unusable_bucket_url() {
    let root = tempdir().unwrap();
    let base = root.path();
    fs::write(
        base.join("models.json"),
        r#"{"m": {"trajs_dir": "missing", "logs_dir": "m.run", "report_file": "m.json"}}"#,
    )
    .unwrap();
    let config = format!(
        r#"
reports_root: "{base}/reports"
reports:
  destination: "{base}/results/reports"
  manifest: "{base}/results/manifest.json"
"#,
        base = base.display()
    );
    fs::write(base.join("push.yaml"), config).unwrap();

    command(base)
        .env("RESULTS_PUSH_BUCKET", "gs://")
        .args(["push", "docent", "--config"])
        .arg(base.join("push.yaml"))
        .assert()
        .success();

    command(base)
        .env("RESULTS_PUSH_BUCKET", "gs://")
        .args(["push", "gcs", "--config"])
        .arg(base.join("push.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid bucket URL"));
}

#[test]
fn sync_reports_writes_manifest() {
    let root = tempdir().unwrap();
    let base = root.path();
    fs::create_dir_all(base.join("reports")).unwrap();
    fs::write(base.join("reports/a.json"), r#"{"summary": {}}"#).unwrap();
    fs::write(
        base.join("models.json"),
        r#"{"a": {"trajs_dir": "t", "logs_dir": "l", "report_file": "a.json"}}"#,
    )
    .unwrap();
    let config = format!(
        "registry: \"{base}/models.json\"\nreports_root: \"{base}/reports\"\nreports:\n  destination: \"{base}/out\"\n  manifest: \"{base}/out/manifest.json\"\n",
        base = base.display()
    );
    fs::write(base.join("push.yaml"), config).unwrap();

    command(base)
        .args(["sync-reports", "--config"])
        .arg(base.join("push.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Reports: 1 synced, 0 skipped"));

    assert!(base.join("out/a.json").is_file());
    assert!(base.join("out/manifest.json").is_file());
}
