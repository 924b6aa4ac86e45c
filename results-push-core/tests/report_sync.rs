use results_push_core::contract::ReportSync;
use results_push_core::registry::{ModelEntry, Registry};
use results_push_core::report_sync::LocalReportSync;
use std::collections::BTreeMap;
use std::fs;
use tempfile::tempdir;

#[tokio::test]
async fn test_sync_reports_copies_reports_and_writes_manifest() {
    let root = tempdir().unwrap();
    let reports_src = root.path().join("internal").join("reports");
    fs::create_dir_all(&reports_src).unwrap();
    fs::write(
        reports_src.join("opus.report.json"),
        r#"{"summary": {"total_instances": 102, "opt_commit": 0.31, "opt_base": 0.42,
            "passed_instances": 40, "score": 0.39}, "instances": []}"#,
    )
    .unwrap();
    fs::write(reports_src.join("broken.report.json"), "not json").unwrap();

    let mut models = BTreeMap::new();
    let mut opus = ModelEntry::new("opus_traj", "opus.run", "opus.report.json");
    opus.docent_id = Some("abc-123".to_string());
    models.insert("opus".to_string(), opus);
    models.insert(
        "gpt".to_string(),
        ModelEntry::new("gpt_traj", "gpt.run", "gpt.report.json"),
    );
    models.insert(
        "broken".to_string(),
        ModelEntry::new("b_traj", "b.run", "broken.report.json"),
    );
    let registry = Registry::from_models(root.path().join("models.json"), models);

    let sync = LocalReportSync {
        reports_src,
        reports_dst: root.path().join("results").join("reports"),
        manifest_path: root.path().join("results").join("manifest.json"),
        bucket_url: "gs://gso-experiments/".to_string(),
        viewer_base_url: "https://docent.transluce.org/dashboard".to_string(),
    };

    let summary = sync.sync_reports(&registry).await.expect("sync should succeed");

    assert_eq!(summary.synced.len(), 1);
    assert_eq!(summary.skipped, vec!["broken".to_string(), "gpt".to_string()]);
    assert!(root.path().join("results/reports/opus.json").is_file());
    assert!(!root.path().join("results/reports/gpt.json").exists());

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(root.path().join("results/manifest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        manifest,
        serde_json::json!({
            "models": {
                "opus": {
                    "docent_url": "https://docent.transluce.org/dashboard/abc-123",
                    "gcs_path": "gs://gso-experiments/opus",
                    "report": "reports/opus.json",
                    "summary": {
                        "total_instances": 102,
                        "opt_commit": 0.31,
                        "opt_base": 0.42,
                        "passed": 40,
                        "score": 0.39
                    }
                }
            }
        })
    );
}

#[tokio::test]
async fn test_sync_reports_without_collection_or_summary() {
    let root = tempdir().unwrap();
    let reports_src = root.path().join("reports");
    fs::create_dir_all(&reports_src).unwrap();
    fs::write(reports_src.join("m.json"), "{}").unwrap();

    let mut models = BTreeMap::new();
    models.insert("m".to_string(), ModelEntry::new("t", "l", "m.json"));
    let registry = Registry::from_models(root.path().join("models.json"), models);

    let sync = LocalReportSync {
        reports_src,
        reports_dst: root.path().join("out"),
        manifest_path: root.path().join("manifest.json"),
        bucket_url: "gs://bucket".to_string(),
        viewer_base_url: "https://viewer".to_string(),
    };
    let summary = sync.sync_reports(&registry).await.unwrap();

    let entry = &summary.synced["m"];
    assert_eq!(entry.docent_url, None);
    assert_eq!(entry.summary.total_instances, None);
    assert_eq!(summary.manifest_path, Some(root.path().join("manifest.json")));
}

#[tokio::test]
async fn test_sync_reports_isolates_bad_report_from_others() {
    let root = tempdir().unwrap();
    let reports_src = root.path().join("reports");
    fs::create_dir_all(&reports_src).unwrap();
    fs::write(reports_src.join("a.json"), [0xffu8, 0xfe, 0x00]).unwrap();
    fs::write(reports_src.join("b.json"), r#"{"summary": {"passed_instances": 3}}"#).unwrap();
    fs::write(reports_src.join("c.json"), "{}").unwrap();

    // A directory at c's destination makes its write fail.
    let reports_dst = root.path().join("out");
    fs::create_dir_all(reports_dst.join("c.json")).unwrap();

    let mut models = BTreeMap::new();
    models.insert("a".to_string(), ModelEntry::new("t", "l", "a.json"));
    models.insert("b".to_string(), ModelEntry::new("t", "l", "b.json"));
    models.insert("c".to_string(), ModelEntry::new("t", "l", "c.json"));
    let registry = Registry::from_models(root.path().join("models.json"), models);

    let sync = LocalReportSync {
        reports_src,
        reports_dst: reports_dst.clone(),
        manifest_path: root.path().join("manifest.json"),
        bucket_url: "gs://bucket".to_string(),
        viewer_base_url: "https://viewer".to_string(),
    };
    let summary = sync
        .sync_reports(&registry)
        .await
        .expect("one bad report must not abort the sync");

    assert_eq!(summary.skipped, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(summary.synced.len(), 1);
    assert!(reports_dst.join("b.json").is_file());
    assert!(!reports_dst.join("a.json").exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.path().join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["models"]["b"]["summary"]["passed"], 3);
    assert!(manifest["models"].get("a").is_none());
}
