use fgr_conformance::{HarnessConfig, run_forecasting_suite, set_verification_log_path};
use serde_json::Value;
use std::fs;

#[test]
fn every_graded_attempt_is_logged_with_digests() {
    let log_path = std::env::temp_dir()
        .join(format!("fgr_verification_log_{}", std::process::id()))
        .join("forecasting.jsonl");
    let _ = fs::remove_file(&log_path);
    set_verification_log_path(Some(log_path.clone()));

    let report = run_forecasting_suite(&HarnessConfig::default_paths()).expect("suite");
    set_verification_log_path(None);
    assert!(report.all_passed(), "{:?}", report.failures);

    let raw = fs::read_to_string(&log_path).expect("log written");
    let entries: Vec<Value> = raw
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(entries.len(), report.case_count);

    for entry in &entries {
        assert_eq!(entry["suite"], "forecasting");
        for field in ["problem_sha256", "answer_sha256", "report_sha256"] {
            let digest = entry[field].as_str().expect("digest string");
            assert_eq!(digest.len(), 64);
        }
    }

    let early = entries
        .iter()
        .find(|entry| entry["attempt_id"] == "early_value")
        .expect("early_value attempt");
    assert_eq!(early["first_failure"], "ma");
    assert_eq!(early["failed_count"], 1);

    let exact = entries
        .iter()
        .find(|entry| entry["fixture_id"] == "three_period_moving_average" && entry["attempt_id"] == "exact")
        .expect("exact attempt");
    assert!(exact["first_failure"].is_null());
    assert_eq!(exact["problem_sha256"], early["problem_sha256"]);
    assert_ne!(exact["answer_sha256"], early["answer_sha256"]);

    let _ = fs::remove_dir_all(log_path.parent().expect("parent"));
}
