#![forbid(unsafe_code)]

use fgr_conformance::{HarnessConfig, SuiteReport, run_all_suites, set_verification_log_path};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const DIGEST_FIELDS: &[&str] = &["problem_sha256", "answer_sha256", "report_sha256"];
const ID_FIELDS: &[&str] = &["suite", "fixture_id", "attempt_id"];
const COUNT_FIELDS: &[&str] = &["check_count", "failed_count", "skipped_count"];

const USAGE: &str = "Usage: cargo run -p fgr-conformance --bin run_verification_gate -- \
                     [--log-path <path>] [--fixture-root <dir>]";

#[derive(Debug, Default)]
struct GateArgs {
    log_path: Option<PathBuf>,
    fixture_root: Option<PathBuf>,
    help: bool,
}

impl GateArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            let mut value_of = |flag: &str| {
                args.next()
                    .map(PathBuf::from)
                    .ok_or_else(|| format!("{flag} requires a value"))
            };
            match arg.as_str() {
                "--log-path" => parsed.log_path = Some(value_of("--log-path")?),
                "--fixture-root" => parsed.fixture_root = Some(value_of("--fixture-root")?),
                "--help" | "-h" => parsed.help = true,
                unknown => return Err(format!("unknown argument: {unknown}")),
            }
        }
        Ok(parsed)
    }
}

#[derive(Debug, Serialize)]
struct SuiteSummary {
    suite: &'static str,
    case_count: usize,
    pass_count: usize,
    failures: Vec<String>,
}

impl From<SuiteReport> for SuiteSummary {
    fn from(report: SuiteReport) -> Self {
        Self {
            suite: report.suite,
            case_count: report.case_count,
            pass_count: report.pass_count,
            failures: report.failures,
        }
    }
}

#[derive(Debug, Serialize)]
struct GateSummary {
    status: &'static str,
    verification_log: String,
    total_cases: usize,
    total_passed: usize,
    suites: Vec<SuiteSummary>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("run_verification_gate failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = GateArgs::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let log_path = args.log_path.unwrap_or_else(default_log_path);
    set_verification_log_path(Some(log_path.clone()));

    let mut cfg = HarnessConfig::default_paths();
    if let Some(root) = args.fixture_root {
        cfg.fixture_root = root;
    }
    let mut suites =
        run_all_suites(&cfg).map_err(|err| format!("[{}] {err}", err.reason_code()))?;
    suites.push(audit_verification_log(&log_path)?);

    let passed = suites.iter().all(SuiteReport::all_passed);
    let summary = GateSummary {
        status: if passed { "pass" } else { "fail" },
        verification_log: log_path.display().to_string(),
        total_cases: suites.iter().map(|suite| suite.case_count).sum(),
        total_passed: suites.iter().map(|suite| suite.pass_count).sum(),
        suites: suites.into_iter().map(SuiteSummary::from).collect(),
    };
    let rendered = serde_json::to_string_pretty(&summary)
        .map_err(|err| format!("failed serializing gate summary: {err}"))?;
    println!("{rendered}");

    if !passed {
        std::process::exit(2);
    }
    Ok(())
}

fn default_log_path() -> PathBuf {
    let ts_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../artifacts/logs")
        .join(format!("verification_e2e_{ts_millis}.jsonl"))
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|byte| byte.is_ascii_hexdigit())
}

/// Problems with one log record; empty when the record is well formed.
fn entry_problems(entry: &Map<String, Value>) -> Vec<String> {
    let mut problems = Vec::new();
    let text = |field: &str| entry.get(field).and_then(Value::as_str);
    let count = |field: &str| entry.get(field).and_then(Value::as_u64);

    for &field in ID_FIELDS {
        if !text(field).is_some_and(|value| !value.trim().is_empty()) {
            problems.push(format!("`{field}` must be a non-empty string"));
        }
    }
    for &field in DIGEST_FIELDS {
        if !text(field).is_some_and(is_sha256_hex) {
            problems.push(format!("`{field}` must be a sha256 hex digest"));
        }
    }
    for &field in COUNT_FIELDS {
        if count(field).is_none() {
            problems.push(format!("`{field}` must be a count"));
        }
    }
    for field in ["passed", "not_attempted"] {
        if !entry.get(field).is_some_and(Value::is_boolean) {
            problems.push(format!("`{field}` must be a boolean"));
        }
    }

    let (checks, failed, skipped) = (
        count("check_count").unwrap_or(0),
        count("failed_count").unwrap_or(0),
        count("skipped_count").unwrap_or(0),
    );
    if failed + skipped > checks {
        problems.push(format!(
            "{failed} failed + {skipped} skipped exceeds {checks} checks"
        ));
    }
    if (failed > 0) != text("first_failure").is_some() {
        problems.push(format!(
            "`first_failure` must be set exactly when failed_count > 0 (got {failed})"
        ));
    }
    problems
}

fn audit_verification_log(path: &Path) -> Result<SuiteReport, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed reading verification log {}: {err}", path.display()))?;

    let mut report = SuiteReport {
        suite: "verification_log_contract",
        case_count: 0,
        pass_count: 0,
        failures: Vec::new(),
    };

    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        report.case_count += 1;
        let problems = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(entry)) => entry_problems(&entry),
            Ok(_) => vec!["record must be a JSON object".to_string()],
            Err(err) => vec![format!("invalid json: {err}")],
        };
        if problems.is_empty() {
            report.pass_count += 1;
        } else {
            report
                .failures
                .push(format!("line {}: {}", index + 1, problems.join("; ")));
        }
    }

    if report.case_count == 0 {
        report.case_count = 1;
        report
            .failures
            .push("verification log must contain at least one entry".to_string());
    }
    Ok(report)
}
