#![forbid(unsafe_code)]

//! Fixture-driven conformance suites for the verification engine.
//!
//! Each fixture file holds exercises (problem, declared checks, optional
//! assumption thresholds) and graded attempts with their expected outcome.
//! Every graded attempt can be appended to a JSONL log together with SHA-256
//! digests of the problem, the answer and the resulting report.

use fgr_assume::AssumptionConfig;
use fgr_oracle::ProblemInstance;
use fgr_report::{VerificationReport, sha256_hex};
use fgr_verify::{CheckSpec, ExercisePlan, SubmittedAnswer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

pub const VERIFICATION_LOG_ENV: &str = "FGR_VERIFICATION_LOG_PATH";

pub const HARNESS_REASON_CODES: [&str; 4] = [
    "harness_fixture_io",
    "harness_fixture_parse",
    "harness_serialize",
    "harness_log_io",
];

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed reading {path}: {source}")]
    FixtureIo {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    FixtureParse {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed serializing {what}: {source}")]
    Serialize {
        what: &'static str,
        source: serde_json::Error,
    },
    #[error("failed appending verification log {path}: {reason}")]
    LogIo { path: String, reason: String },
}

impl HarnessError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::FixtureIo { .. } => "harness_fixture_io",
            Self::FixtureParse { .. } => "harness_fixture_parse",
            Self::Serialize { .. } => "harness_serialize",
            Self::LogIo { .. } => "harness_log_io",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub fixture_root: PathBuf,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            fixture_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessReport {
    pub suite: &'static str,
    pub fixture_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub suite: &'static str,
    pub case_count: usize,
    pub pass_count: usize,
    pub failures: Vec<String>,
}

impl SuiteReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.case_count == self.pass_count && self.failures.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct ExerciseFixture {
    id: String,
    #[serde(default)]
    problem: ProblemInstance,
    checks: Vec<CheckSpec>,
    #[serde(default)]
    assumptions: Option<AssumptionConfig>,
    /// Building the plan must fail with this reason code.
    #[serde(default)]
    expected_error: Option<String>,
    #[serde(default)]
    attempts: Vec<AttemptFixture>,
}

#[derive(Debug, Deserialize)]
struct AttemptFixture {
    id: String,
    answer: SubmittedAnswer,
    passed: bool,
    /// When non-empty, exactly these checks fail.
    #[serde(default)]
    failed_checks: Vec<String>,
    #[serde(default)]
    not_attempted: bool,
    /// Exact reason text expected for a named check.
    #[serde(default)]
    reasons: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct VerificationLogEntry {
    suite: &'static str,
    fixture_id: String,
    attempt_id: String,
    first_failure: Option<String>,
    problem_sha256: String,
    answer_sha256: String,
    report_sha256: String,
    check_count: usize,
    failed_count: usize,
    skipped_count: usize,
    not_attempted: bool,
    passed: bool,
}

static VERIFICATION_LOG_PATH: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

pub fn set_verification_log_path(path: Option<PathBuf>) {
    let cell = VERIFICATION_LOG_PATH.get_or_init(|| Mutex::new(None));
    if let Ok(mut slot) = cell.lock() {
        *slot = path;
    }
}

#[must_use]
pub fn run_smoke(config: &HarnessConfig) -> HarnessReport {
    let fixture_count = fs::read_dir(&config.fixture_root)
        .ok()
        .into_iter()
        .flat_map(|it| it.filter_map(Result::ok))
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .count();

    HarnessReport {
        suite: "smoke",
        fixture_count,
    }
}

fn load_exercises(fixture_root: &Path, file_name: &str) -> Result<Vec<ExerciseFixture>, HarnessError> {
    let path = fixture_root.join(file_name);
    let raw = fs::read_to_string(&path).map_err(|source| HarnessError::FixtureIo {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| HarnessError::FixtureParse {
        path: path.display().to_string(),
        source,
    })
}

fn digest_of<T: Serialize>(what: &'static str, value: &T) -> Result<String, HarnessError> {
    let bytes = serde_json::to_vec(value).map_err(|source| HarnessError::Serialize { what, source })?;
    Ok(sha256_hex(&bytes))
}

/// Mismatches between a graded report and the attempt's expectations.
fn attempt_mismatches(attempt: &AttemptFixture, report: &VerificationReport) -> Vec<String> {
    let mut mismatches = Vec::new();
    if report.all_passed() != attempt.passed {
        let failed: Vec<String> = report
            .failures()
            .map(|check| match check.reason() {
                Some(reason) => format!("{} ({reason})", check.name),
                None => check.name.clone(),
            })
            .collect();
        mismatches.push(format!(
            "expected passed={}, got passed={} with failures {failed:?}",
            attempt.passed,
            report.all_passed()
        ));
    }
    if !attempt.failed_checks.is_empty() {
        let expected: BTreeSet<&str> = attempt.failed_checks.iter().map(String::as_str).collect();
        let actual: BTreeSet<&str> = report.failures().map(|check| check.name.as_str()).collect();
        if expected != actual {
            mismatches.push(format!("failed checks {actual:?}, expected {expected:?}"));
        }
    }
    if report.not_attempted() != attempt.not_attempted {
        mismatches.push(format!(
            "not_attempted={}, expected {}",
            report.not_attempted(),
            attempt.not_attempted
        ));
    }
    for (name, expected) in &attempt.reasons {
        match report.find(name) {
            None => mismatches.push(format!("no check named {name}")),
            Some(check) if check.reason() != Some(expected.as_str()) => mismatches.push(format!(
                "{name}: reason {:?}, expected {expected:?}",
                check.reason()
            )),
            Some(_) => {}
        }
    }
    mismatches
}

fn run_exercise_suite(
    config: &HarnessConfig,
    suite: &'static str,
    file_name: &str,
) -> Result<SuiteReport, HarnessError> {
    let exercises = load_exercises(&config.fixture_root, file_name)?;

    let mut report = SuiteReport {
        suite,
        case_count: 0,
        pass_count: 0,
        failures: Vec::new(),
    };

    for exercise in exercises {
        let built = ExercisePlan::build(&exercise.problem, exercise.checks);
        let plan = match (built, &exercise.expected_error) {
            (Ok(plan), None) => plan,
            (Err(err), Some(expected)) => {
                report.case_count += 1;
                if err.reason_code() == expected {
                    report.pass_count += 1;
                } else {
                    report.failures.push(format!(
                        "{}: build failed with {}, expected {expected}",
                        exercise.id,
                        err.reason_code()
                    ));
                }
                continue;
            }
            (Ok(_), Some(expected)) => {
                report.case_count += 1;
                report.failures.push(format!(
                    "{}: plan built, expected {expected}",
                    exercise.id
                ));
                continue;
            }
            (Err(err), None) => {
                report.case_count += 1;
                report.failures.push(format!("{}: plan build failed: {err}", exercise.id));
                continue;
            }
        };
        let plan = match exercise.assumptions {
            Some(assumptions) => plan.with_assumptions(assumptions),
            None => plan,
        };
        let problem_sha256 = digest_of("problem", &exercise.problem)?;

        for attempt in &exercise.attempts {
            report.case_count += 1;
            let graded = plan.grade(&attempt.answer);
            let mismatches = attempt_mismatches(attempt, &graded);
            let ok = mismatches.is_empty();
            if ok {
                report.pass_count += 1;
            }
            report.failures.extend(
                mismatches
                    .into_iter()
                    .map(|mismatch| format!("{}/{}: {mismatch}", exercise.id, attempt.id)),
            );

            let counts = graded.counts();
            let log_entry = VerificationLogEntry {
                suite,
                fixture_id: exercise.id.clone(),
                attempt_id: attempt.id.clone(),
                first_failure: graded.failures().next().map(|check| check.name.clone()),
                problem_sha256: problem_sha256.clone(),
                answer_sha256: digest_of("answer", &attempt.answer)?,
                report_sha256: graded.digest().map_err(|source| HarnessError::Serialize {
                    what: "report",
                    source,
                })?,
                check_count: counts.total(),
                failed_count: counts.failed,
                skipped_count: counts.skipped,
                not_attempted: graded.not_attempted(),
                passed: ok,
            };
            maybe_append_verification_log(&log_entry)?;
        }
    }

    Ok(report)
}

pub fn run_inventory_suite(config: &HarnessConfig) -> Result<SuiteReport, HarnessError> {
    run_exercise_suite(config, "inventory", "inventory_cases.json")
}

pub fn run_probability_suite(config: &HarnessConfig) -> Result<SuiteReport, HarnessError> {
    run_exercise_suite(config, "probability", "probability_cases.json")
}

pub fn run_regression_suite(config: &HarnessConfig) -> Result<SuiteReport, HarnessError> {
    run_exercise_suite(config, "regression", "regression_cases.json")
}

pub fn run_forecasting_suite(config: &HarnessConfig) -> Result<SuiteReport, HarnessError> {
    run_exercise_suite(config, "forecasting", "forecasting_cases.json")
}

pub fn run_model_suite(config: &HarnessConfig) -> Result<SuiteReport, HarnessError> {
    run_exercise_suite(config, "model", "model_cases.json")
}

pub fn run_all_suites(config: &HarnessConfig) -> Result<Vec<SuiteReport>, HarnessError> {
    Ok(vec![
        run_inventory_suite(config)?,
        run_probability_suite(config)?,
        run_regression_suite(config)?,
        run_forecasting_suite(config)?,
        run_model_suite(config)?,
    ])
}

fn maybe_append_verification_log(entry: &VerificationLogEntry) -> Result<(), HarnessError> {
    let configured = VERIFICATION_LOG_PATH
        .get()
        .and_then(|cell| cell.lock().ok())
        .and_then(|slot| slot.clone());
    let from_env = std::env::var_os(VERIFICATION_LOG_ENV).map(PathBuf::from);
    let Some(path) = configured.or(from_env) else {
        return Ok(());
    };
    let log_error = |reason: String| HarnessError::LogIo {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| log_error(format!("failed creating {}: {err}", parent.display())))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| log_error(format!("failed opening: {err}")))?;
    let line = serde_json::to_string(entry).map_err(|source| HarnessError::Serialize {
        what: "verification log entry",
        source,
    })?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload)
        .map_err(|err| log_error(err.to_string()))
}
