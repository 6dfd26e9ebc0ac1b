#![forbid(unsafe_code)]

//! Check outcomes and the ordered report produced for one graded attempt.
//!
//! A wrong or missing answer is never an error here: it is a
//! [`CheckOutcome::Failed`] entry carrying enough detail to explain itself.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed,
    Failed,
    /// Nothing was attempted; does not count against `all_passed`.
    Skipped,
}

impl CheckOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn from_bool(passed: bool) -> Self {
        if passed { Self::Passed } else { Self::Failed }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckDetail {
    Comparison {
        actual: f64,
        expected: f64,
        diff: f64,
        threshold: f64,
    },
    Reason(String),
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub name: String,
    pub outcome: CheckOutcome,
    pub detail: CheckDetail,
}

impl VerificationCheck {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: CheckOutcome::Passed,
            detail: CheckDetail::None,
        }
    }

    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: CheckOutcome::Failed,
            detail: CheckDetail::Reason(reason.into()),
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: CheckOutcome::Skipped,
            detail: CheckDetail::Reason(reason.into()),
        }
    }

    /// Passed or Failed according to `passed`, with a reason attached either way.
    pub fn judged(name: impl Into<String>, passed: bool, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: CheckOutcome::from_bool(passed),
            detail: CheckDetail::Reason(reason.into()),
        }
    }

    pub fn comparison(
        name: impl Into<String>,
        passed: bool,
        actual: f64,
        expected: f64,
        threshold: f64,
    ) -> Self {
        Self {
            name: name.into(),
            outcome: CheckOutcome::from_bool(passed),
            detail: CheckDetail::Comparison {
                actual,
                expected,
                diff: (actual - expected).abs(),
                threshold,
            },
        }
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match &self.detail {
            CheckDetail::Reason(reason) => Some(reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.outcome == CheckOutcome::Failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl OutcomeCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    checks: Vec<VerificationCheck>,
    #[serde(default)]
    not_attempted: bool,
}

impl VerificationReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, check: VerificationCheck) {
        self.checks.push(check);
    }

    #[must_use]
    pub fn checks(&self) -> &[VerificationCheck] {
        &self.checks
    }

    #[must_use]
    pub fn last(&self) -> Option<&VerificationCheck> {
        self.checks.last()
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&VerificationCheck> {
        self.checks.iter().find(|check| check.name == name)
    }

    pub fn failures(&self) -> impl Iterator<Item = &VerificationCheck> {
        self.checks.iter().filter(|check| check.is_failed())
    }

    /// True iff no check failed. Skipped checks do not count against a pass.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(VerificationCheck::is_failed)
    }

    #[must_use]
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for check in &self.checks {
            match check.outcome {
                CheckOutcome::Passed => counts.passed += 1,
                CheckOutcome::Failed => counts.failed += 1,
                CheckOutcome::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    pub fn mark_not_attempted(&mut self) {
        self.not_attempted = true;
    }

    #[must_use]
    pub fn not_attempted(&self) -> bool {
        self.not_attempted
    }

    /// SHA-256 over the canonical JSON form of the report.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(sha256_hex(&bytes))
    }
}

impl Extend<VerificationCheck> for VerificationReport {
    fn extend<T: IntoIterator<Item = VerificationCheck>>(&mut self, iter: T) {
        self.checks.extend(iter);
    }
}

impl FromIterator<VerificationCheck> for VerificationReport {
    fn from_iter<T: IntoIterator<Item = VerificationCheck>>(iter: T) -> Self {
        Self {
            checks: iter.into_iter().collect(),
            not_attempted: false,
        }
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{
        CheckDetail, CheckOutcome, VerificationCheck, VerificationReport, sha256_hex,
    };

    #[test]
    fn skipped_checks_do_not_fail_a_report() {
        let mut report = VerificationReport::new();
        report.push(VerificationCheck::passed("eoq"));
        report.push(VerificationCheck::skipped("balance", "model infeasible"));
        assert!(report.all_passed());

        report.push(VerificationCheck::failed("rop", "missing field: rop"));
        assert!(!report.all_passed());
        let counts = report.counts();
        assert_eq!((counts.passed, counts.failed, counts.skipped), (1, 1, 1));
        assert_eq!(counts.total(), 3);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.last().map(|c| c.name.as_str()), Some("rop"));
    }

    #[test]
    fn empty_report_passes_vacuously() {
        let report = VerificationReport::new();
        assert!(report.all_passed());
        assert!(!report.not_attempted());
        assert!(report.last().is_none());
    }

    #[test]
    fn comparison_detail_records_absolute_difference() {
        let check = VerificationCheck::comparison("safety_stock", true, 95.0, 91.96, 9.196);
        assert_eq!(check.outcome, CheckOutcome::Passed);
        match check.detail {
            CheckDetail::Comparison {
                actual,
                expected,
                diff,
                threshold,
            } => {
                assert_eq!(actual, 95.0);
                assert_eq!(expected, 91.96);
                assert!((diff - 3.04).abs() < 1e-12);
                assert_eq!(threshold, 9.196);
            }
            other => panic!("unexpected detail {other:?}"),
        }
        assert!(check.reason().is_none());
    }

    #[test]
    fn report_round_trips_through_json_with_stable_digest() {
        let mut report: VerificationReport = [
            VerificationCheck::passed("a"),
            VerificationCheck::failed("b", "missing field: b"),
        ]
        .into_iter()
        .collect();
        report.mark_not_attempted();

        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains("\"outcome\":\"failed\""));
        assert!(json.contains("\"not_attempted\":true"));
        let back: VerificationReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, report);
        assert_eq!(
            back.digest().expect("digest"),
            report.digest().expect("digest")
        );
        assert_eq!(back.find("b").and_then(|c| c.reason()), Some("missing field: b"));
    }

    #[test]
    fn sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
