#![forbid(unsafe_code)]

//! Tolerance comparator: judges submitted values against reference values.
//!
//! Every judgement that concerns a learner's answer comes back as a
//! [`VerificationCheck`]. Only a malformed [`ToleranceSpec`] is an error.

pub mod answer;
pub mod field;
pub mod rules;
pub mod series;

use fgr_report::VerificationCheck;
use serde::{Deserialize, Serialize};

pub use answer::{AnswerMap, AnswerValue, ExpectedValue};
pub use field::{FieldExpectation, compare_field, compare_fields, compare_flag, compare_labels};
pub use rules::{
    AbcBands, Band, check_abc_bands, check_abc_volumes, check_matching_keys,
    check_monotone_cumulative, check_non_negative, check_policy_bands, check_positive,
    check_smooth_trend, check_sums_to, check_unit_interval, check_within_band,
};
pub use series::{check_periodic, check_reconstruction, compare_series};

pub const COMPARE_REASON_CODES: [&str; 1] = ["compare_invalid_tolerance"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompareError {
    #[error("tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),
}

impl CompareError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidTolerance(_) => "compare_invalid_tolerance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceMode {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct RawToleranceSpec {
    mode: ToleranceMode,
    value: f64,
}

/// Allowed deviation between a submitted and a reference value.
///
/// A zero value demands an exact match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawToleranceSpec", into = "RawToleranceSpec")]
pub struct ToleranceSpec {
    mode: ToleranceMode,
    value: f64,
}

impl TryFrom<RawToleranceSpec> for ToleranceSpec {
    type Error = CompareError;

    fn try_from(raw: RawToleranceSpec) -> Result<Self, Self::Error> {
        Self::new(raw.mode, raw.value)
    }
}

impl From<ToleranceSpec> for RawToleranceSpec {
    fn from(spec: ToleranceSpec) -> Self {
        Self {
            mode: spec.mode,
            value: spec.value,
        }
    }
}

impl ToleranceSpec {
    pub fn new(mode: ToleranceMode, value: f64) -> Result<Self, CompareError> {
        if !value.is_finite() || value < 0.0 {
            return Err(CompareError::InvalidTolerance(value));
        }
        Ok(Self { mode, value })
    }

    pub fn absolute(value: f64) -> Result<Self, CompareError> {
        Self::new(ToleranceMode::Absolute, value)
    }

    pub fn relative(value: f64) -> Result<Self, CompareError> {
        Self::new(ToleranceMode::Relative, value)
    }

    #[must_use]
    pub fn exact() -> Self {
        Self {
            mode: ToleranceMode::Absolute,
            value: 0.0,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ToleranceMode {
        self.mode
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Largest admissible `|actual - expected|` for this reference value.
    ///
    /// Relative mode degrades to absolute when the reference is exactly zero.
    #[must_use]
    pub fn threshold(&self, expected: f64) -> f64 {
        match self.mode {
            ToleranceMode::Absolute => self.value,
            ToleranceMode::Relative if expected == 0.0 => self.value,
            ToleranceMode::Relative => self.value * expected.abs(),
        }
    }
}

/// `|actual - expected| <= threshold`. Non-finite inputs never match.
#[must_use]
pub fn compare(actual: f64, expected: f64, tolerance: &ToleranceSpec) -> bool {
    if !actual.is_finite() || !expected.is_finite() {
        return false;
    }
    (actual - expected).abs() <= tolerance.threshold(expected)
}

pub fn compare_scalar(
    name: impl Into<String>,
    actual: f64,
    expected: f64,
    tolerance: &ToleranceSpec,
) -> VerificationCheck {
    VerificationCheck::comparison(
        name,
        compare(actual, expected, tolerance),
        actual,
        expected,
        tolerance.threshold(expected),
    )
}
