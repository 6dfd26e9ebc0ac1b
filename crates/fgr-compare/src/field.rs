//! Mapping-shaped answers: only the keys a check requires are examined.

use crate::answer::{AnswerMap, AnswerValue, ExpectedValue};
use crate::series::compare_series;
use crate::{ToleranceSpec, compare, compare_scalar};
use fgr_report::VerificationCheck;
use serde::{Deserialize, Serialize};

/// A required key in a mapping answer and the reference it must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExpectation {
    pub key: String,
    pub expected: ExpectedValue,
    pub tolerance: ToleranceSpec,
}

impl FieldExpectation {
    pub fn new(
        key: impl Into<String>,
        expected: impl Into<ExpectedValue>,
        tolerance: ToleranceSpec,
    ) -> Self {
        Self {
            key: key.into(),
            expected: expected.into(),
            tolerance,
        }
    }
}

fn missing(name: String, key: &str) -> VerificationCheck {
    VerificationCheck::failed(name, format!("missing field: {key}"))
}

fn wrong_shape(name: String, key: &str, expected: &str, got: &str) -> VerificationCheck {
    VerificationCheck::failed(
        name,
        format!("unexpected shape for {key}: expected {expected}, got {got}"),
    )
}

/// A series reference with leading undefined (NaN) positions, such as a
/// moving average, treats those positions as its warm-up window.
pub fn compare_field(
    name: impl Into<String>,
    answer: &AnswerMap,
    key: &str,
    expected: &ExpectedValue,
    tolerance: &ToleranceSpec,
) -> VerificationCheck {
    let name = name.into();
    let Some(value) = answer.get(key) else {
        return missing(name, key);
    };

    match (expected, value) {
        (ExpectedValue::Scalar(reference), AnswerValue::Scalar(actual)) => {
            compare_scalar(name, *actual, *reference, tolerance)
        }
        (ExpectedValue::Series(reference), AnswerValue::Series(actual)) => {
            let warm_up = reference.iter().take_while(|value| value.is_nan()).count();
            compare_series(name, actual, reference, tolerance, warm_up)
        }
        (ExpectedValue::Mapping(reference), AnswerValue::Mapping(actual)) => {
            for (inner_key, inner_expected) in reference {
                let Some(inner_actual) = actual.get(inner_key) else {
                    return missing(name, &format!("{key}.{inner_key}"));
                };
                if !compare(*inner_actual, *inner_expected, tolerance) {
                    return VerificationCheck::failed(
                        name,
                        format!(
                            "{key}.{inner_key}: actual {inner_actual} differs from expected \
                             {inner_expected} by more than {}",
                            tolerance.threshold(*inner_expected)
                        ),
                    );
                }
            }
            VerificationCheck::judged(
                name,
                true,
                format!("{} entries within tolerance", reference.len()),
            )
        }
        (expected, value) => wrong_shape(name, key, expected.shape(), value.shape()),
    }
}

/// One check per expectation, named after its key, in expectation order.
pub fn compare_fields(
    answer: &AnswerMap,
    expectations: &[FieldExpectation],
) -> Vec<VerificationCheck> {
    expectations
        .iter()
        .map(|exp| compare_field(exp.key.clone(), answer, &exp.key, &exp.expected, &exp.tolerance))
        .collect()
}

/// Boolean conclusions such as `residuals_normal` must equal the reference flag.
pub fn compare_flag(
    name: impl Into<String>,
    answer: &AnswerMap,
    key: &str,
    expected: bool,
) -> VerificationCheck {
    let name = name.into();
    match answer.get(key) {
        None => missing(name, key),
        Some(AnswerValue::Flag(actual)) => VerificationCheck::judged(
            name,
            *actual == expected,
            format!("{key} = {actual}, expected {expected}"),
        ),
        Some(other) => wrong_shape(name, key, "flag", other.shape()),
    }
}

/// Category labels (for example ABC classes) must match element for element.
pub fn compare_labels(
    name: impl Into<String>,
    answer: &AnswerMap,
    key: &str,
    expected: &[String],
) -> VerificationCheck {
    let name = name.into();
    let actual = match answer.get(key) {
        None => return missing(name, key),
        Some(AnswerValue::Labels(labels)) => labels,
        Some(other) => return wrong_shape(name, key, "labels", other.shape()),
    };
    if actual.len() != expected.len() {
        return VerificationCheck::failed(
            name,
            format!(
                "length mismatch for {key}: got {}, expected {}",
                actual.len(),
                expected.len()
            ),
        );
    }
    match actual.iter().zip(expected).position(|(a, e)| a != e) {
        Some(index) => VerificationCheck::failed(
            name,
            format!(
                "{key}[{index}] = {:?}, expected {:?}",
                actual[index], expected[index]
            ),
        ),
        None => VerificationCheck::judged(name, true, format!("{} labels match", actual.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldExpectation, compare_field, compare_fields, compare_flag, compare_labels};
    use crate::answer::{AnswerMap, AnswerValue, ExpectedValue};
    use crate::ToleranceSpec;
    use fgr_report::CheckOutcome;
    use std::collections::BTreeMap;

    fn tol() -> ToleranceSpec {
        ToleranceSpec::absolute(0.01).expect("tolerance")
    }

    #[test]
    fn empty_submission_reports_missing_field() {
        let answer = AnswerMap::new();
        let check = compare_field("eoq", &answer, "eoq", &ExpectedValue::Scalar(200.0), &tol());
        assert_eq!(check.outcome, CheckOutcome::Failed);
        assert_eq!(check.reason(), Some("missing field: eoq"));
    }

    #[test]
    fn only_required_keys_are_examined() {
        let mut answer = AnswerMap::new();
        answer.insert("eoq".into(), AnswerValue::Scalar(200.004));
        answer.insert("scratch".into(), AnswerValue::Labels(vec!["junk".into()]));
        let checks = compare_fields(&answer, &[FieldExpectation::new("eoq", 200.0, tol())]);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name, "eoq");
        assert_eq!(checks[0].outcome, CheckOutcome::Passed);
    }

    #[test]
    fn shape_mismatch_is_a_failure_not_a_panic() {
        let mut answer = AnswerMap::new();
        answer.insert("eoq".into(), AnswerValue::Series(vec![1.0, 2.0]));
        let check = compare_field("eoq", &answer, "eoq", &ExpectedValue::Scalar(2.0), &tol());
        assert_eq!(check.outcome, CheckOutcome::Failed);
        assert_eq!(
            check.reason(),
            Some("unexpected shape for eoq: expected scalar, got series")
        );
    }

    #[test]
    fn nested_mappings_report_the_missing_inner_key() {
        let mut shares = BTreeMap::new();
        shares.insert("A".to_string(), 0.75);
        let mut answer = AnswerMap::new();
        answer.insert("shares".into(), AnswerValue::Mapping(shares.clone()));

        shares.insert("B".to_string(), 0.17);
        let check = compare_field(
            "shares",
            &answer,
            "shares",
            &ExpectedValue::Mapping(shares),
            &tol(),
        );
        assert_eq!(check.reason(), Some("missing field: shares.B"));
    }

    #[test]
    fn flags_and_labels() {
        let mut answer = AnswerMap::new();
        answer.insert("homoscedastic".into(), AnswerValue::Flag(true));
        answer.insert(
            "classes".into(),
            AnswerValue::Labels(vec!["A".into(), "B".into(), "C".into()]),
        );
        assert_eq!(
            compare_flag("homoscedastic", &answer, "homoscedastic", true).outcome,
            CheckOutcome::Passed
        );
        assert_eq!(
            compare_flag("homoscedastic", &answer, "homoscedastic", false).outcome,
            CheckOutcome::Failed
        );

        let expected = vec!["A".to_string(), "C".to_string(), "C".to_string()];
        let check = compare_labels("classes", &answer, "classes", &expected);
        assert_eq!(check.reason(), Some("classes[1] = \"B\", expected \"C\""));
        assert_eq!(
            compare_labels("classes", &answer, "missing", &expected).reason(),
            Some("missing field: missing")
        );
    }

    #[test]
    fn series_reference_skips_its_undefined_warm_up() {
        let reference = ExpectedValue::Series(vec![f64::NAN, f64::NAN, 12.0, 14.0]);
        let mut answer = AnswerMap::new();
        answer.insert(
            "ma".into(),
            AnswerValue::Series(vec![f64::NAN, f64::NAN, 12.0, 14.0]),
        );
        let check = compare_field("ma", &answer, "ma", &reference, &tol());
        assert_eq!(check.outcome, CheckOutcome::Passed);
        assert_eq!(check.reason(), Some("2 positions within tolerance"));

        answer.insert("ma".into(), AnswerValue::Series(vec![10.0, f64::NAN, 12.0, 14.0]));
        let check = compare_field("ma", &answer, "ma", &reference, &tol());
        assert_eq!(
            check.reason(),
            Some("position 0 should be undefined during the warm-up window")
        );
    }
}
