//! Exercise plans: check declarations resolved against one problem instance.

use crate::quantity::Quantity;
use crate::{Submission, SubmittedAnswer};
use fgr_assume::{
    AssumptionConfig, AssumptionKind, validate_regression_residuals,
    validate_white_noise_residuals,
};
use fgr_compare::{
    AbcBands, AnswerMap, AnswerValue, Band, ExpectedValue, ToleranceSpec, check_abc_volumes,
    check_matching_keys, check_monotone_cumulative, check_non_negative, check_periodic,
    check_policy_bands, check_positive, check_reconstruction, check_smooth_trend,
    check_sums_to, check_unit_interval, check_within_band, compare_field, compare_flag,
    compare_labels, compare_scalar, compare_series,
};
use fgr_model::{ModelSchema, SolvedModel, inspect};
use fgr_oracle::{OracleError, ProblemInstance};
use fgr_report::{CheckOutcome, VerificationCheck, VerificationReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Check declaration as written in an exercise definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum CheckSpec {
    /// A bare scalar submission against one reference value; `select`
    /// picks a component of a mapping-valued quantity.
    Answer {
        quantity: Quantity,
        #[serde(default)]
        select: Option<String>,
        tolerance: ToleranceSpec,
    },
    Field {
        field: String,
        quantity: Quantity,
        #[serde(default)]
        select: Option<String>,
        tolerance: ToleranceSpec,
    },
    /// Defaults `warm_up` to the number of leading undefined reference values.
    Series {
        field: String,
        quantity: Quantity,
        tolerance: ToleranceSpec,
        #[serde(default)]
        warm_up: Option<usize>,
    },
    Periodic {
        field: String,
        period: usize,
        tolerance: ToleranceSpec,
    },
    Rule {
        name: String,
        #[serde(flatten)]
        rule: RuleSpec,
    },
    Flag {
        field: String,
        expected: bool,
    },
    Labels {
        field: String,
        expected: Vec<String>,
    },
    /// A boolean conclusion the learner drew about problem data, judged
    /// against what the assumption check concludes on `sample` under the
    /// plan's [`AssumptionConfig`].
    Conclusion {
        field: String,
        sample: String,
        kind: AssumptionKind,
    },
    Assumption {
        field: String,
        kind: AssumptionKind,
    },
    /// Regression diagnostics when `fitted` is given, white-noise
    /// diagnostics otherwise.
    Residuals {
        #[serde(default)]
        fitted: Option<String>,
        residuals: String,
    },
    Model {
        schema: ModelSchema,
        tolerance: ToleranceSpec,
    },
}

/// Structural rules over submitted numbers. A rule `fields` entry may name a
/// scalar, a series or a mapping; their values are pooled in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    SumsTo {
        fields: Vec<String>,
        target: f64,
        tolerance: ToleranceSpec,
    },
    MonotoneCumulative {
        field: String,
        tolerance: ToleranceSpec,
    },
    UnitInterval {
        fields: Vec<String>,
    },
    WithinBand {
        field: String,
        lo: f64,
        hi: f64,
    },
    /// Every number in `field` (scalar, series or mapping) is `> 0`.
    Positive {
        field: String,
    },
    /// Every number in `field` is `>= 0`.
    NonNegative {
        field: String,
    },
    /// `field` holds class volumes (or shares) keyed `A`, `B`, `C`, or three
    /// values in that order; they are normalised by their total.
    AbcBands {
        field: String,
        #[serde(default)]
        bands: AbcBands,
    },
    /// `field` maps classes to one policy attribute; each listed class must
    /// fall inside its band.
    PolicyBands {
        field: String,
        bands: BTreeMap<String, Band>,
    },
    /// `field` equals the sum of `parts`, e.g. reorder point against lead
    /// time demand plus safety stock.
    SumOfFields {
        field: String,
        parts: Vec<String>,
        tolerance: ToleranceSpec,
    },
    /// Mapping fields keyed by the same entities, with no negative amounts.
    MatchingKeys {
        fields: Vec<String>,
    },
    SmoothTrend {
        field: String,
        max_curvature: f64,
    },
    /// `original` names a problem parameter; the components are answer fields.
    Reconstruction {
        original: String,
        trend: String,
        seasonal: String,
        residual: String,
        tolerance: ToleranceSpec,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum PlannedCheck {
    Answer {
        name: String,
        expected: f64,
        tolerance: ToleranceSpec,
    },
    Field {
        field: String,
        expected: ExpectedValue,
        tolerance: ToleranceSpec,
    },
    Series {
        field: String,
        expected: Vec<f64>,
        tolerance: ToleranceSpec,
        warm_up: usize,
    },
    Periodic {
        field: String,
        period: usize,
        tolerance: ToleranceSpec,
    },
    Rule {
        name: String,
        rule: RuleSpec,
        original: Vec<f64>,
    },
    Flag {
        field: String,
        expected: bool,
    },
    Labels {
        field: String,
        expected: Vec<String>,
    },
    Conclusion {
        field: String,
        sample: Vec<f64>,
        kind: AssumptionKind,
    },
    Assumption {
        field: String,
        kind: AssumptionKind,
    },
    Residuals {
        fitted: Option<String>,
        residuals: String,
    },
    Model {
        schema: ModelSchema,
        tolerance: ToleranceSpec,
    },
}

/// Every reference value of an exercise, computed once. Grading only reads
/// the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ExercisePlan {
    checks: Vec<PlannedCheck>,
    assumptions: AssumptionConfig,
}

fn select_component(
    value: ExpectedValue,
    select: Option<&str>,
) -> Result<ExpectedValue, OracleError> {
    match (value, select) {
        (value, None) => Ok(value),
        (ExpectedValue::Mapping(mut components), Some(key)) => components
            .remove(key)
            .map(ExpectedValue::Scalar)
            .ok_or_else(|| {
                OracleError::invalid("select", format!("quantity has no component `{key}`"))
            }),
        (value, Some(key)) => Err(OracleError::invalid(
            "select",
            format!("cannot select `{key}` from a {} quantity", value.shape()),
        )),
    }
}

fn resolve(spec: CheckSpec, problem: &ProblemInstance) -> Result<PlannedCheck, OracleError> {
    let planned = match spec {
        CheckSpec::Answer {
            quantity,
            select,
            tolerance,
        } => {
            let value = select_component(quantity.evaluate(problem)?, select.as_deref())?;
            let ExpectedValue::Scalar(expected) = value else {
                return Err(OracleError::invalid(
                    "select",
                    format!("a scalar answer needs a scalar reference, got {}", value.shape()),
                ));
            };
            PlannedCheck::Answer {
                name: select.unwrap_or_else(|| "answer".to_string()),
                expected,
                tolerance,
            }
        }
        CheckSpec::Field {
            field,
            quantity,
            select,
            tolerance,
        } => PlannedCheck::Field {
            expected: select_component(quantity.evaluate(problem)?, select.as_deref())?,
            field,
            tolerance,
        },
        CheckSpec::Series {
            field,
            quantity,
            tolerance,
            warm_up,
        } => {
            let ExpectedValue::Series(expected) = quantity.evaluate(problem)? else {
                return Err(OracleError::invalid(
                    field,
                    "series check needs a series-valued quantity",
                ));
            };
            let warm_up =
                warm_up.unwrap_or_else(|| expected.iter().take_while(|v| v.is_nan()).count());
            PlannedCheck::Series {
                field,
                expected,
                tolerance,
                warm_up,
            }
        }
        CheckSpec::Periodic {
            field,
            period,
            tolerance,
        } => PlannedCheck::Periodic {
            field,
            period,
            tolerance,
        },
        CheckSpec::Rule { name, rule } => {
            let original = match &rule {
                RuleSpec::Reconstruction { original, .. } => problem.array(original)?.to_vec(),
                _ => Vec::new(),
            };
            PlannedCheck::Rule {
                name,
                rule,
                original,
            }
        }
        CheckSpec::Flag { field, expected } => PlannedCheck::Flag { field, expected },
        CheckSpec::Labels { field, expected } => PlannedCheck::Labels { field, expected },
        CheckSpec::Conclusion {
            field,
            sample,
            kind,
        } => PlannedCheck::Conclusion {
            field,
            sample: problem.array(&sample)?.to_vec(),
            kind,
        },
        CheckSpec::Assumption { field, kind } => PlannedCheck::Assumption { field, kind },
        CheckSpec::Residuals { fitted, residuals } => PlannedCheck::Residuals { fitted, residuals },
        CheckSpec::Model { schema, tolerance } => PlannedCheck::Model { schema, tolerance },
    };
    Ok(planned)
}

impl ExercisePlan {
    /// Resolves every quantity against `problem`. A malformed problem is
    /// reported here, before any answer is seen.
    pub fn build(problem: &ProblemInstance, specs: Vec<CheckSpec>) -> Result<Self, OracleError> {
        let checks = specs
            .into_iter()
            .map(|spec| resolve(spec, problem))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(checks = checks.len(), "exercise plan built");
        Ok(Self {
            checks,
            assumptions: AssumptionConfig::default(),
        })
    }

    #[must_use]
    pub fn with_assumptions(mut self, config: AssumptionConfig) -> Self {
        self.assumptions = config;
        self
    }

    #[must_use]
    pub fn assumptions(&self) -> &AssumptionConfig {
        &self.assumptions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Never fails: a wrong, missing or mis-shaped answer becomes a failed
    /// check, an unavailable model a skipped one.
    #[must_use]
    pub fn grade(&self, answer: &SubmittedAnswer) -> VerificationReport {
        self.grade_submission(Submission::from(answer))
    }

    /// Grades a live solver result without copying it into a snapshot.
    #[must_use]
    pub fn grade_model(&self, model: Option<&dyn SolvedModel>) -> VerificationReport {
        self.grade_submission(Submission::Model(model))
    }

    fn grade_submission(&self, submission: Submission<'_>) -> VerificationReport {
        let mut report = VerificationReport::new();
        for planned in &self.checks {
            let before = report.checks().len();
            planned.grade(submission, &self.assumptions, &mut report);
            for check in &report.checks()[before..] {
                debug!(check = %check.name, outcome = check.outcome.as_str(), "graded check");
            }
        }
        report
    }
}

fn mapping_of<'a>(
    name: &str,
    submission: Submission<'a>,
) -> Result<&'a AnswerMap, VerificationCheck> {
    match submission {
        Submission::Mapping(answer) => Ok(answer),
        other => Err(VerificationCheck::failed(
            name,
            format!("expected a mapping answer, got {}", other.shape()),
        )),
    }
}

/// Numbers in `field` labelled for failure reasons: `eoq`, `ma[3]`,
/// `safety_stocks.P1`.
fn entries(answer: &AnswerMap, field: &str) -> Result<Vec<(String, f64)>, String> {
    match answer.get(field) {
        None => Err(format!("missing field: {field}")),
        Some(AnswerValue::Scalar(value)) => Ok(vec![(field.to_string(), *value)]),
        Some(AnswerValue::Series(values)) => Ok(values
            .iter()
            .enumerate()
            .map(|(index, value)| (format!("{field}[{index}]"), *value))
            .collect()),
        Some(AnswerValue::Mapping(values)) => Ok(values
            .iter()
            .map(|(key, value)| (format!("{field}.{key}"), *value))
            .collect()),
        Some(other) => Err(format!(
            "unexpected shape for {field}: expected numbers, got {}",
            other.shape()
        )),
    }
}

fn numbers(answer: &AnswerMap, field: &str) -> Result<Vec<f64>, String> {
    entries(answer, field).map(|labelled| labelled.into_iter().map(|(_, value)| value).collect())
}

fn table<'a>(answer: &'a AnswerMap, field: &str) -> Result<&'a BTreeMap<String, f64>, String> {
    match answer.get(field) {
        None => Err(format!("missing field: {field}")),
        Some(AnswerValue::Mapping(values)) => Ok(values),
        Some(other) => Err(format!(
            "unexpected shape for {field}: expected mapping, got {}",
            other.shape()
        )),
    }
}

fn pooled(answer: &AnswerMap, fields: &[String]) -> Result<Vec<f64>, String> {
    let mut out = Vec::new();
    for field in fields {
        out.extend(numbers(answer, field)?);
    }
    Ok(out)
}

fn single(answer: &AnswerMap, field: &str) -> Result<f64, String> {
    match answer.get(field) {
        None => Err(format!("missing field: {field}")),
        Some(AnswerValue::Scalar(value)) => Ok(*value),
        Some(other) => Err(format!(
            "unexpected shape for {field}: expected scalar, got {}",
            other.shape()
        )),
    }
}

fn abc_volumes(answer: &AnswerMap, field: &str) -> Result<[f64; 3], String> {
    match answer.get(field) {
        None => Err(format!("missing field: {field}")),
        Some(AnswerValue::Mapping(volumes)) => {
            let share = |class: &str| {
                volumes
                    .get(class)
                    .copied()
                    .ok_or_else(|| format!("missing field: {field}.{class}"))
            };
            Ok([share("A")?, share("B")?, share("C")?])
        }
        Some(AnswerValue::Series(values)) => match values.as_slice() {
            [a, b, c] => Ok([*a, *b, *c]),
            _ => Err(format!(
                "length mismatch for {field}: got {}, expected 3",
                values.len()
            )),
        },
        Some(other) => Err(format!(
            "unexpected shape for {field}: expected class volumes, got {}",
            other.shape()
        )),
    }
}

fn or_failed(name: &str, result: Result<VerificationCheck, String>) -> VerificationCheck {
    result.unwrap_or_else(|reason| VerificationCheck::failed(name, reason))
}

fn grade_rule(name: &str, rule: &RuleSpec, original: &[f64], answer: &AnswerMap) -> VerificationCheck {
    let result = match rule {
        RuleSpec::SumsTo {
            fields,
            target,
            tolerance,
        } => pooled(answer, fields).map(|values| check_sums_to(name, &values, *target, tolerance)),
        RuleSpec::MonotoneCumulative { field, tolerance } => numbers(answer, field)
            .map(|values| check_monotone_cumulative(name, &values, tolerance)),
        RuleSpec::UnitInterval { fields } => {
            pooled(answer, fields).map(|values| check_unit_interval(name, &values))
        }
        RuleSpec::WithinBand { field, lo, hi } => {
            single(answer, field).map(|value| check_within_band(name, value, *lo, *hi))
        }
        RuleSpec::Positive { field } => {
            entries(answer, field).map(|labelled| check_positive(name, &labelled))
        }
        RuleSpec::NonNegative { field } => {
            entries(answer, field).map(|labelled| check_non_negative(name, &labelled))
        }
        RuleSpec::AbcBands { field, bands } => {
            abc_volumes(answer, field).map(|volumes| check_abc_volumes(name, volumes, bands))
        }
        RuleSpec::PolicyBands { field, bands } => {
            table(answer, field).map(|values| check_policy_bands(name, values, bands))
        }
        RuleSpec::SumOfFields {
            field,
            parts,
            tolerance,
        } => single(answer, field).and_then(|total| {
            let parts = pooled(answer, parts)?;
            Ok(check_sums_to(name, &parts, total, tolerance))
        }),
        RuleSpec::MatchingKeys { fields } => fields
            .iter()
            .map(|field| table(answer, field).map(|values| (field.as_str(), values)))
            .collect::<Result<Vec<_>, _>>()
            .map(|mappings| check_matching_keys(name, &mappings)),
        RuleSpec::SmoothTrend {
            field,
            max_curvature,
        } => series(answer, field).map(|trend| check_smooth_trend(name, trend, *max_curvature)),
        RuleSpec::Reconstruction {
            trend,
            seasonal,
            residual,
            tolerance,
            ..
        } => numbers(answer, trend).and_then(|trend| {
            let seasonal = numbers(answer, seasonal)?;
            let residual = numbers(answer, residual)?;
            Ok(check_reconstruction(
                name, original, &trend, &seasonal, &residual, tolerance,
            ))
        }),
    };
    or_failed(name, result)
}

impl PlannedCheck {
    fn name(&self) -> String {
        match self {
            Self::Answer { name, .. } | Self::Rule { name, .. } => name.clone(),
            Self::Field { field, .. }
            | Self::Series { field, .. }
            | Self::Flag { field, .. }
            | Self::Labels { field, .. }
            | Self::Conclusion { field, .. } => field.clone(),
            Self::Periodic { field, .. } => format!("{field}.periodic"),
            Self::Assumption { field, kind } => format!("{field}.{}", kind.check_name()),
            Self::Residuals { residuals, .. } => residuals.clone(),
            Self::Model { .. } => "model".to_string(),
        }
    }

    fn grade(
        &self,
        submission: Submission<'_>,
        assumptions: &AssumptionConfig,
        report: &mut VerificationReport,
    ) {
        match self {
            Self::Answer {
                name,
                expected,
                tolerance,
            } => report.push(match submission {
                Submission::Scalar(actual) => compare_scalar(name.clone(), actual, *expected, tolerance),
                other => VerificationCheck::failed(
                    name.clone(),
                    format!("expected a scalar answer, got {}", other.shape()),
                ),
            }),
            Self::Model { schema, tolerance } => match submission {
                Submission::Model(model) => {
                    let inspected = inspect(model, schema, tolerance);
                    let unavailable = inspected.not_attempted();
                    report.extend(inspected.checks().iter().cloned());
                    if unavailable {
                        report.mark_not_attempted();
                    }
                }
                other => report.push(VerificationCheck::failed(
                    "model",
                    format!("expected a model answer, got {}", other.shape()),
                )),
            },
            _ => {
                let name = self.name();
                match mapping_of(&name, submission) {
                    Ok(answer) => self.grade_mapping(name, answer, assumptions, report),
                    Err(check) => report.push(check),
                }
            }
        }
    }

    fn grade_mapping(
        &self,
        name: String,
        answer: &AnswerMap,
        assumptions: &AssumptionConfig,
        report: &mut VerificationReport,
    ) {
        let check = match self {
            Self::Field {
                field,
                expected,
                tolerance,
            } => compare_field(name, answer, field, expected, tolerance),
            Self::Series {
                field,
                expected,
                tolerance,
                warm_up,
            } => or_failed(
                &name,
                series(answer, field)
                    .map(|actual| compare_series(name.clone(), actual, expected, tolerance, *warm_up)),
            ),
            Self::Periodic {
                field,
                period,
                tolerance,
            } => or_failed(
                &name,
                series(answer, field)
                    .map(|actual| check_periodic(name.clone(), actual, *period, tolerance)),
            ),
            Self::Rule {
                rule, original, ..
            } => grade_rule(&name, rule, original, answer),
            Self::Flag { field, expected } => compare_flag(name, answer, field, *expected),
            Self::Labels { field, expected } => compare_labels(name, answer, field, expected),
            Self::Conclusion {
                field,
                sample,
                kind,
            } => {
                let verdict = kind.run(sample, assumptions);
                compare_flag(name, answer, field, verdict.outcome == CheckOutcome::Passed)
            }
            Self::Assumption { field, kind } => match series(answer, field) {
                Ok(sample) => {
                    let mut check = kind.run(sample, assumptions);
                    check.name = name;
                    check
                }
                Err(reason) => VerificationCheck::failed(name, reason),
            },
            Self::Residuals { fitted, residuals } => {
                let bundle = series(answer, residuals).and_then(|resid| match fitted {
                    Some(fitted) => series(answer, fitted)
                        .map(|fitted| validate_regression_residuals(fitted, resid, assumptions)),
                    None => Ok(validate_white_noise_residuals(resid, assumptions)),
                });
                match bundle {
                    Ok(checks) => {
                        report.extend(checks.into_iter().map(|mut check| {
                            check.name = format!("{name}.{}", check.name);
                            check
                        }));
                        return;
                    }
                    Err(reason) => VerificationCheck::failed(name, reason),
                }
            }
            Self::Answer { .. } | Self::Model { .. } => return,
        };
        report.push(check);
    }
}

fn series<'a>(answer: &'a AnswerMap, field: &str) -> Result<&'a [f64], String> {
    match answer.get(field) {
        None => Err(format!("missing field: {field}")),
        Some(AnswerValue::Series(values)) => Ok(values),
        Some(other) => Err(format!(
            "unexpected shape for {field}: expected series, got {}",
            other.shape()
        )),
    }
}
