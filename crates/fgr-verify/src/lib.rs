#![forbid(unsafe_code)]

//! Verification result aggregator.
//!
//! An [`ExercisePlan`] is built once per exercise: every reference value is
//! computed from the [`ProblemInstance`](fgr_oracle::ProblemInstance) up
//! front, so a malformed problem fails at build time. Grading then runs the
//! planned comparator, assumption and model checks against a
//! [`SubmittedAnswer`] in declaration order and never fails itself.

pub mod plan;
pub mod quantity;

use fgr_compare::AnswerMap;
use fgr_model::{ModelSnapshot, SolvedModel};
use fgr_report::VerificationReport;
use serde::{Deserialize, Serialize};

pub use plan::{CheckSpec, ExercisePlan, RuleSpec};
pub use quantity::{Formula, Quantity};

/// One learner attempt. `Model(None)` stands for a model that could not be
/// built or handed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SubmittedAnswer {
    Scalar(f64),
    Mapping(AnswerMap),
    Model(Option<ModelSnapshot>),
}

impl SubmittedAnswer {
    #[must_use]
    pub fn shape(&self) -> &'static str {
        Submission::from(self).shape()
    }
}

/// Borrowed view of an attempt; lets a live [`SolvedModel`] be graded
/// without a snapshot.
#[derive(Clone, Copy)]
pub(crate) enum Submission<'a> {
    Scalar(f64),
    Mapping(&'a AnswerMap),
    Model(Option<&'a dyn SolvedModel>),
}

impl Submission<'_> {
    fn shape(self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Mapping(_) => "mapping",
            Self::Model(_) => "model",
        }
    }
}

impl<'a> From<&'a SubmittedAnswer> for Submission<'a> {
    fn from(answer: &'a SubmittedAnswer) -> Self {
        match answer {
            SubmittedAnswer::Scalar(value) => Self::Scalar(*value),
            SubmittedAnswer::Mapping(map) => Self::Mapping(map),
            SubmittedAnswer::Model(model) => {
                Self::Model(model.as_ref().map(|snapshot| snapshot as &dyn SolvedModel))
            }
        }
    }
}

/// Grades each attempt independently; one report per answer, in order.
#[must_use]
pub fn grade_batch(plan: &ExercisePlan, answers: &[SubmittedAnswer]) -> Vec<VerificationReport> {
    answers.iter().map(|answer| plan.grade(answer)).collect()
}

#[cfg(test)]
mod tests {
    use super::{CheckSpec, ExercisePlan, Formula, SubmittedAnswer, grade_batch};
    use fgr_compare::ToleranceSpec;
    use fgr_model::{MODEL_UNAVAILABLE, ModelSchema, ModelSnapshot};
    use fgr_oracle::ProblemInstance;
    use fgr_report::CheckOutcome;

    fn schema() -> ModelSchema {
        serde_json::from_str(
            r#"{
                "groups": [
                    {"name": "production", "name_pattern": "x_*", "domain": "integer", "lower_bound": 0, "expected_count": 2}
                ],
                "families": [{"tag": "Demand", "expected_count": 1, "relation": "ge"}],
                "objective": {"sense": "min", "required_terms": [{"group": "production"}]},
                "balances": [{"name": "WH1", "inflow": {"pattern": "x_*"}, "outflow": {"constant": 100}}]
            }"#,
        )
        .expect("schema json")
    }

    fn model_plan() -> ExercisePlan {
        ExercisePlan::build(
            &ProblemInstance::default(),
            vec![CheckSpec::Model {
                schema: schema(),
                tolerance: ToleranceSpec::absolute(1e-6).expect("tolerance"),
            }],
        )
        .expect("plan")
    }

    fn solved() -> ModelSnapshot {
        serde_json::from_str(
            r#"{
                "status": "optimal",
                "variables": [
                    {"name": "x_A", "domain": "integer", "lower_bound": 0, "value": 60},
                    {"name": "x_B", "domain": "integer", "lower_bound": 0, "value": 40}
                ],
                "constraints": [
                    {"name": "Demand_WH1", "tag": "Demand", "relation": "ge", "lhs_value": 100, "rhs_value": 100}
                ],
                "objective": {"sense": "min", "terms": {"x_A": 3, "x_B": 4}}
            }"#,
        )
        .expect("model json")
    }

    #[test]
    fn unavailable_model_is_not_attempted() {
        let report = model_plan().grade(&SubmittedAnswer::Model(None));
        assert!(report.not_attempted());
        assert!(report.all_passed());
        assert!(report.checks().iter().all(|check| {
            check.outcome == CheckOutcome::Skipped && check.reason() == Some(MODEL_UNAVAILABLE)
        }));
    }

    #[test]
    fn solved_model_passes_every_stage() {
        let plan = model_plan();
        let report = plan.grade(&SubmittedAnswer::Model(Some(solved())));
        assert!(report.all_passed(), "{:?}", report.failures().collect::<Vec<_>>());
        assert!(!report.not_attempted());
        assert!(report.find("feasibility").is_some());

        let snapshot = solved();
        let live = plan.grade_model(Some(&snapshot));
        assert_eq!(live, report);
    }

    #[test]
    fn model_check_rejects_non_model_answers() {
        let report = model_plan().grade(&SubmittedAnswer::Scalar(1.0));
        assert_eq!(report.checks().len(), 1);
        assert_eq!(
            report.checks()[0].reason(),
            Some("expected a model answer, got scalar")
        );
        assert!(!report.not_attempted());
    }

    #[test]
    fn batch_grades_each_answer_independently() {
        let problem = ProblemInstance::builder()
            .scalar("units", 90.0)
            .scalar("mean", 75.0)
            .scalar("std", 25.0)
            .build();
        let plan = ExercisePlan::build(
            &problem,
            vec![CheckSpec::Answer {
                quantity: Formula::AchievedServiceLevel.into(),
                select: None,
                tolerance: ToleranceSpec::absolute(0.001).expect("tolerance"),
            }],
        )
        .expect("plan");

        let answers: Vec<SubmittedAnswer> = serde_json::from_str(
            r#"[
                {"kind": "scalar", "value": 0.7257},
                {"kind": "mapping", "value": {"service_level": 0.7257}},
                {"kind": "model", "value": null},
                {"kind": "scalar", "value": 0.5}
            ]"#,
        )
        .expect("answers json");
        let reports = grade_batch(&plan, &answers);
        let passed: Vec<bool> = reports.iter().map(|report| report.all_passed()).collect();
        assert_eq!(passed, [true, false, false, false]);
        assert_eq!(
            reports[2].checks()[0].reason(),
            Some("expected a scalar answer, got model")
        );
        assert_eq!(answers[1].shape(), "mapping");
    }
}
