#![forbid(unsafe_code)]

//! Model structural inspector.
//!
//! A solver backend exposes its result through [`SolvedModel`]; the inspector
//! compares that read-only view against a [`ModelSchema`] compiled once per
//! exercise. [`ModelSnapshot`] is an owned, serde-loadable model any backend
//! (or a JSON fixture) can populate.

pub mod inspect;
pub mod schema;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use inspect::{
    MODEL_UNAVAILABLE, inspect, verify_balance_constraints, verify_constraint_counts,
    verify_constraint_satisfaction, verify_feasibility, verify_integrality, verify_objective,
    verify_variable_schema,
};
pub use schema::{
    ConstraintFamily, FlowBalance, FlowSide, ModelSchema, NamePattern, ObjectiveSpec, TermRef,
    VariableGroup,
};

pub const MODEL_REASON_CODES: [&str; 3] = [
    "model_invalid_pattern",
    "model_duplicate_group",
    "model_unknown_group",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid name pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("variable group `{0}` is declared more than once")]
    DuplicateGroup(String),
    #[error("objective refers to undeclared variable group `{0}`")]
    UnknownGroup(String),
}

impl ModelError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidPattern { .. } => "model_invalid_pattern",
            Self::DuplicateGroup(_) => "model_duplicate_group",
            Self::UnknownGroup(_) => "model_unknown_group",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Optimal,
    Infeasible,
    Unbounded,
    NotSolved,
}

impl Status {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::NotSolved => "not_solved",
        }
    }

    #[must_use]
    pub fn is_feasible(self) -> bool {
        self == Self::Optimal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Binary,
    Integer,
    Continuous,
}

impl Domain {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Integer => "integer",
            Self::Continuous => "continuous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    Min,
    Max,
}

impl Sense {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Relation between a constraint's left- and right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

impl Relation {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub domain: Domain,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,
    /// Absent until the model has been solved.
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub tag: String,
    pub relation: Relation,
    pub lhs_value: f64,
    pub rhs_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub sense: Sense,
    /// Coefficient per variable name.
    #[serde(default)]
    pub terms: BTreeMap<String, f64>,
}

/// Read-only view of a model after a solve attempt.
pub trait SolvedModel {
    fn status(&self) -> Status;
    fn variables(&self) -> &[Variable];
    fn constraints(&self) -> &[Constraint];
    fn objective(&self) -> &Objective;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub status: Status,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    pub objective: Objective,
}

impl SolvedModel for ModelSnapshot {
    fn status(&self) -> Status {
        self.status
    }

    fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    fn objective(&self) -> &Objective {
        &self.objective
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Domain, MODEL_REASON_CODES, ModelError, ModelSnapshot, Relation, SolvedModel, Status,
    };

    #[test]
    fn reason_codes_are_registered() {
        for err in [
            ModelError::InvalidPattern {
                pattern: "x[".into(),
                reason: "unclosed class".into(),
            },
            ModelError::DuplicateGroup("production".into()),
            ModelError::UnknownGroup("shipping".into()),
        ] {
            assert!(MODEL_REASON_CODES.contains(&err.reason_code()));
        }
    }

    #[test]
    fn snapshot_loads_from_json() {
        let snapshot: ModelSnapshot = serde_json::from_str(
            r#"{
                "status": "optimal",
                "variables": [
                    {"name": "use_T2", "domain": "binary", "lower_bound": 0, "upper_bound": 1, "value": 1},
                    {"name": "x_T1_WH1", "domain": "integer", "lower_bound": 0}
                ],
                "constraints": [
                    {"name": "Demand_WH1", "tag": "Demand", "relation": "ge", "lhs_value": 6000, "rhs_value": 6000}
                ],
                "objective": {"sense": "max", "terms": {"x_T1_WH1": 12.5, "use_T2": -3000}}
            }"#,
        )
        .expect("snapshot json");

        let model: &dyn SolvedModel = &snapshot;
        assert_eq!(model.status(), Status::Optimal);
        assert!(model.status().is_feasible());
        assert_eq!(model.variables()[0].domain, Domain::Binary);
        assert_eq!(model.variables()[1].value, None);
        assert_eq!(model.constraints()[0].relation, Relation::Ge);
        assert_eq!(model.objective().terms["use_T2"], -3000.0);
        assert_eq!(Status::NotSolved.as_str(), "not_solved");
    }
}
