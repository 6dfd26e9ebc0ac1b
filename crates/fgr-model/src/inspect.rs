//! Inspection stages. Each stage yields one check per schema item and only
//! ever skips itself; [`inspect`] runs them all in order.

use crate::schema::{FlowSide, ModelSchema, TermRef, VariableGroup};
use crate::{Domain, Relation, SolvedModel, Status, Variable};
use fgr_compare::{ToleranceSpec, compare, compare_scalar};
use fgr_report::{VerificationCheck, VerificationReport};

pub const MODEL_UNAVAILABLE: &str = "model unavailable";

fn group_check(group: &VariableGroup) -> String {
    format!("variables.{}", group.name)
}

fn family_check(tag: &str) -> String {
    format!("constraints.{tag}")
}

fn term_check(term: &TermRef) -> String {
    format!("objective.term.{}", term.label())
}

fn balance_check(name: &str) -> String {
    format!("balance.{name}")
}

fn integrality_check(group: &VariableGroup) -> String {
    format!("integrality.{}", group.name)
}

const OBJECTIVE_SENSE: &str = "objective.sense";
const FEASIBILITY: &str = "feasibility";
const CONSTRAINT_SATISFACTION: &str = "constraint_satisfaction";

fn is_discrete(group: &VariableGroup) -> bool {
    matches!(group.domain, Domain::Binary | Domain::Integer)
}

/// Every check name [`inspect`] produces for `schema`, in order.
fn planned_checks(schema: &ModelSchema) -> Vec<String> {
    let mut names: Vec<String> = schema.groups().iter().map(group_check).collect();
    names.extend(schema.families().iter().map(|family| family_check(&family.tag)));
    if let Some(objective) = schema.objective() {
        names.push(OBJECTIVE_SENSE.to_string());
        names.extend(objective.required_terms.iter().map(term_check));
    }
    names.push(FEASIBILITY.to_string());
    names.extend(schema.balances().iter().map(|balance| balance_check(&balance.name)));
    names.extend(
        schema
            .groups()
            .iter()
            .filter(|group| is_discrete(group))
            .map(integrality_check),
    );
    names.push(CONSTRAINT_SATISFACTION.to_string());
    names
}

fn describe_bound(bound: Option<f64>) -> String {
    bound.map_or_else(|| "none".to_string(), |value| value.to_string())
}

fn first_group_mismatch(group: &VariableGroup, matched: &[&Variable]) -> Option<String> {
    if matched.len() != group.expected_count {
        return Some(format!(
            "group {}: expected {} variables matching `{}`, found {}",
            group.name,
            group.expected_count,
            group.name_pattern.as_str(),
            matched.len()
        ));
    }
    for variable in matched {
        if variable.domain != group.domain {
            return Some(format!(
                "group {}: {} is {}, expected {}",
                group.name,
                variable.name,
                variable.domain.as_str(),
                group.domain.as_str()
            ));
        }
        for (side, expected, actual) in [
            ("lower", group.lower_bound, variable.lower_bound),
            ("upper", group.upper_bound, variable.upper_bound),
        ] {
            if expected.is_some() && actual != expected {
                return Some(format!(
                    "group {}: {} has {side} bound {}, expected {}",
                    group.name,
                    variable.name,
                    describe_bound(actual),
                    describe_bound(expected)
                ));
            }
        }
    }
    None
}

/// Count, domain and declared bounds of each variable group.
pub fn verify_variable_schema(
    model: &dyn SolvedModel,
    schema: &ModelSchema,
) -> Vec<VerificationCheck> {
    schema
        .groups()
        .iter()
        .map(|group| {
            let matched: Vec<&Variable> = group.name_pattern.select(model.variables()).collect();
            match first_group_mismatch(group, &matched) {
                Some(reason) => VerificationCheck::failed(group_check(group), reason),
                None => VerificationCheck::judged(
                    group_check(group),
                    true,
                    format!("{} variables", matched.len()),
                ),
            }
        })
        .collect()
}

pub fn verify_constraint_counts(
    model: &dyn SolvedModel,
    schema: &ModelSchema,
) -> Vec<VerificationCheck> {
    schema
        .families()
        .iter()
        .map(|family| {
            let name = family_check(&family.tag);
            let tagged: Vec<_> = model
                .constraints()
                .iter()
                .filter(|constraint| constraint.tag == family.tag)
                .collect();
            if tagged.len() != family.expected_count {
                return VerificationCheck::failed(
                    name,
                    format!(
                        "family {}: expected {} constraints, found {}",
                        family.tag,
                        family.expected_count,
                        tagged.len()
                    ),
                );
            }
            if let Some(relation) = family.relation {
                if let Some(odd) = tagged.iter().find(|constraint| constraint.relation != relation) {
                    return VerificationCheck::failed(
                        name,
                        format!(
                            "family {}: {} uses {}, expected {}",
                            family.tag,
                            odd.name,
                            odd.relation.symbol(),
                            relation.symbol()
                        ),
                    );
                }
            }
            VerificationCheck::judged(name, true, format!("{} constraints", tagged.len()))
        })
        .collect()
}

fn has_term(model: &dyn SolvedModel, variable: &str) -> bool {
    model
        .objective()
        .terms
        .get(variable)
        .is_some_and(|coefficient| coefficient.is_finite() && *coefficient != 0.0)
}

/// Objective sense, then one check per required term.
pub fn verify_objective(model: &dyn SolvedModel, schema: &ModelSchema) -> Vec<VerificationCheck> {
    let Some(spec) = schema.objective() else {
        return Vec::new();
    };
    let mut checks = Vec::with_capacity(spec.required_terms.len() + 1);
    let sense = model.objective().sense;
    checks.push(VerificationCheck::judged(
        OBJECTIVE_SENSE,
        sense == spec.sense,
        format!(
            "objective sense is {}, expected {}",
            sense.as_str(),
            spec.sense.as_str()
        ),
    ));

    for term in &spec.required_terms {
        let name = term_check(term);
        let check = match term {
            TermRef::Variable(variable) => VerificationCheck::judged(
                name,
                has_term(model, variable),
                format!("objective term {variable}"),
            ),
            TermRef::Group(group_name) => match schema.group(group_name) {
                None => VerificationCheck::failed(name, format!("unknown group {group_name}")),
                Some(group) => {
                    let matched: Vec<&Variable> =
                        group.name_pattern.select(model.variables()).collect();
                    if matched.is_empty() {
                        VerificationCheck::failed(
                            name,
                            format!("group {group_name} matches no variables"),
                        )
                    } else if let Some(absent) =
                        matched.iter().find(|variable| !has_term(model, &variable.name))
                    {
                        VerificationCheck::failed(
                            name,
                            format!(
                                "objective is missing {} from group {group_name}",
                                absent.name
                            ),
                        )
                    } else {
                        VerificationCheck::judged(
                            name,
                            true,
                            format!("{} terms from group {group_name}", matched.len()),
                        )
                    }
                }
            },
        };
        checks.push(check);
    }
    checks
}

/// Optimal passes; infeasible and unbounded fail; an unsolved model is skipped.
#[must_use]
pub fn verify_feasibility(model: &dyn SolvedModel) -> VerificationCheck {
    match model.status() {
        Status::Optimal => VerificationCheck::passed(FEASIBILITY),
        status @ (Status::Infeasible | Status::Unbounded) => {
            VerificationCheck::failed(FEASIBILITY, status.as_str())
        }
        Status::NotSolved => VerificationCheck::skipped(FEASIBILITY, "model was not solved"),
    }
}

fn not_feasible(status: Status) -> String {
    format!("model is {}", status.as_str())
}

fn side_total(model: &dyn SolvedModel, side: &FlowSide) -> Result<f64, String> {
    match side {
        FlowSide::Constant(value) => Ok(*value),
        FlowSide::Pattern(pattern) => {
            let mut total = 0.0;
            let mut matched = 0_usize;
            for variable in pattern.select(model.variables()) {
                let Some(value) = variable.value else {
                    return Err(format!("variable {} has no value", variable.name));
                };
                total += value;
                matched += 1;
            }
            if matched == 0 {
                return Err(format!("pattern `{}` matches no variables", pattern.as_str()));
            }
            Ok(total)
        }
    }
}

/// Flow conservation `|inflow - outflow| <= tolerance` for each declared pair.
pub fn verify_balance_constraints(
    model: &dyn SolvedModel,
    schema: &ModelSchema,
    tolerance: &ToleranceSpec,
) -> Vec<VerificationCheck> {
    let status = model.status();
    schema
        .balances()
        .iter()
        .map(|balance| {
            let name = balance_check(&balance.name);
            if !status.is_feasible() {
                return VerificationCheck::skipped(name, not_feasible(status));
            }
            match (
                side_total(model, &balance.inflow),
                side_total(model, &balance.outflow),
            ) {
                (Ok(inflow), Ok(outflow)) => compare_scalar(name, inflow, outflow, tolerance),
                (Err(reason), _) | (_, Err(reason)) => VerificationCheck::failed(name, reason),
            }
        })
        .collect()
}

/// Binary and integer groups take integral solution values.
pub fn verify_integrality(
    model: &dyn SolvedModel,
    schema: &ModelSchema,
    tolerance: &ToleranceSpec,
) -> Vec<VerificationCheck> {
    let status = model.status();
    schema
        .groups()
        .iter()
        .filter(|group| is_discrete(group))
        .map(|group| {
            let name = integrality_check(group);
            if !status.is_feasible() {
                return VerificationCheck::skipped(name, not_feasible(status));
            }
            let mut count = 0_usize;
            for variable in group.name_pattern.select(model.variables()) {
                let Some(value) = variable.value else {
                    return VerificationCheck::failed(
                        name,
                        format!("variable {} has no value", variable.name),
                    );
                };
                let nearest = value.round();
                let admissible = compare(value, nearest, tolerance)
                    && (group.domain != Domain::Binary || nearest == 0.0 || nearest == 1.0);
                if !admissible {
                    return VerificationCheck::failed(
                        name,
                        format!(
                            "{} = {value} violates the {} domain",
                            variable.name,
                            group.domain.as_str()
                        ),
                    );
                }
                count += 1;
            }
            VerificationCheck::judged(name, true, format!("{count} values integral"))
        })
        .collect()
}

/// Every constraint's `lhs relation rhs` holds within tolerance.
#[must_use]
pub fn verify_constraint_satisfaction(
    model: &dyn SolvedModel,
    tolerance: &ToleranceSpec,
) -> VerificationCheck {
    let status = model.status();
    if !status.is_feasible() {
        return VerificationCheck::skipped(CONSTRAINT_SATISFACTION, not_feasible(status));
    }
    let constraints = model.constraints();
    for constraint in constraints {
        let (lhs, rhs) = (constraint.lhs_value, constraint.rhs_value);
        let slack = tolerance.threshold(rhs);
        let holds = match constraint.relation {
            Relation::Le => lhs <= rhs + slack,
            Relation::Ge => lhs >= rhs - slack,
            Relation::Eq => compare(lhs, rhs, tolerance),
        };
        if !holds {
            return VerificationCheck::failed(
                CONSTRAINT_SATISFACTION,
                format!(
                    "{}: {lhs} {} {rhs} does not hold",
                    constraint.name,
                    constraint.relation.symbol()
                ),
            );
        }
    }
    VerificationCheck::judged(
        CONSTRAINT_SATISFACTION,
        true,
        format!("{} constraints hold", constraints.len()),
    )
}

/// All stages in order. A missing model skips every check and marks the
/// report not attempted.
#[must_use]
pub fn inspect(
    model: Option<&dyn SolvedModel>,
    schema: &ModelSchema,
    tolerance: &ToleranceSpec,
) -> VerificationReport {
    let Some(model) = model else {
        let mut report: VerificationReport = planned_checks(schema)
            .into_iter()
            .map(|name| VerificationCheck::skipped(name, MODEL_UNAVAILABLE))
            .collect();
        report.mark_not_attempted();
        return report;
    };

    let mut report = VerificationReport::new();
    report.extend(verify_variable_schema(model, schema));
    report.extend(verify_constraint_counts(model, schema));
    report.extend(verify_objective(model, schema));
    report.push(verify_feasibility(model));
    report.extend(verify_balance_constraints(model, schema, tolerance));
    report.extend(verify_integrality(model, schema, tolerance));
    report.push(verify_constraint_satisfaction(model, tolerance));
    report
}
