//! Reference schema of an optimization model: variable groups selected by
//! name pattern, constraint families selected by tag, the objective and the
//! flow-conservation pairs of a network model.

use crate::{Domain, ModelError, Relation, Sense, Variable};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Glob over variable names (`*`, `?`, `[...]`, `[!...]`), compiled to an
/// anchored regex when the schema is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamePattern {
    glob: String,
    regex: Regex,
}

impl NamePattern {
    pub fn new(glob: impl Into<String>) -> Result<Self, ModelError> {
        let glob = glob.into();
        if glob.is_empty() {
            return Err(ModelError::InvalidPattern {
                pattern: glob,
                reason: "empty pattern".into(),
            });
        }
        match Regex::new(&glob_to_regex(&glob)) {
            Ok(regex) => Ok(Self { glob, regex }),
            Err(err) => Err(ModelError::InvalidPattern {
                pattern: glob,
                reason: err.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.glob
    }

    pub fn select<'a>(&'a self, variables: &'a [Variable]) -> impl Iterator<Item = &'a Variable> {
        variables
            .iter()
            .filter(move |variable| self.matches(&variable.name))
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.glob == other.glob
    }
}

impl TryFrom<String> for NamePattern {
    type Error = ModelError;

    fn try_from(glob: String) -> Result<Self, Self::Error> {
        Self::new(glob)
    }
}

impl From<NamePattern> for String {
    fn from(pattern: NamePattern) -> Self {
        pattern.glob
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut in_class = false;
    for ch in glob.chars() {
        match (in_class, ch) {
            (false, '*') => out.push_str(".*"),
            (false, '?') => out.push('.'),
            (false, '[') => {
                in_class = true;
                out.push('[');
            }
            (true, ']') => {
                in_class = false;
                out.push(']');
            }
            (true, '!') if out.ends_with('[') => out.push('^'),
            (true, '\\' | '[' | '&' | '~') => {
                out.push('\\');
                out.push(ch);
            }
            (true, _) => out.push(ch),
            (false, _) => {
                let mut buf = [0_u8; 4];
                out.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
            }
        }
    }
    out.push('$');
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableGroup {
    pub name: String,
    pub name_pattern: NamePattern,
    pub domain: Domain,
    /// `None` leaves the bound unchecked.
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,
    pub expected_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintFamily {
    pub tag: String,
    pub expected_count: usize,
    #[serde(default)]
    pub relation: Option<Relation>,
}

/// A term the objective must contain with a non-zero coefficient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermRef {
    Variable(String),
    /// Every variable of the named group.
    Group(String),
}

impl TermRef {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Variable(name) | Self::Group(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveSpec {
    pub sense: Sense,
    #[serde(default)]
    pub required_terms: Vec<TermRef>,
}

/// One side of a conservation equation: the summed solution values of the
/// matching variables, or a fixed quantity such as a demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowSide {
    Pattern(NamePattern),
    Constant(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowBalance {
    pub name: String,
    pub inflow: FlowSide,
    pub outflow: FlowSide,
}

#[derive(Debug, Clone, Deserialize)]
struct RawModelSchema {
    #[serde(default)]
    groups: Vec<VariableGroup>,
    #[serde(default)]
    families: Vec<ConstraintFamily>,
    #[serde(default)]
    objective: Option<ObjectiveSpec>,
    #[serde(default)]
    balances: Vec<FlowBalance>,
}

/// Validated reference schema; patterns are compiled and group references
/// resolved at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawModelSchema")]
pub struct ModelSchema {
    groups: Vec<VariableGroup>,
    families: Vec<ConstraintFamily>,
    objective: Option<ObjectiveSpec>,
    balances: Vec<FlowBalance>,
}

impl TryFrom<RawModelSchema> for ModelSchema {
    type Error = ModelError;

    fn try_from(raw: RawModelSchema) -> Result<Self, Self::Error> {
        Self::new(raw.groups, raw.families, raw.objective, raw.balances)
    }
}

impl ModelSchema {
    pub fn new(
        groups: Vec<VariableGroup>,
        families: Vec<ConstraintFamily>,
        objective: Option<ObjectiveSpec>,
        balances: Vec<FlowBalance>,
    ) -> Result<Self, ModelError> {
        let mut seen = BTreeSet::new();
        for group in &groups {
            if !seen.insert(group.name.as_str()) {
                return Err(ModelError::DuplicateGroup(group.name.clone()));
            }
        }
        if let Some(spec) = &objective {
            for term in &spec.required_terms {
                if let TermRef::Group(name) = term {
                    if !seen.contains(name.as_str()) {
                        return Err(ModelError::UnknownGroup(name.clone()));
                    }
                }
            }
        }
        Ok(Self {
            groups,
            families,
            objective,
            balances,
        })
    }

    #[must_use]
    pub fn groups(&self) -> &[VariableGroup] {
        &self.groups
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&VariableGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    #[must_use]
    pub fn families(&self) -> &[ConstraintFamily] {
        &self.families
    }

    #[must_use]
    pub fn objective(&self) -> Option<&ObjectiveSpec> {
        self.objective.as_ref()
    }

    #[must_use]
    pub fn balances(&self) -> &[FlowBalance] {
        &self.balances
    }
}

#[cfg(test)]
mod tests {
    use super::{ModelSchema, NamePattern, TermRef, VariableGroup};
    use crate::{Domain, ObjectiveSpec, Sense};

    #[test]
    fn globs_are_anchored_and_escape_regex_metacharacters() {
        let pattern = NamePattern::new("x_*_WH?").expect("pattern");
        assert!(pattern.matches("x_T1_WH1"));
        assert!(pattern.matches("x__WH2"));
        assert!(!pattern.matches("x_T1_WH12"));
        assert!(!pattern.matches("use_x_T1_WH1"));

        let dotted = NamePattern::new("ship.a+b").expect("literal metacharacters");
        assert!(dotted.matches("ship.a+b"));
        assert!(!dotted.matches("shipXaab"));

        let class = NamePattern::new("use_[TM]2").expect("class");
        assert!(class.matches("use_T2") && class.matches("use_M2"));
        assert!(!class.matches("use_C2"));
        let negated = NamePattern::new("use_[!TM]2").expect("negated class");
        assert!(negated.matches("use_C2") && !negated.matches("use_T2"));
    }

    #[test]
    fn malformed_patterns_fail_at_construction() {
        let err = NamePattern::new("x_[T").expect_err("unclosed class");
        assert_eq!(err.reason_code(), "model_invalid_pattern");
        assert!(NamePattern::new("").is_err());

        let err = serde_json::from_str::<ModelSchema>(
            r#"{"groups": [{"name": "x", "name_pattern": "x_[", "domain": "integer", "expected_count": 1}]}"#,
        )
        .expect_err("bad pattern in json");
        assert!(err.to_string().contains("invalid name pattern"));
    }

    #[test]
    fn duplicate_and_unknown_groups_are_rejected() {
        let group = VariableGroup {
            name: "production".into(),
            name_pattern: NamePattern::new("x_*").expect("pattern"),
            domain: Domain::Integer,
            lower_bound: Some(0.0),
            upper_bound: None,
            expected_count: 10,
        };
        let err = ModelSchema::new(vec![group.clone(), group.clone()], vec![], None, vec![])
            .expect_err("duplicate");
        assert_eq!(err.reason_code(), "model_duplicate_group");

        let objective = ObjectiveSpec {
            sense: Sense::Max,
            required_terms: vec![TermRef::Group("use_line".into())],
        };
        let err = ModelSchema::new(vec![group], vec![], Some(objective), vec![])
            .expect_err("unknown group");
        assert_eq!(err.reason_code(), "model_unknown_group");
    }

    #[test]
    fn schema_loads_from_json() {
        let schema: ModelSchema = serde_json::from_str(
            r#"{
                "groups": [
                    {"name": "production", "name_pattern": "x_*", "domain": "integer", "lower_bound": 0, "expected_count": 10}
                ],
                "families": [{"tag": "Demand", "expected_count": 2, "relation": "ge"}],
                "objective": {"sense": "max", "required_terms": [{"group": "production"}, {"variable": "use_T2"}]},
                "balances": [{"name": "WH1", "inflow": {"pattern": "x_*_WH1"}, "outflow": {"constant": 6000}}]
            }"#,
        )
        .expect("schema json");
        assert_eq!(schema.groups().len(), 1);
        assert!(schema.group("production").is_some());
        assert_eq!(schema.families()[0].expected_count, 2);
        assert_eq!(
            schema.objective().map(|objective| objective.required_terms.len()),
            Some(2)
        );
        assert_eq!(schema.balances()[0].name, "WH1");
    }
}
