#![forbid(unsafe_code)]

//! Reference value oracle.
//!
//! Pure functions that compute the canonical answer for each exercise family
//! from explicit problem parameters. Inputs outside a formula's domain are a
//! malformed problem, reported as [`OracleError`] rather than a sentinel.

pub mod cost;
pub mod forecasting;
pub mod hypothesis;
pub mod inventory;
pub mod probability;
pub mod regression;

use fgr_stats::StatsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ORACLE_REASON_CODES: [&str; 2] = ["oracle_invalid_parameter", "oracle_singular_design"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidParameter { parameter: String, reason: String },
    #[error("singular design: {0}")]
    SingularDesign(String),
}

impl OracleError {
    pub fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_stats(parameter: &str, err: &StatsError) -> Self {
        Self::invalid(parameter, err.to_string())
    }

    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "oracle_invalid_parameter",
            Self::SingularDesign(_) => "oracle_singular_design",
        }
    }
}

pub(crate) fn require_positive(parameter: &str, value: f64) -> Result<f64, OracleError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(OracleError::invalid(
            parameter,
            format!("must be finite and > 0, got {value}"),
        ));
    }
    Ok(value)
}

pub(crate) fn require_non_negative(parameter: &str, value: f64) -> Result<f64, OracleError> {
    if !value.is_finite() || value < 0.0 {
        return Err(OracleError::invalid(
            parameter,
            format!("must be finite and >= 0, got {value}"),
        ));
    }
    Ok(value)
}

pub(crate) fn require_finite(parameter: &str, value: f64) -> Result<f64, OracleError> {
    if !value.is_finite() {
        return Err(OracleError::invalid(parameter, "must be finite"));
    }
    Ok(value)
}

/// Strictly inside (0, 1): service levels, significance levels, confidence.
pub(crate) fn require_open_unit(parameter: &str, value: f64) -> Result<f64, OracleError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(OracleError::invalid(
            parameter,
            format!("must lie strictly between 0 and 1, got {value}"),
        ));
    }
    Ok(value)
}

pub(crate) fn require_unit(parameter: &str, value: f64) -> Result<f64, OracleError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(OracleError::invalid(
            parameter,
            format!("must lie in [0, 1], got {value}"),
        ));
    }
    Ok(value)
}

/// One named problem parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(f64),
    Array(Vec<f64>),
    Table(BTreeMap<String, f64>),
}

impl ParamValue {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Array(_) => "array",
            Self::Table(_) => "table",
        }
    }
}

/// Named numeric parameters of one exercise. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemInstance {
    params: BTreeMap<String, ParamValue>,
}

impl ProblemInstance {
    #[must_use]
    pub fn builder() -> ProblemBuilder {
        ProblemBuilder::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    fn require(&self, name: &str) -> Result<&ParamValue, OracleError> {
        self.params
            .get(name)
            .ok_or_else(|| OracleError::invalid(name, "parameter is not defined"))
    }

    pub fn scalar(&self, name: &str) -> Result<f64, OracleError> {
        match self.require(name)? {
            ParamValue::Scalar(value) => require_finite(name, *value),
            other => Err(OracleError::invalid(
                name,
                format!("expected scalar, found {}", other.kind()),
            )),
        }
    }

    pub fn array(&self, name: &str) -> Result<&[f64], OracleError> {
        match self.require(name)? {
            ParamValue::Array(values) => Ok(values),
            other => Err(OracleError::invalid(
                name,
                format!("expected array, found {}", other.kind()),
            )),
        }
    }

    pub fn table(&self, name: &str) -> Result<&BTreeMap<String, f64>, OracleError> {
        match self.require(name)? {
            ParamValue::Table(table) => Ok(table),
            other => Err(OracleError::invalid(
                name,
                format!("expected table, found {}", other.kind()),
            )),
        }
    }

    /// A scalar that must be a non-negative whole number (population sizes,
    /// draw counts, window lengths).
    pub fn count(&self, name: &str) -> Result<u64, OracleError> {
        let value = self.scalar(name)?;
        if value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
            return Err(OracleError::invalid(
                name,
                format!("expected a non-negative integer, got {value}"),
            ));
        }
        Ok(value as u64)
    }

    /// An array whose entries are all non-negative whole numbers.
    pub fn counts(&self, name: &str) -> Result<Vec<u64>, OracleError> {
        self.array(name)?
            .iter()
            .map(|value| {
                if *value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
                    Err(OracleError::invalid(
                        name,
                        format!("expected non-negative integers, found {value}"),
                    ))
                } else {
                    Ok(*value as u64)
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProblemBuilder {
    params: BTreeMap<String, ParamValue>,
}

impl ProblemBuilder {
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), ParamValue::Scalar(value));
        self
    }

    #[must_use]
    pub fn array(mut self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        self.params.insert(name.into(), ParamValue::Array(values.into()));
        self
    }

    #[must_use]
    pub fn table<K, I>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let table = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        self.params.insert(name.into(), ParamValue::Table(table));
        self
    }

    #[must_use]
    pub fn build(self) -> ProblemInstance {
        ProblemInstance {
            params: self.params,
        }
    }
}
