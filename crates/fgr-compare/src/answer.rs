use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A mapping-shaped submission: field name to value.
pub type AnswerMap = BTreeMap<String, AnswerValue>;

/// One field of a mapping-shaped submission.
///
/// In JSON, `null` inside a series stands for an undefined (NaN) position,
/// such as the warm-up window of a moving average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Flag(bool),
    Scalar(f64),
    Series(#[serde(deserialize_with = "nullable_series")] Vec<f64>),
    Labels(Vec<String>),
    Mapping(BTreeMap<String, f64>),
}

impl AnswerValue {
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Flag(_) => "flag",
            Self::Scalar(_) => "scalar",
            Self::Series(_) => "series",
            Self::Labels(_) => "labels",
            Self::Mapping(_) => "mapping",
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            Self::Series(values) => Some(values),
            _ => None,
        }
    }
}

fn nullable_series<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|value| value.unwrap_or(f64::NAN))
        .collect())
}

/// Reference value produced by the oracle; mirrors the shape it is checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectedValue {
    Scalar(f64),
    Series(Vec<f64>),
    Mapping(BTreeMap<String, f64>),
}

impl ExpectedValue {
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Series(_) => "series",
            Self::Mapping(_) => "mapping",
        }
    }
}

impl From<f64> for ExpectedValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for ExpectedValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Series(values)
    }
}
