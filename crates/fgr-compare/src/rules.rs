//! Invariant checks that need no oracle value: sums, monotone cumulative
//! shares, probability ranges, sign constraints and the ABC classification
//! bands.

use crate::{ToleranceSpec, compare};
use fgr_report::VerificationCheck;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lo: f64,
    pub hi: f64,
}

impl Band {
    #[must_use]
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

/// Acceptable share of total volume for each ABC class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbcBands {
    #[serde(default = "default_band_a")]
    pub a: Band,
    #[serde(default = "default_band_b")]
    pub b: Band,
    #[serde(default = "default_band_c")]
    pub c: Band,
}

fn default_band_a() -> Band {
    Band::new(0.70, 0.80)
}

fn default_band_b() -> Band {
    Band::new(0.15, 0.20)
}

fn default_band_c() -> Band {
    Band::new(0.05, 0.10)
}

impl Default for AbcBands {
    fn default() -> Self {
        Self {
            a: default_band_a(),
            b: default_band_b(),
            c: default_band_c(),
        }
    }
}

pub fn check_sums_to(
    name: impl Into<String>,
    values: &[f64],
    target: f64,
    tolerance: &ToleranceSpec,
) -> VerificationCheck {
    let total = values.iter().sum::<f64>();
    VerificationCheck::comparison(
        name,
        compare(total, target, tolerance),
        total,
        target,
        tolerance.threshold(target),
    )
}

/// Cumulative shares never decrease (beyond `tolerance`) and end at 1.
pub fn check_monotone_cumulative(
    name: impl Into<String>,
    values: &[f64],
    tolerance: &ToleranceSpec,
) -> VerificationCheck {
    let name = name.into();
    let Some(last) = values.last() else {
        return VerificationCheck::failed(name, "empty cumulative sequence");
    };
    if let Some(index) = values.iter().position(|value| !value.is_finite()) {
        return VerificationCheck::failed(name, format!("position {index} is not finite"));
    }
    for (index, pair) in values.windows(2).enumerate() {
        if pair[1] < pair[0] - tolerance.threshold(pair[0]) {
            return VerificationCheck::failed(
                name,
                format!(
                    "cumulative share drops from {} to {} at position {}",
                    pair[0],
                    pair[1],
                    index + 1
                ),
            );
        }
    }
    if !compare(*last, 1.0, tolerance) {
        return VerificationCheck::failed(name, format!("cumulative share ends at {last}, not 1"));
    }
    VerificationCheck::passed(name)
}

/// Every value is a probability.
pub fn check_unit_interval(name: impl Into<String>, values: &[f64]) -> VerificationCheck {
    let name = name.into();
    match values
        .iter()
        .position(|value| !(0.0..=1.0).contains(value))
    {
        Some(index) => VerificationCheck::failed(
            name,
            format!("value {} at position {index} is outside [0, 1]", values[index]),
        ),
        None => VerificationCheck::passed(name),
    }
}

pub fn check_within_band(
    name: impl Into<String>,
    value: f64,
    lo: f64,
    hi: f64,
) -> VerificationCheck {
    VerificationCheck::judged(
        name,
        Band::new(lo, hi).contains(value),
        format!("{value} against [{lo}, {hi}]"),
    )
}

fn check_sign(
    name: impl Into<String>,
    entries: &[(String, f64)],
    accept: impl Fn(f64) -> bool,
    requirement: &str,
) -> VerificationCheck {
    let name = name.into();
    if entries.is_empty() {
        return VerificationCheck::failed(name, "no values to check");
    }
    match entries
        .iter()
        .find(|(_, value)| !(value.is_finite() && accept(*value)))
    {
        Some((label, value)) => VerificationCheck::failed(
            name,
            format!("{label} = {value} must be finite and {requirement}"),
        ),
        None => VerificationCheck::judged(
            name,
            true,
            format!("{} values finite and {requirement}", entries.len()),
        ),
    }
}

/// Every labelled value is strictly positive (safety stocks, investments).
pub fn check_positive(name: impl Into<String>, entries: &[(String, f64)]) -> VerificationCheck {
    check_sign(name, entries, |value| value > 0.0, "> 0")
}

/// Every labelled value is zero or more (error metrics, cost lines).
pub fn check_non_negative(
    name: impl Into<String>,
    entries: &[(String, f64)],
) -> VerificationCheck {
    check_sign(name, entries, |value| value >= 0.0, ">= 0")
}

/// Class shares (fractions of total volume) fall inside their bands.
pub fn check_abc_bands(
    name: impl Into<String>,
    shares: [f64; 3],
    bands: &AbcBands,
) -> VerificationCheck {
    let name = name.into();
    let classes = [("A", shares[0], bands.a), ("B", shares[1], bands.b), ("C", shares[2], bands.c)];
    for (class, share, band) in classes {
        if !band.contains(share) {
            return VerificationCheck::failed(
                name,
                format!(
                    "class {class} share {share:.3} outside [{:.2}, {:.2}]",
                    band.lo, band.hi
                ),
            );
        }
    }
    VerificationCheck::judged(
        name,
        true,
        format!(
            "shares {:.3}/{:.3}/{:.3} inside bands",
            shares[0], shares[1], shares[2]
        ),
    )
}

/// Class volumes normalised by their total, then held to the share bands.
/// Shares that already sum to 1 pass through unchanged.
pub fn check_abc_volumes(
    name: impl Into<String>,
    volumes: [f64; 3],
    bands: &AbcBands,
) -> VerificationCheck {
    let name = name.into();
    if volumes.iter().any(|volume| !volume.is_finite() || *volume < 0.0) {
        return VerificationCheck::failed(
            name,
            format!("class volumes {volumes:?} must be finite and non-negative"),
        );
    }
    let total = volumes.iter().sum::<f64>();
    if total <= 0.0 {
        return VerificationCheck::failed(
            name,
            format!("class volumes sum to {total}, expected a positive total"),
        );
    }
    check_abc_bands(name, volumes.map(|volume| volume / total), bands)
}

/// One policy attribute (review frequency, service level, safety stock
/// days) held to a range per class.
pub fn check_policy_bands(
    name: impl Into<String>,
    values: &BTreeMap<String, f64>,
    bands: &BTreeMap<String, Band>,
) -> VerificationCheck {
    let name = name.into();
    for (class, band) in bands {
        let Some(value) = values.get(class) else {
            return VerificationCheck::failed(name, format!("missing class {class}"));
        };
        if !band.contains(*value) {
            return VerificationCheck::failed(
                name,
                format!("class {class} value {value} outside [{}, {}]", band.lo, band.hi),
            );
        }
    }
    VerificationCheck::judged(
        name,
        true,
        format!("{} classes inside their ranges", bands.len()),
    )
}

/// Breakdowns keyed by the same entities (revenue and cost per customer)
/// cover the same keys and carry no negative amounts.
pub fn check_matching_keys(
    name: impl Into<String>,
    mappings: &[(&str, &BTreeMap<String, f64>)],
) -> VerificationCheck {
    let name = name.into();
    let Some(((first_label, first), rest)) = mappings.split_first() else {
        return VerificationCheck::failed(name, "no mappings to compare");
    };
    for (label, mapping) in rest {
        if let Some(key) = first.keys().find(|key| !mapping.contains_key(*key)) {
            return VerificationCheck::failed(
                name,
                format!("{label} has no entry for {key} present in {first_label}"),
            );
        }
        if let Some(key) = mapping.keys().find(|key| !first.contains_key(*key)) {
            return VerificationCheck::failed(
                name,
                format!("{label} has entry {key} missing from {first_label}"),
            );
        }
    }
    for (label, mapping) in mappings {
        if let Some((key, value)) = mapping
            .iter()
            .find(|(_, value)| !(value.is_finite() && **value >= 0.0))
        {
            return VerificationCheck::failed(
                name,
                format!("{label}.{key} = {value} must be finite and >= 0"),
            );
        }
    }
    VerificationCheck::judged(
        name,
        true,
        format!("{} mappings share {} keys", mappings.len(), first.len()),
    )
}

/// A decomposition trend bends slowly: `|t[i-1] - 2·t[i] + t[i+1]|` stays
/// within `max_curvature`. Windows touching an undefined position are not
/// judged.
pub fn check_smooth_trend(
    name: impl Into<String>,
    trend: &[f64],
    max_curvature: f64,
) -> VerificationCheck {
    let name = name.into();
    let mut windows = 0usize;
    for (index, window) in trend.windows(3).enumerate() {
        if window.iter().any(|value| value.is_nan()) {
            continue;
        }
        windows += 1;
        let curvature = window[2] - 2.0 * window[1] + window[0];
        if curvature.is_nan() || curvature.abs() > max_curvature {
            return VerificationCheck::failed(
                name,
                format!(
                    "trend curvature {curvature} at position {} exceeds {max_curvature}",
                    index + 1
                ),
            );
        }
    }
    if windows == 0 {
        return VerificationCheck::failed(name, "trend has no three consecutive defined values");
    }
    VerificationCheck::judged(
        name,
        true,
        format!("{windows} windows within curvature {max_curvature}"),
    )
}
