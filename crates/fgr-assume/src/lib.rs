#![forbid(unsafe_code)]

//! Assumption validator.
//!
//! Each check inspects raw submitted data (samples, residuals, fitted values)
//! and reduces to a single [`VerificationCheck`]. Nothing here returns an
//! error: a sample that is too small, constant, or not finite is a failed
//! check with a reason.

use fgr_report::VerificationCheck;
use fgr_stats::{
    StatsError, TtestAlternative, durbin_watson, lag_autocorrelation, levene_median, mean, median,
    normaltest, pearson_r, shapiro_wilk, ttest_1samp, variance, z_scores,
};
use serde::{Deserialize, Serialize};

pub const INSUFFICIENT_SAMPLE: &str = "insufficient sample size";

/// Thresholds shared by every assumption check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssumptionConfig {
    #[serde(default = "default_significance")]
    pub significance: f64,
    #[serde(default = "default_autocorrelation_bound")]
    pub autocorrelation_bound: f64,
    #[serde(default = "default_durbin_watson_band")]
    pub durbin_watson_band: [f64; 2],
    #[serde(default = "default_outlier_z")]
    pub outlier_z: f64,
}

fn default_significance() -> f64 {
    0.05
}

fn default_autocorrelation_bound() -> f64 {
    0.5
}

fn default_durbin_watson_band() -> [f64; 2] {
    [1.5, 2.5]
}

fn default_outlier_z() -> f64 {
    3.0
}

impl Default for AssumptionConfig {
    fn default() -> Self {
        Self {
            significance: default_significance(),
            autocorrelation_bound: default_autocorrelation_bound(),
            durbin_watson_band: default_durbin_watson_band(),
            outlier_z: default_outlier_z(),
        }
    }
}

/// Single-sample assumption checks addressable from a grading plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionKind {
    Normality,
    NormalityOmnibus,
    HomoscedasticityHalves,
    IndependenceAutocorrelation,
    IndependenceDurbinWatson,
    NoOutliers,
    ZeroMean,
    WhiteNoise,
}

impl AssumptionKind {
    #[must_use]
    pub fn check_name(self) -> &'static str {
        match self {
            Self::Normality => "normality",
            Self::NormalityOmnibus => "normality_omnibus",
            Self::HomoscedasticityHalves => "homoscedasticity",
            Self::IndependenceAutocorrelation => "independence",
            Self::IndependenceDurbinWatson => "durbin_watson",
            Self::NoOutliers => "no_outliers",
            Self::ZeroMean => "zero_mean",
            Self::WhiteNoise => "white_noise",
        }
    }

    #[must_use]
    pub fn run(self, sample: &[f64], config: &AssumptionConfig) -> VerificationCheck {
        match self {
            Self::Normality => check_normality(sample, config),
            Self::NormalityOmnibus => check_normality_omnibus(sample, config),
            Self::HomoscedasticityHalves => check_homoscedasticity_halves(sample, config),
            Self::IndependenceAutocorrelation => {
                check_independence_autocorrelation(sample, config)
            }
            Self::IndependenceDurbinWatson => check_independence_durbin_watson(sample, config),
            Self::NoOutliers => check_no_outliers(sample, config),
            Self::ZeroMean => check_zero_mean(sample, config),
            Self::WhiteNoise => check_white_noise(sample),
        }
    }
}

fn insufficient(name: &str) -> VerificationCheck {
    VerificationCheck::failed(name, INSUFFICIENT_SAMPLE)
}

fn stats_failure(name: &str, err: &StatsError) -> VerificationCheck {
    match err {
        StatsError::InsufficientSample { .. } => insufficient(name),
        other => VerificationCheck::failed(name, other.to_string()),
    }
}

fn require_sample(name: &str, sample: &[f64], required: usize) -> Option<VerificationCheck> {
    if sample.len() < required {
        return Some(insufficient(name));
    }
    if let Some(index) = sample.iter().position(|value| !value.is_finite()) {
        return Some(VerificationCheck::failed(
            name,
            format!("position {index} is not finite"),
        ));
    }
    None
}

/// Shapiro-Wilk; normality is retained when `p > significance`.
#[must_use]
pub fn check_normality(sample: &[f64], config: &AssumptionConfig) -> VerificationCheck {
    let name = AssumptionKind::Normality.check_name();
    if let Some(check) = require_sample(name, sample, 3) {
        return check;
    }
    match shapiro_wilk(sample) {
        Ok(result) => VerificationCheck::judged(
            name,
            result.p_value > config.significance,
            format!(
                "Shapiro-Wilk W = {:.4}, p = {:.4}",
                result.statistic, result.p_value
            ),
        ),
        Err(err) => stats_failure(name, &err),
    }
}

/// D'Agostino-Pearson K² (skewness and kurtosis combined).
#[must_use]
pub fn check_normality_omnibus(sample: &[f64], config: &AssumptionConfig) -> VerificationCheck {
    let name = AssumptionKind::NormalityOmnibus.check_name();
    if let Some(check) = require_sample(name, sample, 8) {
        return check;
    }
    match normaltest(sample) {
        Ok(result) => VerificationCheck::judged(
            name,
            result.p_value > config.significance,
            format!("K2 = {:.4}, p = {:.4}", result.statistic, result.p_value),
        ),
        Err(err) => stats_failure(name, &err),
    }
}

fn levene_check(
    name: &str,
    low: &[f64],
    high: &[f64],
    config: &AssumptionConfig,
) -> VerificationCheck {
    match levene_median(&[low, high]) {
        Ok(result) => VerificationCheck::judged(
            name,
            result.p_value > config.significance,
            format!("Levene W = {:.4}, p = {:.4}", result.statistic, result.p_value),
        ),
        Err(err) => stats_failure(name, &err),
    }
}

/// Equal spread in the first and second half of the series.
#[must_use]
pub fn check_homoscedasticity_halves(
    residuals: &[f64],
    config: &AssumptionConfig,
) -> VerificationCheck {
    let name = AssumptionKind::HomoscedasticityHalves.check_name();
    if let Some(check) = require_sample(name, residuals, 6) {
        return check;
    }
    let (low, high) = residuals.split_at(residuals.len() / 2);
    levene_check(name, low, high, config)
}

/// Equal spread of residuals below and above the median fitted value.
#[must_use]
pub fn check_homoscedasticity_fitted(
    fitted: &[f64],
    residuals: &[f64],
    config: &AssumptionConfig,
) -> VerificationCheck {
    let name = "homoscedasticity";
    if fitted.len() != residuals.len() {
        return VerificationCheck::failed(
            name,
            format!(
                "{} fitted values for {} residuals",
                fitted.len(),
                residuals.len()
            ),
        );
    }
    if let Some(check) = require_sample(name, residuals, 6) {
        return check;
    }
    if let Some(check) = require_sample(name, fitted, 6) {
        return check;
    }
    let center = match median(fitted) {
        Ok(center) => center,
        Err(err) => return stats_failure(name, &err),
    };
    let (low, high): (Vec<_>, Vec<_>) = fitted
        .iter()
        .zip(residuals)
        .partition(|(value, _)| **value <= center);
    let low: Vec<f64> = low.into_iter().map(|(_, residual)| *residual).collect();
    let high: Vec<f64> = high.into_iter().map(|(_, residual)| *residual).collect();
    if low.len() < 3 || high.len() < 3 {
        return insufficient(name);
    }
    levene_check(name, &low, &high, config)
}

/// Lag-1 correlation of consecutive observations stays below the bound.
#[must_use]
pub fn check_independence_autocorrelation(
    sample: &[f64],
    config: &AssumptionConfig,
) -> VerificationCheck {
    let name = AssumptionKind::IndependenceAutocorrelation.check_name();
    if let Some(check) = require_sample(name, sample, 3) {
        return check;
    }
    let n = sample.len();
    match pearson_r(&sample[..n - 1], &sample[1..]) {
        Ok(r) => VerificationCheck::judged(
            name,
            r.abs() < config.autocorrelation_bound,
            format!(
                "lag-1 autocorrelation {r:.4} against bound {}",
                config.autocorrelation_bound
            ),
        ),
        Err(err) => stats_failure(name, &err),
    }
}

#[must_use]
pub fn check_independence_durbin_watson(
    residuals: &[f64],
    config: &AssumptionConfig,
) -> VerificationCheck {
    let name = AssumptionKind::IndependenceDurbinWatson.check_name();
    if let Some(check) = require_sample(name, residuals, 3) {
        return check;
    }
    let [lo, hi] = config.durbin_watson_band;
    match durbin_watson(residuals) {
        Ok(dw) => {
            let inside = dw >= lo && dw <= hi;
            let verdict = if inside { "inside" } else { "outside" };
            VerificationCheck::judged(
                name,
                inside,
                format!("Durbin-Watson {dw:.3} {verdict} [{lo}, {hi}]"),
            )
        }
        Err(err) => stats_failure(name, &err),
    }
}

/// No observation lies more than `outlier_z` population standard deviations
/// from the mean. A constant sample has no outliers.
#[must_use]
pub fn check_no_outliers(sample: &[f64], config: &AssumptionConfig) -> VerificationCheck {
    let name = AssumptionKind::NoOutliers.check_name();
    if let Some(check) = require_sample(name, sample, 3) {
        return check;
    }
    let scores = match z_scores(sample) {
        Ok(scores) => scores,
        Err(err) => return stats_failure(name, &err),
    };
    let flagged: Vec<usize> = scores
        .iter()
        .enumerate()
        .filter(|(_, z)| z.abs() > config.outlier_z)
        .map(|(index, _)| index)
        .collect();
    match flagged.first() {
        None => VerificationCheck::judged(
            name,
            true,
            format!("no |z| above {}", config.outlier_z),
        ),
        Some(first) => VerificationCheck::failed(
            name,
            format!(
                "{} outlier(s), first at position {first} with z = {:.3}",
                flagged.len(),
                scores[*first]
            ),
        ),
    }
}

/// One-sample t-test against zero; zero mean is retained when
/// `p >= significance`.
#[must_use]
pub fn check_zero_mean(residuals: &[f64], config: &AssumptionConfig) -> VerificationCheck {
    let name = AssumptionKind::ZeroMean.check_name();
    if let Some(check) = require_sample(name, residuals, 3) {
        return check;
    }
    // constant residuals: the test is undefined, the mean is known exactly
    if let (Ok(center), Ok(spread)) = (mean(residuals), variance(residuals)) {
        if spread <= 0.0 {
            return VerificationCheck::judged(
                name,
                center == 0.0,
                format!("constant residuals equal to {center}"),
            );
        }
    }
    let outcome = ttest_1samp(residuals, 0.0).and_then(|result| {
        Ok((
            result.statistic,
            result.p_value(TtestAlternative::TwoSided)?,
        ))
    });
    match outcome {
        Ok((statistic, p)) => VerificationCheck::judged(
            name,
            p >= config.significance,
            format!("t = {statistic:.4}, p = {p:.4}"),
        ),
        Err(err) => stats_failure(name, &err),
    }
}

/// Every uncentred autocorrelation at lags `1..n` stays within `2 / sqrt(n)`.
#[must_use]
pub fn check_white_noise(residuals: &[f64]) -> VerificationCheck {
    let name = AssumptionKind::WhiteNoise.check_name();
    if let Some(check) = require_sample(name, residuals, 3) {
        return check;
    }
    let n = residuals.len();
    let bound = 2.0 / (n as f64).sqrt();
    for lag in 1..n {
        match lag_autocorrelation(residuals, lag) {
            Ok(acf) if acf.abs() > bound => {
                return VerificationCheck::failed(
                    name,
                    format!("autocorrelation {acf:.4} at lag {lag} exceeds {bound:.4}"),
                );
            }
            Ok(_) => {}
            Err(err) => return stats_failure(name, &err),
        }
    }
    VerificationCheck::judged(
        name,
        true,
        format!("all autocorrelations within {bound:.4}"),
    )
}

/// Standard regression diagnostics: normal residuals, constant variance
/// across fitted values, no serial correlation, no outliers.
#[must_use]
pub fn validate_regression_residuals(
    fitted: &[f64],
    residuals: &[f64],
    config: &AssumptionConfig,
) -> Vec<VerificationCheck> {
    vec![
        check_normality(residuals, config),
        check_homoscedasticity_fitted(fitted, residuals, config),
        check_independence_autocorrelation(residuals, config),
        check_no_outliers(residuals, config),
    ]
}

/// Time-series model residuals should look like white noise: zero mean,
/// stable variance, normal, uncorrelated.
#[must_use]
pub fn validate_white_noise_residuals(
    residuals: &[f64],
    config: &AssumptionConfig,
) -> Vec<VerificationCheck> {
    vec![
        check_zero_mean(residuals, config),
        check_homoscedasticity_halves(residuals, config),
        check_normality_omnibus(residuals, config),
        check_white_noise(residuals),
    ]
}
