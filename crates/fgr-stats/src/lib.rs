#![forbid(unsafe_code)]

//! Distribution and statistics kernels consumed by the grading oracle and the
//! assumption validator.
//!
//! Everything here is a pure function of its arguments. Domain violations are
//! reported through [`StatsError`] with a stable reason code; numerically
//! degenerate-but-legal inputs (for example a zero-variance sample handed to
//! a normality test) are reported the same way so callers can decide whether
//! the condition is a configuration defect or a grading outcome.

pub mod describe;
pub mod dist;
pub mod htest;
pub mod special;

pub use describe::{
    durbin_watson, kurtosis, lag_autocorrelation, mean, median, pearson_r, skewness, std_dev,
    variance, z_scores,
};
pub use dist::{
    Binomial, ChiSquared, FisherF, Hypergeometric, Normal, NoncentralT, Poisson, StudentT,
    standard_normal_cdf, standard_normal_pdf, standard_normal_ppf, standard_normal_sf,
};
pub use htest::{
    TestResult, TtestAlternative, TtestResult, levene_median, normaltest, shapiro_wilk,
    ttest_1samp, ttest_ind,
};
pub use special::{beta_reg, erf, erfc, gamma_p, gamma_q, ln_choose, ln_gamma};

pub const STATS_REASON_CODES: [&str; 4] = [
    "stats_invalid_argument",
    "stats_insufficient_sample",
    "stats_degenerate_sample",
    "stats_non_convergence",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    #[error("{0}")]
    InvalidArgument(&'static str),
    #[error("{test} requires at least {required} observations, got {actual}")]
    InsufficientSample {
        test: &'static str,
        required: usize,
        actual: usize,
    },
    #[error("{0}")]
    DegenerateSample(&'static str),
    #[error("{0} did not converge")]
    NonConvergence(&'static str),
}

impl StatsError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "stats_invalid_argument",
            Self::InsufficientSample { .. } => "stats_insufficient_sample",
            Self::DegenerateSample(_) => "stats_degenerate_sample",
            Self::NonConvergence(_) => "stats_non_convergence",
        }
    }
}

pub(crate) fn require_finite(values: &[f64], msg: &'static str) -> Result<(), StatsError> {
    if values.iter().any(|value| !value.is_finite()) {
        return Err(StatsError::InvalidArgument(msg));
    }
    Ok(())
}

pub(crate) fn require_len(
    values: &[f64],
    test: &'static str,
    required: usize,
) -> Result<(), StatsError> {
    if values.len() < required {
        return Err(StatsError::InsufficientSample {
            test,
            required,
            actual: values.len(),
        });
    }
    Ok(())
}
