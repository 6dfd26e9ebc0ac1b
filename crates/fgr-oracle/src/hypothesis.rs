//! t-test statistics, critical values and one-sample power.

use crate::{OracleError, require_finite, require_open_unit};
use fgr_stats::{NoncentralT, StatsError, StudentT, TtestAlternative, TtestResult};

/// Statistic, degrees of freedom and the p-value under each alternative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestSummary {
    pub statistic: f64,
    pub df: f64,
    pub p_two_sided: f64,
    pub p_less: f64,
    pub p_greater: f64,
}

impl TTestSummary {
    fn from_result(parameter: &str, result: TtestResult) -> Result<Self, OracleError> {
        let p = |alternative| {
            result
                .p_value(alternative)
                .map_err(|err| OracleError::from_stats(parameter, &err))
        };
        Ok(Self {
            statistic: result.statistic,
            df: result.df,
            p_two_sided: p(TtestAlternative::TwoSided)?,
            p_less: p(TtestAlternative::Less)?,
            p_greater: p(TtestAlternative::Greater)?,
        })
    }

    #[must_use]
    pub fn p_value(&self, alternative: TtestAlternative) -> f64 {
        match alternative {
            TtestAlternative::TwoSided => self.p_two_sided,
            TtestAlternative::Less => self.p_less,
            TtestAlternative::Greater => self.p_greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tails {
    One,
    Two,
}

fn require_samples(parameter: &str, samples: &[f64]) -> Result<(), OracleError> {
    if samples.len() < 2 {
        return Err(OracleError::invalid(
            parameter,
            format!("need at least 2 observations, got {}", samples.len()),
        ));
    }
    for value in samples {
        require_finite(parameter, *value)?;
    }
    Ok(())
}

pub fn one_sample_t(samples: &[f64], mu0: f64) -> Result<TTestSummary, OracleError> {
    require_samples("samples", samples)?;
    require_finite("mu0", mu0)?;
    let result = fgr_stats::ttest_1samp(samples, mu0)
        .map_err(|err| OracleError::from_stats("samples", &err))?;
    TTestSummary::from_result("samples", result)
}

/// Pooled-variance (`equal_var`) or Welch two-sample t-test.
pub fn two_sample_t(a: &[f64], b: &[f64], equal_var: bool) -> Result<TTestSummary, OracleError> {
    require_samples("a", a)?;
    require_samples("b", b)?;
    let result = fgr_stats::ttest_ind(a, b, equal_var)
        .map_err(|err| OracleError::from_stats("a", &err))?;
    TTestSummary::from_result("a", result)
}

fn student_t(df: f64) -> Result<StudentT, OracleError> {
    StudentT::new(df).map_err(|err| OracleError::from_stats("df", &err))
}

/// Upper critical value: `t_{1-alpha}` for one tail, `t_{1-alpha/2}` for two.
pub fn t_critical(alpha: f64, df: f64, tails: Tails) -> Result<f64, OracleError> {
    require_open_unit("alpha", alpha)?;
    let upper = match tails {
        Tails::One => 1.0 - alpha,
        Tails::Two => 1.0 - alpha / 2.0,
    };
    student_t(df)?
        .ppf(upper)
        .map_err(|err: StatsError| OracleError::from_stats("alpha", &err))
}

/// Power of a one-sided one-sample t-test with standardized effect `d`:
/// `P(T' > t_{1-alpha, n-1})` with `T' ~ nct(n - 1, d * sqrt(n))`.
pub fn t_test_power(effect_size: f64, alpha: f64, n: u64) -> Result<f64, OracleError> {
    if n < 2 {
        return Err(OracleError::invalid(
            "n",
            format!("need at least 2 observations, got {n}"),
        ));
    }
    let effect = require_finite("effect_size", effect_size)?;
    let n = n as f64;
    let df = n - 1.0;
    let critical = t_critical(alpha, df, Tails::One)?;
    let dist = NoncentralT::new(df, effect * n.sqrt())
        .map_err(|err| OracleError::from_stats("effect_size", &err))?;
    Ok(dist.sf(critical).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::{Tails, one_sample_t, t_critical, t_test_power, two_sample_t};
    use fgr_stats::TtestAlternative;

    fn approx_equal(lhs: f64, rhs: f64, tol: f64) -> bool {
        (lhs - rhs).abs() <= tol
    }

    const FILL_WEIGHTS: [f64; 10] = [
        685.0, 695.0, 701.0, 688.0, 692.0, 679.0, 683.0, 698.0, 691.0, 687.0,
    ];

    #[test]
    fn one_sample_summary_carries_every_alternative() {
        let summary = one_sample_t(&FILL_WEIGHTS, 690.0).expect("t");
        assert!(approx_equal(summary.statistic, -0.046_132_013_680_471_43, 1e-12));
        assert_eq!(summary.df, 9.0);
        assert!(approx_equal(summary.p_two_sided, 0.964_212_440_133_699_4, 1e-9));
        assert!(approx_equal(summary.p_less + summary.p_greater, 1.0, 1e-12));
        assert_eq!(
            summary.p_value(TtestAlternative::Less),
            summary.p_less
        );
    }

    #[test]
    fn tiny_or_constant_samples_are_rejected() {
        let err = one_sample_t(&[690.0], 690.0).expect_err("n=1");
        assert_eq!(err.reason_code(), "oracle_invalid_parameter");
        assert!(one_sample_t(&[3.0, 3.0, 3.0], 1.0).is_err());
        assert!(two_sample_t(&[1.0, 2.0], &[3.0], true).is_err());
    }

    #[test]
    fn pooled_and_welch_two_sample() {
        let a = [12.1, 14.3, 13.8, 15.2, 12.9, 14.7, 13.5];
        let b = [15.8, 16.4, 14.9, 17.2, 16.1, 15.5];
        let pooled = two_sample_t(&a, &b, true).expect("pooled");
        assert!(approx_equal(pooled.p_two_sided, 0.001_588_825_939_836_493, 1e-9));
        let welch = two_sample_t(&a, &b, false).expect("welch");
        assert!(approx_equal(welch.df, 10.817_807_563_549_758, 1e-9));
        assert!(welch.p_less < 0.001);
    }

    #[test]
    fn critical_values() {
        assert!(approx_equal(
            t_critical(0.05, 9.0, Tails::One).expect("one tail"),
            1.833_112_932_656_233,
            1e-6
        ));
        assert!(approx_equal(
            t_critical(0.05, 12.0, Tails::Two).expect("two tails"),
            2.178_812_829_667_228,
            1e-6
        ));
        assert!(t_critical(0.0, 9.0, Tails::One).is_err());
        assert!(t_critical(0.05, 0.0, Tails::One).is_err());
    }

    #[test]
    fn power_grows_with_sample_size() {
        let power = t_test_power(0.8, 0.05, 10).expect("power");
        assert!(approx_equal(power, 0.754_424_759_249_352_5, 1e-6));
        let larger = t_test_power(0.5, 0.05, 30).expect("power");
        assert!(approx_equal(larger, 0.848_254_190_928_982_6, 1e-6));

        let mut previous = 0.0;
        for n in [2_u64, 5, 10, 20, 40, 80] {
            let power = t_test_power(0.5, 0.05, n).expect("power");
            assert!(power > previous, "n={n} power={power}");
            previous = power;
        }
        assert!(t_test_power(0.5, 0.05, 1).is_err());
    }
}
