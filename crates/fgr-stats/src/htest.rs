//! Classical hypothesis tests: normality, equality of variance, t-tests.

use crate::describe::{kurtosis, mean, median, skewness, variance};
use crate::dist::{ChiSquared, FisherF, StudentT, standard_normal_ppf, standard_normal_sf};
use crate::{StatsError, require_finite, require_len};

const SW_C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_19, 4.434_685, -2.706_056];
const SW_C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];
const SW_C3: [f64; 4] = [0.544, -0.399_78, 0.025_054, -6.714e-4];
const SW_C4: [f64; 4] = [1.382_2, -0.778_57, 0.062_767, -0.002_032_2];
const SW_C5: [f64; 4] = [-1.586_1, -0.310_82, -0.083_751, 0.003_891_5];
const SW_C6: [f64; 3] = [-0.480_3, -0.082_676, 0.003_030_2];
const SW_G: [f64; 2] = [-2.273, 0.459];
const SW_SMALL_P: f64 = 1e-99;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtestAlternative {
    #[default]
    TwoSided,
    Less,
    Greater,
}

/// t statistic together with its degrees of freedom; p-values are derived
/// per alternative on demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TtestResult {
    pub statistic: f64,
    pub df: f64,
}

impl TtestResult {
    pub fn p_value(&self, alternative: TtestAlternative) -> Result<f64, StatsError> {
        let dist = StudentT::new(self.df)?;
        Ok(match alternative {
            TtestAlternative::TwoSided => (2.0 * dist.sf(self.statistic.abs())).min(1.0),
            TtestAlternative::Less => dist.cdf(self.statistic),
            TtestAlternative::Greater => dist.sf(self.statistic),
        })
    }

    pub fn into_test_result(
        self,
        alternative: TtestAlternative,
    ) -> Result<TestResult, StatsError> {
        Ok(TestResult {
            statistic: self.statistic,
            p_value: self.p_value(alternative)?,
        })
    }
}

fn poly(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro-Wilk W test (Royston's AS R94 approximation).
pub fn shapiro_wilk(sample: &[f64]) -> Result<TestResult, StatsError> {
    require_len(sample, "shapiro_wilk", 3)?;
    require_finite(sample, "shapiro_wilk requires finite values")?;

    let mut x = sample.to_vec();
    x.sort_by(f64::total_cmp);
    let n = x.len();
    let half = n / 2;
    if x[n - 1] - x[0] <= 0.0 {
        return Err(StatsError::DegenerateSample(
            "shapiro_wilk of a constant sample",
        ));
    }

    let an = n as f64;
    let mut a = vec![0.0; half];
    if n == 3 {
        a[0] = std::f64::consts::FRAC_1_SQRT_2;
    } else {
        let an25 = an + 0.25;
        let mut m = Vec::with_capacity(half);
        for i in 0..half {
            m.push(standard_normal_ppf((i as f64 + 1.0 - 0.375) / an25)?);
        }
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();
        let a1 = poly(&SW_C1, rsn) - m[0] / ssumm2;

        let (first_free, fac) = if n > 5 {
            let a2 = -m[1] / ssumm2 + poly(&SW_C2, rsn);
            let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
                / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
                .sqrt();
            a[1] = a2;
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
            (1, fac)
        };
        a[0] = a1;
        for i in first_free..half {
            a[i] = -m[i] / fac;
        }
    }

    let xm = x.iter().sum::<f64>() / an;
    let ssq = x.iter().map(|v| (v - xm) * (v - xm)).sum::<f64>();
    let numerator = (0..half).map(|i| a[i] * (x[n - 1 - i] - x[i])).sum::<f64>();
    let w = (numerator * numerator / ssq).min(1.0);

    if n == 3 {
        let p = 1.909_859_317_102_74 * (w.sqrt().asin() - 1.047_197_551_196_6);
        return Ok(TestResult {
            statistic: w,
            p_value: p.max(0.0),
        });
    }

    let mut w1 = (1.0 - w).ln();
    let (mu, sigma) = if n <= 11 {
        let gamma = poly(&SW_G, an);
        if w1 >= gamma {
            return Ok(TestResult {
                statistic: w,
                p_value: SW_SMALL_P,
            });
        }
        w1 = -(gamma - w1).ln();
        (poly(&SW_C3, an), poly(&SW_C4, an).exp())
    } else {
        let ln_n = an.ln();
        (poly(&SW_C5, ln_n), poly(&SW_C6, ln_n).exp())
    };

    Ok(TestResult {
        statistic: w,
        p_value: standard_normal_sf((w1 - mu) / sigma),
    })
}

fn skew_z(sample: &[f64]) -> Result<f64, StatsError> {
    let n = sample.len() as f64;
    let b2 = skewness(sample)?;
    let mut y = b2 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    if y == 0.0 {
        y = 1.0;
    }
    let ratio = y / alpha;
    Ok(delta * (ratio + (ratio * ratio + 1.0).sqrt()).ln())
}

fn kurtosis_z(sample: &[f64]) -> Result<f64, StatsError> {
    let n = sample.len() as f64;
    let b2 = kurtosis(sample)?;
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let var_b2 = 24.0 * n * (n - 2.0) * (n - 3.0)
        / ((n + 1.0) * (n + 1.0) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / var_b2.sqrt();
    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return Err(StatsError::DegenerateSample(
            "kurtosis transform is undefined for this sample",
        ));
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    Ok((term1 - term2) / (2.0 / (9.0 * a)).sqrt())
}

/// D'Agostino-Pearson K² omnibus normality test.
pub fn normaltest(sample: &[f64]) -> Result<TestResult, StatsError> {
    require_len(sample, "normaltest", 8)?;
    let zs = skew_z(sample)?;
    let zk = kurtosis_z(sample)?;
    let k2 = zs * zs + zk * zk;
    Ok(TestResult {
        statistic: k2,
        p_value: ChiSquared::new(2.0)?.sf(k2),
    })
}

/// Brown-Forsythe variant of Levene's test (deviations from group medians).
pub fn levene_median(groups: &[&[f64]]) -> Result<TestResult, StatsError> {
    if groups.len() < 2 {
        return Err(StatsError::InvalidArgument(
            "levene requires at least two groups",
        ));
    }
    let mut deviations = Vec::with_capacity(groups.len());
    for group in groups {
        require_len(group, "levene_median", 2)?;
        let center = median(group)?;
        deviations.push(group.iter().map(|v| (v - center).abs()).collect::<Vec<_>>());
    }

    let k = groups.len() as f64;
    let total = deviations.iter().map(Vec::len).sum::<usize>() as f64;
    let group_means = deviations
        .iter()
        .map(|z| mean(z))
        .collect::<Result<Vec<_>, _>>()?;
    let grand_mean = deviations.iter().flatten().sum::<f64>() / total;

    let between = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.len() as f64 * (zm - grand_mean) * (zm - grand_mean))
        .sum::<f64>();
    let within = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.iter().map(|v| (v - zm) * (v - zm)).sum::<f64>())
        .sum::<f64>();
    if within <= 0.0 {
        return Err(StatsError::DegenerateSample(
            "levene with zero within-group spread",
        ));
    }

    let statistic = (total - k) * between / ((k - 1.0) * within);
    Ok(TestResult {
        statistic,
        p_value: FisherF::new(k - 1.0, total - k)?.sf(statistic),
    })
}

pub fn ttest_1samp(sample: &[f64], popmean: f64) -> Result<TtestResult, StatsError> {
    require_len(sample, "ttest_1samp", 2)?;
    let n = sample.len() as f64;
    let m = mean(sample)?;
    let var = variance(sample)?;
    if var <= 0.0 {
        return Err(StatsError::DegenerateSample(
            "one-sample t-test on a constant sample",
        ));
    }
    Ok(TtestResult {
        statistic: (m - popmean) / (var / n).sqrt(),
        df: n - 1.0,
    })
}

/// Two-sample t-test; pooled variance when `equal_var`, Welch otherwise.
pub fn ttest_ind(a: &[f64], b: &[f64], equal_var: bool) -> Result<TtestResult, StatsError> {
    require_len(a, "ttest_ind", 2)?;
    require_len(b, "ttest_ind", 2)?;
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (ma, mb) = (mean(a)?, mean(b)?);
    let (va, vb) = (variance(a)?, variance(b)?);

    let (se, df) = if equal_var {
        let df = na + nb - 2.0;
        let pooled = ((na - 1.0) * va + (nb - 1.0) * vb) / df;
        ((pooled * (1.0 / na + 1.0 / nb)).sqrt(), df)
    } else {
        let (sa, sb) = (va / na, vb / nb);
        let se2 = sa + sb;
        let df = se2 * se2 / (sa * sa / (na - 1.0) + sb * sb / (nb - 1.0));
        (se2.sqrt(), df)
    };
    if se <= 0.0 || !df.is_finite() {
        return Err(StatsError::DegenerateSample(
            "two-sample t-test with zero variance",
        ));
    }
    Ok(TtestResult {
        statistic: (ma - mb) / se,
        df,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        TtestAlternative, levene_median, normaltest, shapiro_wilk, ttest_1samp, ttest_ind,
    };

    fn approx_equal(lhs: f64, rhs: f64, tol: f64) -> bool {
        (lhs - rhs).abs() <= tol
    }

    const FILL_WEIGHTS: [f64; 10] = [
        685.0, 695.0, 701.0, 688.0, 692.0, 679.0, 683.0, 698.0, 691.0, 687.0,
    ];
    const HEAVY_TAIL: [f64; 17] = [
        1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 4.0, 5.0, 8.0, 13.0, 21.0, 34.0, 55.0, 89.0,
    ];

    #[test]
    fn shapiro_three_point_exact_form() {
        let result = shapiro_wilk(&[1.0, 2.0, 4.0]).expect("n=3");
        assert!(approx_equal(result.statistic, 0.964_285_714_285_714_6, 1e-12));
        assert!(approx_equal(result.p_value, 0.636_886_845_028_965_4, 1e-9));
    }

    #[test]
    fn shapiro_separates_symmetric_from_skewed() {
        let symmetric = shapiro_wilk(&FILL_WEIGHTS).expect("fill weights");
        assert!(approx_equal(symmetric.statistic, 0.987_343_790_801_122_7, 1e-9));
        assert!(symmetric.p_value > 0.05);

        let skewed = shapiro_wilk(&HEAVY_TAIL).expect("heavy tail");
        assert!(approx_equal(skewed.statistic, 0.625_363_002_722_614, 1e-9));
        assert!(skewed.p_value < 0.001);
    }

    #[test]
    fn shapiro_rejects_short_and_constant_samples() {
        let err = shapiro_wilk(&[1.0, 2.0]).expect_err("n=2");
        assert_eq!(err.reason_code(), "stats_insufficient_sample");
        let err = shapiro_wilk(&[4.0, 4.0, 4.0, 4.0]).expect_err("constant");
        assert_eq!(err.reason_code(), "stats_degenerate_sample");
    }

    #[test]
    fn omnibus_normality() {
        let calm = normaltest(&FILL_WEIGHTS).expect("fill weights");
        assert!(approx_equal(calm.statistic, 0.181_300_347_225_076_07, 1e-9));
        assert!(approx_equal(calm.p_value, 0.913_337_164_460_143_1, 1e-9));

        let skewed = normaltest(&HEAVY_TAIL).expect("heavy tail");
        assert!(approx_equal(skewed.statistic, 21.173_568_909_732_38, 1e-7));
        assert!(skewed.p_value < 1e-4);

        assert!(normaltest(&FILL_WEIGHTS[..7]).is_err());
    }

    #[test]
    fn levene_on_scaled_groups() {
        let narrow = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let wide = [2.0, 4.0, 6.0, 8.0, 10.0, 12.0];
        let result = levene_median(&[&narrow, &wide]).expect("levene");
        assert!(approx_equal(result.statistic, 3.375, 1e-12));
        assert!(approx_equal(result.p_value, 0.096_050_820_330_662_94, 1e-9));
        assert!(levene_median(&[&narrow]).is_err());
    }

    #[test]
    fn one_sample_t_against_target_fill() {
        let t = ttest_1samp(&FILL_WEIGHTS, 690.0).expect("t");
        assert!(approx_equal(t.statistic, -0.046_132_013_680_471_43, 1e-12));
        assert_eq!(t.df, 9.0);
        let two_sided = t.p_value(TtestAlternative::TwoSided).expect("p");
        assert!(approx_equal(two_sided, 0.964_212_440_133_699_4, 1e-9));
        let less = t.p_value(TtestAlternative::Less).expect("p");
        let greater = t.p_value(TtestAlternative::Greater).expect("p");
        assert!(approx_equal(less + greater, 1.0, 1e-12));
        assert!(ttest_1samp(&[3.0, 3.0, 3.0], 1.0).is_err());
    }

    #[test]
    fn two_sample_pooled_and_welch() {
        let a = [12.1, 14.3, 13.8, 15.2, 12.9, 14.7, 13.5];
        let b = [15.8, 16.4, 14.9, 17.2, 16.1, 15.5];

        let pooled = ttest_ind(&a, &b, true).expect("pooled");
        assert!(approx_equal(pooled.statistic, -4.160_194_648_635_74, 1e-9));
        assert_eq!(pooled.df, 11.0);
        let p = pooled.p_value(TtestAlternative::TwoSided).expect("p");
        assert!(approx_equal(p, 0.001_588_825_939_836_493, 1e-9));

        let welch = ttest_ind(&a, &b, false).expect("welch");
        assert!(approx_equal(welch.statistic, -4.263_245_337_900_216, 1e-9));
        assert!(approx_equal(welch.df, 10.817_807_563_549_758, 1e-9));
        let p = welch.p_value(TtestAlternative::TwoSided).expect("p");
        assert!(approx_equal(p, 0.001_386_526_416_130_608_8, 1e-9));
    }
}
