//! Continuous and discrete distributions with cdf / sf / quantile access.

use crate::StatsError;
use crate::special::{beta_reg, erfc, gamma_q, ln_choose, ln_gamma};

const SQRT_2: f64 = std::f64::consts::SQRT_2;
const SQRT_2PI: f64 = 2.506_628_274_631_000_5;
const QUANTILE_BISECTION_STEPS: usize = 400;
const NCT_MAX_TERMS: usize = 1000;
const NCT_ERRMAX: f64 = 1e-14;

// Acklam's rational approximation, refined by one Halley step below.
const PPF_A: [f64; 6] = [
    -3.969_683_028_665_376e1,
    2.209_460_984_245_205e2,
    -2.759_285_104_469_687e2,
    1.383_577_518_672_69e2,
    -3.066_479_806_614_716e1,
    2.506_628_277_459_239,
];
const PPF_B: [f64; 5] = [
    -5.447_609_879_822_406e1,
    1.615_858_368_580_409e2,
    -1.556_989_798_598_866e2,
    6.680_131_188_771_972e1,
    -1.328_068_155_288_572e1,
];
const PPF_C: [f64; 6] = [
    -7.784_894_002_430_293e-3,
    -3.223_964_580_411_365e-1,
    -2.400_758_277_161_838,
    -2.549_732_539_343_734,
    4.374_664_141_464_968,
    2.938_163_982_698_783,
];
const PPF_D: [f64; 4] = [
    7.784_695_709_041_462e-3,
    3.224_671_290_700_398e-1,
    2.445_134_137_142_996,
    3.754_408_661_907_416,
];
const PPF_LOW: f64 = 0.024_25;

#[must_use]
pub fn standard_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / SQRT_2PI
}

#[must_use]
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

#[must_use]
pub fn standard_normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Inverse of the standard normal cdf.
pub fn standard_normal_ppf(p: f64) -> Result<f64, StatsError> {
    if !(p > 0.0 && p < 1.0) {
        return Err(StatsError::InvalidArgument(
            "normal quantile probability must lie in (0, 1)",
        ));
    }

    let x = if p < PPF_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        ppf_tail(q)
    } else if p <= 1.0 - PPF_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((PPF_A[0] * r + PPF_A[1]) * r + PPF_A[2]) * r + PPF_A[3]) * r + PPF_A[4]) * r
            + PPF_A[5])
            * q
            / (((((PPF_B[0] * r + PPF_B[1]) * r + PPF_B[2]) * r + PPF_B[3]) * r + PPF_B[4]) * r
                + 1.0)
    } else {
        let q = (-2.0 * (-p).ln_1p()).sqrt();
        -ppf_tail(q)
    };

    let err = standard_normal_cdf(x) - p;
    let u = err * SQRT_2PI * (0.5 * x * x).exp();
    Ok(x - u / (1.0 + 0.5 * x * u))
}

fn ppf_tail(q: f64) -> f64 {
    (((((PPF_C[0] * q + PPF_C[1]) * q + PPF_C[2]) * q + PPF_C[3]) * q + PPF_C[4]) * q + PPF_C[5])
        / ((((PPF_D[0] * q + PPF_D[1]) * q + PPF_D[2]) * q + PPF_D[3]) * q + 1.0)
}

/// Inverts a monotone non-decreasing cdf by bracketing then bisection.
fn invert_monotone_cdf(cdf: impl Fn(f64) -> f64, p: f64) -> f64 {
    let mut lo = -1.0_f64;
    let mut hi = 1.0_f64;
    while cdf(lo) > p && lo > -1e300 {
        lo *= 2.0;
    }
    while cdf(hi) < p && hi < 1e300 {
        hi *= 2.0;
    }
    for _ in 0..QUANTILE_BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-14 * mid.abs().max(1.0) {
            break;
        }
    }
    0.5 * (lo + hi)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    mean: f64,
    std_dev: f64,
}

impl Normal {
    pub fn new(mean: f64, std_dev: f64) -> Result<Self, StatsError> {
        if !mean.is_finite() || !std_dev.is_finite() || std_dev <= 0.0 {
            return Err(StatsError::InvalidArgument(
                "normal distribution requires finite mean and std_dev > 0",
            ));
        }
        Ok(Self { mean, std_dev })
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    #[must_use]
    pub fn z_score(&self, x: f64) -> f64 {
        (x - self.mean) / self.std_dev
    }

    #[must_use]
    pub fn pdf(&self, x: f64) -> f64 {
        standard_normal_pdf(self.z_score(x)) / self.std_dev
    }

    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        standard_normal_cdf(self.z_score(x))
    }

    #[must_use]
    pub fn sf(&self, x: f64) -> f64 {
        standard_normal_sf(self.z_score(x))
    }

    pub fn ppf(&self, p: f64) -> Result<f64, StatsError> {
        Ok(self.mean + self.std_dev * standard_normal_ppf(p)?)
    }
}

/// Student's t distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudentT {
    df: f64,
}

impl StudentT {
    pub fn new(df: f64) -> Result<Self, StatsError> {
        if !df.is_finite() || df <= 0.0 {
            return Err(StatsError::InvalidArgument(
                "t distribution requires finite df > 0",
            ));
        }
        Ok(Self { df })
    }

    #[must_use]
    pub fn df(&self) -> f64 {
        self.df
    }

    #[must_use]
    pub fn cdf(&self, t: f64) -> f64 {
        if t.is_nan() {
            return f64::NAN;
        }
        if t.is_infinite() {
            return if t > 0.0 { 1.0 } else { 0.0 };
        }
        let x = self.df / (self.df + t * t);
        let tail = 0.5 * beta_reg(0.5 * self.df, 0.5, x);
        if t > 0.0 { 1.0 - tail } else { tail }
    }

    #[must_use]
    pub fn sf(&self, t: f64) -> f64 {
        self.cdf(-t)
    }

    pub fn ppf(&self, p: f64) -> Result<f64, StatsError> {
        if !(p > 0.0 && p < 1.0) {
            return Err(StatsError::InvalidArgument(
                "t quantile probability must lie in (0, 1)",
            ));
        }
        if p == 0.5 {
            return Ok(0.0);
        }
        Ok(invert_monotone_cdf(|t| self.cdf(t), p))
    }
}

/// Non-central t distribution; cdf by Lenth's series (AS 243).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoncentralT {
    df: f64,
    nc: f64,
}

impl NoncentralT {
    pub fn new(df: f64, nc: f64) -> Result<Self, StatsError> {
        if !df.is_finite() || df <= 0.0 || !nc.is_finite() {
            return Err(StatsError::InvalidArgument(
                "non-central t requires finite df > 0 and finite non-centrality",
            ));
        }
        Ok(Self { df, nc })
    }

    #[must_use]
    pub fn cdf(&self, t: f64) -> f64 {
        if t.is_nan() {
            return f64::NAN;
        }
        if t.is_infinite() {
            return if t > 0.0 { 1.0 } else { 0.0 };
        }
        let value = if t < 0.0 {
            1.0 - lenth_cdf(-t, self.df, -self.nc)
        } else {
            lenth_cdf(t, self.df, self.nc)
        };
        value.clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn sf(&self, t: f64) -> f64 {
        1.0 - self.cdf(t)
    }
}

fn lenth_cdf(t: f64, df: f64, delta: f64) -> f64 {
    let x = t * t / (t * t + df);
    if x <= 0.0 {
        return standard_normal_cdf(-delta);
    }

    let lambda = delta * delta;
    let mut p = 0.5 * (-0.5 * lambda).exp();
    let mut q = (2.0 / std::f64::consts::PI).sqrt() * p * delta;
    let mut s = 0.5 - p;
    let mut a = 0.5;
    let b = 0.5 * df;
    let rxb = (1.0 - x).powf(b);
    let ln_beta_half = 0.5 * std::f64::consts::PI.ln() + ln_gamma(b) - ln_gamma(0.5 + b);
    let mut xodd = beta_reg(a, b, x);
    let mut godd = 2.0 * rxb * (a * x.ln() - ln_beta_half).exp();
    let mut xeven = 1.0 - rxb;
    let mut geven = b * x * rxb;
    let mut tnc = p * xodd + q * xeven;

    let mut en = 1.0;
    for _ in 0..NCT_MAX_TERMS {
        a += 1.0;
        xodd -= godd;
        xeven -= geven;
        godd *= x * (a + b - 1.0) / a;
        geven *= x * (a + b - 0.5) / (a + 0.5);
        p *= lambda / (2.0 * en);
        q *= lambda / (2.0 * en + 1.0);
        s -= p;
        en += 1.0;
        tnc += p * xodd + q * xeven;
        let err_bound = 2.0 * s * (xodd - godd);
        if err_bound.abs() <= NCT_ERRMAX {
            break;
        }
    }
    tnc + standard_normal_cdf(-delta)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquared {
    k: f64,
}

impl ChiSquared {
    pub fn new(k: f64) -> Result<Self, StatsError> {
        if !k.is_finite() || k <= 0.0 {
            return Err(StatsError::InvalidArgument(
                "chi-square requires finite degrees of freedom > 0",
            ));
        }
        Ok(Self { k })
    }

    #[must_use]
    pub fn sf(&self, x: f64) -> f64 {
        gamma_q(0.5 * self.k, 0.5 * x)
    }

    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        1.0 - self.sf(x)
    }
}

/// Fisher-Snedecor F distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FisherF {
    d1: f64,
    d2: f64,
}

impl FisherF {
    pub fn new(d1: f64, d2: f64) -> Result<Self, StatsError> {
        if !d1.is_finite() || !d2.is_finite() || d1 <= 0.0 || d2 <= 0.0 {
            return Err(StatsError::InvalidArgument(
                "F distribution requires finite d1 > 0 and d2 > 0",
            ));
        }
        Ok(Self { d1, d2 })
    }

    #[must_use]
    pub fn sf(&self, f: f64) -> f64 {
        if f <= 0.0 {
            return 1.0;
        }
        beta_reg(
            0.5 * self.d2,
            0.5 * self.d1,
            self.d2 / (self.d2 + self.d1 * f),
        )
    }

    #[must_use]
    pub fn cdf(&self, f: f64) -> f64 {
        1.0 - self.sf(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binomial {
    n: u64,
    p: f64,
}

impl Binomial {
    pub fn new(n: u64, p: f64) -> Result<Self, StatsError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(StatsError::InvalidArgument(
                "binomial success probability must lie in [0, 1]",
            ));
        }
        Ok(Self { n, p })
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.n as f64 * self.p
    }

    #[must_use]
    pub fn variance(&self) -> f64 {
        self.n as f64 * self.p * (1.0 - self.p)
    }

    #[must_use]
    pub fn pmf(&self, k: u64) -> f64 {
        if k > self.n {
            return 0.0;
        }
        if self.p == 0.0 {
            return if k == 0 { 1.0 } else { 0.0 };
        }
        if self.p == 1.0 {
            return if k == self.n { 1.0 } else { 0.0 };
        }
        let k_f = k as f64;
        let rest = (self.n - k) as f64;
        (ln_choose(self.n, k) + k_f * self.p.ln() + rest * (-self.p).ln_1p()).exp()
    }

    #[must_use]
    pub fn cdf(&self, k: u64) -> f64 {
        if k >= self.n {
            return 1.0;
        }
        (0..=k).map(|i| self.pmf(i)).sum::<f64>().min(1.0)
    }

    /// P(X > k).
    #[must_use]
    pub fn sf(&self, k: u64) -> f64 {
        if k >= self.n {
            return 0.0;
        }
        ((k + 1)..=self.n).map(|i| self.pmf(i)).sum::<f64>().min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Poisson {
    lambda: f64,
}

impl Poisson {
    pub fn new(lambda: f64) -> Result<Self, StatsError> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(StatsError::InvalidArgument(
                "poisson rate must be finite and > 0",
            ));
        }
        Ok(Self { lambda })
    }

    #[must_use]
    pub fn pmf(&self, k: u64) -> f64 {
        let k_f = k as f64;
        (k_f * self.lambda.ln() - self.lambda - ln_gamma(k_f + 1.0)).exp()
    }

    #[must_use]
    pub fn cdf(&self, k: u64) -> f64 {
        gamma_q(k as f64 + 1.0, self.lambda)
    }
}

/// Draws without replacement: `population` items, `successes` of which are
/// marked, `draws` taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypergeometric {
    population: u64,
    successes: u64,
    draws: u64,
}

impl Hypergeometric {
    pub fn new(population: u64, successes: u64, draws: u64) -> Result<Self, StatsError> {
        if successes > population {
            return Err(StatsError::InvalidArgument(
                "hypergeometric successes must not exceed population",
            ));
        }
        if draws > population {
            return Err(StatsError::InvalidArgument(
                "hypergeometric draws must not exceed population",
            ));
        }
        Ok(Self {
            population,
            successes,
            draws,
        })
    }

    #[must_use]
    pub fn pmf(&self, k: u64) -> f64 {
        let failures = self.population - self.successes;
        if k > self.successes || k > self.draws || self.draws - k > failures {
            return 0.0;
        }
        (ln_choose(self.successes, k) + ln_choose(failures, self.draws - k)
            - ln_choose(self.population, self.draws))
        .exp()
    }

    #[must_use]
    pub fn cdf(&self, k: u64) -> f64 {
        (0..=k.min(self.draws))
            .map(|i| self.pmf(i))
            .sum::<f64>()
            .min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Binomial, ChiSquared, FisherF, Hypergeometric, Normal, NoncentralT, Poisson, StudentT,
        standard_normal_cdf, standard_normal_ppf,
    };

    fn approx_equal(lhs: f64, rhs: f64, tol: f64) -> bool {
        (lhs - rhs).abs() <= tol
    }

    #[test]
    fn normal_ppf_reference_quantiles() {
        let cases = [
            (0.95, 1.644_853_626_951_472),
            (0.975, 1.959_963_984_540_054),
            (0.9, 1.281_551_565_544_601),
            (0.001, -3.090_232_306_167_813),
        ];
        for (p, expected) in cases {
            let got = standard_normal_ppf(p).expect("valid probability");
            assert!(approx_equal(got, expected, 1e-9), "p={p} got={got}");
        }
    }

    #[test]
    fn normal_ppf_inverts_cdf_across_grid() {
        for step in 1_u32..200 {
            let p = f64::from(step) / 200.0;
            let z = standard_normal_ppf(p).expect("valid probability");
            assert!(
                approx_equal(standard_normal_cdf(z), p, 1e-12),
                "p={p} z={z}"
            );
        }
    }

    #[test]
    fn normal_ppf_rejects_closed_endpoints() {
        for p in [0.0, 1.0, -0.2, f64::NAN] {
            let err = standard_normal_ppf(p).expect_err("endpoint must fail");
            assert_eq!(err.reason_code(), "stats_invalid_argument");
        }
    }

    #[test]
    fn service_level_example_matches_table_value() {
        let demand = Normal::new(75.0, 25.0).expect("valid normal");
        assert!(approx_equal(demand.cdf(90.0), 0.725_746_882_249_926_6, 1e-10));
        assert!(approx_equal(demand.cdf(80.0) + demand.sf(80.0), 1.0, 1e-15));
        assert!(Normal::new(75.0, 0.0).is_err());
    }

    #[test]
    fn student_t_quantiles_and_tails() {
        let t12 = StudentT::new(12.0).expect("df");
        assert!(approx_equal(t12.ppf(0.975).expect("ppf"), 2.178_812_829_667_228, 1e-8));
        let t9 = StudentT::new(9.0).expect("df");
        assert!(approx_equal(t9.ppf(0.95).expect("ppf"), 1.833_112_932_656_233, 1e-8));
        let t5 = StudentT::new(5.0).expect("df");
        assert!(approx_equal(t5.cdf(2.0), 0.949_030_260_585_070_8, 1e-10));
        assert!(approx_equal(t5.cdf(-2.0) + t5.sf(-2.0), 1.0, 1e-14));
        assert_eq!(t5.ppf(0.5).expect("median"), 0.0);
    }

    #[test]
    fn noncentral_t_reduces_to_central_when_nc_is_zero() {
        let central = StudentT::new(7.0).expect("df");
        let nct = NoncentralT::new(7.0, 0.0).expect("nct");
        for t in [-2.5, -0.3, 0.0, 0.8, 3.1] {
            assert!(approx_equal(nct.cdf(t), central.cdf(t), 1e-12), "t={t}");
        }
    }

    #[test]
    fn noncentral_t_matches_quadrature_reference() {
        let cases = [
            (1.833, 9.0, 2.53, 0.245_490_239_873_48),
            (2.0, 5.0, 1.0, 0.778_074_662_616_15),
            (-1.0, 7.0, 0.5, 0.078_102_202_200_87),
        ];
        for (t, df, nc, expected) in cases {
            let dist = NoncentralT::new(df, nc).expect("nct");
            assert!(
                approx_equal(dist.cdf(t), expected, 1e-9),
                "t={t} df={df} nc={nc} got={}",
                dist.cdf(t)
            );
        }
    }

    #[test]
    fn chi_square_and_f_reference_tails() {
        let chi1 = ChiSquared::new(1.0).expect("df");
        assert!(approx_equal(chi1.sf(3.84), 0.050_043_521_248_705, 1e-10));
        let chi2 = ChiSquared::new(2.0).expect("df");
        assert!(approx_equal(chi2.sf(4.0), (-2.0_f64).exp(), 1e-13));
        let f = FisherF::new(1.0, 10.0).expect("df");
        assert!(approx_equal(f.sf(4.0), 0.073_388_034_770_740_6, 1e-10));
        assert_eq!(f.sf(0.0), 1.0);
    }

    #[test]
    fn binomial_tails_are_complementary() {
        let dist = Binomial::new(100, 0.3).expect("binomial");
        let k = 25;
        let pmf = dist.pmf(k);
        let cdf = dist.cdf(k);
        assert!((0.0..=1.0).contains(&pmf));
        assert!(cdf >= pmf);
        assert!(approx_equal(1.0 - dist.cdf(k - 1), dist.sf(k - 1), 1e-12));
        assert!(approx_equal(dist.mean(), 30.0, 1e-12));
        assert!(Binomial::new(10, 1.5).is_err());
    }

    #[test]
    fn poisson_approximates_rare_binomial() {
        let binomial = Binomial::new(1000, 0.01).expect("binomial");
        let poisson = Poisson::new(10.0).expect("poisson");
        let b = binomial.pmf(10);
        let p = poisson.pmf(10);
        assert!((b - p).abs() <= 0.1 * p, "binomial={b} poisson={p}");
        let summed: f64 = (0..=10).map(|k| poisson.pmf(k)).sum();
        assert!(approx_equal(poisson.cdf(10), summed, 1e-12));
    }

    #[test]
    fn hypergeometric_single_draw_is_a_ratio() {
        let dist = Hypergeometric::new(300, 65, 1).expect("hypergeometric");
        assert!(approx_equal(dist.pmf(1), 65.0 / 300.0, 1e-12));
        let total: f64 = (0..=5).map(|k| Hypergeometric::new(20, 7, 5).expect("h").pmf(k)).sum();
        assert!(approx_equal(total, 1.0, 1e-12));
        assert!(Hypergeometric::new(10, 11, 2).is_err());
        assert!(Hypergeometric::new(10, 3, 11).is_err());
    }
}
