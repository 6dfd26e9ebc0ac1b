//! Gamma, beta and error functions.
//!
//! Lanczos `ln_gamma`, Lentz continued fractions for the regularized
//! incomplete gamma and beta functions, and `erfc` routed through `Q(1/2, x²)`.
//! Accuracy is ~1e-14 relative across the ranges the distributions use.

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_13,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

const CF_EPS: f64 = 1e-15;
const CF_FPMIN: f64 = 1e-300;
const CF_MAX_ITER: usize = 500;

/// Natural log of |Γ(x)|.
#[must_use]
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        let reflected = (std::f64::consts::PI / (std::f64::consts::PI * x).sin().abs()).ln();
        return reflected - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let mut acc = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        acc += coeff / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

/// ln C(n, k). Returns `-inf` when `k > n`.
#[must_use]
pub fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if k == 0 || k == n {
        return 0.0;
    }
    let n = n as f64;
    let k = k as f64;
    ln_gamma(n + 1.0) - ln_gamma(k + 1.0) - ln_gamma(n - k + 1.0)
}

/// Lower regularized incomplete gamma function P(a, x).
#[must_use]
pub fn gamma_p(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x < a + 1.0 {
        gamma_series(a, x)
    } else {
        1.0 - gamma_continued_fraction(a, x)
    }
}

/// Upper regularized incomplete gamma function Q(a, x) = 1 - P(a, x).
#[must_use]
pub fn gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        1.0 - gamma_series(a, x)
    } else {
        gamma_continued_fraction(a, x)
    }
}

fn gamma_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut sum = 1.0 / a;
    let mut term = sum;
    for _ in 0..CF_MAX_ITER {
        ap += 1.0;
        term *= x / ap;
        sum += term;
        if term.abs() < sum.abs() * CF_EPS {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

fn gamma_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / CF_FPMIN;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..CF_MAX_ITER {
        let i = i as f64;
        let an = -i * (i - a);
        b += 2.0;
        d = clamp_tiny(an * d + b);
        c = clamp_tiny(b + an / c);
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < CF_EPS {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Regularized incomplete beta function I_x(a, b).
#[must_use]
pub fn beta_reg(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (-x).ln_1p();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / clamp_tiny(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..CF_MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let even = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / clamp_tiny(1.0 + even * d);
        c = clamp_tiny(1.0 + even / c);
        h *= d * c;

        let odd = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / clamp_tiny(1.0 + odd * d);
        c = clamp_tiny(1.0 + odd / c);
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < CF_EPS {
            break;
        }
    }
    h
}

fn clamp_tiny(value: f64) -> f64 {
    if value.abs() < CF_FPMIN {
        CF_FPMIN
    } else {
        value
    }
}

/// Complementary error function.
#[must_use]
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    gamma_q(0.5, x * x)
}

#[must_use]
pub fn erf(x: f64) -> f64 {
    1.0 - erfc(x)
}

#[cfg(test)]
mod tests {
    use super::{beta_reg, erf, erfc, gamma_p, gamma_q, ln_choose, ln_gamma};

    fn approx_equal(lhs: f64, rhs: f64, tol: f64) -> bool {
        (lhs - rhs).abs() <= tol
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        let mut factorial = 1.0_f64;
        for n in 1_u32..=20 {
            factorial *= f64::from(n);
            let got = ln_gamma(f64::from(n) + 1.0);
            assert!(
                approx_equal(got, factorial.ln(), 1e-10),
                "n={n} got={got} expected={}",
                factorial.ln()
            );
        }
    }

    #[test]
    fn ln_gamma_half_integer_and_reflection() {
        let sqrt_pi_ln = std::f64::consts::PI.sqrt().ln();
        assert!(approx_equal(ln_gamma(0.5), sqrt_pi_ln, 1e-12));
        assert!(approx_equal(ln_gamma(4.5), 2.453_736_570_842_442, 1e-12));
        assert!(approx_equal(ln_gamma(0.3), 1.095_797_994_818_075, 1e-12));
    }

    #[test]
    fn ln_choose_matches_small_binomials() {
        assert!(approx_equal(ln_choose(300, 3).exp(), 4_455_100.0, 1e-3));
        assert!(approx_equal(ln_choose(10, 0), 0.0, 0.0));
        assert_eq!(ln_choose(3, 4), f64::NEG_INFINITY);
    }

    #[test]
    fn incomplete_gamma_halves_sum_to_one() {
        for a in [0.5, 1.0, 2.5, 7.0, 30.0] {
            for x in [0.01, 0.5, 1.0, 3.0, 10.0, 50.0] {
                let total = gamma_p(a, x) + gamma_q(a, x);
                assert!(approx_equal(total, 1.0, 1e-12), "a={a} x={x} total={total}");
            }
        }
        // P(1, x) = 1 - e^{-x}
        assert!(approx_equal(gamma_p(1.0, 2.0), 1.0 - (-2.0_f64).exp(), 1e-13));
    }

    #[test]
    fn erfc_reference_values() {
        assert!(approx_equal(erfc(0.7), 0.322_198_806_162_581_6, 1e-13));
        assert!(approx_equal(erfc(3.1), 1.164_865_736_719_959e-5, 1e-15));
        assert!(approx_equal(erfc(-1.2), 1.910_313_978_229_635, 1e-13));
        assert!(approx_equal(erf(0.0), 0.0, 1e-15));
        assert!(erfc(f64::NAN).is_nan());
    }

    #[test]
    fn incomplete_beta_symmetry_and_endpoints() {
        assert_eq!(beta_reg(2.0, 3.0, 0.0), 0.0);
        assert_eq!(beta_reg(2.0, 3.0, 1.0), 1.0);
        for (a, b, x) in [(2.0, 3.0, 0.4), (0.5, 4.5, 0.2), (10.0, 0.5, 0.9)] {
            let lhs = beta_reg(a, b, x);
            let rhs = 1.0 - beta_reg(b, a, 1.0 - x);
            assert!(approx_equal(lhs, rhs, 1e-12), "a={a} b={b} x={x}");
        }
        // I_x(1, 1) = x
        assert!(approx_equal(beta_reg(1.0, 1.0, 0.37), 0.37, 1e-13));
    }
}
