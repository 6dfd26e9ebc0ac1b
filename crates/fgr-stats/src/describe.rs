//! Descriptive statistics over `f64` samples.

use crate::{StatsError, require_finite, require_len};

pub fn mean(values: &[f64]) -> Result<f64, StatsError> {
    require_len(values, "mean", 1)?;
    require_finite(values, "mean requires finite values")?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Result<f64, StatsError> {
    require_len(values, "median", 1)?;
    require_finite(values, "median requires finite values")?;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok(0.5 * (sorted[mid - 1] + sorted[mid]))
    } else {
        Ok(sorted[mid])
    }
}

/// Sample variance with `n - 1` in the denominator.
pub fn variance(values: &[f64]) -> Result<f64, StatsError> {
    require_len(values, "variance", 2)?;
    let m = mean(values)?;
    let ss = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>();
    Ok(ss / (values.len() - 1) as f64)
}

pub fn std_dev(values: &[f64]) -> Result<f64, StatsError> {
    Ok(variance(values)?.sqrt())
}

fn central_moments(values: &[f64]) -> Result<(f64, f64, f64), StatsError> {
    let m = mean(values)?;
    let n = values.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for value in values {
        let d = value - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    Ok((m2 / n, m3 / n, m4 / n))
}

/// Biased sample skewness `g1 = m3 / m2^(3/2)`.
pub fn skewness(values: &[f64]) -> Result<f64, StatsError> {
    require_len(values, "skewness", 3)?;
    let (m2, m3, _) = central_moments(values)?;
    if m2 <= 0.0 {
        return Err(StatsError::DegenerateSample("skewness of a constant sample"));
    }
    Ok(m3 / m2.powf(1.5))
}

/// Biased Pearson kurtosis `b2 = m4 / m2²` (3 for a normal population).
pub fn kurtosis(values: &[f64]) -> Result<f64, StatsError> {
    require_len(values, "kurtosis", 4)?;
    let (m2, _, m4) = central_moments(values)?;
    if m2 <= 0.0 {
        return Err(StatsError::DegenerateSample("kurtosis of a constant sample"));
    }
    Ok(m4 / (m2 * m2))
}

/// Standard scores using the population standard deviation.
///
/// A constant sample has no spread; every score is reported as zero.
pub fn z_scores(values: &[f64]) -> Result<Vec<f64>, StatsError> {
    let (m2, _, _) = central_moments(values)?;
    let m = mean(values)?;
    if m2 <= 0.0 {
        return Ok(vec![0.0; values.len()]);
    }
    let sd = m2.sqrt();
    Ok(values.iter().map(|v| (v - m) / sd).collect())
}

pub fn pearson_r(x: &[f64], y: &[f64]) -> Result<f64, StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::InvalidArgument(
            "pearson_r requires equal-length samples",
        ));
    }
    require_len(x, "pearson_r", 2)?;
    let mx = mean(x)?;
    let my = mean(y)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return Err(StatsError::DegenerateSample(
            "correlation with a constant sample",
        ));
    }
    Ok(sxy / (sxx * syy).sqrt())
}

/// Uncentred autocorrelation at `lag`: `Σ x[t]·x[t+lag] / Σ x[t]²`.
///
/// Intended for residual series, which are already centred on zero.
pub fn lag_autocorrelation(values: &[f64], lag: usize) -> Result<f64, StatsError> {
    require_len(values, "lag_autocorrelation", lag + 1)?;
    require_finite(values, "autocorrelation requires finite values")?;
    let energy = values.iter().map(|v| v * v).sum::<f64>();
    if energy <= 0.0 {
        return Err(StatsError::DegenerateSample(
            "autocorrelation of an all-zero series",
        ));
    }
    let cross = values
        .iter()
        .zip(values.iter().skip(lag))
        .map(|(a, b)| a * b)
        .sum::<f64>();
    Ok(cross / energy)
}

/// Durbin-Watson statistic `Σ (e[t] - e[t-1])² / Σ e[t]²`.
pub fn durbin_watson(residuals: &[f64]) -> Result<f64, StatsError> {
    require_len(residuals, "durbin_watson", 2)?;
    require_finite(residuals, "durbin_watson requires finite residuals")?;
    let energy = residuals.iter().map(|e| e * e).sum::<f64>();
    if energy <= 0.0 {
        return Err(StatsError::DegenerateSample(
            "durbin_watson of all-zero residuals",
        ));
    }
    let diffs = residuals
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) * (pair[1] - pair[0]))
        .sum::<f64>();
    Ok(diffs / energy)
}

#[cfg(test)]
mod tests {
    use super::{
        durbin_watson, kurtosis, lag_autocorrelation, mean, median, pearson_r, skewness, std_dev,
        variance, z_scores,
    };

    fn approx_equal(lhs: f64, rhs: f64, tol: f64) -> bool {
        (lhs - rhs).abs() <= tol
    }

    #[test]
    fn location_and_spread() {
        let data = [685.0, 695.0, 701.0, 688.0, 692.0, 679.0, 683.0, 698.0, 691.0, 687.0];
        assert!(approx_equal(mean(&data).expect("mean"), 689.9, 1e-12));
        assert!(approx_equal(median(&data).expect("median"), 689.5, 1e-12));
        assert!(approx_equal(variance(&data).expect("var"), 422.9 / 9.0, 1e-9));
        assert!(approx_equal(
            std_dev(&data).expect("sd"),
            (422.9_f64 / 9.0).sqrt(),
            1e-9
        ));
        assert!(approx_equal(median(&[3.0, 1.0, 2.0]).expect("median"), 2.0, 0.0));
    }

    #[test]
    fn empty_and_non_finite_inputs_are_rejected() {
        assert_eq!(
            mean(&[]).expect_err("empty").reason_code(),
            "stats_insufficient_sample"
        );
        assert_eq!(
            mean(&[1.0, f64::NAN]).expect_err("nan").reason_code(),
            "stats_invalid_argument"
        );
        assert!(variance(&[1.0]).is_err());
    }

    #[test]
    fn shape_moments_of_symmetric_sample() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(approx_equal(skewness(&data).expect("skew"), 0.0, 1e-15));
        // m2 = 2, m4 = 6.8
        assert!(approx_equal(kurtosis(&data).expect("kurt"), 1.7, 1e-12));
        assert!(skewness(&[2.0, 2.0, 2.0]).is_err());
    }

    #[test]
    fn z_scores_use_population_spread() {
        let z = z_scores(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).expect("z");
        assert!(approx_equal(z[0], -1.5, 1e-12));
        assert!(approx_equal(z[7], 2.0, 1e-12));
        assert_eq!(z_scores(&[3.0, 3.0]).expect("constant"), vec![0.0, 0.0]);
    }

    #[test]
    fn correlation_measures() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!(approx_equal(pearson_r(&x, &[2.0, 4.0, 6.0, 8.0]).expect("r"), 1.0, 1e-12));
        assert!(approx_equal(pearson_r(&x, &[8.0, 6.0, 4.0, 2.0]).expect("r"), -1.0, 1e-12));
        assert!(pearson_r(&x, &[1.0, 2.0]).is_err());

        let alternating = [1.0, -1.0, 1.0, -1.0];
        assert!(approx_equal(
            lag_autocorrelation(&alternating, 1).expect("acf"),
            -0.75,
            1e-12
        ));
        // (4 * 3) / 4
        assert!(approx_equal(durbin_watson(&alternating).expect("dw"), 3.0, 1e-12));
        assert!(durbin_watson(&[0.0, 0.0]).is_err());
    }
}
