//! Simple linear regression by ordinary least squares.

use crate::{OracleError, require_finite, require_open_unit};
use fgr_linalg::{LinAlgError, LineSystem};
use fgr_stats::StudentT;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OlsFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Residual mean square `SSE / (n - 2)`.
    pub mse: f64,
    pub sxx: f64,
    pub x_mean: f64,
    pub n: usize,
}

impl OlsFit {
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    #[must_use]
    pub fn fitted(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|xi| self.predict(*xi)).collect()
    }

    /// `y - ŷ` for each observation; `x` and `y` are the fitted data.
    #[must_use]
    pub fn residuals(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(y)
            .map(|(xi, yi)| yi - self.predict(*xi))
            .collect()
    }

    fn residual_df(&self) -> f64 {
        self.n as f64 - 2.0
    }
}

fn linalg_error(err: LinAlgError) -> OracleError {
    match err {
        LinAlgError::SingularGram => {
            OracleError::SingularDesign("x must take at least two distinct values".into())
        }
        LinAlgError::NonFiniteInput(which) => OracleError::invalid(which, err.to_string()),
        other => OracleError::invalid("x", other.to_string()),
    }
}

pub fn ols_fit(x: &[f64], y: &[f64]) -> Result<OlsFit, OracleError> {
    if x.len() != y.len() {
        return Err(OracleError::invalid(
            "y",
            format!("length {} does not match x length {}", y.len(), x.len()),
        ));
    }
    if x.len() < 3 {
        return Err(OracleError::invalid(
            "x",
            format!("need at least 3 observations, got {}", x.len()),
        ));
    }

    let system = LineSystem::assemble(x, y).map_err(linalg_error)?;
    let coefficients = system.solve().map_err(linalg_error)?;
    let (level, slope) = (coefficients.level, coefficients.slope);
    let x_mean = system.x_mean();
    let intercept = coefficients.intercept(x_mean);

    let n = x.len();
    let mut sse = 0.0;
    let mut sst = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let residual = yi - (intercept + slope * xi);
        sse += residual * residual;
        sst += (yi - level) * (yi - level);
    }
    let r_squared = if sst > 0.0 { 1.0 - sse / sst } else { 1.0 };

    Ok(OlsFit {
        slope,
        intercept,
        r_squared,
        mse: sse / (n as f64 - 2.0),
        sxx: system.sxx(),
        x_mean,
        n,
    })
}

pub fn prediction_at(fit: &OlsFit, x_new: f64) -> Result<f64, OracleError> {
    Ok(fit.predict(require_finite("x_new", x_new)?))
}

/// Point prediction with the mean-response (confidence) interval and the
/// single-observation (prediction) interval at `x_new`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionIntervals {
    pub prediction: f64,
    pub confidence: (f64, f64),
    pub prediction_interval: (f64, f64),
}

pub fn intervals(fit: &OlsFit, x_new: f64, alpha: f64) -> Result<PredictionIntervals, OracleError> {
    let prediction = prediction_at(fit, x_new)?;
    require_open_unit("alpha", alpha)?;
    let t = StudentT::new(fit.residual_df())
        .and_then(|dist| dist.ppf(1.0 - alpha / 2.0))
        .map_err(|err| OracleError::from_stats("alpha", &err))?;

    let n = fit.n as f64;
    let leverage = 1.0 / n + (x_new - fit.x_mean).powi(2) / fit.sxx;
    let mean_half = t * (fit.mse * leverage).sqrt();
    let single_half = t * (fit.mse * (1.0 + leverage)).sqrt();
    Ok(PredictionIntervals {
        prediction,
        confidence: (prediction - mean_half, prediction + mean_half),
        prediction_interval: (prediction - single_half, prediction + single_half),
    })
}

#[cfg(test)]
mod tests {
    use super::{intervals, ols_fit, prediction_at};

    fn approx_equal(lhs: f64, rhs: f64, tol: f64) -> bool {
        (lhs - rhs).abs() <= tol
    }

    const HOURS: [f64; 14] = [
        3.0, 7.0, 2.0, 8.0, 1.0, 4.0, 6.0, 2.0, 3.0, 7.0, 5.0, 4.0, 5.0, 6.0,
    ];
    const SCORES: [f64; 14] = [
        45.0, 95.0, 35.0, 105.0, 25.0, 55.0, 85.0, 30.0, 40.0, 90.0, 70.0, 50.0, 75.0, 80.0,
    ];

    #[test]
    fn study_hours_fit() {
        let fit = ols_fit(&HOURS, &SCORES).expect("fit");
        assert!(approx_equal(fit.slope, 12.100_840_336_134_453, 1e-9));
        assert!(approx_equal(fit.intercept, 8.403_361_344_537_814, 1e-9));
        assert!(approx_equal(fit.r_squared, 0.980_518_252_317_004, 1e-9));
        assert!(approx_equal(fit.mse, 14.425_770_308_123_248, 1e-9));
        assert!(approx_equal(fit.sxx, 59.5, 1e-9));
        assert!(approx_equal(fit.x_mean, 4.5, 1e-12));
        assert_eq!(fit.n, 14);

        let residuals = fit.residuals(&HOURS, &SCORES);
        assert!(approx_equal(residuals.iter().sum::<f64>(), 0.0, 1e-9));
    }

    #[test]
    fn interval_bounds_at_new_point() {
        let fit = ols_fit(&HOURS, &SCORES).expect("fit");
        let bounds = intervals(&fit, 5.5, 0.05).expect("intervals");
        assert!(approx_equal(bounds.prediction, 74.957_983_193_277_3, 1e-9));
        assert!(approx_equal(bounds.confidence.0, 72.499_820_636_082_82, 1e-6));
        assert!(approx_equal(bounds.confidence.1, 77.416_145_750_471_78, 1e-6));
        assert!(approx_equal(bounds.prediction_interval.0, 66.325_200_003_001_26, 1e-6));
        assert!(approx_equal(bounds.prediction_interval.1, 83.590_766_383_553_34, 1e-6));
        assert!(bounds.prediction_interval.0 < bounds.confidence.0);
        assert!(prediction_at(&fit, f64::NAN).is_err());
        assert!(intervals(&fit, 5.5, 1.5).is_err());
    }

    #[test]
    fn degenerate_designs() {
        let err = ols_fit(&[2.0, 2.0, 2.0, 2.0], &[1.0, 2.0, 3.0, 4.0]).expect_err("flat x");
        assert_eq!(err.reason_code(), "oracle_singular_design");

        let err = ols_fit(&[1.0, 2.0], &[1.0, 2.0]).expect_err("n=2");
        assert_eq!(err.reason_code(), "oracle_invalid_parameter");
        assert!(ols_fit(&[1.0, 2.0, 3.0], &[1.0, 2.0]).is_err());

        let perfect = ols_fit(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]).expect("constant y");
        assert_eq!(perfect.r_squared, 1.0);
        assert!(approx_equal(perfect.slope, 0.0, 1e-12));
    }
}
