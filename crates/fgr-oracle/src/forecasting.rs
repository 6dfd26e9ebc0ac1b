//! Moving averages, simple exponential smoothing and forecast error metrics.

use crate::{OracleError, require_finite};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

fn require_series(parameter: &str, data: &[f64]) -> Result<(), OracleError> {
    if data.is_empty() {
        return Err(OracleError::invalid(parameter, "series is empty"));
    }
    for value in data {
        require_finite(parameter, *value)?;
    }
    Ok(())
}

/// Trailing moving average of `window` points. Weights, when given, apply
/// oldest to newest and must sum to 1. The first `window - 1` positions are
/// undefined (NaN).
pub fn moving_average(
    data: &[f64],
    window: usize,
    weights: Option<&[f64]>,
) -> Result<Vec<f64>, OracleError> {
    require_series("data", data)?;
    if window == 0 || window > data.len() {
        return Err(OracleError::invalid(
            "window",
            format!("must be between 1 and {}, got {window}", data.len()),
        ));
    }
    let weights = match weights {
        Some(weights) => {
            if weights.len() != window {
                return Err(OracleError::invalid(
                    "weights",
                    format!("expected {window} weights, got {}", weights.len()),
                ));
            }
            let total = weights.iter().sum::<f64>();
            if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(OracleError::invalid(
                    "weights",
                    format!("weights sum to {total}, not 1"),
                ));
            }
            weights.to_vec()
        }
        None => vec![1.0 / window as f64; window],
    };

    let mut out = vec![f64::NAN; window - 1];
    out.extend(data.windows(window).map(|span| {
        span.iter()
            .zip(&weights)
            .map(|(value, weight)| value * weight)
            .sum::<f64>()
    }));
    Ok(out)
}

/// Level recursion `s_t = alpha * x_t + (1 - alpha) * s_{t-1}` seeded with
/// the first observation.
pub fn exponential_smoothing(data: &[f64], alpha: f64) -> Result<Vec<f64>, OracleError> {
    require_series("data", data)?;
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(OracleError::invalid(
            "alpha",
            format!("must lie in (0, 1], got {alpha}"),
        ));
    }
    let mut level = data[0];
    let mut out = Vec::with_capacity(data.len());
    out.push(level);
    for value in &data[1..] {
        level = alpha * value + (1.0 - alpha) * level;
        out.push(level);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastAccuracy {
    /// Mean absolute percentage error, in percent.
    pub mape: f64,
    pub rmse: f64,
    pub mae: f64,
}

/// Error metrics over the positions where a forecast is defined; undefined
/// (NaN) forecasts from a warm-up window are left out.
pub fn forecast_accuracy(forecasts: &[f64], actuals: &[f64]) -> Result<ForecastAccuracy, OracleError> {
    if forecasts.len() != actuals.len() {
        return Err(OracleError::invalid(
            "forecasts",
            format!(
                "length {} does not match actuals length {}",
                forecasts.len(),
                actuals.len()
            ),
        ));
    }
    require_series("actuals", actuals)?;

    let mut count = 0_usize;
    let mut abs_pct = 0.0;
    let mut squared = 0.0;
    let mut absolute = 0.0;
    for (forecast, actual) in forecasts.iter().zip(actuals) {
        if forecast.is_nan() {
            continue;
        }
        require_finite("forecasts", *forecast)?;
        if *actual == 0.0 {
            return Err(OracleError::invalid(
                "actuals",
                "percentage error is undefined for a zero actual",
            ));
        }
        let error = actual - forecast;
        abs_pct += (error / actual).abs();
        squared += error * error;
        absolute += error.abs();
        count += 1;
    }
    if count == 0 {
        return Err(OracleError::invalid("forecasts", "no defined forecasts"));
    }
    let count = count as f64;
    Ok(ForecastAccuracy {
        mape: 100.0 * abs_pct / count,
        rmse: (squared / count).sqrt(),
        mae: absolute / count,
    })
}
