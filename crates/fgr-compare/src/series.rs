//! Sequence-shaped answers: element-wise comparison, warm-up windows and
//! periodicity.

use crate::{ToleranceSpec, compare};
use fgr_report::VerificationCheck;

/// Element-wise comparison of a submitted series against a reference.
///
/// The first `warm_up` positions (window size minus one for a moving
/// average) must be undefined (NaN) in the submission and are not compared.
pub fn compare_series(
    name: impl Into<String>,
    actual: &[f64],
    expected: &[f64],
    tolerance: &ToleranceSpec,
    warm_up: usize,
) -> VerificationCheck {
    let name = name.into();
    if actual.len() != expected.len() {
        return VerificationCheck::failed(
            name,
            format!(
                "length mismatch: got {}, expected {}",
                actual.len(),
                expected.len()
            ),
        );
    }
    if warm_up > actual.len() {
        return VerificationCheck::failed(
            name,
            format!(
                "warm-up window {warm_up} exceeds series length {}",
                actual.len()
            ),
        );
    }

    if let Some(index) = actual[..warm_up].iter().position(|value| !value.is_nan()) {
        return VerificationCheck::failed(
            name,
            format!("position {index} should be undefined during the warm-up window"),
        );
    }

    for (index, (a, e)) in actual.iter().zip(expected).enumerate().skip(warm_up) {
        if !compare(*a, *e, tolerance) {
            return VerificationCheck::failed(
                name,
                format!(
                    "position {index}: actual {a} differs from expected {e} by more than {}",
                    tolerance.threshold(*e)
                ),
            );
        }
    }

    VerificationCheck::judged(
        name,
        true,
        format!("{} positions within tolerance", actual.len() - warm_up),
    )
}

/// Seasonal components repeat: `series[i] ≈ series[i + period]` for every `i`.
pub fn check_periodic(
    name: impl Into<String>,
    series: &[f64],
    period: usize,
    tolerance: &ToleranceSpec,
) -> VerificationCheck {
    let name = name.into();
    if period == 0 {
        return VerificationCheck::failed(name, "period must be positive");
    }
    if series.len() <= period {
        return VerificationCheck::failed(
            name,
            format!(
                "series of length {} is too short to repeat with period {period}",
                series.len()
            ),
        );
    }
    for (index, (head, tail)) in series.iter().zip(&series[period..]).enumerate() {
        if !compare(*tail, *head, tolerance) {
            return VerificationCheck::failed(
                name,
                format!(
                    "position {} = {tail} does not repeat position {index} = {head}",
                    index + period
                ),
            );
        }
    }
    VerificationCheck::judged(
        name,
        true,
        format!("series repeats with period {period}"),
    )
}

/// Additive decomposition: `trend + seasonal + residual ≈ original`.
///
/// Positions where any component is undefined (edge effects of a centred
/// moving average) are left out; at least one position must remain.
pub fn check_reconstruction(
    name: impl Into<String>,
    original: &[f64],
    trend: &[f64],
    seasonal: &[f64],
    residual: &[f64],
    tolerance: &ToleranceSpec,
) -> VerificationCheck {
    let name = name.into();
    let n = original.len();
    if trend.len() != n || seasonal.len() != n || residual.len() != n {
        return VerificationCheck::failed(
            name,
            format!(
                "component lengths {}/{}/{} do not match original length {n}",
                trend.len(),
                seasonal.len(),
                residual.len()
            ),
        );
    }

    let mut compared = 0_usize;
    for index in 0..n {
        let parts = [trend[index], seasonal[index], residual[index]];
        if parts.iter().any(|part| part.is_nan()) {
            continue;
        }
        let rebuilt = parts.iter().sum::<f64>();
        if !compare(rebuilt, original[index], tolerance) {
            return VerificationCheck::failed(
                name,
                format!(
                    "position {index}: components sum to {rebuilt}, original is {}",
                    original[index]
                ),
            );
        }
        compared += 1;
    }

    if compared == 0 {
        return VerificationCheck::failed(name, "no fully defined positions to reconstruct");
    }
    VerificationCheck::judged(name, true, format!("{compared} positions reconstruct"))
}

#[cfg(test)]
mod tests {
    use super::{check_periodic, check_reconstruction, compare_series};
    use crate::ToleranceSpec;
    use fgr_report::CheckOutcome;

    fn tol() -> ToleranceSpec {
        ToleranceSpec::absolute(1e-6).expect("tolerance")
    }

    #[test]
    fn warm_up_positions_are_skipped() {
        let expected = [f64::NAN, f64::NAN, 11.0, 12.0, 13.0];
        let actual = [f64::NAN, f64::NAN, 11.0, 12.0, 13.0];
        let check = compare_series("ma_3", &actual, &expected, &tol(), 2);
        assert_eq!(check.outcome, CheckOutcome::Passed);
    }

    #[test]
    fn defined_value_inside_warm_up_fails() {
        let expected = [f64::NAN, f64::NAN, 11.0];
        let actual = [10.0, f64::NAN, 11.0];
        let check = compare_series("ma_3", &actual, &expected, &tol(), 2);
        assert_eq!(check.outcome, CheckOutcome::Failed);
        assert_eq!(
            check.reason(),
            Some("position 0 should be undefined during the warm-up window")
        );
    }

    #[test]
    fn nan_after_warm_up_and_length_mismatch_fail() {
        let expected = [f64::NAN, 11.0, 12.0];
        let check = compare_series("ma_2", &[f64::NAN, f64::NAN, 12.0], &expected, &tol(), 1);
        assert_eq!(check.outcome, CheckOutcome::Failed);

        let check = compare_series("ma_2", &[f64::NAN, 11.0], &expected, &tol(), 1);
        assert_eq!(check.reason(), Some("length mismatch: got 2, expected 3"));
    }

    #[test]
    fn periodic_series() {
        let seasonal = [1.0, -2.0, 1.0, 1.0, -2.0, 1.0, 1.0, -2.0];
        assert_eq!(
            check_periodic("seasonal", &seasonal, 3, &tol()).outcome,
            CheckOutcome::Passed
        );
        let check = check_periodic("seasonal", &seasonal, 2, &tol());
        assert_eq!(check.outcome, CheckOutcome::Failed);
        assert_eq!(
            check.reason(),
            Some("position 3 = 1 does not repeat position 1 = -2")
        );
        assert_eq!(
            check_periodic("seasonal", &seasonal, 0, &tol()).outcome,
            CheckOutcome::Failed
        );
        assert_eq!(
            check_periodic("seasonal", &seasonal[..3], 3, &tol()).outcome,
            CheckOutcome::Failed
        );
    }

    #[test]
    fn reconstruction_skips_undefined_edges() {
        let original = [10.0, 12.0, 11.0, 13.0];
        let trend = [f64::NAN, 11.5, 11.75, f64::NAN];
        let seasonal = [-1.0, 0.5, -1.0, 0.5];
        let residual = [0.0, 0.0, 0.25, 0.0];
        let check = check_reconstruction("decomp", &original, &trend, &seasonal, &residual, &tol());
        assert_eq!(check.outcome, CheckOutcome::Passed);
        assert_eq!(check.reason(), Some("2 positions reconstruct"));

        let bad_residual = [0.0, 1.0, 0.25, 0.0];
        let check =
            check_reconstruction("decomp", &original, &trend, &seasonal, &bad_residual, &tol());
        assert_eq!(check.outcome, CheckOutcome::Failed);
    }
}
