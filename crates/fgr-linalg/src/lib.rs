#![forbid(unsafe_code)]

//! Normal equations for fitting a straight line `y = a + b·x` by least
//! squares.
//!
//! The abscissae are centred on their mean before the Gram matrix is formed,
//! so the system stays well conditioned for calendar-like `x` values and the
//! solved coefficients are `[level at x̄, slope]`.

pub const LINALG_REASON_CODES: [&str; 4] = [
    "linalg_length_mismatch",
    "linalg_empty_design",
    "linalg_singular_gram",
    "linalg_non_finite_input",
];

/// Relative determinant threshold, scaled by the magnitude of the two
/// diagonal products of the Gram matrix.
pub const SINGULARITY_RTOL: f64 = 64.0 * f64::EPSILON;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinAlgError {
    #[error("x has {x} rows but y has {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("design has no rows")]
    EmptyDesign,
    #[error("Gram matrix is singular; x takes a single value")]
    SingularGram,
    #[error("{0} must be finite")]
    NonFiniteInput(&'static str),
}

impl LinAlgError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::LengthMismatch { .. } => "linalg_length_mismatch",
            Self::EmptyDesign => "linalg_empty_design",
            Self::SingularGram => "linalg_singular_gram",
            Self::NonFiniteInput(_) => "linalg_non_finite_input",
        }
    }
}

/// Solution of a [`LineSystem`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCoefficients {
    /// Fitted value at the mean abscissa, which is also the mean response.
    pub level: f64,
    pub slope: f64,
}

impl LineCoefficients {
    /// Intercept at `x = 0` given the mean abscissa the system was centred on.
    #[must_use]
    pub fn intercept(&self, x_mean: f64) -> f64 {
        self.slope.mul_add(-x_mean, self.level)
    }
}

/// `XᵀX β = Xᵀy` for the centred design `[1, x - x̄]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSystem {
    gram: [[f64; 2]; 2],
    moment: [f64; 2],
    x_mean: f64,
}

impl LineSystem {
    pub fn assemble(x: &[f64], y: &[f64]) -> Result<Self, LinAlgError> {
        if x.len() != y.len() {
            return Err(LinAlgError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.is_empty() {
            return Err(LinAlgError::EmptyDesign);
        }
        if x.iter().any(|value| !value.is_finite()) {
            return Err(LinAlgError::NonFiniteInput("x"));
        }
        if y.iter().any(|value| !value.is_finite()) {
            return Err(LinAlgError::NonFiniteInput("y"));
        }

        let n = x.len() as f64;
        let x_mean = x.iter().sum::<f64>() / n;
        let (mut sum_dx, mut sum_dx2, mut sum_y, mut sum_dxy) = (0.0, 0.0, 0.0, 0.0);
        for (xi, yi) in x.iter().zip(y) {
            let dx = xi - x_mean;
            sum_dx += dx;
            sum_dx2 += dx * dx;
            sum_y += yi;
            sum_dxy += dx * yi;
        }

        Ok(Self {
            gram: [[n, sum_dx], [sum_dx, sum_dx2]],
            moment: [sum_y, sum_dxy],
            x_mean,
        })
    }

    #[must_use]
    pub fn x_mean(&self) -> f64 {
        self.x_mean
    }

    /// `Σ (x - x̄)²`.
    #[must_use]
    pub fn sxx(&self) -> f64 {
        self.gram[1][1]
    }

    #[must_use]
    pub fn determinant(&self) -> f64 {
        let [[a, b], [c, d]] = self.gram;
        a * d - b * c
    }

    fn is_singular(&self, det: f64) -> bool {
        let [[a, b], [c, d]] = self.gram;
        let scale = (a * d).abs() + (b * c).abs();
        scale == 0.0 || det.abs() <= SINGULARITY_RTOL * scale
    }

    /// Cramer's rule on the 2x2 Gram matrix.
    pub fn solve(&self) -> Result<LineCoefficients, LinAlgError> {
        let det = self.determinant();
        if self.is_singular(det) {
            return Err(LinAlgError::SingularGram);
        }
        let [[a, b], [c, d]] = self.gram;
        let [r0, r1] = self.moment;
        Ok(LineCoefficients {
            level: (r0 * d - b * r1) / det,
            slope: (a * r1 - r0 * c) / det,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{LINALG_REASON_CODES, LinAlgError, LineSystem};

    fn approx_equal(lhs: f64, rhs: f64, tol: f64) -> bool {
        (lhs - rhs).abs() <= tol
    }

    #[test]
    fn reason_codes_are_registered() {
        for err in [
            LinAlgError::LengthMismatch { x: 2, y: 1 },
            LinAlgError::EmptyDesign,
            LinAlgError::SingularGram,
            LinAlgError::NonFiniteInput("x"),
        ] {
            assert!(LINALG_REASON_CODES.contains(&err.reason_code()));
        }
    }

    #[test]
    fn exact_lines_are_recovered_for_every_slope_in_grid() {
        let x: Vec<f64> = (0..12).map(|i| 2000.0 + f64::from(i)).collect();
        for step in -20_i32..=20_i32 {
            let slope = f64::from(step) / 4.0;
            let intercept = f64::from(step * 3 + 7);
            let y: Vec<f64> = x.iter().map(|xi| intercept + slope * xi).collect();

            let system = LineSystem::assemble(&x, &y).expect("system");
            let coefficients = system.solve().expect("solve");
            assert!(
                approx_equal(coefficients.slope, slope, 1e-9),
                "step={step} slope={}",
                coefficients.slope
            );
            assert!(
                approx_equal(coefficients.intercept(system.x_mean()), intercept, 1e-6),
                "step={step} intercept={}",
                coefficients.intercept(system.x_mean())
            );
        }
    }

    #[test]
    fn centred_gram_is_diagonal() {
        let system = LineSystem::assemble(&[1.0, 2.0, 3.0, 6.0], &[0.0, 1.0, 0.0, 1.0])
            .expect("system");
        assert!(approx_equal(system.x_mean(), 3.0, 1e-12));
        assert!(approx_equal(system.sxx(), 14.0, 1e-12));
        assert!(approx_equal(system.determinant(), 4.0 * 14.0, 1e-9));
    }

    #[test]
    fn level_is_mean_response() {
        let system =
            LineSystem::assemble(&[1.0, 2.0, 4.0], &[3.0, 1.0, 8.0]).expect("system");
        let coefficients = system.solve().expect("solve");
        assert!(approx_equal(coefficients.level, 4.0, 1e-12));
    }

    #[test]
    fn degenerate_designs_are_rejected() {
        let err = LineSystem::assemble(&[1.0, 2.0], &[1.0]).expect_err("length mismatch");
        assert_eq!(err.reason_code(), "linalg_length_mismatch");
        assert_eq!(err.to_string(), "x has 2 rows but y has 1");

        let err = LineSystem::assemble(&[], &[]).expect_err("empty");
        assert_eq!(err.reason_code(), "linalg_empty_design");

        let err = LineSystem::assemble(&[1.0, f64::NAN], &[1.0, 2.0]).expect_err("nan x");
        assert_eq!(err, LinAlgError::NonFiniteInput("x"));

        let err = LineSystem::assemble(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0])
            .and_then(|system| system.solve())
            .expect_err("constant design");
        assert_eq!(err.reason_code(), "linalg_singular_gram");
    }

    #[test]
    fn tiny_spread_is_not_mistaken_for_singularity() {
        let x = [1e-6, 2e-6, 3e-6];
        let y = [1.0, 2.0, 3.0];
        let coefficients = LineSystem::assemble(&x, &y)
            .and_then(|system| system.solve())
            .expect("solve");
        assert!(approx_equal(coefficients.slope, 1e6, 1e-3));
    }
}
