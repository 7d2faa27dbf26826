//! Ordinary Least Squares
//!
//! Small dense OLS solver used by the Engle-Granger test, the hedge-ratio
//! fit and the OU discretisation. Designs here have at most a couple of
//! dozen columns, so the normal equations are solved directly with
//! Gauss-Jordan elimination after Jacobi scaling (unit diagonal).

use thiserror::Error;

/// Pivot below this (on the unit-diagonal scaled system) is treated as singular
const SINGULAR_PIVOT: f64 = 1e-10;

/// Regression failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    #[error("Too few observations: {observations} for {parameters} parameters")]
    TooFewObservations {
        observations: usize,
        parameters: usize,
    },
    #[error("Regressor is constant or nearly constant")]
    DegenerateRegressor,
    #[error("Singular design matrix")]
    Singular,
    #[error("Length mismatch: {0} vs {1}")]
    LengthMismatch(usize, usize),
    #[error("Non-finite value in regression input")]
    NonFinite,
}

/// Result of an OLS fit
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// One coefficient per design column, in column order
    pub coefficients: Vec<f64>,
    /// Classical (homoskedastic) standard errors
    pub std_errors: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Sum of squared residuals
    pub ssr: f64,
    /// Centered R², 1.0 when the dependent variable is constant and fit exactly
    pub r_squared: f64,
    pub nobs: usize,
}

impl OlsFit {
    /// t-statistic of coefficient `i`
    pub fn t_value(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }

    /// Akaike information criterion from the Gaussian log-likelihood
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let k = self.coefficients.len() as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * k
    }

    /// Population standard deviation of the residuals
    pub fn residual_std(&self) -> f64 {
        let n = self.residuals.len() as f64;
        let mean = self.residuals.iter().sum::<f64>() / n;
        (self.residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt()
    }
}

/// Regress `y` on the given design columns.
///
/// No intercept is added; pass a column of ones (see [`ones`]) when needed.
pub fn ols(y: &[f64], columns: &[&[f64]]) -> Result<OlsFit, EstimationError> {
    let n = y.len();
    let k = columns.len();

    for col in columns {
        if col.len() != n {
            return Err(EstimationError::LengthMismatch(n, col.len()));
        }
    }
    if n <= k {
        return Err(EstimationError::TooFewObservations {
            observations: n,
            parameters: k,
        });
    }
    if y.iter().chain(columns.iter().flat_map(|c| c.iter())).any(|v| !v.is_finite()) {
        return Err(EstimationError::NonFinite);
    }

    // Normal equations X'X b = X'y
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in i..k {
            let v: f64 = columns[i].iter().zip(columns[j].iter()).map(|(a, b)| a * b).sum();
            xtx[i][j] = v;
            xtx[j][i] = v;
        }
        xty[i] = columns[i].iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    }

    let inverse = invert_symmetric(&xtx)?;

    let coefficients: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inverse[i][j] * xty[j]).sum())
        .collect();

    let residuals: Vec<f64> = (0..n)
        .map(|t| {
            let fitted: f64 = (0..k).map(|j| coefficients[j] * columns[j][t]).sum();
            y[t] - fitted
        })
        .collect();

    let ssr: f64 = residuals.iter().map(|r| r * r).sum();
    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|i| (sigma2 * inverse[i][i]).sqrt()).collect();

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = if tss > 0.0 { 1.0 - ssr / tss } else { 1.0 };

    Ok(OlsFit {
        coefficients,
        std_errors,
        residuals,
        ssr,
        r_squared,
        nobs: n,
    })
}

/// Column of ones for an intercept term
pub fn ones(n: usize) -> Vec<f64> {
    vec![1.0; n]
}

/// Invert a symmetric positive semi-definite matrix, failing if singular.
fn invert_symmetric(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, EstimationError> {
    let k = matrix.len();

    // Jacobi scaling so the pivot tolerance is independent of column units
    let mut scale = Vec::with_capacity(k);
    for (i, row) in matrix.iter().enumerate() {
        let d = row[i];
        if !(d > 0.0) {
            return Err(EstimationError::Singular);
        }
        scale.push(1.0 / d.sqrt());
    }

    let mut a: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| matrix[i][j] * scale[i] * scale[j]).collect())
        .collect();
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot_row = (col..k)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < SINGULAR_PIVOT {
            return Err(EstimationError::Singular);
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..k {
            a[col][j] /= pivot;
            inv[col][j] /= pivot;
        }

        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Ok((0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * scale[i] * scale[j]).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_line() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 2.0 * v).collect();
        let fit = ols(&y, &[&ones(10), &x]).unwrap();

        assert_relative_eq!(fit.coefficients[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients[1], 2.0, epsilon = 1e-9);
        assert!(fit.ssr < 1e-18);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_standard_errors_match_textbook() {
        // y = [1, 3, 2, 5, 4] on x = [1..5] with intercept
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        let fit = ols(&y, &[&ones(5), &x]).unwrap();

        // slope = Sxy / Sxx = 8 / 10
        assert_relative_eq!(fit.coefficients[1], 0.8, epsilon = 1e-12);
        assert_relative_eq!(fit.coefficients[0], 0.6, epsilon = 1e-12);
        // ssr = 3.6, sigma² = 1.2, se(slope) = sqrt(1.2 / 10)
        assert_relative_eq!(fit.ssr, 3.6, epsilon = 1e-12);
        assert_relative_eq!(fit.std_errors[1], (0.12f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_collinear_columns_are_singular() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let x2 = [2.0, 4.0, 6.0, 8.0];
        let y = [1.0, 2.0, 3.0, 5.0];
        assert_eq!(ols(&y, &[&x, &x2]).unwrap_err(), EstimationError::Singular);
    }

    #[test]
    fn test_constant_regressor_with_intercept_is_singular() {
        let x = [4.2; 6];
        let y = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(ols(&y, &[&ones(6), &x]).unwrap_err(), EstimationError::Singular);
    }

    #[test]
    fn test_too_few_observations() {
        let err = ols(&[1.0, 2.0], &[&[1.0, 1.0], &[0.0, 1.0]]).unwrap_err();
        assert!(matches!(err, EstimationError::TooFewObservations { .. }));
    }

    #[test]
    fn test_nan_rejected() {
        let err = ols(&[1.0, f64::NAN, 3.0], &[&[1.0, 2.0, 3.0]]).unwrap_err();
        assert_eq!(err, EstimationError::NonFinite);
    }

    #[test]
    fn test_aic_gaussian_likelihood() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        let fit = ols(&y, &[&ones(5), &x]).unwrap();

        let expected = 5.0 * ((2.0 * std::f64::consts::PI).ln() + (3.6f64 / 5.0).ln() + 1.0) + 4.0;
        assert_relative_eq!(fit.aic(), expected, epsilon = 1e-10);
    }
}
