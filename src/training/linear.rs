//! Ordinary least squares regression

use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Cholesky factor of a symmetric positive-definite matrix, lower triangular.
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l: Array2<f64> = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Some(l)
}

/// Solve `A x = b` given the Cholesky factor of A, by forward then backward
/// substitution.
fn cholesky_substitute(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    x
}

/// Solve the normal equations `(X^T X) w = X^T y`. A near-singular Gram
/// matrix gets a small ridge on the diagonal and one retry.
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);
    let n = xtx.nrows();

    if let Some(l) = cholesky_factor(&xtx) {
        return Some(cholesky_substitute(&l, &xty));
    }

    let ridge = 1e-8 * xtx.diag().iter().map(|v| v.abs()).sum::<f64>().max(1.0) / n as f64;
    let mut regularized = xtx;
    for i in 0..n {
        regularized[[i, i]] += ridge;
    }
    cholesky_factor(&regularized).map(|l| cholesky_substitute(&l, &xty))
}

/// Linear regression fit by centered normal equations with an intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    is_fitted: bool,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(ScorecastError::Shape {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(ScorecastError::Fit("cannot fit on zero rows".to_string()));
        }

        // Center both sides so the intercept falls out of the solve.
        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ScorecastError::Fit("cannot fit on zero rows".to_string()))?;
        let y_mean = y.mean().unwrap_or(0.0);
        let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        let coefficients = solve_normal_equations(&x_centered, &y_centered).ok_or_else(|| {
            ScorecastError::Fit("normal equations are singular".to_string())
        })?;

        self.intercept = y_mean - coefficients.dot(&x_mean);
        self.coefficients = Some(coefficients);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(ScorecastError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(ScorecastError::Shape {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{}", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept)
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_exact_line() {
        // y = 2x + 1
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![3.0, 5.0, 7.0, 9.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[5.0]]).unwrap();
        assert!((pred[0] - 11.0).abs() < 1e-8);
    }

    #[test]
    fn test_two_features() {
        // y = 1*x0 + 2*x1 + 3
        let x = array![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, 1.0],
        ];
        let y = array![3.0, 4.0, 5.0, 6.0, 7.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-8);
        }
    }

    #[test]
    fn test_collinear_features_still_solve() {
        // Second column duplicates the first; ridge retry must kick in.
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(ScorecastError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        let mut model = LinearRegression::new();
        assert!(matches!(
            model.fit(&x, &y),
            Err(ScorecastError::Shape { .. })
        ));
    }
}
