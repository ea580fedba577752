//! Small dense solver for the ridge-regularised normal equations.

use super::model::FitError;

const PIVOT_TOLERANCE: f64 = 1e-12;

/// Row-major design matrix.
#[derive(Debug, Clone)]
pub struct Design {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Design {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let n = rows.len();
        let data = rows.into_iter().flatten().collect();
        Self {
            rows: n,
            cols,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Solve `(XᵀX + diag(penalty)) β = Xᵀy`.
    pub fn ridge_solve(&self, y: &[f64], penalty: &[f64]) -> Result<Vec<f64>, FitError> {
        let p = self.cols;
        let mut gram = vec![0.0; p * p];
        let mut rhs = vec![0.0; p];
        for (i, yi) in y.iter().enumerate().take(self.rows) {
            let row = self.row(i);
            for a in 0..p {
                rhs[a] += row[a] * yi;
                for b in 0..=a {
                    gram[a * p + b] += row[a] * row[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                gram[b * p + a] = gram[a * p + b];
            }
            gram[a * p + a] += penalty[a];
        }
        let lower = cholesky(&gram, p)?;
        Ok(cholesky_solve(&lower, p, &rhs))
    }

    pub fn apply(&self, beta: &[f64]) -> Vec<f64> {
        (0..self.rows).map(|i| dot(self.row(i), beta)).collect()
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Lower-triangular factor `L` with `A = L Lᵀ`.
fn cholesky(a: &[f64], n: usize) -> Result<Vec<f64>, FitError> {
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                // relative pivot tolerance
                let tol = PIVOT_TOLERANCE * a[i * n + i].abs();
                if sum.is_nan() || sum <= tol || !sum.is_finite() {
                    return Err(FitError::Singular);
                }
                l[i * n + i] = sum.sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }
    Ok(l)
}

fn cholesky_solve(l: &[f64], n: usize, b: &[f64]) -> Vec<f64> {
    // forward: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let s: f64 = (0..i).map(|k| l[i * n + k] * z[k]).sum();
        z[i] = (b[i] - s) / l[i * n + i];
    }
    // back: Lᵀ x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let s: f64 = (i + 1..n).map(|k| l[k * n + i] * x[k]).sum();
        x[i] = (z[i] - s) / l[i * n + i];
    }
    x
}
