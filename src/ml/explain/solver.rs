//! Dense linear algebra for the Kernel SHAP regression.

use ndarray::{Array2, ArrayView2};
use thiserror::Error;

const PIVOT_EPSILON: f64 = 1e-12;
const RIDGE: f64 = 1e-8;

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error("Matrix is {rows}x{cols}; expected a square system")]
    NotSquare { rows: usize, cols: usize },
    #[error("Right-hand side has {found} entries, expected {expected}")]
    RhsLength { expected: usize, found: usize },
    #[error("Design has {rows} rows but {targets} targets and {weights} weights")]
    ObservationMismatch {
        rows: usize,
        targets: usize,
        weights: usize,
    },
    #[error("System is singular")]
    Singular,
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
pub fn solve_linear_system(matrix: ArrayView2<'_, f64>, rhs: &[f64]) -> Result<Vec<f64>, SolveError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(SolveError::NotSquare { rows, cols });
    }
    if rhs.len() != rows {
        return Err(SolveError::RhsLength {
            expected: rows,
            found: rhs.len(),
        });
    }
    let n = rows;
    let mut a = matrix.to_owned();
    let mut b = rhs.to_vec();
    let scale = a.iter().fold(0.0f64, |acc, v| acc.max(v.abs())).max(1.0);

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() <= PIVOT_EPSILON * scale {
            return Err(SolveError::Singular);
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}

/// Minimise `sum_i w_i (t_i - X_i . beta)^2` through the normal equations.
///
/// Rank-deficient designs are retried with a small ridge on the diagonal.
pub fn weighted_least_squares(
    design: ArrayView2<'_, f64>,
    targets: &[f64],
    weights: &[f64],
) -> Result<Vec<f64>, SolveError> {
    let (rows, cols) = design.dim();
    if targets.len() != rows || weights.len() != rows {
        return Err(SolveError::ObservationMismatch {
            rows,
            targets: targets.len(),
            weights: weights.len(),
        });
    }
    let mut normal = Array2::<f64>::zeros((cols, cols));
    let mut rhs = vec![0.0; cols];
    for (i, row) in design.outer_iter().enumerate() {
        let w = weights[i];
        if w == 0.0 {
            continue;
        }
        for a in 0..cols {
            let wa = w * row[a];
            rhs[a] += wa * targets[i];
            for b in a..cols {
                normal[[a, b]] += wa * row[b];
            }
        }
    }
    for a in 0..cols {
        for b in 0..a {
            normal[[a, b]] = normal[[b, a]];
        }
    }

    match solve_linear_system(normal.view(), &rhs) {
        Err(SolveError::Singular) => {
            let trace: f64 = (0..cols).map(|i| normal[[i, i]]).sum();
            let ridge = RIDGE * (trace / cols.max(1) as f64).max(1.0);
            for i in 0..cols {
                normal[[i, i]] += ridge;
            }
            solve_linear_system(normal.view(), &rhs)
        }
        other => other,
    }
}
