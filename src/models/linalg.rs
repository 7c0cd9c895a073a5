//! Small dense linear-algebra helpers shared by the linear and Bayesian
//! estimators.
use ndarray::{Array1, Array2};

/// Solve the symmetric positive-definite system `a * x = b` by Cholesky
/// decomposition. Returns `None` when `a` is not positive definite.
pub(crate) fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // a = l * l^T
    let mut l = Array2::<f64>::zeros((n, n));
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

    // l * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // l^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
/// Fallback path for systems where Cholesky fails.
pub(crate) fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // Augmented matrix [m | I]
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }
        if aug[[max_row, col]].abs() < 1e-12 {
            return None;
        }
        if max_row != col {
            for j in 0..2 * n {
                let tmp = aug[[col, j]];
                aug[[col, j]] = aug[[max_row, j]];
                aug[[max_row, j]] = tmp;
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[[row, col]];
            if factor != 0.0 {
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Some(inv)
}

/// Solve `a * x = b` for symmetric `a`, preferring Cholesky and falling back
/// to an explicit inverse with a small ridge on the diagonal.
pub(crate) fn solve_symmetric(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    if let Some(x) = cholesky_solve(a, b) {
        return Some(x);
    }
    let n = a.nrows();
    let mut a_reg = a.clone();
    let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
    for k in 0..n {
        a_reg[[k, k]] += ridge.max(1e-12);
    }
    if let Some(x) = cholesky_solve(&a_reg, b) {
        return Some(x);
    }
    matrix_inverse(&a_reg).map(|inv| inv.dot(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cholesky_solve_identity() {
        let a = array![[1.0, 0.0], [0.0, 1.0]];
        let b = array![3.0, -2.0];
        let x = cholesky_solve(&a, &b).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-12);
        assert!((x[1] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_inverse_round_trip() {
        let m = array![[4.0, 1.0], [1.0, 3.0]];
        let inv = matrix_inverse(&m).unwrap();
        let prod = m.dot(&inv);
        assert!((prod[[0, 0]] - 1.0).abs() < 1e-9);
        assert!((prod[[1, 1]] - 1.0).abs() < 1e-9);
        assert!(prod[[0, 1]].abs() < 1e-9);
    }

    #[test]
    fn test_solve_symmetric_spd() {
        let a = array![[2.0, 0.5], [0.5, 1.0]];
        let b = array![1.0, 2.0];
        let x = solve_symmetric(&a, &b).unwrap();
        let r0 = 2.0 * x[0] + 0.5 * x[1];
        let r1 = 0.5 * x[0] + 1.0 * x[1];
        assert!((r0 - 1.0).abs() < 1e-9);
        assert!((r1 - 2.0).abs() < 1e-9);
    }
}
