//! Sparse symmetric systems for the Newton step.
//!
//! A compressed-sparse-row matrix assembled from triplets and a conjugate
//! gradient solver. The Ricci energy Hessian is a weighted graph Laplacian,
//! symmetric positive semi-definite with the constant vector in its kernel, so
//! the solver can optionally keep right-hand side and iterates orthogonal to
//! the constants.

use nalgebra::DVector;

use crate::error::{MeshError, Result};

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    /// `row_ptr[i]..row_ptr[i + 1]` indexes the entries of row `i`.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Assemble from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            match (last, values.last_mut()) {
                (Some(prev), Some(acc)) if prev == (row, col) => *acc += val,
                _ => {
                    col_idx.push(col);
                    values.push(val);
                    row_ptr[row + 1] += 1;
                    last = Some((row, col));
                }
            }
        }

        // Per-row counts to offsets.
        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `y = A * x`.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        debug_assert_eq!(x.len(), self.cols, "vector dimension mismatch");

        DVector::from_iterator(
            self.rows,
            (0..self.rows).map(|i| {
                (self.row_ptr[i]..self.row_ptr[i + 1])
                    .map(|k| self.values[k] * x[self.col_idx[k]])
                    .sum::<f64>()
            }),
        )
    }
}

/// Subtract the mean from every entry.
pub fn remove_mean(x: &mut DVector<f64>) {
    if x.is_empty() {
        return;
    }
    let mean = x.mean();
    x.add_scalar_mut(-mean);
}

/// Conjugate gradient settings.
#[derive(Debug, Clone, Copy)]
pub struct ConjugateGradient {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Relative residual `|r| / |b|` at which to stop.
    pub tolerance: f64,
    /// Keep `b` and the iterates orthogonal to the constant vector.
    pub deflate_constants: bool,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            deflate_constants: false,
        }
    }
}

impl ConjugateGradient {
    /// Solve `A x = b` for symmetric positive (semi-)definite `A`, starting at zero.
    ///
    /// # Errors
    ///
    /// [`MeshError::ConvergenceFailed`] when the iteration budget runs out or
    /// the search direction degenerates before reaching the tolerance.
    pub fn solve(&self, a: &CsrMatrix, b: &DVector<f64>) -> Result<DVector<f64>> {
        let n = b.len();
        if a.nrows() != n || a.ncols() != n {
            return Err(MeshError::invalid_param(
                "matrix",
                format!("{}x{}", a.nrows(), a.ncols()),
                "must be square and match the right-hand side",
            ));
        }

        let mut rhs = b.clone();
        if self.deflate_constants {
            remove_mean(&mut rhs);
        }

        let mut x = DVector::zeros(n);
        let b_norm = rhs.norm();
        if b_norm < 1e-15 {
            return Ok(x);
        }

        let mut r = rhs;
        let mut p = r.clone();
        let mut r_norm_sq = r.dot(&r);

        for _ in 0..self.max_iterations {
            let ap = a.mul_vec(&p);
            let p_ap = p.dot(&ap);
            if p_ap.abs() < 1e-300 {
                break;
            }
            let alpha = r_norm_sq / p_ap;

            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &ap, 1.0);
            if self.deflate_constants {
                remove_mean(&mut r);
            }

            let new_r_norm_sq = r.dot(&r);
            if new_r_norm_sq.sqrt() / b_norm < self.tolerance {
                if self.deflate_constants {
                    remove_mean(&mut x);
                }
                return Ok(x);
            }

            let beta = new_r_norm_sq / r_norm_sq;
            p = &r + beta * &p;
            r_norm_sq = new_r_norm_sq;
        }

        Err(MeshError::ConvergenceFailed {
            iterations: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spd_2x2() -> CsrMatrix {
        // [ 4  1 ]
        // [ 1  3 ]
        CsrMatrix::from_triplets(2, 2, vec![(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)])
    }

    #[test]
    fn test_duplicates_are_summed() {
        let a = CsrMatrix::from_triplets(
            2,
            2,
            vec![(1, 1, 3.0), (0, 0, 2.0), (0, 1, 1.0), (0, 0, 2.0), (1, 0, 1.0)],
        );
        assert_eq!(a.nnz(), 4);
        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0]));
        assert!((y[0] - 5.0).abs() < 1e-12);
        assert!((y[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_rows() {
        let a = CsrMatrix::from_triplets(3, 3, vec![(2, 2, 1.0)]);
        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0, 2.0]));
        assert_eq!(y.as_slice(), &[0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_cg_spd() {
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let x = ConjugateGradient::default().solve(&a, &b).unwrap();

        assert!((x[0] - 1.0 / 11.0).abs() < 1e-8);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-8);
    }

    #[test]
    fn test_cg_singular_laplacian() {
        // Path graph 0 - 1 - 2 with unit weights; kernel = constants.
        let a = CsrMatrix::from_triplets(
            3,
            3,
            vec![
                (0, 0, 1.0),
                (0, 1, -1.0),
                (1, 0, -1.0),
                (1, 1, 2.0),
                (1, 2, -1.0),
                (2, 1, -1.0),
                (2, 2, 1.0),
            ],
        );
        let b = DVector::from_vec(vec![1.0, 0.0, -1.0]);
        let solver = ConjugateGradient {
            deflate_constants: true,
            ..Default::default()
        };
        let x = solver.solve(&a, &b).unwrap();

        assert!(x.sum().abs() < 1e-10);
        assert!((a.mul_vec(&x) - &b).norm() < 1e-8);
    }

    #[test]
    fn test_cg_budget_exhausted() {
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let solver = ConjugateGradient {
            max_iterations: 1,
            tolerance: 1e-14,
            deflate_constants: false,
        };
        assert!(matches!(
            solver.solve(&a, &b),
            Err(MeshError::ConvergenceFailed { iterations: 1 })
        ));
    }
}
