//! linalg — dense helpers bridging `ndarray` storage and `nalgebra` solvers.
//!
//! Purpose
//! -------
//! Keep every factorization used by the VAR engines in one place. Public data
//! lives in `ndarray` containers; decompositions (Cholesky, LU, SVD, Schur)
//! are delegated to `nalgebra` by copying into a `DMatrix`, exactly once per
//! call.
//!
//! Conventions
//! -----------
//! - Functions returning `Option` signal numerical breakdown with `None`;
//!   callers map that to the domain error that explains the failure.
//! - No logging, no global state; safe to call from rayon workers.
use nalgebra::{Cholesky, Complex, DMatrix};
use ndarray::{Array2, ArrayBase, Data, Ix2};

/// Tolerance for treating a companion eigenvalue as a unit root.
pub const UNIT_ROOT_TOL: f64 = 1e-8;

/// Relative singular-value cutoff for rank and pseudo-inverse decisions.
pub const RANK_TOL: f64 = 1e-10;

/// Copy an `ndarray` matrix into a column-major `DMatrix`.
pub fn to_dmatrix<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> DMatrix<f64> {
    let (r, c) = a.dim();
    DMatrix::from_fn(r, c, |i, j| a[[i, j]])
}

/// Copy a `DMatrix` back into row-major `ndarray` storage.
pub fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Lower Cholesky factor `L` with `L·Lᵀ = a`, or `None` if `a` is not
/// strictly positive definite.
pub fn cholesky_lower<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> Option<Array2<f64>> {
    Cholesky::new(to_dmatrix(a)).map(|c| to_array2(&c.l()))
}

/// Solve `a·X = b` for symmetric positive definite `a`.
pub fn spd_solve<S, T>(a: &ArrayBase<S, Ix2>, b: &ArrayBase<T, Ix2>) -> Option<Array2<f64>>
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
{
    let chol = Cholesky::new(to_dmatrix(a))?;
    Some(to_array2(&chol.solve(&to_dmatrix(b))))
}

/// Inverse of a symmetric positive definite matrix.
pub fn spd_inverse<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> Option<Array2<f64>> {
    Cholesky::new(to_dmatrix(a)).map(|c| to_array2(&c.inverse()))
}

/// Solve a general square system with full pivoting.
pub fn lu_solve<S, T>(a: &ArrayBase<S, Ix2>, b: &ArrayBase<T, Ix2>) -> Option<Array2<f64>>
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
{
    let lu = to_dmatrix(a).full_piv_lu();
    lu.solve(&to_dmatrix(b)).map(|x| to_array2(&x))
}

/// Moore–Penrose pseudo-inverse with a relative singular-value cutoff.
pub fn pseudo_inverse<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> Option<Array2<f64>> {
    let m = to_dmatrix(a);
    let scale = m.amax().max(1.0);
    m.pseudo_inverse(RANK_TOL * scale).ok().map(|p| to_array2(&p))
}

/// Numerical rank via SVD with a relative cutoff.
pub fn rank<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> usize {
    let m = to_dmatrix(a);
    let scale = m.amax().max(1.0);
    m.rank(RANK_TOL * scale)
}

/// Eigenvalues of a real square matrix (possibly complex).
pub fn eigenvalues<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> Vec<Complex<f64>> {
    to_dmatrix(a).complex_eigenvalues().iter().copied().collect()
}

/// Kronecker product `a ⊗ b`.
pub fn kron<S, T>(a: &ArrayBase<S, Ix2>, b: &ArrayBase<T, Ix2>) -> Array2<f64>
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
{
    ndarray::linalg::kron(a, b)
}

/// `(a + aᵀ) / 2`, removing round-off asymmetry from covariance products.
pub fn symmetrize<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> Array2<f64> {
    (a + &a.t()) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Verify the Cholesky bridge reconstructs the input and rejects
    // indefinite matrices.
    //
    // Given
    // -----
    // - A 2×2 SPD matrix and a 2×2 indefinite matrix.
    //
    // Expect
    // ------
    // - `L·Lᵀ = a` for the SPD case, `None` for the indefinite one.
    fn cholesky_roundtrip_and_failure() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let l = cholesky_lower(&a).unwrap();
        let back = l.dot(&l.t());
        for (x, y) in back.iter().zip(a.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
        assert_eq!(l[[0, 1]], 0.0);
        assert!(cholesky_lower(&array![[1.0, 2.0], [2.0, 1.0]]).is_none());
    }

    #[test]
    // Purpose
    // -------
    // Check the Kronecker product against a hand-computed case.
    //
    // Given
    // -----
    // - `I₂ ⊗ [[1, 2]]` and a 2×2 ⊗ 2×2 product.
    //
    // Expect
    // ------
    // - Block-diagonal 2×4 result; row 3 of the 4×4 product is `[3, 0, 4, 0]`.
    fn kron_matches_manual() {
        let out = kron(&Array2::<f64>::eye(2), &array![[1.0, 2.0]]);
        assert_eq!(out, array![[1.0, 2.0, 0.0, 0.0], [0.0, 0.0, 1.0, 2.0]]);

        let block = kron(&array![[1.0, 2.0], [3.0, 4.0]], &array![[0.0, 1.0], [1.0, 0.0]]);
        assert_eq!(block.dim(), (4, 4));
        assert_eq!(block.row(3).to_vec(), vec![3.0, 0.0, 4.0, 0.0]);
    }

    #[test]
    // Purpose
    // -------
    // Eigenvalues of a rotation-scaled matrix are complex with known modulus.
    //
    // Given
    // -----
    // - `0.5·R(90°)`.
    //
    // Expect
    // ------
    // - Two eigenvalues of modulus 0.5.
    fn complex_eigenvalues_modulus() {
        let eig = eigenvalues(&array![[0.0, -0.5], [0.5, 0.0]]);
        assert_eq!(eig.len(), 2);
        for z in eig {
            assert_relative_eq!(z.norm(), 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Rank detection on a rank-deficient matrix.
    //
    // Given
    // -----
    // - Two identical rows.
    //
    // Expect
    // ------
    // - Rank 1.
    fn rank_detects_duplicate_rows() {
        assert_eq!(rank(&array![[1.0, 2.0, 3.0], [1.0, 2.0, 3.0]]), 1);
        assert_eq!(rank(&array![[1.0, 0.0], [0.0, 1.0]]), 2);
    }
}
