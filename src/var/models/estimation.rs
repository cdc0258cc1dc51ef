//! Reduced-form VAR estimation — ordinary and restricted least squares.
//!
//! Purpose
//! -------
//! Estimate `β` in `Y = Xβ + E` for a [`VarSpec`] over a sample range, with
//! optional linear equality restrictions, and package the result as an
//! immutable [`VarModel`] plus aligned residual, fitted, and data panels.
//!
//! Key behaviors
//! -------------
//! - Unrestricted case: `β̂ = (XᵀX)⁻¹XᵀY` via a Cholesky solve of the normal
//!   equations (no explicit inverse).
//! - Restricted case: solve the augmented symmetric system
//!
//! ```text
//! | I⊗XᵀX  Rᵀ | | vec β |   | vec XᵀY |
//! |   R    0  | |   λ   | = |    c    |
//! ```
//!
//!   with a fully pivoted LU, after checking that `R` has full row rank.
//! - `Ω̂ = ÊᵀÊ / T`; optionally `Σ̂ = Ω̂ ⊗ (XᵀX)⁻¹` (projected onto the
//!   restriction subspace when restrictions are present).
//!
//! Invariants & assumptions
//! ------------------------
//! - `P` periods before the range start are available and observed.
//! - An empty [`ConstraintSet`] takes the unrestricted path, so results are
//!   identical to passing `None`.
//! - Every equation shares the same regressors; restricted estimation is
//!   equation-by-equation least squares subject to `R·vec(β) = c`.
//!
//! Downstream usage
//! ----------------
//! - The bootstrap engine calls [`estimate`] once per synthetic sample.
//! - Forecast, ACF, and structural engines consume the returned model; the
//!   structural identifier also consumes the residual panel.
use ndarray::{Array1, Array2};
use tracing::debug;

use crate::var::{
    core::{
        constraints::{ConstraintSet, RestrictionSystem},
        linalg::{kron, lu_solve, rank, spd_inverse, spd_solve, symmetrize},
        model::VarModel,
        options::EstimateOptions,
        panel::Panel,
        period::PeriodRange,
        spec::VarSpec,
    },
    errors::{VarError, VarResult},
};

/// Prefix of residual column names (`res_<variable>`).
pub const RESIDUAL_PREFIX: &str = "res_";

/// EstimationOutput — estimated model with aligned panels.
///
/// Fields
/// ------
/// - `model`: the estimated [`VarModel`].
/// - `residuals`: fitted residuals over the sample range, named
///   `res_<variable>`.
/// - `fitted`: fitted values `Xβ̂` over the sample range, named per variable.
/// - `data`: endogenous variables clipped to `[start − P, end]`, i.e. the
///   sample plus its pre-sample initial conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationOutput {
    pub model: VarModel,
    pub residuals: Panel,
    pub fitted: Panel,
    pub data: Panel,
}

/// Estimate a reduced-form VAR by (restricted) least squares.
///
/// Parameters
/// ----------
/// - `panel`: `&Panel`
///   Source data; must contain every variable of `spec` (by name).
/// - `spec`: `&VarSpec`
///   Model class (names, order, constant, cointegrating vectors).
/// - `range`: [`PeriodRange`]
///   Fitted periods. `P` periods of history before `range.start()` are used
///   as initial conditions.
/// - `constraints`: `Option<&ConstraintSet>`
///   Linear equality restrictions; `None` or an empty set means unrestricted.
/// - `opts`: `&EstimateOptions`
///   Whether to compute the parameter covariance `Σ̂`.
///
/// Returns
/// -------
/// `VarResult<EstimationOutput>`
///
/// Errors
/// ------
/// - `VarError::DimensionMismatch` if the panel has fewer variables than the
///   spec.
/// - `VarError::UnknownVariable`, `InsufficientHistory`, `RangeOutsidePanel`,
///   `UnobservedData` from building the design matrices.
/// - `VarError::InsufficientObservations` if `T < k`.
/// - `VarError::SingularDesign` if `XᵀX` is not positive definite
///   (unrestricted path, or when `Σ̂` is requested).
/// - `VarError::InvalidConstraint` / `VarError::InconsistentConstraints` from
///   the restriction system.
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::Array2;
/// # use rust_var::var::core::{EstimateOptions, Panel, Period, PeriodRange, VarSpec};
/// # use rust_var::var::models::estimation::estimate;
/// let data = Array2::from_shape_fn((40, 1), |(t, _)| ((t as f64) * 0.7).sin());
/// let panel = Panel::new(&["x"], Period::new(0), data).unwrap();
/// let spec = VarSpec::new(&["x"], 1, true).unwrap();
/// let range = PeriodRange::new(Period::new(1), Period::new(39)).unwrap();
/// let out = estimate(&panel, &spec, range, None, &EstimateOptions::default()).unwrap();
/// assert_eq!(out.residuals.n_periods(), 39);
/// ```
pub fn estimate(
    panel: &Panel, spec: &VarSpec, range: PeriodRange, constraints: Option<&ConstraintSet>,
    opts: &EstimateOptions,
) -> VarResult<EstimationOutput> {
    if panel.n_vars() < spec.ny() {
        return Err(VarError::DimensionMismatch {
            expected: spec.ny(),
            found: panel.n_vars(),
            context: "panel variables",
        });
    }
    let design = panel.lagged_design(range, spec)?;
    let (x, y) = (&design.x, &design.y);
    let t_len = x.nrows();
    let k = spec.n_regressors();
    if t_len < k {
        return Err(VarError::InsufficientObservations { needed: k, found: t_len });
    }

    let xtx = symmetrize(&x.t().dot(x));
    let xty = x.t().dot(y);

    let restrictions = match constraints {
        Some(set) if !set.is_empty() => Some(set.system(spec)?),
        _ => None,
    };
    let beta = match &restrictions {
        None => spd_solve(&xtx, &xty).ok_or(VarError::SingularDesign)?,
        Some(system) => restricted_beta(&xtx, &xty, system)?,
    };

    let fitted = x.dot(&beta);
    let resid = y - &fitted;
    let omega = symmetrize(&(resid.t().dot(&resid) / t_len as f64));

    let sigma = if opts.cov_parameters {
        let xtx_inv = spd_inverse(&xtx).ok_or(VarError::SingularDesign)?;
        let unrestricted = kron(&omega, &xtx_inv);
        Some(match &restrictions {
            None => unrestricted,
            Some(system) => restricted_covariance(&xtx_inv, &unrestricted, system, spec.ny())?,
        })
    } else {
        None
    };

    debug!(
        periods = t_len,
        regressors = k,
        restrictions = restrictions.as_ref().map_or(0, |s| s.r.nrows()),
        "estimated VAR({})",
        spec.order()
    );

    let residual_names: Vec<String> =
        spec.names().iter().map(|n| format!("{RESIDUAL_PREFIX}{n}")).collect();
    let residuals = Panel::new(&residual_names, range.start(), resid)?;
    let fitted = Panel::new(spec.names(), range.start(), fitted)?;
    let data_range = PeriodRange::covering(
        range.start().offset(-(spec.order() as i64)),
        range.len() + spec.order(),
    );
    let data = panel.select(spec.names())?.clip(data_range)?;
    let model = VarModel::from_beta(spec.clone(), &beta, omega, sigma, t_len, range);

    Ok(EstimationOutput { model, residuals, fitted, data })
}

/// Unrestricted least squares `β̂ = (XᵀX)⁻¹XᵀY` for a pre-built design.
///
/// Errors
/// ------
/// - `VarError::SingularDesign` if `XᵀX` is not positive definite.
pub fn least_squares(x: &Array2<f64>, y: &Array2<f64>) -> VarResult<Array2<f64>> {
    let xtx = symmetrize(&x.t().dot(x));
    spd_solve(&xtx, &x.t().dot(y)).ok_or(VarError::SingularDesign)
}

// ---- Helper methods ----

/// Solve the bordered normal equations for `vec(β)` and reshape to `k × Ny`.
fn restricted_beta(
    xtx: &Array2<f64>, xty: &Array2<f64>, system: &RestrictionSystem,
) -> VarResult<Array2<f64>> {
    let k = xtx.nrows();
    let ny = xty.ncols();
    let n = k * ny;
    let m = system.r.nrows();
    if m > n || rank(&system.r) < m {
        return Err(VarError::InconsistentConstraints {
            reason: "restriction matrix does not have full row rank",
        });
    }

    let mut lhs = Array2::<f64>::zeros((n + m, n + m));
    let mut rhs = Array2::<f64>::zeros((n + m, 1));
    for eq in 0..ny {
        for a in 0..k {
            for b in 0..k {
                lhs[[eq * k + a, eq * k + b]] = xtx[[a, b]];
            }
            rhs[[eq * k + a, 0]] = xty[[a, eq]];
        }
    }
    for i in 0..m {
        for j in 0..n {
            lhs[[n + i, j]] = system.r[[i, j]];
            lhs[[j, n + i]] = system.r[[i, j]];
        }
        rhs[[n + i, 0]] = system.c[i];
    }

    let solution = lu_solve(&lhs, &rhs).ok_or(VarError::InconsistentConstraints {
        reason: "augmented normal equations are singular",
    })?;
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(VarError::InconsistentConstraints {
            reason: "augmented normal equations are numerically singular",
        });
    }
    let vec_beta: Array1<f64> = solution.column(0).to_owned();
    Ok(Array2::from_shape_fn((k, ny), |(a, eq)| vec_beta[eq * k + a]))
}

/// `Σ_r = M·Σ·Mᵀ` with `M = I − W⁻¹Rᵀ(RW⁻¹Rᵀ)⁻¹R`, `W⁻¹ = I⊗(XᵀX)⁻¹`.
fn restricted_covariance(
    xtx_inv: &Array2<f64>, unrestricted: &Array2<f64>, system: &RestrictionSystem, ny: usize,
) -> VarResult<Array2<f64>> {
    let w_inv = kron(&Array2::<f64>::eye(ny), xtx_inv);
    let r = &system.r;
    let w_inv_rt = w_inv.dot(&r.t());
    let middle = spd_inverse(&r.dot(&w_inv_rt)).ok_or(VarError::InconsistentConstraints {
        reason: "restrictions are not identified by the data",
    })?;
    let n = w_inv.nrows();
    let projector = Array2::<f64>::eye(n) - w_inv_rt.dot(&middle).dot(r);
    Ok(symmetrize(&projector.dot(unrestricted).dot(&projector.t())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::core::{Coefficient, Period};
    use approx::assert_relative_eq;
    use ndarray::Array2;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - exact recovery of coefficients from noise-free VAR data,
    // - equivalence of "no constraints" and "empty constraint set",
    // - satisfaction of fixed and cross-equation restrictions,
    // - rank-deficient restriction systems,
    // - shapes and the Kronecker form of the parameter covariance,
    // - self-consistency: refitting fitted values leaves zero residuals.
    //
    // Large-sample consistency is exercised in the integration tests.
    // -------------------------------------------------------------------------

    /// Deterministic bivariate panel with mild irregular noise.
    fn toy_panel(n: usize) -> Panel {
        let mut data = Array2::<f64>::zeros((n, 2));
        data[[0, 0]] = 1.0;
        data[[0, 1]] = -0.5;
        for t in 1..n {
            let e1 = ((t * 7919) % 101) as f64 / 101.0 - 0.5;
            let e2 = ((t * 104_729) % 97) as f64 / 97.0 - 0.5;
            data[[t, 0]] = 0.2 + 0.5 * data[[t - 1, 0]] + 0.1 * data[[t - 1, 1]] + e1;
            data[[t, 1]] = -0.1 + 0.2 * data[[t - 1, 0]] + 0.3 * data[[t - 1, 1]] + e2;
        }
        Panel::new(&["x", "y"], Period::new(0), data).unwrap()
    }

    fn full_range(n: usize, p: usize) -> PeriodRange {
        PeriodRange::new(Period::new(p as i64), Period::new(n as i64 - 1)).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Noise-free data generated by a VAR(1) is fitted exactly.
    //
    // Given
    // -----
    // - x_t = 1 + 0.5 x_{t-1}, y_t = 0.3 x_{t-1} + 0.2 y_{t-1} − 0.4 plus a
    //   non-degenerate starting point (so regressors are not collinear only
    //   while converging).
    //
    // Expect
    // ------
    // - Estimated coefficients match the generating ones; Ω ≈ 0.
    fn recovers_noise_free_coefficients() {
        let n = 12;
        let mut data = Array2::<f64>::zeros((n, 2));
        data[[0, 0]] = 5.0;
        data[[0, 1]] = -3.0;
        for t in 1..n {
            data[[t, 0]] = 1.0 + 0.5 * data[[t - 1, 0]];
            data[[t, 1]] = -0.4 + 0.3 * data[[t - 1, 0]] + 0.2 * data[[t - 1, 1]];
        }
        let panel = Panel::new(&["x", "y"], Period::new(0), data).unwrap();
        let spec = VarSpec::new(&["x", "y"], 1, true).unwrap();

        let out = estimate(&panel, &spec, full_range(n, 1), None, &EstimateOptions::default())
            .unwrap();

        let m = &out.model;
        assert_relative_eq!(m.constant()[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(m.constant()[1], -0.4, epsilon = 1e-6);
        assert_relative_eq!(m.lag_matrix(1)[[0, 0]], 0.5, epsilon = 1e-6);
        assert_relative_eq!(m.lag_matrix(1)[[1, 0]], 0.3, epsilon = 1e-6);
        assert_relative_eq!(m.lag_matrix(1)[[1, 1]], 0.2, epsilon = 1e-6);
        assert!(m.residual_covariance().iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    // Purpose
    // -------
    // An empty constraint set reproduces the unrestricted estimate exactly.
    //
    // Given
    // -----
    // - The toy panel, once with `None`, once with `ConstraintSet::new()`.
    //
    // Expect
    // ------
    // - Identical models.
    fn empty_constraints_match_unrestricted() {
        let panel = toy_panel(60);
        let spec = VarSpec::new(&["x", "y"], 2, true).unwrap();
        let range = full_range(60, 2);
        let opts = EstimateOptions::new(true);

        let free = estimate(&panel, &spec, range, None, &opts).unwrap();
        let empty = estimate(&panel, &spec, range, Some(&ConstraintSet::new()), &opts).unwrap();

        assert_eq!(free.model, empty.model);
    }

    #[test]
    // Purpose
    // -------
    // Fixed and cross-equation restrictions hold exactly in the estimate.
    //
    // Given
    // -----
    // - Fix `x ← y{-1} = 0` and impose `A₁[x,x] + A₁[y,y] = 0.9`.
    //
    // Expect
    // ------
    // - Both restrictions satisfied to 1e-10; Σ̂ has zero variance along the
    //   fixed coefficient.
    fn restrictions_are_satisfied() {
        let panel = toy_panel(80);
        let spec = VarSpec::new(&["x", "y"], 1, true).unwrap();
        let set = ConstraintSet::new().fix(Coefficient::lag("x", "y", 1), 0.0).linear(
            vec![(Coefficient::lag("x", "x", 1), 1.0), (Coefficient::lag("y", "y", 1), 1.0)],
            0.9,
        );

        let out =
            estimate(&panel, &spec, full_range(80, 1), Some(&set), &EstimateOptions::new(true))
                .unwrap();

        let a = out.model.lag_matrix(1);
        assert_relative_eq!(a[[0, 1]], 0.0, epsilon = 1e-10);
        assert_relative_eq!(a[[0, 0]] + a[[1, 1]], 0.9, epsilon = 1e-10);
        let sigma = out.model.parameter_covariance().unwrap();
        let fixed = spec.lag_row(1, 1);
        assert!(sigma[[fixed, fixed]].abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Linearly dependent restrictions are reported, not silently solved.
    //
    // Given
    // -----
    // - The same fixed restriction twice.
    //
    // Expect
    // ------
    // - `InconsistentConstraints`.
    fn dependent_restrictions_fail() {
        let panel = toy_panel(40);
        let spec = VarSpec::new(&["x", "y"], 1, true).unwrap();
        let set = ConstraintSet::new()
            .fix(Coefficient::constant("x"), 0.0)
            .fix(Coefficient::constant("x"), 1.0);

        let opts = EstimateOptions::default();
        let err = estimate(&panel, &spec, full_range(40, 1), Some(&set), &opts).unwrap_err();

        assert!(matches!(err, VarError::InconsistentConstraints { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Parameter covariance has the Kronecker form `Ω ⊗ (XᵀX)⁻¹`.
    //
    // Given
    // -----
    // - Unrestricted VAR(1) on the toy panel with `cov_parameters = true`.
    //
    // Expect
    // ------
    // - Σ is `Ny·k` square and its (0,0) block ratio equals Ω₀₀/Ω₁₁ against
    //   the (1,1) block.
    fn parameter_covariance_kronecker_form() {
        let panel = toy_panel(50);
        let spec = VarSpec::new(&["x", "y"], 1, true).unwrap();

        let out =
            estimate(&panel, &spec, full_range(50, 1), None, &EstimateOptions::new(true)).unwrap();

        let sigma = out.model.parameter_covariance().unwrap();
        let k = spec.n_regressors();
        assert_eq!(sigma.dim(), (2 * k, 2 * k));
        let omega = out.model.residual_covariance();
        assert_relative_eq!(
            sigma[[0, 0]] / sigma[[k, k]],
            omega[[0, 0]] / omega[[1, 1]],
            epsilon = 1e-10
        );
    }

    #[test]
    // Purpose
    // -------
    // Self-consistency: regressing fitted values on the same design returns
    // the same coefficients and zero residuals.
    //
    // Given
    // -----
    // - Design matrices of the toy panel and the fitted panel from `estimate`.
    //
    // Expect
    // ------
    // - `least_squares(X, Ŷ)` equals β̂ and `Ŷ − Xβ̂ ≈ 0`.
    fn refit_of_fitted_values_has_zero_residuals() {
        let panel = toy_panel(50);
        let spec = VarSpec::new(&["x", "y"], 2, true).unwrap();
        let range = full_range(50, 2);
        let out = estimate(&panel, &spec, range, None, &EstimateOptions::default()).unwrap();
        let design = panel.lagged_design(range, &spec).unwrap();

        let refit = least_squares(&design.x, out.fitted.data()).unwrap();
        let resid = out.fitted.data() - &design.x.dot(&refit);

        assert!(resid.iter().all(|v| v.abs() < 1e-9));
        for (b, b0) in refit.iter().zip(out.model.beta().iter()) {
            assert_relative_eq!(*b, *b0, epsilon = 1e-8);
        }
    }

    #[test]
    // Purpose
    // -------
    // Output panels are aligned with the sample and its initial conditions.
    //
    // Given
    // -----
    // - VAR(2) over periods 2..=39.
    //
    // Expect
    // ------
    // - Residuals start at 2 and are named `res_*`; data starts at 0.
    fn output_panels_are_aligned() {
        let panel = toy_panel(40);
        let spec = VarSpec::new(&["x", "y"], 2, true).unwrap();

        let out =
            estimate(&panel, &spec, full_range(40, 2), None, &EstimateOptions::default()).unwrap();

        assert_eq!(out.residuals.start(), Period::new(2));
        assert_eq!(out.residuals.names(), &["res_x".to_string(), "res_y".to_string()]);
        assert_eq!(out.data.start(), Period::new(0));
        assert_eq!(out.data.n_periods(), 40);
        assert_eq!(out.model.nobs(), 38);
        assert!(out.model.parameter_covariance().is_none());
    }

    #[test]
    // Purpose
    // -------
    // Panels narrower than the spec fail with a dimension mismatch.
    //
    // Given
    // -----
    // - A one-variable panel and a two-variable spec.
    //
    // Expect
    // ------
    // - `DimensionMismatch`.
    fn narrow_panel_is_rejected() {
        let panel = toy_panel(20).select(&["x"]).unwrap();
        let spec = VarSpec::new(&["x", "y"], 1, true).unwrap();
        let err = estimate(&panel, &spec, full_range(20, 1), None, &EstimateOptions::default())
            .unwrap_err();
        assert!(matches!(err, VarError::DimensionMismatch { .. }));
    }

    #[test]
    // Purpose
    // -------
    // `InconsistentConstraints` is raised for contradictory restrictions
    // expressed through a rank-deficient R; the Display names the cause.
    //
    // Given
    // -----
    // - `c_x = 1` and `2·c_x = 3` (parallel rows).
    //
    // Expect
    // ------
    // - Error message mentions "full row rank".
    fn contradictory_parallel_rows() {
        let panel = toy_panel(30);
        let spec = VarSpec::new(&["x", "y"], 1, true).unwrap();
        let set = ConstraintSet::new()
            .fix(Coefficient::constant("x"), 1.0)
            .linear(vec![(Coefficient::constant("x"), 2.0)], 3.0);
        let opts = EstimateOptions::default();
        let err = estimate(&panel, &spec, full_range(30, 1), Some(&set), &opts).unwrap_err();
        assert!(err.to_string().contains("full row rank"));
    }
}
