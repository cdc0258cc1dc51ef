//! Autocovariance and autocorrelation functions — theoretical and sample.
//!
//! Purpose
//! -------
//! Provide the second-moment view of a VAR: the implied (population)
//! autocovariances of a stationary model, and the empirical autocovariances of
//! a data or residual panel.
//!
//! Key behaviors
//! -------------
//! - [`acf`] solves the discrete Lyapunov equation `Γ = ΦΓΦᵀ + Q` on the
//!   companion form (`Q` holds `Ω` in its top-left block) by the doubling
//!   iteration, then moves to higher lags with `Γ(k) = Φ·Γ(k−1)`.
//! - [`sample_acf`] forms lagged cross products of a panel, optionally
//!   demeaned, with a `1/N` or `1/(N−k)` divisor.
//! - Correlations divide by the outer product of lag-0 standard deviations.
//!
//! Conventions
//! -----------
//! - `covariance[[i, j, k]] = Cov(y_{i,t}, y_{j,t−k})`, so lag 0 is symmetric
//!   and `covariance[.., .., k]ᵀ` is the lead-`k` matrix.
//! - A zero lag-0 variance yields `NaN` correlations for that variable.
use ndarray::{Array2, Array3, Axis, s};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::var::{
    core::{linalg::symmetrize, model::VarModel, options::AcfOptions, panel::Panel},
    errors::{VarError, VarResult},
};

/// Hard cap on doubling steps; each step squares the transition power.
const MAX_DOUBLING_STEPS: usize = 128;

/// Relative size of the last doubling increment that counts as converged.
const DOUBLING_TOL: f64 = 1e-15;

/// AcfResult — autocovariance and autocorrelation tensors (`Ny × Ny × L+1`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AcfResult {
    pub covariance: Array3<f64>,
    pub correlation: Array3<f64>,
}

impl AcfResult {
    /// Number of lags (excluding lag 0).
    pub fn max_lag(&self) -> usize {
        self.covariance.len_of(Axis(2)) - 1
    }

    /// Lag-`k` autocovariance matrix.
    pub fn covariance_at(&self, lag: usize) -> Array2<f64> {
        self.covariance.index_axis(Axis(2), lag).to_owned()
    }

    /// Lag-`k` autocorrelation matrix.
    pub fn correlation_at(&self, lag: usize) -> Array2<f64> {
        self.correlation.index_axis(Axis(2), lag).to_owned()
    }
}

/// Theoretical autocovariances of a stationary VAR up to `max_lag`.
///
/// Parameters
/// ----------
/// - `model`: `&VarModel`
///   Reduced-form model; its residual covariance drives the moments.
/// - `max_lag`: `usize`
///   Largest lag returned; the tensors carry `max_lag + 1` slices.
///
/// Returns
/// -------
/// `VarResult<AcfResult>`
///
/// Errors
/// ------
/// - `VarError::NonStationaryModel` if any companion eigenvalue has modulus
///   within `1e-8` of the unit circle or beyond.
pub fn acf(model: &VarModel, max_lag: usize) -> VarResult<AcfResult> {
    let max_modulus = model.max_modulus();
    if !model.is_stationary() {
        return Err(VarError::NonStationaryModel { max_modulus });
    }
    let ny = model.ny();
    let phi = model.companion();
    let n = phi.nrows();

    let mut q = Array2::<f64>::zeros((n, n));
    q.slice_mut(s![..ny, ..ny]).assign(model.residual_covariance());
    let gamma0 = lyapunov_doubling(&phi, q);

    let mut covariance = Array3::<f64>::zeros((ny, ny, max_lag + 1));
    let mut current = gamma0;
    for k in 0..=max_lag {
        if k > 0 {
            current = phi.dot(&current);
        }
        covariance.slice_mut(s![.., .., k]).assign(&current.slice(s![..ny, ..ny]));
    }
    let correlation = normalize(&covariance);
    Ok(AcfResult { covariance, correlation })
}

/// Sample autocovariances of every column of `panel` up to `max_lag`.
///
/// Parameters
/// ----------
/// - `panel`: `&Panel`
///   Fully observed panel (typically residuals from estimation).
/// - `max_lag`: `usize`
///   Must be smaller than the number of periods.
/// - `opts`: `&AcfOptions`
///   Demeaning and divisor choice.
///
/// Errors
/// ------
/// - `VarError::UnobservedData` if the panel contains `NaN`.
/// - `VarError::InvalidOption` if `max_lag ≥ N`.
pub fn sample_acf(panel: &Panel, max_lag: usize, opts: &AcfOptions) -> VarResult<AcfResult> {
    let n = panel.n_periods();
    if max_lag >= n {
        return Err(VarError::InvalidOption {
            name: "max_lag",
            reason: "must be smaller than the number of periods",
        });
    }
    if let Some((row, col)) = first_nan(panel.data()) {
        return Err(VarError::UnobservedData {
            period: panel.start().offset(row as i64),
            variable: panel.names()[col].clone(),
        });
    }

    let mut x = panel.data().to_owned();
    if opts.demean {
        if let Some(mean) = x.mean_axis(Axis(0)) {
            x -= &mean;
        }
    }

    let nv = panel.n_vars();
    let mut covariance = Array3::<f64>::zeros((nv, nv, max_lag + 1));
    for k in 0..=max_lag {
        let lead = x.slice(s![k.., ..]);
        let lagged = x.slice(s![..n - k, ..]);
        let divisor = if opts.small_sample { (n - k) as f64 } else { n as f64 };
        let mut ck = lead.t().dot(&lagged) / divisor;
        if k == 0 {
            ck = symmetrize(&ck);
        }
        covariance.slice_mut(s![.., .., k]).assign(&ck);
    }
    let correlation = normalize(&covariance);
    Ok(AcfResult { covariance, correlation })
}

// ---- Helper methods ----

/// Solve `Γ = ΦΓΦᵀ + Q` by doubling: `Γ ← Γ + AΓAᵀ`, `A ← A²`.
fn lyapunov_doubling(phi: &Array2<f64>, q: Array2<f64>) -> Array2<f64> {
    let mut gamma = q;
    let mut a = phi.clone();
    for _ in 0..MAX_DOUBLING_STEPS {
        let increment = a.dot(&gamma).dot(&a.t());
        gamma += &increment;
        let step = increment.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let scale = gamma.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        if step <= DOUBLING_TOL * scale {
            break;
        }
        a = a.dot(&a);
    }
    symmetrize(&gamma)
}

fn normalize(covariance: &Array3<f64>) -> Array3<f64> {
    let n = covariance.len_of(Axis(0));
    let sd: Vec<f64> = (0..n).map(|i| covariance[[i, i, 0]].max(0.0).sqrt()).collect();
    let mut correlation = covariance.clone();
    for ((i, j, _), v) in correlation.indexed_iter_mut() {
        let denom = sd[i] * sd[j];
        *v = if denom > 0.0 { *v / denom } else { f64::NAN };
    }
    correlation
}

fn first_nan(data: &Array2<f64>) -> Option<(usize, usize)> {
    data.indexed_iter().find(|(_, v)| v.is_nan()).map(|(idx, _)| idx)
}
