//! Simulation — re-running the VAR recursion from given or random shocks.
//!
//! Purpose
//! -------
//! Rebuild a path `y_t = K + Σ Ã_l y_{t−l} + ε_t` over a range from `P`
//! initial conditions and a residual panel, optionally decomposed into the
//! contribution of each residual source; or draw a fresh path with Gaussian
//! shocks `ε_t ~ N(0, Ω)`.
//!
//! Key behaviors
//! -------------
//! - [`simulate`] feeds the supplied residuals through the recursion. With
//!   estimation residuals and the estimation data this reproduces the
//!   observed sample.
//! - Contributions split the path by linearity: one slice per residual
//!   source (zero initial conditions, no constant) plus one slice for the
//!   initial conditions and the constant. Slices sum to the path.
//! - [`simulate_random`] draws shocks as `L·z` with `L·Lᵀ = Ω` and
//!   `z ~ N(0, I)` from a caller-provided RNG.
//!
//! Conventions
//! -----------
//! - Residual panels are matched to model variables by position; the
//!   `res_` column names produced by estimation are not required.
//! - `contributions[[t, i, j]]` is the part of variable `i` at period `t`
//!   due to source `j`; `j = Ny` is the initial-condition/constant part.
use ndarray::{Array2, Array3, ArrayView2, s};
use rand::Rng;
use rand_distr::StandardNormal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::var::{
    core::{
        linalg::cholesky_lower,
        model::{Dynamics, VarModel},
        options::SimulateOptions,
        panel::Panel,
        period::PeriodRange,
    },
    errors::{VarError, VarResult},
};

/// Name of the initial-condition/constant contribution slice.
pub const INITIAL_SOURCE: &str = "initial";

/// SimulationResult — simulated path with optional decomposition.
///
/// Fields
/// ------
/// - `path`: simulated values over the range, named per model variable.
/// - `contributions`: `T × Ny × (Ny+1)` decomposition, when requested.
/// - `sources`: labels of the last axis of `contributions` (the residual
///   column names followed by [`INITIAL_SOURCE`]).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationResult {
    pub path: Panel,
    pub contributions: Option<Array3<f64>>,
    pub sources: Vec<String>,
}

/// Resimulate `model` over `range` from the residuals in `residuals`.
///
/// Parameters
/// ----------
/// - `model`: `&VarModel`
/// - `data`: `&Panel`
///   Supplies the `P` initial conditions before `range.start()` (by name).
/// - `residuals`: `&Panel`
///   `Ny` columns covering `range`, matched to variables by position.
/// - `range`: [`PeriodRange`]
/// - `opts`: `&SimulateOptions`
///
/// Errors
/// ------
/// - `VarError::DimensionMismatch` if `residuals` does not have `Ny` columns.
/// - `VarError::InsufficientHistory` / `RangeOutsidePanel` /
///   `UnobservedData` for missing initial conditions or residuals.
pub fn simulate(
    model: &VarModel, data: &Panel, residuals: &Panel, range: PeriodRange, opts: &SimulateOptions,
) -> VarResult<SimulationResult> {
    let ny = model.ny();
    let history = data.initial_conditions(model.names(), range.start(), model.order())?;
    let shocks = shock_block(residuals, range, ny)?;

    let dynamics = model.dynamics();
    let path = recurse(&dynamics, history.view(), shocks.view(), true);

    let contributions = opts.contributions.then(|| {
        let t_len = range.len();
        let mut out = Array3::<f64>::zeros((t_len, ny, ny + 1));
        let zero_history = Array2::<f64>::zeros(history.raw_dim());
        for j in 0..ny {
            let mut single = Array2::<f64>::zeros((t_len, ny));
            single.column_mut(j).assign(&shocks.column(j));
            let part = recurse(&dynamics, zero_history.view(), single.view(), false);
            out.slice_mut(s![.., .., j]).assign(&part);
        }
        let no_shocks = Array2::<f64>::zeros((t_len, ny));
        let initial = recurse(&dynamics, history.view(), no_shocks.view(), true);
        out.slice_mut(s![.., .., ny]).assign(&initial);
        out
    });

    let mut sources = residuals.names().to_vec();
    sources.push(INITIAL_SOURCE.to_string());
    let path = Panel::new(model.names(), range.start(), path)?;
    Ok(SimulationResult { path, contributions, sources })
}

/// Draw a path over `range` with Gaussian shocks `N(0, Ω)`.
///
/// Parameters
/// ----------
/// - `model`: `&VarModel`
/// - `data`: `&Panel`
///   Supplies the `P` initial conditions before `range.start()`.
/// - `range`: [`PeriodRange`]
/// - `rng`: any [`Rng`]; seed it for reproducible draws.
///
/// Returns
/// -------
/// `VarResult<Panel>`
///   The simulated path over `range`, named per model variable.
///
/// Errors
/// ------
/// - `VarError::NonPositiveDefiniteResidualCovariance` if `Ω` has no Cholesky
///   factor.
/// - Initial-condition errors as in [`simulate`].
pub fn simulate_random<R: Rng + ?Sized>(
    model: &VarModel, data: &Panel, range: PeriodRange, rng: &mut R,
) -> VarResult<Panel> {
    let ny = model.ny();
    let chol = cholesky_lower(model.residual_covariance())
        .ok_or(VarError::NonPositiveDefiniteResidualCovariance)?;
    let history = data.initial_conditions(model.names(), range.start(), model.order())?;
    let z =
        Array2::from_shape_simple_fn((range.len(), ny), || rng.sample::<f64, _>(StandardNormal));
    let shocks = z.dot(&chol.t());
    let path = recurse(&model.dynamics(), history.view(), shocks.view(), true);
    Panel::new(model.names(), range.start(), path)
}

/// Residual rows over `range`, checked for width and missing entries.
pub(crate) fn shock_block(
    residuals: &Panel, range: PeriodRange, ny: usize,
) -> VarResult<Array2<f64>> {
    if residuals.n_vars() != ny {
        return Err(VarError::DimensionMismatch {
            expected: ny,
            found: residuals.n_vars(),
            context: "residual columns",
        });
    }
    let block = residuals.clip(range)?;
    if let Some(((row, col), _)) = block.data().indexed_iter().find(|(_, v)| v.is_nan()) {
        return Err(VarError::UnobservedData {
            period: range.start().offset(row as i64),
            variable: block.names()[col].clone(),
        });
    }
    Ok(block.data().to_owned())
}

/// Run the recursion for `shocks.nrows()` periods after `history` (`P × Ny`).
pub(crate) fn recurse(
    dynamics: &Dynamics, history: ArrayView2<'_, f64>, shocks: ArrayView2<'_, f64>,
    with_constant: bool,
) -> Array2<f64> {
    let p = history.nrows();
    let t_len = shocks.nrows();
    let mut buf = Array2::<f64>::zeros((p + t_len, shocks.ncols()));
    buf.slice_mut(s![..p, ..]).assign(&history);
    for t in 0..t_len {
        let next = dynamics.step(buf.view(), p + t, with_constant) + &shocks.row(t);
        buf.row_mut(p + t).assign(&next);
    }
    buf.slice(s![p.., ..]).to_owned()
}
