//! Residual bootstrap for reduced-form VARs.
//!
//! Purpose
//! -------
//! Generate synthetic samples from an estimated model by perturbing its
//! residuals, and re-estimate each sample to approximate the sampling
//! distribution of the coefficients.
//!
//! Key behaviors
//! -------------
//! - Efron: each period draws a whole residual row with replacement, so the
//!   cross-variable covariance is preserved.
//! - Wild: each observed residual row is multiplied by an independent
//!   Rademacher sign, preserving heteroscedasticity.
//! - Every draw re-runs the recursion from the same `P` initial conditions.
//! - [`bootstrap`] resamples and re-estimates each draw as one independent
//!   task; failed re-estimates are dropped and counted. Each kept member
//!   carries the perturbed residuals that generated its sample.
//!
//! Invariants & assumptions
//! ------------------------
//! - One `u64` seed per draw is taken from the master RNG before any work is
//!   fanned out, so results do not depend on `parallel` or on thread timing.
//! - Results are gathered in draw-index order.
//!
//! Conventions
//! -----------
//! - [`resample`] returns `Ny·draws` columns laid out draw-major: draw `d`,
//!   variable `i` is column `d·Ny + i`, named `<variable>_<d>`. Rows cover
//!   `[start − P, end]` so the pre-sample is included.
use ndarray::{Array2, ArrayView2, s};
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::var::{
    core::{
        constraints::ConstraintSet,
        model::{Dynamics, VarModel},
        options::{BootstrapMethod, BootstrapOptions, EstimateOptions},
        panel::Panel,
        period::{Period, PeriodRange},
    },
    errors::VarResult,
    models::{
        ensemble::VarEnsemble,
        estimation::{RESIDUAL_PREFIX, estimate},
        simulate::{recurse, shock_block},
    },
};

/// Synthetic samples for every draw, draw-major (see module docs).
///
/// Parameters
/// ----------
/// - `model`: `&VarModel`
///   Coefficients used to rebuild each path.
/// - `data`: `&Panel`
///   Supplies the `P` initial conditions before `range.start()`.
/// - `residuals`: `&Panel`
///   `Ny` residual columns covering `range` (matched by position).
/// - `range`: [`PeriodRange`]
/// - `opts`: `&BootstrapOptions`
///   Draw count, method, and seed (`parallel` is honored).
///
/// Errors
/// ------
/// - `VarError::InvalidDrawCount` for zero draws.
/// - `VarError::DrawBudgetExceeded` when `draws` exceeds `opts.max_draws`.
/// - Initial-condition and residual errors as in
///   [`simulate`](crate::var::models::simulate::simulate).
pub fn resample(
    model: &VarModel, data: &Panel, residuals: &Panel, range: PeriodRange, opts: &BootstrapOptions,
) -> VarResult<Panel> {
    let mut rng = StdRng::seed_from_u64(opts.seed);
    resample_with_rng(model, data, residuals, range, opts, &mut rng)
}

/// [`resample`] with a caller-provided master RNG (`opts.seed` is ignored).
pub fn resample_with_rng<R: Rng + ?Sized>(
    model: &VarModel, data: &Panel, residuals: &Panel, range: PeriodRange, opts: &BootstrapOptions,
    rng: &mut R,
) -> VarResult<Panel> {
    let inputs = DrawInputs::prepare(model, data, residuals, range, opts)?;
    let seeds = draw_seeds(rng, opts.draws);
    let paths: Vec<Array2<f64>> = fan_out(&seeds, opts.parallel, |seed| inputs.draw(seed).1);

    let ny = model.ny();
    let rows = inputs.history.nrows() + range.len();
    let mut stacked = Array2::<f64>::zeros((rows, ny * opts.draws));
    let mut names = Vec::with_capacity(ny * opts.draws);
    for (d, path) in paths.iter().enumerate() {
        stacked.slice_mut(s![.., d * ny..(d + 1) * ny]).assign(path);
        names.extend(model.names().iter().map(|n| format!("{n}_{d}")));
    }
    Panel::new(&names, inputs.first_period(range), stacked)
}

/// Resample and re-estimate every draw.
///
/// Parameters
/// ----------
/// - `model`, `data`, `residuals`, `range`: as in [`resample`].
/// - `constraints`: restrictions re-imposed on every draw.
/// - `opts`: `&BootstrapOptions`
///
/// Returns
/// -------
/// `VarResult<VarEnsemble>`
///   Re-estimated models in draw order; draws whose estimation failed are
///   excluded and counted in [`VarEnsemble::excluded`].
///
/// Errors
/// ------
/// - As in [`resample`]. Failures of individual draws are not errors.
pub fn bootstrap(
    model: &VarModel, data: &Panel, residuals: &Panel, range: PeriodRange,
    constraints: Option<&ConstraintSet>, opts: &BootstrapOptions,
) -> VarResult<VarEnsemble> {
    let mut rng = StdRng::seed_from_u64(opts.seed);
    bootstrap_with_rng(model, data, residuals, range, constraints, opts, &mut rng)
}

/// [`bootstrap`] with a caller-provided master RNG (`opts.seed` is ignored).
pub fn bootstrap_with_rng<R: Rng + ?Sized>(
    model: &VarModel, data: &Panel, residuals: &Panel, range: PeriodRange,
    constraints: Option<&ConstraintSet>, opts: &BootstrapOptions, rng: &mut R,
) -> VarResult<VarEnsemble> {
    let inputs = DrawInputs::prepare(model, data, residuals, range, opts)?;
    let seeds = draw_seeds(rng, opts.draws);
    let spec = model.spec();
    let first = inputs.first_period(range);
    let estimate_opts = EstimateOptions::default();
    let residual_names: Vec<String> =
        spec.names().iter().map(|n| format!("{RESIDUAL_PREFIX}{n}")).collect();

    let outcomes: Vec<VarResult<(VarModel, Panel)>> = fan_out(&seeds, opts.parallel, |seed| {
        let (shocks, path) = inputs.draw(seed);
        let panel = Panel::new(spec.names(), first, path)?;
        let fitted = estimate(&panel, spec, range, constraints, &estimate_opts)?;
        Ok((fitted.model, Panel::new(&residual_names, range.start(), shocks)?))
    });

    let mut members = Vec::with_capacity(outcomes.len());
    let mut residual_draws = Vec::with_capacity(outcomes.len());
    let mut draws = Vec::with_capacity(outcomes.len());
    let mut excluded = 0;
    for (d, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok((m, shocks)) => {
                members.push(m);
                residual_draws.push(shocks);
                draws.push(d);
            }
            Err(err) => {
                debug!(draw = d, error = %err, "bootstrap draw failed to re-estimate");
                excluded += 1;
            }
        }
    }
    if excluded > 0 {
        warn!(excluded, draws = opts.draws, "bootstrap draws excluded from ensemble");
    }
    Ok(VarEnsemble::from_draws(members, residual_draws, draws, excluded))
}

// ---- Helper methods ----

/// Shared, read-only inputs of every draw.
struct DrawInputs {
    dynamics: Dynamics,
    history: Array2<f64>,
    residuals: Array2<f64>,
    method: BootstrapMethod,
}

impl DrawInputs {
    fn prepare(
        model: &VarModel, data: &Panel, residuals: &Panel, range: PeriodRange,
        opts: &BootstrapOptions,
    ) -> VarResult<Self> {
        opts.validate()?;
        let history = data.initial_conditions(model.names(), range.start(), model.order())?;
        let residuals = shock_block(residuals, range, model.ny())?;
        Ok(DrawInputs { dynamics: model.dynamics(), history, residuals, method: opts.method })
    }

    fn first_period(&self, range: PeriodRange) -> Period {
        range.start().offset(-(self.history.nrows() as i64))
    }

    /// Perturbed residuals of one draw and the path they generate (pre-sample
    /// rows followed by the synthetic sample).
    fn draw(&self, seed: u64) -> (Array2<f64>, Array2<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let shocks = perturb(self.residuals.view(), self.method, &mut rng);
        let simulated = recurse(&self.dynamics, self.history.view(), shocks.view(), true);
        let p = self.history.nrows();
        let mut path = Array2::<f64>::zeros((p + simulated.nrows(), simulated.ncols()));
        path.slice_mut(s![..p, ..]).assign(&self.history);
        path.slice_mut(s![p.., ..]).assign(&simulated);
        (shocks, path)
    }
}

fn perturb<R: Rng + ?Sized>(
    residuals: ArrayView2<'_, f64>, method: BootstrapMethod, rng: &mut R,
) -> Array2<f64> {
    let t_len = residuals.nrows();
    let mut out = Array2::<f64>::zeros(residuals.raw_dim());
    for t in 0..t_len {
        match method {
            BootstrapMethod::Efron => {
                let src = rng.gen_range(0..t_len);
                out.row_mut(t).assign(&residuals.row(src));
            }
            BootstrapMethod::Wild => {
                let sign = if rng.r#gen::<bool>() { 1.0 } else { -1.0 };
                out.row_mut(t).assign(&(&residuals.row(t) * sign));
            }
        }
    }
    out
}

fn draw_seeds<R: RngCore + ?Sized>(rng: &mut R, draws: usize) -> Vec<u64> {
    (0..draws).map(|_| rng.next_u64()).collect()
}

fn fan_out<T, F>(seeds: &[u64], parallel: bool, task: F) -> Vec<T>
where
    T: Send,
    F: Fn(u64) -> T + Sync + Send,
{
    if parallel {
        seeds.par_iter().map(|&seed| task(seed)).collect()
    } else {
        seeds.iter().map(|&seed| task(seed)).collect()
    }
}
