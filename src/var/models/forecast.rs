//! Unconditional and conditional multi-step forecasts.
//!
//! Purpose
//! -------
//! Project a reduced-form VAR forward over a contiguous horizon from the last
//! `P` observed periods, optionally conditioning on exact future values of
//! variables or of registered instruments (linear combinations of variables
//! and their lags).
//!
//! Key behaviors
//! -------------
//! - The mean path is the deterministic recursion `y_t = K + Σ Ã_l y_{t−l}`.
//! - Forecast errors are stacked over the horizon: `e_h = Σ_{s≤h} Ψ_{h−s} ε_s`,
//!   giving the joint covariance `V` of all `H·Ny` forecast values. Marginal
//!   standard deviations are `sqrt(diag V)`.
//! - Conditions are stacked into one measurement `A·y + d = v` and imposed
//!   jointly as exact observations:
//!
//! ```text
//! μ* = μ + V Aᵀ (A V Aᵀ)⁻¹ (v − d − A μ)
//! V* = V − V Aᵀ (A V Aᵀ)⁻¹ A V
//! ```
//!
//!   so the result does not depend on the order in which conditions were
//!   added. Redundant but consistent conditions fall back to the
//!   pseudo-inverse; conditions that cannot hold jointly are an error.
//!
//! Invariants & assumptions
//! ------------------------
//! - With no active condition the unconditional path is returned untouched.
//! - Instrument terms that land before the horizon start read observed
//!   history and enter `d`; the remaining terms enter `A`.
//! - A `NaN` condition value means "not conditioned" and is skipped.
use ndarray::{Array1, Array2, s};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::var::{
    core::{
        linalg::{pseudo_inverse, spd_inverse, symmetrize},
        model::VarModel,
        options::ForecastOptions,
        panel::Panel,
        period::{Period, PeriodRange},
    },
    errors::{VarError, VarResult},
};

/// What a condition pins down.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConditionTarget {
    /// A model variable, by name.
    Variable(String),
    /// An instrument registered on the model, by name.
    Instrument(String),
}

/// One exact future value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Condition {
    pub period: Period,
    pub target: ConditionTarget,
    pub value: f64,
}

/// ConditioningSet — future values imposed jointly on a forecast.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConditioningSet {
    conditions: Vec<Condition>,
}

impl ConditioningSet {
    pub fn new() -> Self {
        ConditioningSet::default()
    }

    /// Fix variable `name` at `value` in `period`.
    pub fn variable(mut self, period: Period, name: &str, value: f64) -> Self {
        self.conditions.push(Condition {
            period,
            target: ConditionTarget::Variable(name.to_string()),
            value,
        });
        self
    }

    /// Fix instrument `name` at `value` in `period`.
    pub fn instrument(mut self, period: Period, name: &str, value: f64) -> Self {
        self.conditions.push(Condition {
            period,
            target: ConditionTarget::Instrument(name.to_string()),
            value,
        });
        self
    }

    /// Fix variable `name` over consecutive periods from `start`.
    pub fn variable_path(mut self, start: Period, name: &str, values: &[f64]) -> Self {
        for (h, &v) in values.iter().enumerate() {
            self = self.variable(start.offset(h as i64), name, v);
        }
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// ForecastResult — mean path and marginal standard deviations.
///
/// Fields
/// ------
/// - `range`: forecast periods; row `h` of each matrix is `range.start() + h`.
/// - `names`: variable names (column order).
/// - `mean`: `H × Ny` forecast means.
/// - `std`: `H × Ny` forecast standard deviations, `None` for mean-only runs.
///   Conditioned entries have zero standard deviation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForecastResult {
    pub range: PeriodRange,
    pub names: Vec<String>,
    pub mean: Array2<f64>,
    pub std: Option<Array2<f64>>,
}

impl ForecastResult {
    /// Mean path as a panel indexed by the forecast periods.
    pub fn mean_panel(&self) -> VarResult<Panel> {
        Panel::new(&self.names, self.range.start(), self.mean.clone())
    }

    /// Gaussian bands `mean ± z·std` covering probability `level`.
    ///
    /// Errors
    /// ------
    /// - `VarError::InvalidOption` if `level ∉ (0, 1)` or the forecast has no
    ///   standard deviations.
    pub fn bands(&self, level: f64) -> VarResult<(Array2<f64>, Array2<f64>)> {
        if !(level > 0.0 && level < 1.0) {
            return Err(VarError::InvalidOption {
                name: "level",
                reason: "must lie strictly between 0 and 1",
            });
        }
        let std = self.std.as_ref().ok_or(VarError::InvalidOption {
            name: "level",
            reason: "forecast was computed without standard deviations",
        })?;
        let normal = Normal::new(0.0, 1.0).map_err(|_| VarError::InvalidOption {
            name: "level",
            reason: "standard normal is unavailable",
        })?;
        let z = normal.inverse_cdf(0.5 + level / 2.0);
        let half = std * z;
        Ok((&self.mean - &half, &self.mean + &half))
    }
}

/// Forecast `model` over `horizon` from the history in `panel`.
///
/// Parameters
/// ----------
/// - `model`: `&VarModel`
///   Model supplying dynamics, `Ω`, and registered instruments.
/// - `panel`: `&Panel`
///   Must hold all model variables for the `P` periods before
///   `horizon.start()`.
/// - `horizon`: [`PeriodRange`]
///   Forecast periods.
/// - `conditions`: `Option<&ConditioningSet>`
///   Exact future values imposed jointly; `None` or empty is unconditional.
/// - `opts`: `&ForecastOptions`
///   `mean_only` skips standard deviations.
///
/// Returns
/// -------
/// `VarResult<ForecastResult>`
///
/// Errors
/// ------
/// - `VarError::InsufficientHistory` / `RangeOutsidePanel` /
///   `UnobservedData` if the initial conditions are unavailable.
/// - `VarError::InvalidConditioningPeriod` for a condition outside
///   `horizon`.
/// - `VarError::UnknownVariable` for an unknown conditioned variable.
/// - `VarError::InvalidInstrumentSpec` for an unregistered instrument, one
///   whose lags exceed `P`, or one whose value is fully determined by
///   observed history.
/// - `VarError::InconsistentConditions` if the conditions contradict each
///   other or fix a zero-variance combination away from its forecast.
pub fn forecast(
    model: &VarModel, panel: &Panel, horizon: PeriodRange, conditions: Option<&ConditioningSet>,
    opts: &ForecastOptions,
) -> VarResult<ForecastResult> {
    let ny = model.ny();
    let p = model.order();
    let h_len = horizon.len();
    let history = panel.initial_conditions(model.names(), horizon.start(), p)?;

    let mut buf = Array2::<f64>::zeros((p + h_len, ny));
    buf.slice_mut(s![..p, ..]).assign(&history);
    let dynamics = model.dynamics();
    for h in 0..h_len {
        let next = dynamics.step(buf.view(), p + h, true);
        buf.row_mut(p + h).assign(&next);
    }
    let mut mean = buf.slice(s![p.., ..]).to_owned();

    let measurement = match conditions {
        Some(set) => build_measurement(model, &history, horizon, set)?,
        None => Measurement::empty(h_len * ny),
    };
    let n_active = measurement.targets.len();

    let std = if n_active == 0 && opts.mean_only {
        None
    } else {
        let v = stacked_covariance(model, h_len);
        let v = if n_active > 0 {
            let mu = Array1::from_iter(mean.iter().copied());
            let (mu_c, v_c) = project(&mu, &v, &measurement)?;
            mean = Array2::from_shape_vec((h_len, ny), mu_c.to_vec())
                .map_err(|_| VarError::DimensionMismatch {
                    expected: h_len * ny,
                    found: mu_c.len(),
                    context: "conditional forecast mean",
                })?;
            v_c
        } else {
            v
        };
        (!opts.mean_only).then(|| {
            Array2::from_shape_fn((h_len, ny), |(h, i)| {
                let d = h * ny + i;
                v[[d, d]].max(0.0).sqrt()
            })
        })
    };

    debug!(horizon = h_len, conditions = n_active, start = %horizon.start(), "forecast computed");

    Ok(ForecastResult { range: horizon, names: model.names().to_vec(), mean, std })
}

// ---- Helper methods ----

/// Largest miss `|A·μ* − t|` accepted, relative to `1 + |t|`.
const CONDITION_TOL: f64 = 1e-8;

/// Stacked conditions `A·y + d = v`, stored as `A` and `v − d`.
struct Measurement {
    a: Array2<f64>,
    targets: Vec<f64>,
    periods: Vec<Period>,
}

impl Measurement {
    fn empty(n: usize) -> Self {
        Measurement { a: Array2::zeros((0, n)), targets: Vec::new(), periods: Vec::new() }
    }
}

fn build_measurement(
    model: &VarModel, history: &Array2<f64>, horizon: PeriodRange, set: &ConditioningSet,
) -> VarResult<Measurement> {
    let ny = model.ny();
    let p = model.order() as i64;
    let n = horizon.len() * ny;
    let mut rows: Vec<Array1<f64>> = Vec::new();
    let mut targets = Vec::new();
    let mut periods = Vec::new();

    for condition in set.conditions() {
        let h = horizon.position(condition.period).ok_or(VarError::InvalidConditioningPeriod {
            period: condition.period,
            start: horizon.start(),
            end: horizon.end(),
        })?;
        if condition.value.is_nan() {
            continue;
        }
        let mut row = Array1::<f64>::zeros(n);
        let mut target = condition.value;
        match &condition.target {
            ConditionTarget::Variable(name) => {
                let i = model
                    .spec()
                    .index_of(name)
                    .ok_or_else(|| VarError::UnknownVariable { name: name.clone() })?;
                row[h * ny + i] = 1.0;
            }
            ConditionTarget::Instrument(name) => {
                let instrument =
                    model.instrument(name).ok_or_else(|| VarError::InvalidInstrumentSpec {
                        name: name.clone(),
                        reason: "instrument is not registered on the model".to_string(),
                    })?;
                instrument.validate(model.spec())?;
                for term in instrument.terms() {
                    let i = model.spec().index_of(&term.variable).ok_or_else(|| {
                        VarError::UnknownVariable { name: term.variable.clone() }
                    })?;
                    let at = h as i64 - term.lag as i64;
                    if at >= 0 {
                        row[at as usize * ny + i] += term.coefficient;
                    } else {
                        target -= term.coefficient * history[[(p + at) as usize, i]];
                    }
                }
                if row.iter().all(|v| *v == 0.0) {
                    return Err(VarError::InvalidInstrumentSpec {
                        name: name.clone(),
                        reason: format!(
                            "value at {} is determined by observed history",
                            condition.period
                        ),
                    });
                }
            }
        }
        rows.push(row);
        targets.push(target);
        periods.push(condition.period);
    }

    let mut a = Array2::<f64>::zeros((rows.len(), n));
    for (r, row) in rows.iter().enumerate() {
        a.row_mut(r).assign(row);
    }
    Ok(Measurement { a, targets, periods })
}

/// Joint covariance of the stacked `H·Ny` forecast errors.
fn stacked_covariance(model: &VarModel, h_len: usize) -> Array2<f64> {
    let ny = model.ny();
    let psi = model.dynamics().ma_weights(h_len);
    let omega = model.residual_covariance();
    // psi_omega[d] = Ψ_d Ω
    let psi_omega: Vec<Array2<f64>> = psi.iter().map(|m| m.dot(omega)).collect();
    let mut v = Array2::<f64>::zeros((h_len * ny, h_len * ny));
    for a in 0..h_len {
        for b in 0..=a {
            let mut block = Array2::<f64>::zeros((ny, ny));
            for s in 0..=b {
                block += &psi_omega[a - s].dot(&psi[b - s].t());
            }
            v.slice_mut(s![a * ny..(a + 1) * ny, b * ny..(b + 1) * ny]).assign(&block);
            if a != b {
                v.slice_mut(s![b * ny..(b + 1) * ny, a * ny..(a + 1) * ny]).assign(&block.t());
            }
        }
    }
    v
}

/// Exact-observation update of a Gaussian `(μ, V)` on `A·y = t`.
///
/// Redundant rows go through the pseudo-inverse. Every condition is
/// re-checked on the updated mean; a miss above `CONDITION_TOL` is an error.
fn project(
    mu: &Array1<f64>, v: &Array2<f64>, m: &Measurement,
) -> VarResult<(Array1<f64>, Array2<f64>)> {
    let a = &m.a;
    let va_t = v.dot(&a.t());
    let s = symmetrize(&a.dot(&va_t));
    let s_inv = match spd_inverse(&s).or_else(|| pseudo_inverse(&s)) {
        Some(inv) => inv,
        None => Array2::zeros(s.raw_dim()),
    };
    let gain = va_t.dot(&s_inv);
    let targets = Array1::from(m.targets.clone());
    let innovation = &targets - &a.dot(mu);
    let mu_c = mu + &gain.dot(&innovation);

    let misses = a.dot(&mu_c) - &targets;
    for ((miss, target), period) in misses.iter().zip(targets.iter()).zip(m.periods.iter()) {
        if miss.is_nan() || miss.abs() > CONDITION_TOL * (1.0 + target.abs()) {
            return Err(VarError::InconsistentConditions { period: *period, residual: miss.abs() });
        }
    }

    let v_c = symmetrize(&(v - &gain.dot(&va_t.t())));
    Ok((mu_c, v_c))
}
