//! Impulse responses and forecast-error variance decompositions.
//!
//! Purpose
//! -------
//! Trace the effect of one-standard-deviation structural shocks through the
//! VAR dynamics, and split forecast-error variance by shock.
//!
//! Key behaviors
//! -------------
//! - `responses[[i, j, h]] = (Ψ_h·B)[i, j]`: response of variable `i`, `h`
//!   steps after a unit impulse in structural shock `j` at step 0, with zero
//!   shocks afterwards.
//! - `cumulative` is the running sum over the horizon axis.
//! - With `presample`, slot 0 holds the (zero) pre-impact state and the
//!   impact moves to slot 1; the tensor keeps `horizon` slots.
//! - FEVD shares `Σ_{s≤h} Θ_s[i, j]² / Σ_j Σ_{s≤h} Θ_s[i, j]²` sum to one
//!   over shocks.
use ndarray::{Array2, Array3, Axis, s};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::var::{
    core::options::ImpulseOptions,
    errors::{VarError, VarResult},
    models::structural::StructuralModel,
};

/// ImpulseResponse — `Ny × Ny × horizon` response tensors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImpulseResponse {
    pub responses: Array3<f64>,
    pub cumulative: Array3<f64>,
    pub variables: Vec<String>,
    pub shocks: Vec<String>,
}

impl ImpulseResponse {
    pub fn horizon(&self) -> usize {
        self.responses.len_of(Axis(2))
    }
}

/// Structural impulse responses over `horizon` steps.
///
/// Errors
/// ------
/// - `VarError::InvalidOption` if `horizon == 0`.
pub fn respond(
    model: &StructuralModel, horizon: usize, opts: &ImpulseOptions,
) -> VarResult<ImpulseResponse> {
    check_horizon(horizon)?;
    let theta = structural_weights(model, horizon);
    let ny = model.ny();
    let offset = usize::from(opts.presample);

    let mut responses = Array3::<f64>::zeros((ny, ny, horizon));
    for h in offset..horizon {
        responses.slice_mut(s![.., .., h]).assign(&theta[h - offset]);
    }
    let mut cumulative = responses.clone();
    cumulative.accumulate_axis_inplace(Axis(2), |&prev, curr| *curr += prev);

    Ok(ImpulseResponse {
        responses,
        cumulative,
        variables: model.reduced().names().to_vec(),
        shocks: model.shock_names().to_vec(),
    })
}

/// Forecast-error variance decomposition (`Ny × Ny × horizon`).
///
/// `out[[i, j, h]]` is the share of the `(h+1)`-step forecast-error variance
/// of variable `i` due to shock `j`.
///
/// Errors
/// ------
/// - `VarError::InvalidOption` if `horizon == 0`.
pub fn fevd(model: &StructuralModel, horizon: usize) -> VarResult<Array3<f64>> {
    check_horizon(horizon)?;
    let theta = structural_weights(model, horizon);
    let ny = model.ny();
    let mut acc = Array3::<f64>::zeros((ny, ny, horizon));
    let mut running = Array2::<f64>::zeros((ny, ny));
    for (h, t) in theta.iter().enumerate() {
        running += &t.mapv(|v| v * v);
        acc.slice_mut(s![.., .., h]).assign(&running);
    }
    for mut slice in acc.axis_iter_mut(Axis(2)) {
        for mut row in slice.rows_mut() {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            }
        }
    }
    Ok(acc)
}

// ---- Helper methods ----

/// `Θ_h = Ψ_h·B` for `h = 0..horizon`.
fn structural_weights(model: &StructuralModel, horizon: usize) -> Vec<Array2<f64>> {
    let b = model.impact();
    model.reduced().dynamics().ma_weights(horizon).iter().map(|psi| psi.dot(b)).collect()
}

fn check_horizon(horizon: usize) -> VarResult<()> {
    if horizon == 0 {
        return Err(VarError::InvalidOption { name: "horizon", reason: "must be at least 1" });
    }
    Ok(())
}
