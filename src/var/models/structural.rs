//! Structural identification by recursive (Cholesky) ordering.
//!
//! Purpose
//! -------
//! Map reduced-form residuals `ε_t` to orthogonal, unit-variance structural
//! shocks `u_t = B⁻¹ε_t` with `B·Bᵀ = Ω`, where `B` is lower triangular in a
//! chosen variable ordering.
//!
//! Key behaviors
//! -------------
//! - Default ordering is the model's own variable order.
//! - A custom ordering permutes `Ω`, factors it, and permutes `B` back, so
//!   `B` is indexed by the original variable order (and is triangular only
//!   after re-permutation).
//! - Shock `j` is named `shock_<variable j>`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Ω` must be strictly positive definite.
//! - The returned shock panel has the residual panel's periods.
use ndarray::Array2;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::var::{
    core::{
        linalg::{cholesky_lower, lu_solve},
        model::VarModel,
        panel::Panel,
    },
    errors::{VarError, VarResult},
    models::{
        acf::{AcfResult, acf},
        simulate::shock_block,
    },
};

/// Prefix of structural shock names (`shock_<variable>`).
pub const SHOCK_PREFIX: &str = "shock_";

/// StructuralModel — reduced-form model plus impact matrix `B`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StructuralModel {
    reduced: VarModel,
    b: Array2<f64>,
    ordering: Vec<String>,
    shock_names: Vec<String>,
}

impl StructuralModel {
    /// The reduced-form model.
    pub fn reduced(&self) -> &VarModel {
        &self.reduced
    }

    /// Impact matrix `B` (`Ny × Ny`); column `j` is the response to shock `j`.
    pub fn impact(&self) -> &Array2<f64> {
        &self.b
    }

    /// Variable ordering used for the factorization.
    pub fn ordering(&self) -> &[String] {
        &self.ordering
    }

    pub fn shock_names(&self) -> &[String] {
        &self.shock_names
    }

    pub fn ny(&self) -> usize {
        self.reduced.ny()
    }

    /// `B·Bᵀ`, equal to the reduced-form `Ω`.
    pub fn implied_covariance(&self) -> Array2<f64> {
        self.b.dot(&self.b.t())
    }

    /// Theoretical ACF with `Ω = B·Bᵀ`.
    ///
    /// Errors
    /// ------
    /// - `VarError::NonStationaryModel` as in [`acf`].
    pub fn acf(&self, max_lag: usize) -> VarResult<AcfResult> {
        acf(&self.reduced.with_residual_covariance(self.implied_covariance()), max_lag)
    }
}

/// Identify structural shocks by Cholesky factorization of `Ω`.
///
/// Parameters
/// ----------
/// - `model`: `&VarModel`
/// - `residuals`: `&Panel`
///   Reduced-form residuals (`Ny` columns, matched by position).
/// - `ordering`: `Option<&[S]>`
///   Permutation of the model's variable names; `None` keeps model order.
///
/// Returns
/// -------
/// `VarResult<(StructuralModel, Panel)>`
///   The structural model and the recovered shocks over the residual periods.
///
/// Errors
/// ------
/// - `VarError::InvalidOrdering` if `ordering` is not a permutation of the
///   model variables.
/// - `VarError::NonPositiveDefiniteResidualCovariance` if Cholesky fails.
/// - `VarError::DimensionMismatch` / `VarError::UnobservedData` for a bad
///   residual panel.
pub fn identify<S: AsRef<str>>(
    model: &VarModel, residuals: &Panel, ordering: Option<&[S]>,
) -> VarResult<(StructuralModel, Panel)> {
    let ny = model.ny();
    let perm = match ordering {
        Some(names) => permutation(model, names)?,
        None => (0..ny).collect(),
    };

    let omega = model.residual_covariance();
    let permuted = Array2::from_shape_fn((ny, ny), |(a, c)| omega[[perm[a], perm[c]]]);
    let l = cholesky_lower(&permuted).ok_or(VarError::NonPositiveDefiniteResidualCovariance)?;
    let mut b = Array2::<f64>::zeros((ny, ny));
    for a in 0..ny {
        for c in 0..ny {
            b[[perm[a], perm[c]]] = l[[a, c]];
        }
    }

    let eps = shock_block(residuals, residuals.range(), ny)?;
    let shocks = lu_solve(&b, &eps.t())
        .ok_or(VarError::NonPositiveDefiniteResidualCovariance)?
        .reversed_axes();

    let shock_names: Vec<String> =
        model.names().iter().map(|n| format!("{SHOCK_PREFIX}{n}")).collect();
    let shock_panel = Panel::new(&shock_names, residuals.start(), shocks)?;
    let ordering = perm.iter().map(|&i| model.names()[i].clone()).collect();

    debug!(variables = ny, periods = residuals.n_periods(), "identified structural shocks");

    let structural = StructuralModel { reduced: model.clone(), b, ordering, shock_names };
    Ok((structural, shock_panel))
}

fn permutation<S: AsRef<str>>(model: &VarModel, names: &[S]) -> VarResult<Vec<usize>> {
    let ny = model.ny();
    if names.len() != ny {
        return Err(VarError::InvalidOrdering {
            reason: format!("expected {ny} names, got {}", names.len()),
        });
    }
    let mut seen = vec![false; ny];
    let mut perm = Vec::with_capacity(ny);
    for name in names {
        let name = name.as_ref();
        let i = model.spec().index_of(name).ok_or_else(|| VarError::InvalidOrdering {
            reason: format!("unknown variable '{name}'"),
        })?;
        if seen[i] {
            return Err(VarError::InvalidOrdering { reason: format!("'{name}' listed twice") });
        }
        seen[i] = true;
        perm.push(i);
    }
    Ok(perm)
}
