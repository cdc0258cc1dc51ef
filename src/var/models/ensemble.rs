//! VarEnsemble — bootstrap re-estimates with stationarity tags.
//!
//! Purpose
//! -------
//! Hold the models re-estimated from bootstrap draws, in draw order, together
//! with the residual draw behind each member, a per-member stationarity flag,
//! and the number of draws that failed re-estimation.
//!
//! Key behaviors
//! -------------
//! - Flags use the same unit-circle test as [`VarModel::is_stationary`].
//! - [`VarEnsemble::filter`] keeps members where a mask is `true`, preserving
//!   relative order; [`VarEnsemble::stationary_only`] is the stationarity
//!   filter and is idempotent.
//! - Element-wise mean and standard deviation of the lag coefficients
//!   summarize the sampling distribution.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every member shares the `VarSpec` of the model that was resampled.
//! - `members`, `residual_draws`, `stationary`, and `draws` always have
//!   equal length; filtering keeps them aligned.
use ndarray::Array3;

use crate::var::{
    core::{model::VarModel, panel::Panel},
    errors::{VarError, VarResult},
};

#[derive(Debug, Clone, PartialEq)]
pub struct VarEnsemble {
    members: Vec<VarModel>,
    residual_draws: Vec<Panel>,
    stationary: Vec<bool>,
    draws: Vec<usize>,
    excluded: usize,
}

impl VarEnsemble {
    /// Ensemble of `members`, each paired with the residual draw that
    /// generated it, tagged with draw indices `0..n`.
    ///
    /// Errors
    /// ------
    /// - `VarError::DimensionMismatch` if the two vectors differ in length.
    pub fn new(members: Vec<VarModel>, residual_draws: Vec<Panel>) -> VarResult<Self> {
        if residual_draws.len() != members.len() {
            return Err(VarError::DimensionMismatch {
                expected: members.len(),
                found: residual_draws.len(),
                context: "ensemble residual draws",
            });
        }
        let draws = (0..members.len()).collect();
        Ok(VarEnsemble::from_draws(members, residual_draws, draws, 0))
    }

    pub(crate) fn from_draws(
        members: Vec<VarModel>, residual_draws: Vec<Panel>, draws: Vec<usize>, excluded: usize,
    ) -> Self {
        let stationary = members.iter().map(VarModel::is_stationary).collect();
        VarEnsemble { members, residual_draws, stationary, draws, excluded }
    }

    pub fn members(&self) -> &[VarModel] {
        &self.members
    }

    pub fn get(&self, i: usize) -> Option<&VarModel> {
        self.members.get(i)
    }

    /// Residuals that generated member `i`'s synthetic sample.
    pub fn residual_draw(&self, i: usize) -> Option<&Panel> {
        self.residual_draws.get(i)
    }

    pub fn residual_draws(&self) -> &[Panel] {
        &self.residual_draws
    }

    pub fn iter(&self) -> impl Iterator<Item = &VarModel> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Draw index each member came from.
    pub fn draw_indices(&self) -> &[usize] {
        &self.draws
    }

    /// Draws dropped because re-estimation failed.
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Stationarity flag per member.
    pub fn stationary_mask(&self) -> Vec<bool> {
        self.stationary.clone()
    }

    pub fn n_stationary(&self) -> usize {
        self.stationary.iter().filter(|&&s| s).count()
    }

    /// Keep members where `mask` is `true`.
    ///
    /// Errors
    /// ------
    /// - `VarError::DimensionMismatch` if `mask.len() != self.len()`.
    pub fn filter(&self, mask: &[bool]) -> VarResult<VarEnsemble> {
        if mask.len() != self.len() {
            return Err(VarError::DimensionMismatch {
                expected: self.len(),
                found: mask.len(),
                context: "ensemble mask",
            });
        }
        Ok(self.keep(mask))
    }

    /// Drop non-stationary members.
    pub fn stationary_only(&self) -> VarEnsemble {
        self.keep(&self.stationary)
    }

    fn keep(&self, mask: &[bool]) -> VarEnsemble {
        let mut out = VarEnsemble {
            members: Vec::new(),
            residual_draws: Vec::new(),
            stationary: Vec::new(),
            draws: Vec::new(),
            excluded: self.excluded,
        };
        for (i, _) in mask.iter().enumerate().filter(|(_, keep)| **keep) {
            out.members.push(self.members[i].clone());
            out.residual_draws.push(self.residual_draws[i].clone());
            out.stationary.push(self.stationary[i]);
            out.draws.push(self.draws[i]);
        }
        out
    }

    /// Element-wise mean of the `Ny × Ny × P` lag coefficients, or `None`
    /// for an empty ensemble.
    pub fn mean_lag_coefficients(&self) -> Option<Array3<f64>> {
        let first = self.members.first()?;
        let mut acc = Array3::<f64>::zeros(first.lag_coefficients().raw_dim());
        for m in &self.members {
            acc += m.lag_coefficients();
        }
        Some(acc / self.len() as f64)
    }

    /// Element-wise sample standard deviation (`n − 1` divisor) of the lag
    /// coefficients; `None` with fewer than two members.
    pub fn std_lag_coefficients(&self) -> Option<Array3<f64>> {
        if self.len() < 2 {
            return None;
        }
        let mean = self.mean_lag_coefficients()?;
        let mut acc = Array3::<f64>::zeros(mean.raw_dim());
        for m in &self.members {
            let d = m.lag_coefficients() - &mean;
            acc += &(&d * &d);
        }
        Some((acc / (self.len() - 1) as f64).mapv(f64::sqrt))
    }
}
