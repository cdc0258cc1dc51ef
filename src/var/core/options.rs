//! VAR options — configuration for estimation, moments, forecasting,
//! simulation, resampling, and impulse responses.
//!
//! Purpose
//! -------
//! Collect every tuning knob of the engines in small option structs so call
//! sites pass explicit values instead of ad-hoc flags. Each struct has a
//! documented `Default` and a plain `new` constructor.
//!
//! Invariants & assumptions
//! ------------------------
//! - Only [`BootstrapOptions`] validates (draw count ≥ 1 and within the
//!   optional `max_draws` budget); the other structs hold booleans with no
//!   cross-field constraints.
//! - The bootstrap `seed` fully determines the random stream, independent of
//!   whether draws run in parallel.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::var::errors::{VarError, VarResult};

/// Estimation-time options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EstimateOptions {
    /// Also compute the asymptotic covariance of `vec(β̂)`.
    pub cov_parameters: bool,
}

impl EstimateOptions {
    pub fn new(cov_parameters: bool) -> Self {
        EstimateOptions { cov_parameters }
    }
}

/// Options for sample autocovariances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AcfOptions {
    /// Subtract column means before forming lagged products.
    pub demean: bool,
    /// Divide lag-`k` sums by `N − k` instead of `N`.
    pub small_sample: bool,
}

impl AcfOptions {
    pub fn new(demean: bool, small_sample: bool) -> Self {
        AcfOptions { demean, small_sample }
    }
}

impl Default for AcfOptions {
    /// Demeaned, `1/N` divisor (guarantees a positive semi-definite sequence).
    fn default() -> Self {
        AcfOptions { demean: true, small_sample: false }
    }
}

/// Forecast options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForecastOptions {
    /// Return the point path only (no standard deviations).
    pub mean_only: bool,
}

impl ForecastOptions {
    pub fn new(mean_only: bool) -> Self {
        ForecastOptions { mean_only }
    }
}

/// Simulation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulateOptions {
    /// Also return the per-source contribution decomposition.
    pub contributions: bool,
}

impl SimulateOptions {
    pub fn new(contributions: bool) -> Self {
        SimulateOptions { contributions }
    }
}

/// Impulse-response options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImpulseOptions {
    /// Reserve the first horizon slot for the (zero) pre-shock period.
    pub presample: bool,
}

impl ImpulseOptions {
    pub fn new(presample: bool) -> Self {
        ImpulseOptions { presample }
    }
}

/// BootstrapMethod — how residuals are perturbed for each draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BootstrapMethod {
    /// Resample whole residual vectors with replacement.
    Efron,
    /// Flip the sign of each observed residual vector with probability ½
    /// (Rademacher weights).
    Wild,
}

/// BootstrapOptions — draw count, method, RNG seed, and parallelism.
///
/// Fields
/// ------
/// - `draws`: number of synthetic samples (≥ 1).
/// - `method`: [`BootstrapMethod`].
/// - `seed`: master seed; per-draw seeds are derived from it in draw order.
/// - `parallel`: fan draws out over the rayon pool.
/// - `max_draws`: optional overall draw budget; `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootstrapOptions {
    pub draws: usize,
    pub method: BootstrapMethod,
    pub seed: u64,
    pub parallel: bool,
    pub max_draws: Option<usize>,
}

impl BootstrapOptions {
    /// Errors
    /// ------
    /// - `VarError::InvalidDrawCount` when `draws == 0`.
    pub fn new(
        draws: usize, method: BootstrapMethod, seed: u64, parallel: bool,
    ) -> VarResult<Self> {
        if draws == 0 {
            return Err(VarError::InvalidDrawCount { draws });
        }
        Ok(BootstrapOptions { draws, method, seed, parallel, max_draws: None })
    }

    /// Cap the number of draws at `max_draws`.
    ///
    /// Errors
    /// ------
    /// - `VarError::DrawBudgetExceeded` when `draws > max_draws`.
    pub fn with_max_draws(self, max_draws: usize) -> VarResult<Self> {
        let capped = BootstrapOptions { max_draws: Some(max_draws), ..self };
        capped.validate()?;
        Ok(capped)
    }

    /// Re-check the draw count and budget, for options built field by field.
    pub fn validate(&self) -> VarResult<()> {
        if self.draws == 0 {
            return Err(VarError::InvalidDrawCount { draws: self.draws });
        }
        match self.max_draws {
            Some(max_draws) if self.draws > max_draws => {
                Err(VarError::DrawBudgetExceeded { draws: self.draws, max_draws })
            }
            _ => Ok(()),
        }
    }
}

impl Default for BootstrapOptions {
    /// 100 Efron draws, seed 42, parallel, no draw budget.
    fn default() -> Self {
        BootstrapOptions {
            draws: 100,
            method: BootstrapMethod::Efron,
            seed: 42,
            parallel: true,
            max_draws: None,
        }
    }
}
