//! models — VAR/SVAR engines built on `var::core`.
//!
//! Purpose
//! -------
//! Collect the operations that turn data into models and models into
//! moments, forecasts, simulations, resampled ensembles, structural shocks,
//! and impulse responses. Every engine is a free function over immutable
//! inputs returning an owned result.
//!
//! Key behaviors
//! -------------
//! - [`estimation`]: ordinary and restricted least squares, residual and
//!   fitted panels, optional parameter covariance.
//! - [`acf`]: theoretical (Lyapunov) and sample autocovariances.
//! - [`forecast`]: unconditional and jointly conditioned forecasts with
//!   Gaussian bands.
//! - [`simulate`]: deterministic resimulation with contribution
//!   decomposition, and Gaussian stochastic simulation.
//! - [`bootstrap`] / [`ensemble`]: Efron and Wild residual bootstrap, fanned
//!   out over rayon, gathered into a [`VarEnsemble`].
//! - [`structural`] / [`irf`]: Cholesky identification, impulse responses,
//!   and variance decompositions.
//!
//! Invariants & assumptions
//! ------------------------
//! - No engine holds state between calls; randomness enters only through an
//!   explicit seed or caller-provided RNG.
//! - Dimension and naming checks live in `var::core`; engines rely on them
//!   and report any remaining failure as a [`VarError`](crate::var::errors::VarError).
//!
//! Testing notes
//! -------------
//! - Each engine carries unit tests for its defining identities (exact
//!   recovery, conditions honored, contributions summing, `B·Bᵀ = Ω`).
//! - `tests/integration_var_pipeline.rs` runs the full pipeline on a
//!   simulated four-variable VAR(2).

pub mod acf;
pub mod bootstrap;
pub mod ensemble;
pub mod estimation;
pub mod forecast;
pub mod irf;
pub mod simulate;
pub mod structural;

pub use self::acf::{AcfResult, acf, sample_acf};
pub use self::bootstrap::{bootstrap, bootstrap_with_rng, resample, resample_with_rng};
pub use self::ensemble::VarEnsemble;
pub use self::estimation::{EstimationOutput, estimate};
pub use self::forecast::{Condition, ConditionTarget, ConditioningSet, ForecastResult, forecast};
pub use self::irf::{ImpulseResponse, fevd, respond};
pub use self::simulate::{SimulationResult, simulate, simulate_random};
pub use self::structural::{StructuralModel, identify};
