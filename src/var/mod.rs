//! var — vector autoregressions: estimation, moments, forecasting, and
//! structural analysis.
//!
//! Purpose
//! -------
//! Provide a complete reduced-form and recursively identified structural VAR
//! toolkit over time-indexed panels: fit `y_t = K + Σ A_l y_{t−l} + ε_t`
//! (optionally with cointegration terms and linear restrictions), then derive
//! autocovariances, forecasts, simulations, bootstrap ensembles, structural
//! shocks, and impulse responses from the fitted model.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds the data carriers ([`Panel`], [`VarSpec`],
//!   [`VarModel`], restrictions, instruments, options) and the dense
//!   linear-algebra bridge.
//! - [`models`] holds the engines; each is a pure function returning owned
//!   results.
//! - [`errors`] defines [`VarError`] / [`VarResult`], used everywhere.
//!
//! Invariants & assumptions
//! ------------------------
//! - Periods are integer ordinals; ranges are inclusive and contiguous.
//! - Unobserved data is `NaN` and is rejected wherever a value is needed.
//! - Models are immutable once built; "modifying" operations such as
//!   registering an instrument return a new model.
//!
//! Downstream usage
//! ----------------
//! - Typical flow:
//!   1. Build a [`Panel`] and a [`VarSpec`].
//!   2. [`estimate`] over a sample range (optionally with a
//!      [`ConstraintSet`]).
//!   3. [`forecast`], [`acf`], or [`simulate`] from the returned model.
//!   4. [`identify`] with the residual panel, then [`respond`] / [`fevd`].
//!   5. [`bootstrap`] for a [`VarEnsemble`] of re-estimated models.
//! - Python bindings import from this module (or its [`prelude`]) and rely
//!   on the `VarError` → `PyErr` conversion in [`errors`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; the end-to-end scenario lives in
//!   `tests/integration_var_pipeline.rs`.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    AcfOptions, BootstrapMethod, BootstrapOptions, Coefficient, ConstraintSet, EstimateOptions,
    ForecastOptions, ImpulseOptions, Instrument, Panel, Period, PeriodRange, Quantity,
    QuantityValue, Restriction, SimulateOptions, VarModel, VarSpec,
};

pub use self::errors::{VarError, VarResult};

pub use self::models::{
    AcfResult, ConditioningSet, EstimationOutput, ForecastResult, ImpulseResponse,
    SimulationResult, StructuralModel, VarEnsemble, acf, bootstrap, estimate, fevd, forecast,
    identify, resample, respond, sample_acf, simulate, simulate_random,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_var::var::prelude::*;
//
// to import the main VAR surface in a single line.

pub mod prelude {
    pub use super::{
        AcfOptions, AcfResult, BootstrapMethod, BootstrapOptions, Coefficient, ConditioningSet,
        ConstraintSet, EstimateOptions, EstimationOutput, ForecastOptions, ForecastResult,
        ImpulseOptions, ImpulseResponse, Instrument, Panel, Period, PeriodRange, Quantity,
        QuantityValue, SimulateOptions, SimulationResult, StructuralModel, VarEnsemble, VarError,
        VarModel, VarResult, VarSpec, acf, bootstrap, estimate, fevd, forecast, identify,
        resample, respond, sample_acf, simulate, simulate_random,
    };
}
