//! var::core — data carriers and numerical building blocks for VAR models.
//!
//! Purpose
//! -------
//! Hold everything the engines in `var::models` share: period indices, the
//! [`Panel`] container, the [`VarSpec`] model class, coefficient
//! restrictions, instruments, option structs, the estimated [`VarModel`], and
//! the dense linear-algebra bridge.
//!
//! Key behaviors
//! -------------
//! - Validate inputs once at construction (names, shapes, orders) so engines
//!   can assume consistent dimensions.
//! - Define the regressor layout and `vec(β)` ordering used by estimation,
//!   constraints, and parameter covariances.
//! - Keep all `nalgebra` factorizations behind [`linalg`].
//!
//! Conventions
//! -----------
//! - Rows index time and columns index variables in every 2-D array.
//! - Coefficient tensors are `Ny × Ny × P` with `[i, j, l-1]` the effect of
//!   `y_{j,t-l}` on `y_{i,t}`.
//! - Unobserved data is `NaN`; it is never silently treated as zero.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its construction rules and
//!   layouts; engine-level behavior is tested under `var::models` and in the
//!   integration tests.

pub mod constraints;
pub mod instruments;
pub mod linalg;
pub mod model;
pub mod options;
pub mod panel;
pub mod period;
pub mod spec;

pub use self::constraints::{Coefficient, ConstraintSet, Restriction, RestrictionSystem};
pub use self::instruments::{Instrument, InstrumentTerm};
pub use self::model::{Quantity, QuantityValue, VarModel};
pub use self::options::{
    AcfOptions, BootstrapMethod, BootstrapOptions, EstimateOptions, ForecastOptions,
    ImpulseOptions, SimulateOptions,
};
pub use self::panel::{DesignMatrices, Panel};
pub use self::period::{Period, PeriodRange};
pub use self::spec::VarSpec;
