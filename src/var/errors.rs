//! Errors for VAR/SVAR modeling (panel validation, estimation, identification,
//! forecasting, and resampling).
//!
//! This module defines the single domain error type, [`VarError`], used by
//! every engine under `var::models` and by the data carriers in `var::core`.
//! It implements `Display`/`Error` and, with the `python-bindings` feature,
//! converts to a Python `ValueError` at the PyO3 boundary.
//!
//! ## Conventions
//! - Periods are reported with their integer ordinal (see [`Period`]).
//! - Variable indices are 0-based and follow the order of the owning
//!   [`VarSpec`](crate::var::core::spec::VarSpec).
//! - Numerical breakdowns inside factorizations are normalized to the
//!   domain-level variant that explains *why* the input was unusable
//!   (e.g. a failed Cholesky of Ω is [`VarError::NonPositiveDefiniteResidualCovariance`]).
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

use crate::var::core::period::Period;

/// Crate-wide result alias for VAR operations that may produce [`VarError`].
pub type VarResult<T> = Result<T, VarError>;

/// Unified error type for VAR modeling.
#[derive(Debug, Clone, PartialEq)]
pub enum VarError {
    // ---- Panel / input validation ----
    /// Panel has no periods or no variables.
    EmptyPanel,

    /// Variable (or shock) names must be unique.
    DuplicateName { name: String },

    /// A referenced variable is not part of the panel or model.
    UnknownVariable { name: String },

    /// Panel variable count disagrees with the model or spec.
    DimensionMismatch { expected: usize, found: usize, context: &'static str },

    /// An unobserved (NaN) entry was found where a value is required.
    UnobservedData { period: Period, variable: String },

    /// Requested range is not covered by the panel.
    RangeOutsidePanel { start: Period, end: Period, first: Period, last: Period },

    // ---- Spec / options ----
    /// Lag order must be at least 1.
    InvalidOrder { order: usize },

    /// An option value is out of its admissible domain.
    InvalidOption { name: &'static str, reason: &'static str },

    /// Bootstrap draw count must be at least 1.
    InvalidDrawCount { draws: usize },

    // ---- Estimation ----
    /// Fewer than `order` periods of pre-sample history before the range.
    InsufficientHistory { required: Period, first: Period },

    /// Not enough fitted periods to identify the regressors.
    InsufficientObservations { needed: usize, found: usize },

    /// XᵗX is not positive definite (collinear regressors).
    SingularDesign,

    /// A restriction references unknown coefficients or carries a non-finite value.
    InvalidConstraint { reason: String },

    /// Restriction system is rank-deficient, contradictory, or numerically singular.
    InconsistentConstraints { reason: &'static str },

    // ---- Model properties ----
    /// Theoretical moments requested on a model with a companion eigenvalue on
    /// or outside the unit circle.
    NonStationaryModel { max_modulus: f64 },

    /// Ω is not strictly positive definite; Cholesky breaks down.
    NonPositiveDefiniteResidualCovariance,

    /// Ordering is not a permutation of the model variables.
    InvalidOrdering { reason: String },

    // ---- Forecasting ----
    /// Conditioning period lies outside the forecast horizon.
    InvalidConditioningPeriod { period: Period, start: Period, end: Period },

    /// Instrument definition is malformed or references unknown variables or
    /// lags beyond the model order.
    InvalidInstrumentSpec { name: String, reason: String },

    /// Conditions cannot all hold: they contradict each other or pin a value
    /// the model gives no variance to move.
    InconsistentConditions { period: Period, residual: f64 },

    // ---- Resampling ----
    /// Requested draws exceed the configured budget.
    DrawBudgetExceeded { draws: usize, max_draws: usize },
}

impl std::error::Error for VarError {}

impl std::fmt::Display for VarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Panel / input validation ----
            VarError::EmptyPanel => {
                write!(f, "Panel must contain at least one period and one variable.")
            }
            VarError::DuplicateName { name } => write!(f, "Name '{name}' appears more than once."),
            VarError::UnknownVariable { name } => write!(f, "Unknown variable '{name}'."),
            VarError::DimensionMismatch { expected, found, context } => {
                write!(f, "Dimension mismatch in {context}: expected {expected}, found {found}.")
            }
            VarError::UnobservedData { period, variable } => {
                write!(f, "Variable '{variable}' is unobserved in period {period}.")
            }
            VarError::RangeOutsidePanel { start, end, first, last } => write!(
                f,
                "Range {start}..={end} is not covered by the panel ({first}..={last})."
            ),
            // ---- Spec / options ----
            VarError::InvalidOrder { order } => write!(f, "Lag order must be >= 1; got: {order}"),
            VarError::InvalidOption { name, reason } => {
                write!(f, "Invalid option '{name}': {reason}")
            }
            VarError::InvalidDrawCount { draws } => {
                write!(f, "Number of bootstrap draws must be >= 1; got: {draws}")
            }
            // ---- Estimation ----
            VarError::InsufficientHistory { required, first } => write!(
                f,
                "Insufficient pre-sample history: need data from period {required}, \
                 panel starts at {first}."
            ),
            VarError::InsufficientObservations { needed, found } => write!(
                f,
                "Insufficient observations: {needed} regressors need at least as many \
                 fitted periods; found {found}."
            ),
            VarError::SingularDesign => {
                write!(f, "Regressor cross-product matrix is singular (collinear regressors).")
            }
            VarError::InvalidConstraint { reason } => write!(f, "Invalid constraint: {reason}"),
            VarError::InconsistentConstraints { reason } => {
                write!(f, "Inconsistent constraints: {reason}")
            }
            // ---- Model properties ----
            VarError::NonStationaryModel { max_modulus } => write!(
                f,
                "Model is not stationary: largest companion eigenvalue modulus is {max_modulus}."
            ),
            VarError::NonPositiveDefiniteResidualCovariance => {
                write!(f, "Residual covariance matrix is not positive definite.")
            }
            VarError::InvalidOrdering { reason } => write!(f, "Invalid shock ordering: {reason}"),
            // ---- Forecasting ----
            VarError::InvalidConditioningPeriod { period, start, end } => write!(
                f,
                "Conditioning period {period} is outside the forecast range {start}..={end}."
            ),
            VarError::InvalidInstrumentSpec { name, reason } => {
                write!(f, "Invalid instrument '{name}': {reason}")
            }
            VarError::InconsistentConditions { period, residual } => write!(
                f,
                "Conditions cannot be met jointly: condition in period {period} misses its \
                 target by {residual}."
            ),
            // ---- Resampling ----
            VarError::DrawBudgetExceeded { draws, max_draws } => {
                write!(f, "Requested {draws} bootstrap draws; the budget allows {max_draws}.")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<VarError> for PyErr {
    fn from(err: VarError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Ensure that `Display` messages embed the payload of each variant so that
    // diagnostics are meaningful without extra context.
    //
    // Given
    // -----
    // - A handful of variants carrying periods, names, and moduli.
    //
    // Expect
    // ------
    // - The rendered strings contain the payload values.
    fn display_embeds_payloads() {
        // Arrange
        let history =
            VarError::InsufficientHistory { required: Period::new(-2), first: Period::new(0) };
        let unknown = VarError::UnknownVariable { name: "gdp".to_string() };
        let explosive = VarError::NonStationaryModel { max_modulus: 1.25 };

        // Act / Assert
        assert!(history.to_string().contains("-2"));
        assert!(unknown.to_string().contains("gdp"));
        assert!(explosive.to_string().contains("1.25"));
    }

    #[test]
    // Purpose
    // -------
    // Verify that the error type is usable behind `Box<dyn Error>`.
    //
    // Given
    // -----
    // - A `VarError::SingularDesign` value.
    //
    // Expect
    // ------
    // - It boxes into `Box<dyn std::error::Error>` and keeps its message.
    fn boxes_as_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(VarError::SingularDesign);
        assert!(err.to_string().contains("singular"));
    }
}
