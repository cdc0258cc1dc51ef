//! VarSpec — the fixed model class a VAR is estimated in.
//!
//! Purpose
//! -------
//! Describe the shape of a reduced-form VAR before any data is seen: the
//! ordered variable names, lag order `P`, whether an intercept is included,
//! and (optionally) a set of `Ng` cointegrating vectors whose lagged
//! combinations `C·y_{t-1}` enter every equation as extra regressors.
//!
//! Key behaviors
//! -------------
//! - Validate names (non-empty, unique), `P ≥ 1`, and the shape of `C`.
//! - Define the regressor layout shared by estimation, constraints, and the
//!   parameter covariance:
//!
//! ```text
//! x_t = [ 1 | y_{t-1}ᵀ | … | y_{t-P}ᵀ | (C y_{t-1})ᵀ ]
//!         ^const (optional)             ^Ng cointegration terms (optional)
//! ```
//!
//! Conventions
//! -----------
//! - Coefficients are stored as `β` with shape `k × Ny` (column `i` is
//!   equation `i`), and `vec(β)` stacks equations, so the coefficient of
//!   regressor `r` in equation `i` sits at `i·k + r`.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ndarray::Array2;

use crate::var::errors::{VarError, VarResult};

/// VarSpec — names, lag order, intercept flag, and cointegrating vectors.
///
/// Fields
/// ------
/// - `names`: ordered, unique endogenous variable names (`Ny` of them).
/// - `order`: lag order `P ≥ 1`.
/// - `constant`: include an intercept in every equation.
/// - `cointegration`: optional `Ng × Ny` matrix `C` of cointegrating vectors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarSpec {
    names: Vec<String>,
    order: usize,
    constant: bool,
    cointegration: Option<Array2<f64>>,
}

impl VarSpec {
    /// Build a validated spec.
    ///
    /// Errors
    /// ------
    /// - `VarError::EmptyPanel` when `names` is empty.
    /// - `VarError::DuplicateName` for repeated names.
    /// - `VarError::InvalidOrder` when `order == 0`.
    pub fn new<S: AsRef<str>>(names: &[S], order: usize, constant: bool) -> VarResult<Self> {
        if names.is_empty() {
            return Err(VarError::EmptyPanel);
        }
        if order == 0 {
            return Err(VarError::InvalidOrder { order });
        }
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        check_unique(&names)?;
        Ok(VarSpec { names, order, constant, cointegration: None })
    }

    /// Attach `Ng` cointegrating vectors (rows of an `Ng × Ny` matrix).
    ///
    /// Errors
    /// ------
    /// - `VarError::DimensionMismatch` if `c.ncols() != Ny`.
    /// - `VarError::InvalidOption` if `c` has no rows or non-finite entries.
    pub fn with_cointegration(mut self, c: Array2<f64>) -> VarResult<Self> {
        if c.ncols() != self.names.len() {
            return Err(VarError::DimensionMismatch {
                expected: self.names.len(),
                found: c.ncols(),
                context: "cointegrating vectors",
            });
        }
        if c.nrows() == 0 {
            return Err(VarError::InvalidOption {
                name: "cointegration",
                reason: "at least one cointegrating vector is required",
            });
        }
        if c.iter().any(|v| !v.is_finite()) {
            return Err(VarError::InvalidOption {
                name: "cointegration",
                reason: "cointegrating vectors must be finite",
            });
        }
        self.cointegration = Some(c);
        Ok(self)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn ny(&self) -> usize {
        self.names.len()
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn constant(&self) -> bool {
        self.constant
    }

    pub fn cointegration(&self) -> Option<&Array2<f64>> {
        self.cointegration.as_ref()
    }

    /// Number of cointegrating vectors `Ng` (0 when none).
    pub fn ng(&self) -> usize {
        self.cointegration.as_ref().map_or(0, |c| c.nrows())
    }

    /// Regressors per equation: `k = [const] + Ny·P + Ng`.
    pub fn n_regressors(&self) -> usize {
        usize::from(self.constant) + self.ny() * self.order + self.ng()
    }

    /// Row of `β` holding the coefficient on `y_{var, t-lag}` (`lag ≥ 1`).
    pub fn lag_row(&self, var: usize, lag: usize) -> usize {
        usize::from(self.constant) + (lag - 1) * self.ny() + var
    }

    /// Row of `β` holding the multiplier on cointegration term `g`.
    pub fn cointegration_row(&self, g: usize) -> usize {
        usize::from(self.constant) + self.ny() * self.order + g
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

pub(crate) fn check_unique(names: &[String]) -> VarResult<()> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(VarError::DuplicateName { name: name.clone() });
        }
    }
    Ok(())
}
