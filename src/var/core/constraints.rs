//! ConstraintSet — linear equality restrictions on VAR coefficients.
//!
//! Purpose
//! -------
//! Express restrictions on the reduced-form coefficients by *name* (equation,
//! regressor variable, lag) and lower them to the numeric system `R·vec(β) = c`
//! consumed by the restricted least-squares solver.
//!
//! Key behaviors
//! -------------
//! - [`Restriction::Fixed`] pins a single coefficient to a value.
//! - [`Restriction::Linear`] imposes `Σ αᵢ·βᵢ = c` over any coefficients,
//!   including across equations.
//! - [`ConstraintSet::system`] validates every reference against a
//!   [`VarSpec`] and returns the dense `(R, c)` pair.
//!
//! Conventions
//! -----------
//! - `vec(β)` stacks equations: coefficient of regressor `r` in equation `i`
//!   sits at column `i·k + r` of `R` (see [`VarSpec`]).
//! - A fixed value is one row of `R` with a single unit entry; it is not
//!   special-cased in the solver.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ndarray::{Array1, Array2};

use crate::var::{
    core::spec::VarSpec,
    errors::{VarError, VarResult},
};

/// Coefficient — named address of one entry of `β`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Coefficient {
    /// Intercept of `equation`.
    Constant { equation: String },
    /// Coefficient on `variable` at `lag ≥ 1` in `equation`.
    Lag { equation: String, variable: String, lag: usize },
    /// Multiplier on cointegration term `index` in `equation`.
    Cointegration { equation: String, index: usize },
}

impl Coefficient {
    pub fn constant(equation: &str) -> Self {
        Coefficient::Constant { equation: equation.to_string() }
    }

    pub fn lag(equation: &str, variable: &str, lag: usize) -> Self {
        Coefficient::Lag { equation: equation.to_string(), variable: variable.to_string(), lag }
    }

    pub fn cointegration(equation: &str, index: usize) -> Self {
        Coefficient::Cointegration { equation: equation.to_string(), index }
    }

    /// Position in `vec(β)` under `spec`.
    pub(crate) fn position(&self, spec: &VarSpec) -> VarResult<usize> {
        let k = spec.n_regressors();
        let equation_of = |name: &str| {
            spec.index_of(name).ok_or_else(|| VarError::InvalidConstraint {
                reason: format!("unknown equation '{name}'"),
            })
        };
        match self {
            Coefficient::Constant { equation } => {
                let eq = equation_of(equation)?;
                if !spec.constant() {
                    return Err(VarError::InvalidConstraint {
                        reason: "model has no constant term".to_string(),
                    });
                }
                Ok(eq * k)
            }
            Coefficient::Lag { equation, variable, lag } => {
                let eq = equation_of(equation)?;
                let var = spec.index_of(variable).ok_or_else(|| VarError::InvalidConstraint {
                    reason: format!("unknown regressor variable '{variable}'"),
                })?;
                if *lag == 0 || *lag > spec.order() {
                    return Err(VarError::InvalidConstraint {
                        reason: format!("lag {lag} outside 1..={}", spec.order()),
                    });
                }
                Ok(eq * k + spec.lag_row(var, *lag))
            }
            Coefficient::Cointegration { equation, index } => {
                let eq = equation_of(equation)?;
                if *index >= spec.ng() {
                    return Err(VarError::InvalidConstraint {
                        reason: format!("cointegration term {index} outside 0..{}", spec.ng()),
                    });
                }
                Ok(eq * k + spec.cointegration_row(*index))
            }
        }
    }
}

/// Restriction — one linear equality on the coefficients.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Restriction {
    /// `β[coefficient] = value`.
    Fixed { coefficient: Coefficient, value: f64 },
    /// `Σ weight·β[coefficient] = rhs`.
    Linear { terms: Vec<(Coefficient, f64)>, rhs: f64 },
}

/// Numeric restriction system `R·vec(β) = c`.
#[derive(Debug, Clone, PartialEq)]
pub struct RestrictionSystem {
    pub r: Array2<f64>,
    pub c: Array1<f64>,
}

/// ConstraintSet — ordered collection of restrictions.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintSet {
    restrictions: Vec<Restriction>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `β[coefficient] = value`.
    pub fn fix(mut self, coefficient: Coefficient, value: f64) -> Self {
        self.restrictions.push(Restriction::Fixed { coefficient, value });
        self
    }

    /// Add `Σ weight·β[coefficient] = rhs`.
    pub fn linear(mut self, terms: Vec<(Coefficient, f64)>, rhs: f64) -> Self {
        self.restrictions.push(Restriction::Linear { terms, rhs });
        self
    }

    pub fn push(&mut self, restriction: Restriction) {
        self.restrictions.push(restriction);
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn len(&self) -> usize {
        self.restrictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }

    /// Lower the restrictions to `(R, c)` for `spec`.
    ///
    /// Errors
    /// ------
    /// - `VarError::InvalidConstraint` for unknown equations/variables, lags
    ///   outside `1..=P`, a constant restriction on a model without one, an
    ///   empty linear restriction, or non-finite weights/values.
    pub fn system(&self, spec: &VarSpec) -> VarResult<RestrictionSystem> {
        let n = spec.ny() * spec.n_regressors();
        let m = self.restrictions.len();
        let mut r = Array2::<f64>::zeros((m, n));
        let mut c = Array1::<f64>::zeros(m);

        for (row, restriction) in self.restrictions.iter().enumerate() {
            match restriction {
                Restriction::Fixed { coefficient, value } => {
                    check_finite(*value)?;
                    r[[row, coefficient.position(spec)?]] = 1.0;
                    c[row] = *value;
                }
                Restriction::Linear { terms, rhs } => {
                    if terms.is_empty() {
                        return Err(VarError::InvalidConstraint {
                            reason: "linear restriction without terms".to_string(),
                        });
                    }
                    check_finite(*rhs)?;
                    for (coefficient, weight) in terms {
                        check_finite(*weight)?;
                        r[[row, coefficient.position(spec)?]] += *weight;
                    }
                    c[row] = *rhs;
                }
            }
        }
        Ok(RestrictionSystem { r, c })
    }
}

fn check_finite(value: f64) -> VarResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(VarError::InvalidConstraint { reason: format!("non-finite value {value}") })
    }
}
