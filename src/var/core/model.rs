//! VarModel — an estimated reduced-form VAR as an immutable value object.
//!
//! Purpose
//! -------
//! Own every numeric quantity of a reduced-form VAR
//!
//! ```text
//! y_t = K + A₁ y_{t-1} + … + A_P y_{t-P} + G (C y_{t-1}) + ε_t,   ε_t ~ (0, Ω)
//! ```
//!
//! and expose typed accessors for downstream engines and reporting code.
//!
//! Key behaviors
//! -------------
//! - Store `A` as an `Ny × Ny × P` tensor (`a[[i, j, l-1]]` is the effect of
//!   `y_{j,t-l}` on `y_{i,t}`), `K`, optional `G`, `Ω`, and optionally the
//!   parameter covariance `Σ` of `vec(β̂)`.
//! - Build the companion transition matrix and its eigenvalues; classify the
//!   model as stationary when every modulus is below `1 − UNIT_ROOT_TOL`.
//! - Keep a registry of [`Instrument`]s; registering returns a new model.
//! - Replace string-pattern queries with the [`Quantity`] enum.
//!
//! Invariants & assumptions
//! ------------------------
//! - Shapes agree with the [`VarSpec`]; checked once in [`VarModel::from_parts`]
//!   and guaranteed by the estimator otherwise.
//! - `Ω` is symmetric positive semi-definite (not re-checked here; the
//!   structural identifier enforces strict definiteness when needed).
//! - All dynamics (companion form, forecasts, simulations) use the effective
//!   first lag `A₁ + G·C` so cointegration terms are never dropped.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use nalgebra::Complex;
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis, s};

use crate::var::{
    core::{
        instruments::Instrument,
        linalg::{UNIT_ROOT_TOL, eigenvalues},
        period::PeriodRange,
        spec::VarSpec,
    },
    errors::{VarError, VarResult},
};

/// Quantity — retrievable attributes of a [`VarModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// `Ny × Ny × P` lag coefficients `A`.
    LagCoefficients,
    /// Intercepts `K`.
    Constant,
    /// Cointegration multipliers `G` (`Ny × Ng`).
    CointegrationMultipliers,
    /// Residual covariance `Ω`.
    ResidualCovariance,
    /// Covariance of `vec(β̂)`.
    ParameterCovariance,
    /// Eigenvalues of the companion transition matrix.
    Eigenvalues,
    /// Endogenous variable names.
    VariableNames,
}

/// Value returned by [`VarModel::get`].
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityValue {
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
    Tensor(Array3<f64>),
    Complex(Vec<Complex<f64>>),
    Names(Vec<String>),
}

/// VarModel — coefficients, covariances, and instruments of a reduced-form VAR.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarModel {
    spec: VarSpec,
    a: Array3<f64>,
    k: Array1<f64>,
    g: Option<Array2<f64>>,
    omega: Array2<f64>,
    sigma: Option<Array2<f64>>,
    instruments: Vec<Instrument>,
    nobs: usize,
    sample: Option<PeriodRange>,
}

impl VarModel {
    /// Assemble a model from known coefficients (e.g. for simulation studies).
    ///
    /// Parameters
    /// ----------
    /// - `spec`: model class; fixes `Ny`, `P`, and `Ng`.
    /// - `a`: `Ny × Ny × P` lag coefficients.
    /// - `k`: intercepts (length `Ny`); must be zero when `spec` has no constant.
    /// - `g`: `Ny × Ng` multipliers, required iff `spec` carries cointegration.
    /// - `omega`: `Ny × Ny` residual covariance.
    ///
    /// Errors
    /// ------
    /// - `VarError::DimensionMismatch` for any shape disagreement.
    /// - `VarError::InvalidOption` for non-finite entries, a non-zero
    ///   intercept without a constant, or an asymmetric `omega`.
    pub fn from_parts(
        spec: VarSpec, a: Array3<f64>, k: Array1<f64>, g: Option<Array2<f64>>, omega: Array2<f64>,
    ) -> VarResult<Self> {
        let ny = spec.ny();
        check_dim(a.dim(), (ny, ny, spec.order()), "lag coefficients")?;
        check_dim((k.len(), 1, 1), (ny, 1, 1), "constant")?;
        check_dim((omega.nrows(), omega.ncols(), 1), (ny, ny, 1), "residual covariance")?;
        match (&g, spec.ng()) {
            (None, 0) => {}
            (Some(g), ng) => check_dim((g.nrows(), g.ncols(), 1), (ny, ng, 1), "cointegration")?,
            (None, ng) => {
                return Err(VarError::DimensionMismatch {
                    expected: ng,
                    found: 0,
                    context: "cointegration multipliers",
                });
            }
        }
        let all_finite = a.iter().chain(k.iter()).chain(omega.iter()).all(|v| v.is_finite())
            && g.as_ref().is_none_or(|g| g.iter().all(|v| v.is_finite()));
        if !all_finite {
            return Err(VarError::InvalidOption { name: "model", reason: "non-finite entries" });
        }
        if !spec.constant() && k.iter().any(|&v| v != 0.0) {
            return Err(VarError::InvalidOption {
                name: "constant",
                reason: "non-zero intercept on a model without a constant term",
            });
        }
        let scale = omega.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        if (&omega - &omega.t()).iter().any(|d| d.abs() > 1e-10 * scale) {
            return Err(VarError::InvalidOption {
                name: "omega",
                reason: "residual covariance must be symmetric",
            });
        }
        Ok(VarModel {
            spec,
            a,
            k,
            g,
            omega,
            sigma: None,
            instruments: Vec::new(),
            nobs: 0,
            sample: None,
        })
    }

    /// Unpack a `k × Ny` coefficient matrix laid out per [`VarSpec`].
    pub(crate) fn from_beta(
        spec: VarSpec, beta: &Array2<f64>, omega: Array2<f64>, sigma: Option<Array2<f64>>,
        nobs: usize, sample: PeriodRange,
    ) -> Self {
        let ny = spec.ny();
        let p = spec.order();
        let mut a = Array3::<f64>::zeros((ny, ny, p));
        for lag in 1..=p {
            for j in 0..ny {
                let row = spec.lag_row(j, lag);
                for i in 0..ny {
                    a[[i, j, lag - 1]] = beta[[row, i]];
                }
            }
        }
        let k = if spec.constant() { beta.row(0).to_owned() } else { Array1::zeros(ny) };
        let g = (spec.ng() > 0).then(|| {
            let from = spec.cointegration_row(0);
            beta.slice(s![from..from + spec.ng(), ..]).t().to_owned()
        });
        VarModel {
            spec,
            a,
            k,
            g,
            omega,
            sigma,
            instruments: Vec::new(),
            nobs,
            sample: Some(sample),
        }
    }

    /// Coefficients as the `k × Ny` matrix `β` (inverse of [`Self::from_beta`]).
    pub fn beta(&self) -> Array2<f64> {
        let spec = &self.spec;
        let ny = spec.ny();
        let mut beta = Array2::<f64>::zeros((spec.n_regressors(), ny));
        if spec.constant() {
            beta.row_mut(0).assign(&self.k);
        }
        for lag in 1..=spec.order() {
            for j in 0..ny {
                let row = spec.lag_row(j, lag);
                for i in 0..ny {
                    beta[[row, i]] = self.a[[i, j, lag - 1]];
                }
            }
        }
        if let Some(g) = &self.g {
            let from = spec.cointegration_row(0);
            beta.slice_mut(s![from..from + spec.ng(), ..]).assign(&g.t());
        }
        beta
    }

    pub fn spec(&self) -> &VarSpec {
        &self.spec
    }

    pub fn names(&self) -> &[String] {
        self.spec.names()
    }

    pub fn ny(&self) -> usize {
        self.spec.ny()
    }

    pub fn order(&self) -> usize {
        self.spec.order()
    }

    pub fn lag_coefficients(&self) -> &Array3<f64> {
        &self.a
    }

    /// `A_lag` as an `Ny × Ny` view (`lag ≥ 1`).
    pub fn lag_matrix(&self, lag: usize) -> ArrayView2<'_, f64> {
        self.a.index_axis(Axis(2), lag - 1)
    }

    pub fn constant(&self) -> &Array1<f64> {
        &self.k
    }

    pub fn cointegration_multipliers(&self) -> Option<&Array2<f64>> {
        self.g.as_ref()
    }

    pub fn residual_covariance(&self) -> &Array2<f64> {
        &self.omega
    }

    pub fn parameter_covariance(&self) -> Option<&Array2<f64>> {
        self.sigma.as_ref()
    }

    /// Number of fitted periods (0 for models built with [`Self::from_parts`]).
    pub fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn sample(&self) -> Option<PeriodRange> {
        self.sample
    }

    /// Lag matrices with `G·C` folded into the first lag.
    pub fn effective_lags(&self) -> Vec<Array2<f64>> {
        let mut lags: Vec<Array2<f64>> =
            (1..=self.order()).map(|l| self.lag_matrix(l).to_owned()).collect();
        if let (Some(g), Some(c)) = (&self.g, self.spec.cointegration()) {
            lags[0] += &g.dot(c);
        }
        lags
    }

    /// Companion transition matrix `Φ` (`Ny·P` square).
    ///
    /// ```text
    /// Φ = | Ã₁ Ã₂ … Ã_P |
    ///     | I  0  … 0   |
    ///     | 0  I  … 0   |
    /// ```
    pub fn companion(&self) -> Array2<f64> {
        let ny = self.ny();
        let p = self.order();
        let mut phi = Array2::<f64>::zeros((ny * p, ny * p));
        for (l, a) in self.effective_lags().iter().enumerate() {
            phi.slice_mut(s![..ny, l * ny..(l + 1) * ny]).assign(a);
        }
        for i in ny..ny * p {
            phi[[i, i - ny]] = 1.0;
        }
        phi
    }

    pub fn eigenvalues(&self) -> Vec<Complex<f64>> {
        eigenvalues(&self.companion())
    }

    /// Largest companion eigenvalue modulus.
    pub fn max_modulus(&self) -> f64 {
        self.eigenvalues().iter().map(|z| z.norm()).fold(0.0, f64::max)
    }

    /// All companion eigenvalues strictly inside the unit circle.
    pub fn is_stationary(&self) -> bool {
        self.max_modulus() < 1.0 - UNIT_ROOT_TOL
    }

    /// Register an instrument, returning a new model.
    ///
    /// Errors
    /// ------
    /// - `VarError::InvalidInstrumentSpec` if the instrument does not fit the
    ///   spec (see [`Instrument::validate`]).
    /// - `VarError::DuplicateName` if an instrument with that name exists.
    pub fn with_instrument(&self, instrument: Instrument) -> VarResult<VarModel> {
        instrument.validate(&self.spec)?;
        if self.instrument(instrument.name()).is_some() {
            return Err(VarError::DuplicateName { name: instrument.name().to_string() });
        }
        let mut model = self.clone();
        model.instruments.push(instrument);
        Ok(model)
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument(&self, name: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.name() == name)
    }

    /// Typed replacement for pattern-based attribute queries.
    ///
    /// Returns `None` for quantities the model does not carry (no `G` without
    /// cointegration, no `Σ` unless requested at estimation).
    pub fn get(&self, quantity: Quantity) -> Option<QuantityValue> {
        match quantity {
            Quantity::LagCoefficients => Some(QuantityValue::Tensor(self.a.clone())),
            Quantity::Constant => Some(QuantityValue::Vector(self.k.clone())),
            Quantity::CointegrationMultipliers => self.g.clone().map(QuantityValue::Matrix),
            Quantity::ResidualCovariance => Some(QuantityValue::Matrix(self.omega.clone())),
            Quantity::ParameterCovariance => self.sigma.clone().map(QuantityValue::Matrix),
            Quantity::Eigenvalues => Some(QuantityValue::Complex(self.eigenvalues())),
            Quantity::VariableNames => Some(QuantityValue::Names(self.names().to_vec())),
        }
    }

    /// Same model with `Ω` replaced; used by the structural layer.
    pub(crate) fn with_residual_covariance(&self, omega: Array2<f64>) -> VarModel {
        VarModel { omega, ..self.clone() }
    }

    pub(crate) fn dynamics(&self) -> Dynamics {
        Dynamics { k: self.k.clone(), lags: self.effective_lags() }
    }
}

/// Dynamics — intercept and effective lag matrices for forward recursions.
#[derive(Debug, Clone)]
pub(crate) struct Dynamics {
    pub k: Array1<f64>,
    pub lags: Vec<Array2<f64>>,
}

impl Dynamics {
    /// Deterministic part of `y_row`: `K + Σ Ã_l y_{row-l}` over rows of `buf`.
    ///
    /// Callers guarantee `row ≥ P`.
    pub fn step(&self, buf: ArrayView2<'_, f64>, row: usize, with_constant: bool) -> Array1<f64> {
        let mut out = if with_constant { self.k.clone() } else { Array1::zeros(self.k.len()) };
        for (l, a) in self.lags.iter().enumerate() {
            out += &a.dot(&buf.row(row - l - 1));
        }
        out
    }

    /// Moving-average weights `Ψ₀ = I, Ψ_h = Σ_{l=1}^{min(h,P)} Ã_l Ψ_{h-l}`.
    pub fn ma_weights(&self, horizon: usize) -> Vec<Array2<f64>> {
        let ny = self.k.len();
        let mut psi: Vec<Array2<f64>> = Vec::with_capacity(horizon);
        for h in 0..horizon {
            if h == 0 {
                psi.push(Array2::eye(ny));
                continue;
            }
            let mut next = Array2::<f64>::zeros((ny, ny));
            for (l, a) in self.lags.iter().enumerate().take(h) {
                next += &a.dot(&psi[h - l - 1]);
            }
            psi.push(next);
        }
        psi
    }
}

fn check_dim(
    found: (usize, usize, usize), expected: (usize, usize, usize), context: &'static str,
) -> VarResult<()> {
    if found == expected {
        return Ok(());
    }
    let size = |d: (usize, usize, usize)| d.0 * d.1 * d.2;
    Err(VarError::DimensionMismatch { expected: size(expected), found: size(found), context })
}
