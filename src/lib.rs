//! rust_var — vector autoregressions with optional Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes VAR estimation, forecasting, and impulse responses to Python via
//! the `_rust_var` extension module. When the `python-bindings` feature is
//! enabled, this module defines the Python-facing class and submodule.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust module (`var`) as the public crate surface.
//! - Define the `#[pyclass]` wrapper [`VAR`] and the `#[pymodule]`
//!   initializer for `_rust_var`.
//! - Register the `var_models` submodule in `sys.modules` so dot-notation
//!   imports work.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in [`var`]; this file performs only FFI glue,
//!   input conversion, and error mapping.
//! - `VarError` values are converted to Python `ValueError` at the boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`var`] (or `var::prelude`) and can
//!   ignore the items guarded by `python-bindings`.
//! - The Python packaging layer imports `_rust_var.var_models.VAR` and wraps
//!   it in user-facing helpers.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in [`var`] and by
//!   `tests/integration_var_pipeline.rs`.

pub mod utils;
pub mod var;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyArray2, PyArray3};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    utils::{extract_bootstrap_method, extract_panel},
    var::{
        core::{
            BootstrapOptions, EstimateOptions, ForecastOptions, ImpulseOptions, PeriodRange,
            VarSpec,
        },
        models::{EstimationOutput, bootstrap, estimate, forecast, identify, respond},
    },
};

/// VAR — Python-facing wrapper for reduced-form VAR(P) models.
///
/// Purpose
/// -------
/// Expose estimation, forecasting, recursive impulse responses, and the
/// residual bootstrap to Python while keeping every invariant on the Rust
/// side.
///
/// Parameters
/// ----------
/// Constructed from Python via `VAR(names, order, constant=True)`:
/// - `names`: `list[str]`
///   Variable names, in column order of the data passed to `fit`.
/// - `order`: `int`
///   Lag order `P ≥ 1`.
/// - `constant`: `bool`
///   Include an intercept.
///
/// Fields
/// ------
/// - `spec`: [`VarSpec`] fixed at construction.
/// - `fitted`: last [`EstimationOutput`], `None` before `fit`.
///
/// Notes
/// -----
/// - Native Rust callers should use [`var::models`] directly; this type
///   exists solely for the PyO3 binding surface.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_var.var_models")]
pub struct VAR {
    spec: VarSpec,
    fitted: Option<EstimationOutput>,
}

#[cfg(feature = "python-bindings")]
impl VAR {
    fn output(&self) -> PyResult<&EstimationOutput> {
        self.fitted
            .as_ref()
            .ok_or_else(|| PyValueError::new_err("model is not fitted; call fit() first"))
    }
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl VAR {
    #[new]
    #[pyo3(
        signature = (names, order, constant = true),
        text_signature = "(names, order, /, constant=True)"
    )]
    pub fn new(names: Vec<String>, order: usize, constant: bool) -> PyResult<Self> {
        let spec = VarSpec::new(&names[..], order, constant)?;
        Ok(VAR { spec, fitted: None })
    }

    /// Estimate by least squares over every period after the first `P`.
    #[pyo3(
        signature = (data, start = 0, cov_parameters = false),
        text_signature = "(self, data, /, start=0, cov_parameters=False)"
    )]
    pub fn fit<'py>(
        &mut self, py: Python<'py>, data: &Bound<'py, PyAny>, start: i64, cov_parameters: bool,
    ) -> PyResult<()> {
        let panel = extract_panel(py, data, self.spec.names(), start)?;
        let first = panel.start().offset(self.spec.order() as i64);
        let range = PeriodRange::new(first, panel.end())
            .ok_or_else(|| PyValueError::new_err("data has no periods after the initial lags"))?;
        let out = estimate(&panel, &self.spec, range, None, &EstimateOptions::new(cov_parameters))?;
        self.fitted = Some(out);
        Ok(())
    }

    /// Unconditional forecast for `horizon` periods after the sample end.
    ///
    /// Returns `(mean, std)`, each `horizon × Ny`.
    #[pyo3(signature = (horizon), text_signature = "(self, horizon, /)")]
    pub fn forecast<'py>(
        &self, py: Python<'py>, horizon: usize,
    ) -> PyResult<(Bound<'py, PyArray2<f64>>, Bound<'py, PyArray2<f64>>)> {
        let out = self.output()?;
        let range = PeriodRange::with_len(out.data.end().offset(1), horizon)
            .ok_or_else(|| PyValueError::new_err("horizon must be at least 1"))?;
        let result = forecast(&out.model, &out.data, range, None, &ForecastOptions::default())?;
        let std = result.std.unwrap_or_else(|| result.mean.mapv(|_| f64::NAN));
        Ok((result.mean.into_pyarray(py), std.into_pyarray(py)))
    }

    /// Recursive (Cholesky) impulse responses, `Ny × Ny × horizon`.
    ///
    /// Returns `(responses, cumulative)`.
    #[pyo3(
        signature = (horizon, ordering = None, presample = false),
        text_signature = "(self, horizon, /, ordering=None, presample=False)"
    )]
    pub fn impulse_response<'py>(
        &self, py: Python<'py>, horizon: usize, ordering: Option<Vec<String>>, presample: bool,
    ) -> PyResult<(Bound<'py, PyArray3<f64>>, Bound<'py, PyArray3<f64>>)> {
        let out = self.output()?;
        let (structural, _) = identify(&out.model, &out.residuals, ordering.as_deref())?;
        let irf = respond(&structural, horizon, &ImpulseOptions::new(presample))?;
        Ok((irf.responses.into_pyarray(py), irf.cumulative.into_pyarray(py)))
    }

    /// Residual bootstrap; returns the ensemble's lag coefficients stacked
    /// as `draws × Ny × Ny × P` plus a stationarity flag per draw.
    #[pyo3(
        signature = (draws = 100, method = None, seed = 42),
        text_signature = "(self, /, draws=100, method='efron', seed=42)"
    )]
    pub fn bootstrap(
        &self, draws: usize, method: Option<&str>, seed: u64,
    ) -> PyResult<(Vec<Vec<f64>>, Vec<bool>)> {
        let out = self.output()?;
        let method = extract_bootstrap_method(method)?;
        let opts = BootstrapOptions::new(draws, method, seed, true)?;
        let range = out.residuals.range();
        let ensemble = bootstrap(&out.model, &out.data, &out.residuals, range, None, &opts)?;
        let coefs =
            ensemble.iter().map(|m| m.lag_coefficients().iter().copied().collect()).collect();
        Ok((coefs, ensemble.stationary_mask()))
    }

    #[getter]
    pub fn names(&self) -> Vec<String> {
        self.spec.names().to_vec()
    }

    #[getter]
    pub fn lag_coefficients<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray3<f64>>> {
        Ok(self.output()?.model.lag_coefficients().clone().into_pyarray(py))
    }

    #[getter]
    pub fn constant<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray1<f64>>> {
        Ok(self.output()?.model.constant().clone().into_pyarray(py))
    }

    #[getter]
    pub fn residual_covariance<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.output()?.model.residual_covariance().clone().into_pyarray(py))
    }

    #[getter]
    pub fn residuals<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.output()?.residuals.data().clone().into_pyarray(py))
    }

    #[getter]
    pub fn eigenvalue_moduli(&self) -> PyResult<Vec<f64>> {
        Ok(self.output()?.model.eigenvalues().iter().map(|z| z.norm()).collect())
    }

    #[getter]
    pub fn is_stationary(&self) -> PyResult<bool> {
        Ok(self.output()?.model.is_stationary())
    }
}

#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_var<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let var_models_mod = PyModule::new(_py, "var_models")?;
    var_models(_py, m, &var_models_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("rust_var.var_models", var_models_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn var_models<'py>(
    _py: Python, rust_var: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<VAR>()?;
    rust_var.add_submodule(m)?;
    Ok(())
}
