//! Python-boundary helpers: array extraction and option parsing.
//!
//! Everything here runs only with the `python-bindings` feature and performs
//! conversion and validation; numerical work stays in `crate::var`.
#[cfg(feature = "python-bindings")]
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

#[cfg(feature = "python-bindings")]
use crate::var::core::{BootstrapMethod, Panel, Period};

/// Accept a 2-D `numpy.ndarray`, a `pandas.DataFrame`, or a nested sequence of
/// floats (rows are periods).
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray2<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro);
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (), None) {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(frame_ro);
        }
    }

    let rows: Vec<Vec<f64>> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err(
            "expected a 2-D numpy.ndarray, pandas.DataFrame, or nested sequence of float64",
        )
    })?;
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(PyValueError::new_err("rows must all have the same length"));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let matrix = Array2::from_shape_vec((flat.len() / ncols.max(1), ncols), flat)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(matrix.into_pyarray(py).readonly())
}

/// Build a [`Panel`] from Python data; `NaN` marks unobserved entries.
#[cfg(feature = "python-bindings")]
pub fn extract_panel<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, names: &[String], start: i64,
) -> PyResult<Panel> {
    let arr = extract_f64_matrix(py, raw_data)?;
    let data = arr.as_array().to_owned();
    Ok(Panel::new(names, Period::new(start), data)?)
}

/// Parse a bootstrap method name (`"efron"` or `"wild"`).
#[cfg(feature = "python-bindings")]
pub fn extract_bootstrap_method(method: Option<&str>) -> PyResult<BootstrapMethod> {
    let method_str = method.unwrap_or("efron").to_lowercase();
    match method_str.as_str() {
        "efron" | "iid" => Ok(BootstrapMethod::Efron),
        "wild" | "rademacher" => Ok(BootstrapMethod::Wild),
        other => Err(PyValueError::new_err(format!(
            "invalid bootstrap method {:?} (expected 'efron' or 'wild')",
            other
        ))),
    }
}
