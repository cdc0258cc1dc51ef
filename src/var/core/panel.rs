//! Panel — time-indexed rectangular data for VAR models.
//!
//! Purpose
//! -------
//! Hold the numeric observations a VAR is estimated on, forecast from, or
//! resampled into, together with their period index and variable names. The
//! panel is the only data container the engines consume or produce.
//!
//! Key behaviors
//! -------------
//! - [`Panel::new`] enforces rectangular, non-empty data with unique names.
//! - Unobserved entries are stored as `NaN`; [`Panel::value`] returns `None`
//!   for them so callers never confuse "missing" with `0.0`.
//! - [`Panel::lagged_design`] builds the regressor matrix `X` and response
//!   `Y` for a sample range following the [`VarSpec`] layout, checking that
//!   `P` pre-sample periods are available.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data` has shape `n_periods × n_vars`; row `r` is period `start + r`.
//! - Names are unique; the column order is the order of `names`.
//! - A panel is read-only once built; engines return new panels.
//!
//! Conventions
//! -----------
//! - Rows index time, columns index variables (same as score matrices
//!   elsewhere in this crate).
//! - Ranges are inclusive [`PeriodRange`]s.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ndarray::{Array1, Array2, ArrayView1, s};

use crate::var::{
    core::{
        period::{Period, PeriodRange},
        spec::{VarSpec, check_unique},
    },
    errors::{VarError, VarResult},
};

/// Panel — named columns of observations over a contiguous period index.
///
/// Fields
/// ------
/// - `names`: `Vec<String>`
///   Column names, unique.
/// - `start`: [`Period`]
///   Period of the first row.
/// - `data`: `Array2<f64>`
///   Observations, `NaN` marking an unobserved entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Panel {
    names: Vec<String>,
    start: Period,
    data: Array2<f64>,
}

/// Regressor/response pair for least-squares estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrices {
    /// `T × k` regressors, one row per fitted period.
    pub x: Array2<f64>,
    /// `T × Ny` responses.
    pub y: Array2<f64>,
}

impl Panel {
    /// Construct a validated panel.
    ///
    /// Errors
    /// ------
    /// - `VarError::EmptyPanel` if there are no rows or no columns.
    /// - `VarError::DimensionMismatch` if `names.len() != data.ncols()`.
    /// - `VarError::DuplicateName` if a name repeats.
    pub fn new<S: AsRef<str>>(names: &[S], start: Period, data: Array2<f64>) -> VarResult<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(VarError::EmptyPanel);
        }
        if names.len() != data.ncols() {
            return Err(VarError::DimensionMismatch {
                expected: data.ncols(),
                found: names.len(),
                context: "panel names",
            });
        }
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        check_unique(&names)?;
        Ok(Panel { names, start, data })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn n_periods(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_vars(&self) -> usize {
        self.data.ncols()
    }

    pub fn start(&self) -> Period {
        self.start
    }

    pub fn end(&self) -> Period {
        self.start.offset(self.data.nrows() as i64 - 1)
    }

    pub fn range(&self) -> PeriodRange {
        PeriodRange::covering(self.start, self.data.nrows())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Row index of `period`, if inside the panel.
    pub fn row_of(&self, period: Period) -> Option<usize> {
        self.range().position(period)
    }

    /// Observed value, or `None` when out of range or unobserved.
    pub fn value(&self, period: Period, name: &str) -> Option<f64> {
        let row = self.row_of(period)?;
        let col = self.index_of(name)?;
        let v = self.data[[row, col]];
        if v.is_nan() { None } else { Some(v) }
    }

    pub fn is_observed(&self, period: Period, name: &str) -> bool {
        self.value(period, name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.index_of(name).map(|j| self.data.column(j))
    }

    /// Sub-panel restricted to `range`.
    ///
    /// Errors
    /// ------
    /// - `VarError::RangeOutsidePanel` if `range` is not fully covered.
    pub fn clip(&self, range: PeriodRange) -> VarResult<Panel> {
        let first = self.check_covers(range)?;
        let rows = s![first..first + range.len(), ..];
        Ok(Panel {
            names: self.names.clone(),
            start: range.start(),
            data: self.data.slice(rows).to_owned(),
        })
    }

    /// Sub-panel with the named columns, in the requested order.
    ///
    /// Errors
    /// ------
    /// - `VarError::UnknownVariable` for a name not present in the panel.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> VarResult<Panel> {
        let cols = self.column_indices(names)?;
        let mut data = Array2::<f64>::zeros((self.n_periods(), cols.len()));
        for (dst, &src) in cols.iter().enumerate() {
            data.column_mut(dst).assign(&self.data.column(src));
        }
        Panel::new(names, self.start, data)
    }

    /// Observations of the spec's variables (in spec order) for one period.
    ///
    /// Errors
    /// ------
    /// - `VarError::RangeOutsidePanel` if the period is not in the panel.
    /// - `VarError::UnobservedData` if any entry is `NaN`.
    pub(crate) fn observation(&self, period: Period, cols: &[usize]) -> VarResult<Array1<f64>> {
        let row = self.row_of(period).ok_or(VarError::RangeOutsidePanel {
            start: period,
            end: period,
            first: self.start,
            last: self.end(),
        })?;
        let mut out = Array1::<f64>::zeros(cols.len());
        for (i, &c) in cols.iter().enumerate() {
            let v = self.data[[row, c]];
            if v.is_nan() {
                return Err(VarError::UnobservedData { period, variable: self.names[c].clone() });
            }
            out[i] = v;
        }
        Ok(out)
    }

    /// Column positions of `names` inside this panel.
    pub(crate) fn column_indices<S: AsRef<str>>(&self, names: &[S]) -> VarResult<Vec<usize>> {
        names
            .iter()
            .map(|n| {
                self.index_of(n.as_ref())
                    .ok_or_else(|| VarError::UnknownVariable { name: n.as_ref().to_string() })
            })
            .collect()
    }

    /// Build the lagged regressor matrix and response for `range`.
    ///
    /// Parameters
    /// ----------
    /// - `range`: [`PeriodRange`]
    ///   Fitted periods; `P` periods before `range.start()` must be present
    ///   as initial conditions.
    /// - `spec`: `&VarSpec`
    ///   Supplies variable names (looked up by name), order, intercept flag,
    ///   and cointegrating vectors.
    ///
    /// Returns
    /// -------
    /// `VarResult<DesignMatrices>`
    ///   `X` (`T × k`) and `Y` (`T × Ny`) with `T = range.len()`.
    ///
    /// Errors
    /// ------
    /// - `VarError::UnknownVariable` if a spec variable is missing.
    /// - `VarError::InsufficientHistory` if the panel starts after
    ///   `range.start() − P`.
    /// - `VarError::RangeOutsidePanel` if `range.end()` is past the panel.
    /// - `VarError::UnobservedData` for a `NaN` in any row used.
    pub fn lagged_design(&self, range: PeriodRange, spec: &VarSpec) -> VarResult<DesignMatrices> {
        let cols = self.column_indices(spec.names())?;
        let p = spec.order();
        self.check_history(range, p)?;

        let t_len = range.len();
        let k = spec.n_regressors();
        let ny = spec.ny();
        let mut x = Array2::<f64>::zeros((t_len, k));
        let mut y = Array2::<f64>::zeros((t_len, ny));

        for (row, period) in range.iter().enumerate() {
            y.row_mut(row).assign(&self.observation(period, &cols)?);
            if spec.constant() {
                x[[row, 0]] = 1.0;
            }
            for lag in 1..=p {
                let lagged = self.observation(period.offset(-(lag as i64)), &cols)?;
                let from = spec.lag_row(0, lag);
                x.slice_mut(s![row, from..from + ny]).assign(&lagged);
            }
            if let Some(c) = spec.cointegration() {
                let lagged = self.observation(period.offset(-1), &cols)?;
                let from = spec.cointegration_row(0);
                x.slice_mut(s![row, from..from + c.nrows()]).assign(&c.dot(&lagged));
            }
        }
        Ok(DesignMatrices { x, y })
    }

    /// The `order × Ny` block of observations just before `start`, oldest
    /// first, with columns in the order of `names`.
    ///
    /// Errors
    /// ------
    /// - `VarError::InsufficientHistory` if the block starts before the panel.
    /// - `VarError::RangeOutsidePanel` if it ends after the panel.
    /// - `VarError::UnknownVariable` / `VarError::UnobservedData` as in
    ///   [`Panel::lagged_design`].
    pub(crate) fn initial_conditions<S: AsRef<str>>(
        &self, names: &[S], start: Period, order: usize,
    ) -> VarResult<Array2<f64>> {
        let required = start.offset(-(order as i64));
        if required < self.start {
            return Err(VarError::InsufficientHistory { required, first: self.start });
        }
        let cols = self.column_indices(names)?;
        let mut history = Array2::<f64>::zeros((order, cols.len()));
        for l in 0..order {
            history.row_mut(l).assign(&self.observation(required.offset(l as i64), &cols)?);
        }
        Ok(history)
    }

    /// Check that `range` is covered and preceded by `order` periods.
    pub(crate) fn check_history(&self, range: PeriodRange, order: usize) -> VarResult<()> {
        let required = range.start().offset(-(order as i64));
        if required < self.start {
            return Err(VarError::InsufficientHistory { required, first: self.start });
        }
        if range.end() > self.end() {
            return Err(VarError::RangeOutsidePanel {
                start: range.start(),
                end: range.end(),
                first: self.start,
                last: self.end(),
            });
        }
        Ok(())
    }

    fn check_covers(&self, range: PeriodRange) -> VarResult<usize> {
        match (self.row_of(range.start()), self.row_of(range.end())) {
            (Some(first), Some(_)) => Ok(first),
            _ => Err(VarError::RangeOutsidePanel {
                start: range.start(),
                end: range.end(),
                first: self.start,
                last: self.end(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_panel() -> Panel {
        let data = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0], [5.0, 50.0]];
        Panel::new(&["a", "b"], Period::new(0), data).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Verify the lagged design matrix row layout for a VAR(2) with intercept.
    //
    // Given
    // -----
    // - A 5-period, 2-variable panel and range 2..=4.
    //
    // Expect
    // ------
    // - X rows `[1, y_{t-1}, y_{t-2}]`, Y rows `y_t`.
    fn lagged_design_layout() {
        // Arrange
        let panel = toy_panel();
        let spec = VarSpec::new(&["a", "b"], 2, true).unwrap();
        let range = PeriodRange::new(Period::new(2), Period::new(4)).unwrap();

        // Act
        let design = panel.lagged_design(range, &spec).unwrap();

        // Assert
        assert_eq!(design.x.dim(), (3, 5));
        assert_eq!(design.x.row(0).to_vec(), vec![1.0, 2.0, 20.0, 1.0, 10.0]);
        assert_eq!(design.y.row(2).to_vec(), vec![5.0, 50.0]);
    }

    #[test]
    // Purpose
    // -------
    // Ensure missing pre-sample history is reported explicitly.
    //
    // Given
    // -----
    // - Range starting at period 1 with order 2 (needs period -1).
    //
    // Expect
    // ------
    // - `InsufficientHistory { required: -1, first: 0 }`.
    fn lagged_design_requires_history() {
        let panel = toy_panel();
        let spec = VarSpec::new(&["a", "b"], 2, true).unwrap();
        let range = PeriodRange::new(Period::new(1), Period::new(4)).unwrap();

        let err = panel.lagged_design(range, &spec).unwrap_err();

        assert_eq!(
            err,
            VarError::InsufficientHistory { required: Period::new(-1), first: Period::new(0) }
        );
    }

    #[test]
    // Purpose
    // -------
    // Distinguish unobserved entries from zeros.
    //
    // Given
    // -----
    // - A panel with a NaN and a literal 0.0.
    //
    // Expect
    // ------
    // - `value` returns `None` for NaN and `Some(0.0)` for zero; the design
    //   builder reports `UnobservedData`.
    fn unobserved_is_not_zero() {
        let data = array![[0.0, 1.0], [f64::NAN, 2.0], [1.0, 3.0]];
        let panel = Panel::new(&["a", "b"], Period::new(0), data).unwrap();
        let spec = VarSpec::new(&["a", "b"], 1, false).unwrap();
        let range = PeriodRange::new(Period::new(1), Period::new(2)).unwrap();

        assert_eq!(panel.value(Period::new(0), "a"), Some(0.0));
        assert_eq!(panel.value(Period::new(1), "a"), None);
        assert!(matches!(
            panel.lagged_design(range, &spec),
            Err(VarError::UnobservedData { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Check `clip` and `select` preserve periods and column order.
    //
    // Given
    // -----
    // - The toy panel, clipped to 1..=3 and reordered to [b, a].
    //
    // Expect
    // ------
    // - Start period 1, three rows, columns swapped.
    fn clip_and_select() {
        let panel = toy_panel();
        let range = PeriodRange::new(Period::new(1), Period::new(3)).unwrap();

        let clipped = panel.clip(range).unwrap().select(&["b", "a"]).unwrap();

        assert_eq!(clipped.start(), Period::new(1));
        assert_eq!(clipped.n_periods(), 3);
        assert_eq!(clipped.data().row(0).to_vec(), vec![20.0, 2.0]);
        assert!(matches!(panel.select(&["zz"]), Err(VarError::UnknownVariable { .. })));
    }
}
