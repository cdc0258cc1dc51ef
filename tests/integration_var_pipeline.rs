//! Integration tests for the VAR/SVAR pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end flow on simulated data: from a known
//!   four-variable VAR(2), through estimation, forecasting, conditioning,
//!   identification, impulse responses, moments, and the bootstrap.
//! - Exercise realistic sample sizes rather than toy edge cases only.
//!
//! Coverage
//! --------
//! - `var::models::simulate`: Gaussian simulation used as the data source.
//! - `var::models::estimation`: consistency of OLS, restricted estimation,
//!   cointegration terms under restrictions.
//! - `var::models::forecast`: deterministic recursion and joint conditions.
//! - `var::models::structural` / `irf`: `B·Bᵀ = Ω`, response shapes, FEVD.
//! - `var::models::acf`: theoretical vs long-run sample covariance.
//! - `var::models::bootstrap` / `ensemble`: draw accounting and filtering.
//!
//! Exclusions
//! ----------
//! - Fine-grained validation of layouts, parsers, and error variants; those
//!   are covered by unit tests.
//! - Python bindings.
use anyhow::Result;
use approx::assert_relative_eq;
use ndarray::{Array1, Array2, Array3, Axis, array, s};
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use rust_var::var::{
    core::{Coefficient, Instrument},
    models::forecast::Condition,
    prelude::*,
};

const NAMES: [&str; 4] = ["gdp", "inf", "rate", "fx"];

/// Purpose
/// -------
/// The data-generating VAR(2) used throughout: stationary, with
/// cross-variable dynamics and correlated innovations.
///
/// Returns
/// -------
/// - `(model, a1, a2, k)` where `model` owns the same coefficients.
fn true_model() -> (VarModel, Array2<f64>, Array2<f64>, Array1<f64>) {
    let a1 = array![
        [0.50, 0.10, 0.00, 0.05],
        [0.05, 0.40, -0.10, 0.00],
        [0.10, 0.20, 0.30, 0.00],
        [0.00, 0.00, 0.10, 0.20],
    ];
    let a2 = array![
        [0.10, 0.00, 0.00, 0.00],
        [0.00, 0.15, 0.00, 0.00],
        [0.00, 0.00, 0.10, 0.05],
        [0.00, -0.05, 0.00, 0.10],
    ];
    let k = array![0.5, -0.3, 0.2, 0.1];
    let omega = array![
        [0.50, 0.05, 0.05, 0.00],
        [0.05, 0.40, 0.05, 0.00],
        [0.05, 0.05, 0.30, 0.05],
        [0.00, 0.00, 0.05, 0.20],
    ];
    let mut a = Array3::<f64>::zeros((4, 4, 2));
    a.slice_mut(s![.., .., 0]).assign(&a1);
    a.slice_mut(s![.., .., 1]).assign(&a2);
    let spec = VarSpec::new(&NAMES, 2, true).expect("valid spec");
    let model = VarModel::from_parts(spec, a, k.clone(), None, omega).expect("valid model");
    (model, a1, a2, k)
}

/// Purpose
/// -------
/// Simulate `n` usable periods after a burn-in from zero initial conditions.
///
/// Parameters
/// ----------
/// - `model`: data-generating model.
/// - `n`: number of periods available for estimation after the two
///   pre-sample periods.
/// - `seed`: RNG seed.
///
/// Returns
/// -------
/// - `(panel, range)` where `range` covers the last `n` periods and the
///   panel holds everything from period 0.
fn simulated_panel(model: &VarModel, n: usize, seed: u64) -> Result<(Panel, PeriodRange)> {
    let burn = 50;
    let p = model.order();
    let ny = model.ny();
    let seed_panel = Panel::new(model.names(), Period::new(0), Array2::zeros((p, ny)))?;
    let sim_range = PeriodRange::with_len(Period::new(p as i64), burn + n).expect("non-empty");
    let path = simulate_random(model, &seed_panel, sim_range, &mut StdRng::seed_from_u64(seed))?;

    let mut full = Array2::<f64>::zeros((p + burn + n, ny));
    full.slice_mut(s![p.., ..]).assign(path.data());
    let panel = Panel::new(model.names(), Period::new(0), full)?;
    let start = Period::new((p + burn) as i64);
    let range = PeriodRange::with_len(start, n).expect("non-empty");
    Ok((panel, range))
}

fn mean_abs_error(model: &VarModel, a1: &Array2<f64>, a2: &Array2<f64>, k: &Array1<f64>) -> f64 {
    let e1 = (&model.lag_matrix(1) - a1).mapv(f64::abs).sum();
    let e2 = (&model.lag_matrix(2) - a2).mapv(f64::abs).sum();
    let ek = (model.constant() - k).mapv(f64::abs).sum();
    (e1 + e2 + ek) / 36.0
}

#[test]
// Purpose
// -------
// Estimation is consistent: coefficients from T = 100 are in the right
// neighbourhood, and the error shrinks for a much longer sample.
//
// Given
// -----
// - The four-variable VAR(2) of `true_model`, simulated for T = 100 and
//   T = 5000 with different seeds.
//
// Expect
// ------
// - T = 100 succeeds with finite estimates and 100 residual rows.
// - Mean absolute coefficient error at T = 5000 is below the T = 100 error
//   and below 0.05; the largest error at T = 5000 is below 0.15.
fn estimation_recovers_coefficients_consistently() -> Result<()> {
    let (truth, a1, a2, k) = true_model();
    let spec = truth.spec().clone();

    let (short_panel, short_range) = simulated_panel(&truth, 100, 1)?;
    let short = estimate(&short_panel, &spec, short_range, None, &EstimateOptions::new(true))?;
    let (long_panel, long_range) = simulated_panel(&truth, 5000, 2)?;
    let long = estimate(&long_panel, &spec, long_range, None, &EstimateOptions::default())?;

    assert_eq!(short.residuals.n_periods(), 100);
    assert!(short.model.lag_coefficients().iter().all(|v| v.is_finite()));
    assert_eq!(short.model.parameter_covariance().map(|s| s.nrows()), Some(4 * 9));
    let short_err = mean_abs_error(&short.model, &a1, &a2, &k);
    let long_err = mean_abs_error(&long.model, &a1, &a2, &k);
    assert!(long_err < short_err, "long {long_err} vs short {short_err}");
    assert!(long_err < 0.05);
    let max_err = (&long.model.lag_matrix(1) - &a1)
        .iter()
        .chain((&long.model.lag_matrix(2) - &a2).iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    assert!(max_err < 0.15);
    Ok(())
}

#[test]
// Purpose
// -------
// An unconditional 8-step forecast reproduces the deterministic recursion
// y_{T+1} = A1 y_T + A2 y_{T−1} + K exactly, and its standard deviations grow.
//
// Given
// -----
// - Model estimated on T = 100 simulated periods.
//
// Expect
// ------
// - Each forecast row equals the hand-rolled recursion to 1e-12.
// - Standard deviations are non-decreasing in the horizon for every variable.
fn forecast_reproduces_recursion() -> Result<()> {
    let (truth, ..) = true_model();
    let (panel, range) = simulated_panel(&truth, 100, 3)?;
    let out = estimate(&panel, truth.spec(), range, None, &EstimateOptions::default())?;
    let m = &out.model;
    let horizon = PeriodRange::with_len(range.end().offset(1), 8).expect("non-empty");

    let fc = forecast(m, &panel, horizon, None, &ForecastOptions::default())?;

    let last = panel.data().nrows() - 1;
    let mut prev2 = panel.data().row(last - 1).to_owned();
    let mut prev1 = panel.data().row(last).to_owned();
    for h in 0..8 {
        let next = m.constant() + &m.lag_matrix(1).dot(&prev1) + &m.lag_matrix(2).dot(&prev2);
        for i in 0..4 {
            assert_relative_eq!(fc.mean[[h, i]], next[i], epsilon = 1e-12);
        }
        prev2 = prev1;
        prev1 = next;
    }
    let std = fc.std.as_ref().expect("standard deviations requested");
    for i in 0..4 {
        for h in 1..8 {
            assert!(std[[h, i]] + 1e-12 >= std[[h - 1, i]]);
        }
    }
    Ok(())
}

#[test]
// Purpose
// -------
// Conditional forecasts satisfy every imposed condition, including an
// instrument, and leave the conditioned combinations without uncertainty.
//
// Given
// -----
// - gdp fixed at 1.0 in forecast periods 1 and 3; the real-rate instrument
//   `real := rate - inf` fixed at 0.5 in period 2.
//
// Expect
// ------
// - mean.gdp = 1.0 at both periods; rate − inf = 0.5 at period 2;
//   std.gdp ≈ 0 at the conditioned periods.
// - Adding gdp = 2.0 at period 1 on top of gdp = 1.0 fails with
//   `InconsistentConditions` instead of returning a compromise path.
fn conditional_forecast_meets_conditions() -> Result<()> {
    let (truth, ..) = true_model();
    let (panel, range) = simulated_panel(&truth, 100, 4)?;
    let out = estimate(&panel, truth.spec(), range, None, &EstimateOptions::default())?;
    let model = out.model.with_instrument(Instrument::parse("real := rate - inf")?)?;
    let start = range.end().offset(1);
    let horizon = PeriodRange::with_len(start, 6).expect("non-empty");
    let conditions = ConditioningSet::new()
        .variable(start.offset(1), "gdp", 1.0)
        .variable(start.offset(3), "gdp", 1.0)
        .instrument(start.offset(2), "real", 0.5);

    let fc = forecast(&model, &panel, horizon, Some(&conditions), &ForecastOptions::default())?;

    assert_relative_eq!(fc.mean[[1, 0]], 1.0, epsilon = 1e-9);
    assert_relative_eq!(fc.mean[[3, 0]], 1.0, epsilon = 1e-9);
    assert_relative_eq!(fc.mean[[2, 2]] - fc.mean[[2, 1]], 0.5, epsilon = 1e-9);
    let std = fc.std.as_ref().expect("standard deviations requested");
    assert!(std[[1, 0]] < 1e-6 && std[[3, 0]] < 1e-6);
    assert!(std[[0, 0]] > 0.1);

    let clash = conditions.variable(start.offset(1), "gdp", 2.0);
    let err = forecast(&model, &panel, horizon, Some(&clash), &ForecastOptions::default());
    assert!(matches!(err, Err(VarError::InconsistentConditions { .. })));
    Ok(())
}

#[test]
// Purpose
// -------
// Identification, impulse responses, and FEVD on an estimated model.
//
// Given
// -----
// - Model estimated on T = 100 periods; default and reversed orderings.
//
// Expect
// ------
// - B·Bᵀ = Ω for both orderings; shock panel has 100 rows.
// - Responses are [4, 4, 12]; the last cumulative slice equals the sum of
//   all response slices.
// - FEVD rows sum to one at every horizon.
fn identification_and_impulse_responses() -> Result<()> {
    let (truth, ..) = true_model();
    let (panel, range) = simulated_panel(&truth, 100, 5)?;
    let out = estimate(&panel, truth.spec(), range, None, &EstimateOptions::default())?;
    let omega = out.model.residual_covariance();

    let (svar, shocks) = identify::<&str>(&out.model, &out.residuals, None)?;
    let reversed = ["fx", "rate", "inf", "gdp"];
    let (svar_rev, _) = identify(&out.model, &out.residuals, Some(&reversed[..]))?;
    for s in [&svar, &svar_rev] {
        for (x, y) in s.implied_covariance().iter().zip(omega.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-10);
        }
    }
    assert_eq!(shocks.n_periods(), 100);

    let irf = respond(&svar, 12, &ImpulseOptions::default())?;
    assert_eq!(irf.responses.dim(), (4, 4, 12));
    let total = irf.responses.sum_axis(Axis(2));
    let last = irf.cumulative.index_axis(Axis(2), 11);
    for (x, y) in total.iter().zip(last.iter()) {
        assert_relative_eq!(*x, *y, epsilon = 1e-12);
    }

    let shares = fevd(&svar, 12)?;
    for h in 0..12 {
        for i in 0..4 {
            assert_relative_eq!(shares.slice(s![i, .., h]).sum(), 1.0, epsilon = 1e-10);
        }
    }
    Ok(())
}

#[test]
// Purpose
// -------
// The theoretical lag-0 covariance matches the sample covariance of a long
// simulation of the same model.
//
// Given
// -----
// - 40 000 simulated periods from `true_model`.
//
// Expect
// ------
// - Every lag-0 entry agrees within 10% of the largest variance; lag-1
//   entries agree to the same tolerance.
fn theoretical_acf_matches_long_simulation() -> Result<()> {
    let (truth, ..) = true_model();
    let (panel, range) = simulated_panel(&truth, 40_000, 6)?;
    let sample = sample_acf(&panel.clip(range)?, 1, &AcfOptions::default())?;

    let theory = acf(&truth, 1)?;

    let scale = (0..4).map(|i| theory.covariance[[i, i, 0]]).fold(0.0_f64, f64::max);
    for (x, y) in theory.covariance.iter().zip(sample.covariance.iter()) {
        assert!((x - y).abs() < 0.1 * scale, "theory {x} vs sample {y}");
    }
    Ok(())
}

#[test]
// Purpose
// -------
// Bootstrap ensembles account for every draw and filter idempotently.
//
// Given
// -----
// - 20 Efron and 20 Wild draws from a model estimated on T = 100 periods.
//
// Expect
// ------
// - members + excluded = 20; stationary filtering keeps at most 20 members
//   and is idempotent; coefficient means are close to the point estimate.
// - Every member, filtered or not, carries a 100 × 4 residual draw.
// - `resample` returns Ny·draws columns covering the sample plus pre-sample.
fn bootstrap_ensembles() -> Result<()> {
    let (truth, ..) = true_model();
    let (panel, range) = simulated_panel(&truth, 100, 7)?;
    let out = estimate(&panel, truth.spec(), range, None, &EstimateOptions::default())?;

    for method in [BootstrapMethod::Efron, BootstrapMethod::Wild] {
        let opts = BootstrapOptions::new(20, method, 123, true)?;
        let ensemble = bootstrap(&out.model, &panel, &out.residuals, range, None, &opts)?;

        assert_eq!(ensemble.len() + ensemble.excluded(), 20);
        let stationary = ensemble.stationary_only();
        assert!(stationary.len() <= 20);
        assert_eq!(stationary.stationary_only(), stationary);
        assert_eq!(stationary.residual_draws().len(), stationary.len());
        for i in 0..ensemble.len() {
            let draw = ensemble.residual_draw(i).expect("one draw per member");
            assert_eq!(draw.data().dim(), (100, 4));
            assert_eq!(draw.start(), range.start());
        }
        let mean = ensemble.mean_lag_coefficients().expect("non-empty ensemble");
        let diff = (&mean - out.model.lag_coefficients()).mapv(f64::abs);
        assert!(diff.iter().all(|d| *d < 0.25));
    }

    let opts = BootstrapOptions::new(3, BootstrapMethod::Efron, 5, false)?;
    let resampled = resample(&out.model, &panel, &out.residuals, range, &opts)?;
    assert_eq!(resampled.data().dim(), (102, 12));
    Ok(())
}

#[test]
// Purpose
// -------
// Restricted estimation honours restrictions on a realistic sample, and
// cointegration terms are estimable once the first lag is restricted.
//
// Given
// -----
// - (a) The four-variable VAR(2) with every off-diagonal A2 entry fixed at 0.
// - (b) A bivariate VAR(1) with C = [1, −1], G = [−0.2, 0.1]ᵀ, and the first
//   column of A1 fixed at 0 in both equations.
//
// Expect
// ------
// - (a) Off-diagonal A2 entries are exactly 0.
// - (b) The estimated effective first lag A1 + G·C is within 0.05 of the
//   truth on 3000 periods.
fn restricted_and_cointegrated_estimation() -> Result<()> {
    let (truth, ..) = true_model();
    let (panel, range) = simulated_panel(&truth, 300, 8)?;
    let mut set = ConstraintSet::new();
    for eq in NAMES {
        for var in NAMES.iter().filter(|v| **v != eq) {
            set = set.fix(Coefficient::lag(eq, var, 2), 0.0);
        }
    }
    let out = estimate(&panel, truth.spec(), range, Some(&set), &EstimateOptions::default())?;
    let a2 = out.model.lag_matrix(2);
    for i in 0..4 {
        for j in (0..4).filter(|j| *j != i) {
            assert_relative_eq!(a2[[i, j]], 0.0, epsilon = 1e-10);
        }
    }

    let spec = VarSpec::new(&["y1", "y2"], 1, true)?.with_cointegration(array![[1.0, -1.0]])?;
    let a = array![[0.0, 0.3], [0.0, 0.5]].insert_axis(Axis(2));
    let g = array![[-0.2], [0.1]];
    let coint = VarModel::from_parts(spec.clone(), a, array![0.1, 0.0], Some(g), Array2::eye(2))?;
    let effective = coint.effective_lags()[0].clone();
    let (cpanel, crange) = simulated_panel(&coint, 3000, 9)?;
    let set = ConstraintSet::new()
        .fix(Coefficient::lag("y1", "y1", 1), 0.0)
        .fix(Coefficient::lag("y2", "y1", 1), 0.0);

    let fitted = estimate(&cpanel, &spec, crange, Some(&set), &EstimateOptions::default())?;

    let estimated = fitted.model.effective_lags()[0].clone();
    for (x, y) in estimated.iter().zip(effective.iter()) {
        assert!((x - y).abs() < 0.05, "estimated {x} vs truth {y}");
    }
    Ok(())
}

/// Purpose
/// -------
/// Fixed model and history for the conditioning property test.
fn conditioning_fixture() -> (VarModel, Panel, PeriodRange) {
    let (truth, ..) = true_model();
    let model = truth
        .with_instrument(Instrument::parse("spread := rate - 0.5*gdp{-1}").expect("valid"))
        .expect("registered");
    let history =
        Panel::new(&NAMES, Period::new(0), array![[0.3, 0.1, 0.2, 0.0], [0.5, -0.2, 0.4, 0.1]])
            .expect("valid panel");
    let horizon = PeriodRange::with_len(Period::new(2), 5).expect("non-empty");
    (model, history, horizon)
}

fn condition_pool() -> Vec<Condition> {
    ConditioningSet::new()
        .variable(Period::new(2), "gdp", 0.8)
        .variable(Period::new(4), "inf", -0.1)
        .instrument(Period::new(3), "spread", 0.25)
        .variable(Period::new(6), "fx", 0.05)
        .conditions()
        .to_vec()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Joint conditioning is order-independent: any permutation of the same
    // conditions yields the same mean path and standard deviations.
    #[test]
    fn joint_conditioning_is_order_independent(shuffled in Just(condition_pool()).prop_shuffle()) {
        let (model, history, horizon) = conditioning_fixture();
        let mut reference = ConditioningSet::new();
        for c in condition_pool() {
            reference.push(c);
        }
        let mut permuted = ConditioningSet::new();
        for c in shuffled {
            permuted.push(c);
        }
        let opts = ForecastOptions::default();

        let a = forecast(&model, &history, horizon, Some(&reference), &opts).unwrap();
        let b = forecast(&model, &history, horizon, Some(&permuted), &opts).unwrap();

        for (x, y) in a.mean.iter().zip(b.mean.iter()) {
            prop_assert!((x - y).abs() < 1e-9);
        }
        for (x, y) in a.std.unwrap().iter().zip(b.std.unwrap().iter()) {
            prop_assert!((x - y).abs() < 1e-7);
        }
    }
}
