//! One-stage implicit Adams-Moulton method (the trapezoidal rule)
//!     y_{n+1} = y_n + h/2 (f(t_n, y_n) + f(t_{n+1}, y_{n+1}))
//! with the implicit equation solved by Newton iteration from an explicit Euler predictor.
use crate::numerical::NR_for_implicit::{NewtonSettings, newton_solve};
use crate::numerical::Stiff_api::{SolverStats, integrate_fixed};
use nalgebra::{DMatrix, DVector};
use std::cell::Cell;

pub fn adams_moulton_step<F, J>(
    f: &F,
    jac: &J,
    t: f64,
    y: &DVector<f64>,
    h: f64,
    settings: &NewtonSettings,
    stats: &mut SolverStats,
) -> Result<DVector<f64>, String>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
    J: Fn(f64, &DVector<f64>) -> DMatrix<f64>,
{
    let n = y.len();
    let t_next = t + h;
    let f_n = f(t, y);
    let predictor = y + h * &f_n;
    let known = y + 0.5 * h * &f_n;
    let rhs_calls = Cell::new(1usize);
    let jac_calls = Cell::new(0usize);

    let residual = |z: &DVector<f64>| {
        rhs_calls.set(rhs_calls.get() + 1);
        z - &known - 0.5 * h * f(t_next, z)
    };
    let newton_matrix = |z: &DVector<f64>| {
        jac_calls.set(jac_calls.get() + 1);
        DMatrix::identity(n, n) - 0.5 * h * jac(t_next, z)
    };
    let outcome = newton_solve(residual, newton_matrix, predictor, settings)
        .map_err(|e| format!("trapezoidal step at t = {}: {}", t, e))?;

    stats.rhs_evaluations += rhs_calls.get();
    stats.jacobian_evaluations += jac_calls.get();
    stats.lu_decompositions += jac_calls.get();
    stats.record_newton(&outcome);
    Ok(outcome.solution)
}

/// Fixed-step trapezoidal integration on [t0, t_end]; see `integrate_fixed` for the layout
/// of the returned trajectory and the meaning of `progress_every`.
pub fn solve_implicit_adams<F, J>(
    f: F,
    jac: J,
    t0: f64,
    y0: DVector<f64>,
    t_end: f64,
    h: f64,
    settings: &NewtonSettings,
    progress_every: usize,
    stats: &mut SolverStats,
) -> Result<(DVector<f64>, DMatrix<f64>), String>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
    J: Fn(f64, &DVector<f64>) -> DMatrix<f64>,
{
    integrate_fixed(t0, y0, t_end, h, progress_every, stats, |t, y, stats| {
        adams_moulton_step(&f, &jac, t, y, h, settings, stats)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::ODE_systems::{
        exponential_decay, exponential_decay_jacobian, van_der_pol, van_der_pol_jacobian,
    };
    use approx::assert_relative_eq;

    fn decay_error(h: f64) -> f64 {
        let mut stats = SolverStats::default();
        let (_, y) = solve_implicit_adams(
            exponential_decay(1.0),
            exponential_decay_jacobian(1.0),
            0.0,
            DVector::from_vec(vec![1.0]),
            1.0,
            h,
            &NewtonSettings::default(),
            0,
            &mut stats,
        )
        .unwrap();
        (y[(y.nrows() - 1, 0)] - (-1.0_f64).exp()).abs()
    }

    #[test]
    fn test_trapezoidal_matches_closed_form() {
        // for y' = -y one step multiplies by (1 - h/2)/(1 + h/2)
        let h = 0.1;
        let mut stats = SolverStats::default();
        let y1 = adams_moulton_step(
            &exponential_decay(1.0),
            &exponential_decay_jacobian(1.0),
            0.0,
            &DVector::from_vec(vec![1.0]),
            h,
            &NewtonSettings::default(),
            &mut stats,
        )
        .unwrap();
        assert_relative_eq!(y1[0], (1.0 - h / 2.0) / (1.0 + h / 2.0), epsilon = 1e-12);
        // linear problem: one Newton correction is enough
        assert_eq!(stats.newton_iterations, 1);
        assert_eq!(stats.unconverged_steps, 0);
    }

    #[test]
    fn test_second_order() {
        let e1 = decay_error(0.05);
        let e2 = decay_error(0.025);
        let order = (e1 / e2).log2();
        assert!((order - 2.0).abs() < 0.1, "observed order {}", order);
    }

    #[test]
    fn test_a_stable_on_stiff_decay() {
        // h*lambda = -1000 would blow up any explicit method
        let mut stats = SolverStats::default();
        let (_, y) = solve_implicit_adams(
            exponential_decay(1e4),
            exponential_decay_jacobian(1e4),
            0.0,
            DVector::from_vec(vec![1.0]),
            1.0,
            0.1,
            &NewtonSettings::default(),
            0,
            &mut stats,
        )
        .unwrap();
        assert!(y.iter().all(|v| v.abs() <= 1.0));
        assert_eq!(stats.steps, 10);
    }

    #[test]
    fn test_van_der_pol_close_to_rk4() {
        use crate::numerical::NonStiff_api::{ExplicitMethod, solve_explicit};
        let mut stats = SolverStats::default();
        let y0 = DVector::from_vec(vec![2.0, 0.0]);
        let (_, y_am) = solve_implicit_adams(
            van_der_pol(1.0),
            van_der_pol_jacobian(1.0),
            0.0,
            y0.clone(),
            2.0,
            1e-3,
            &NewtonSettings::default(),
            0,
            &mut stats,
        )
        .unwrap();
        let (_, y_rk) = solve_explicit(ExplicitMethod::RK4, van_der_pol(1.0), 0.0, y0, 2.0, 1e-3);
        let last = y_am.nrows() - 1;
        assert_relative_eq!(y_am[(last, 0)], y_rk[(last, 0)], epsilon = 1e-4);
        assert_relative_eq!(y_am[(last, 1)], y_rk[(last, 1)], epsilon = 1e-4);
        assert_eq!(stats.steps, 2000);
        assert!(stats.rhs_evaluations > 2 * stats.steps);
    }
}
