/// Radau IIA method for systems of ordinary differential equations.
/// Implicit Runge-Kutta method: on every step the s stage values are found together by
/// Newton iteration on the stacked system of s*n equations, using the analytic Jacobian.
use crate::numerical::NR_for_implicit::{NewtonSettings, newton_solve};
use crate::numerical::Stiff_api::{SolverStats, integrate_fixed};
use nalgebra::{DMatrix, DVector};
use std::cell::Cell;
use strum_macros::{Display, EnumIter};

/// Radau IIA method orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
pub enum RadauOrder {
    Order3, // 2-stage, order 3
    Order5, // 3-stage, order 5
}

/// Butcher tableau coefficients for Radau IIA methods
#[derive(Debug, Clone)]
pub struct RadauCoefficients {
    pub c: DVector<f64>, // nodes
    pub a: DMatrix<f64>, // Runge-Kutta matrix
    pub b: DVector<f64>, // weights
    pub stages: usize,   // number of stages
}

impl RadauCoefficients {
    pub fn new(order: RadauOrder) -> Self {
        match order {
            RadauOrder::Order3 => {
                let c = DVector::from_vec(vec![1.0 / 3.0, 1.0]);
                let a =
                    DMatrix::from_row_slice(2, 2, &[5.0 / 12.0, -1.0 / 12.0, 3.0 / 4.0, 1.0 / 4.0]);
                let b = DVector::from_vec(vec![3.0 / 4.0, 1.0 / 4.0]);
                RadauCoefficients { c, a, b, stages: 2 }
            }
            RadauOrder::Order5 => {
                let s6 = 6_f64.sqrt();
                let c = DVector::from_vec(vec![(4.0 - s6) / 10.0, (4.0 + s6) / 10.0, 1.0]);
                let a = DMatrix::from_row_slice(
                    3,
                    3,
                    &[
                        (88.0 - 7.0 * s6) / 360.0,
                        (296.0 - 169.0 * s6) / 1800.0,
                        (-2.0 + 3.0 * s6) / 225.0,
                        (296.0 + 169.0 * s6) / 1800.0,
                        (88.0 + 7.0 * s6) / 360.0,
                        (-2.0 - 3.0 * s6) / 225.0,
                        (16.0 - s6) / 36.0,
                        (16.0 + s6) / 36.0,
                        1.0 / 9.0,
                    ],
                );
                let b = DVector::from_vec(vec![(16.0 - s6) / 36.0, (16.0 + s6) / 36.0, 1.0 / 9.0]);
                RadauCoefficients { c, a, b, stages: 3 }
            }
        }
    }
}

/// stage i of the stacked vector
fn stage(z: &DVector<f64>, i: usize, n: usize) -> DVector<f64> {
    z.rows(i * n, n).into_owned()
}

/// One Radau IIA step from (t, y).
/// Stage equations  Y_i = y + h sum_j a_ij f(t + c_j h, Y_j)  are solved from Y_i = y,
/// with the block Newton matrix  delta_ij I - h a_ij J(t + c_j h, Y_j).
pub fn radau_step<F, J>(
    coefficients: &RadauCoefficients,
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
    let s = coefficients.stages;
    let (a, c) = (&coefficients.a, &coefficients.c);
    let rhs_calls = Cell::new(0usize);
    let jac_calls = Cell::new(0usize);

    let residual = |z: &DVector<f64>| {
        let derivatives: Vec<DVector<f64>> = (0..s)
            .map(|j| f(t + c[j] * h, &stage(z, j, n)))
            .collect();
        rhs_calls.set(rhs_calls.get() + s);
        let mut F_z = DVector::zeros(s * n);
        for i in 0..s {
            let mut block = stage(z, i, n) - y;
            for j in 0..s {
                block -= h * a[(i, j)] * &derivatives[j];
            }
            F_z.rows_mut(i * n, n).copy_from(&block);
        }
        F_z
    };
    let newton_matrix = |z: &DVector<f64>| {
        let jacobians: Vec<DMatrix<f64>> = (0..s)
            .map(|j| jac(t + c[j] * h, &stage(z, j, n)))
            .collect();
        jac_calls.set(jac_calls.get() + s);
        let mut M = DMatrix::identity(s * n, s * n);
        for i in 0..s {
            for j in 0..s {
                let mut block = M.view_mut((i * n, j * n), (n, n));
                block -= h * a[(i, j)] * &jacobians[j];
            }
        }
        M
    };

    let mut guess = DVector::zeros(s * n);
    for i in 0..s {
        guess.rows_mut(i * n, n).copy_from(y);
    }
    let outcome = newton_solve(residual, newton_matrix, guess, settings)
        .map_err(|e| format!("Radau step at t = {}: {}", t, e))?;

    let mut y_next = y.clone();
    for i in 0..s {
        y_next += h * coefficients.b[i] * f(t + c[i] * h, &stage(&outcome.solution, i, n));
    }
    stats.rhs_evaluations += rhs_calls.get() + s;
    stats.jacobian_evaluations += jac_calls.get();
    stats.lu_decompositions += outcome.iterations;
    stats.record_newton(&outcome);
    Ok(y_next)
}

/// Fixed-step Radau IIA integration on [t0, t_end]
pub fn solve_radau<F, J>(
    order: RadauOrder,
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
    let coefficients = RadauCoefficients::new(order);
    integrate_fixed(t0, y0, t_end, h, progress_every, stats, |t, y, stats| {
        radau_step(&coefficients, &f, &jac, t, y, h, settings, stats)
    })
}
