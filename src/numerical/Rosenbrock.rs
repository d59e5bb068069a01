//! Linearly implicit Rosenbrock-Wanner methods of orders 2 and 3.
//!
//! Transformed formulation with the Jacobian frozen at the start of the step:
//!
//!   (I/(gamma h) - J) K_i = f(t + alpha_i h, y + sum_{j<i} a_ij K_j) + sum_{j<i} (c_ij / h) K_j
//!   y_{n+1} = y + sum_i m_i K_i
//!
//! One LU factorization per step, one back substitution per stage and no iteration.
//! The explicit time derivative of f is not included, so the stated orders hold for
//! autonomous right-hand sides (every system in `ODE_systems` is autonomous).
use crate::numerical::Stiff_api::{SolverStats, integrate_fixed};
use nalgebra::{DMatrix, DVector};
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
pub enum RosenbrockMethod {
    ROW2,
    ROW3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosenbrockTableau {
    pub stages: usize,
    pub gamma: f64,
    pub alpha: [f64; 3],
    pub a: [[f64; 3]; 3],
    pub c: [[f64; 3]; 3],
    pub m: [f64; 3],
    /// stages whose argument coincides with the previous stage's reuse its f value
    pub reuse_f: [bool; 3],
}

impl RosenbrockTableau {
    /// two-stage L-stable scheme of order 2, gamma = 1 + 1/sqrt(2)
    pub fn row2() -> Self {
        let gamma = 1.0 + 1.0 / 2_f64.sqrt();
        RosenbrockTableau {
            stages: 2,
            gamma,
            alpha: [0.0, 1.0, 0.0],
            a: [[0.0; 3], [1.0 / gamma, 0.0, 0.0], [0.0; 3]],
            c: [[0.0; 3], [-2.0 / gamma, 0.0, 0.0], [0.0; 3]],
            m: [3.0 / (2.0 * gamma), 1.0 / (2.0 * gamma), 0.0],
            reuse_f: [false; 3],
        }
    }

    /// three-stage L-stable scheme of order 3 (Sandu et al. ROS3)
    #[rustfmt::skip]
    pub fn row3() -> Self {
        let gamma = 0.43586652150845899942;
        RosenbrockTableau {
            stages: 3,
            gamma,
            alpha: [0.0, gamma, gamma],
            a: [
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
            ],
            c: [
                [0.0, 0.0, 0.0],
                [-1.0156171083877702, 0.0, 0.0],
                [4.0759956452537700, 9.2076794298330791, 0.0],
            ],
            m: [1.0, 6.1697947043828246, -0.42772256543218573],
            reuse_f: [false, false, true],
        }
    }

    pub fn new(method: RosenbrockMethod) -> Self {
        match method {
            RosenbrockMethod::ROW2 => Self::row2(),
            RosenbrockMethod::ROW3 => Self::row3(),
        }
    }
}

pub fn rosenbrock_step<F, J>(
    tableau: &RosenbrockTableau,
    f: &F,
    jac: &J,
    t: f64,
    y: &DVector<f64>,
    h: f64,
    stats: &mut SolverStats,
) -> Result<DVector<f64>, String>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
    J: Fn(f64, &DVector<f64>) -> DMatrix<f64>,
{
    let n = y.len();
    let W = DMatrix::identity(n, n) / (tableau.gamma * h) - jac(t, y);
    stats.jacobian_evaluations += 1;
    let lu = W.lu();
    stats.lu_decompositions += 1;

    let mut K: Vec<DVector<f64>> = Vec::with_capacity(tableau.stages);
    let mut f_values: Vec<DVector<f64>> = Vec::with_capacity(tableau.stages);
    for i in 0..tableau.stages {
        let f_stage = match f_values.last() {
            Some(previous) if tableau.reuse_f[i] => previous.clone(),
            _ => {
                let mut u = y.clone();
                for j in 0..i {
                    u += tableau.a[i][j] * &K[j];
                }
                stats.rhs_evaluations += 1;
                f(t + tableau.alpha[i] * h, &u)
            }
        };
        let mut rhs = f_stage.clone();
        for j in 0..i {
            rhs += (tableau.c[i][j] / h) * &K[j];
        }
        let K_i = lu
            .solve(&rhs)
            .ok_or_else(|| format!("singular Rosenbrock matrix at t = {}", t))?;
        K.push(K_i);
        f_values.push(f_stage);
    }

    let mut y_next = y.clone();
    for (m_i, K_i) in tableau.m.iter().zip(K.iter()) {
        y_next += *m_i * K_i;
    }
    Ok(y_next)
}

pub fn solve_rosenbrock<F, J>(
    method: RosenbrockMethod,
    f: F,
    jac: J,
    t0: f64,
    y0: DVector<f64>,
    t_end: f64,
    h: f64,
    progress_every: usize,
    stats: &mut SolverStats,
) -> Result<(DVector<f64>, DMatrix<f64>), String>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
    J: Fn(f64, &DVector<f64>) -> DMatrix<f64>,
{
    let tableau = RosenbrockTableau::new(method);
    integrate_fixed(t0, y0, t_end, h, progress_every, stats, |t, y, stats| {
        rosenbrock_step(&tableau, &f, &jac, t, y, h, stats)
    })
}
