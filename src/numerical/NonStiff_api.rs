//! Fixed-step explicit integrators: Runge-Kutta of orders 1..4, Adams-Bashforth of orders 2..4
//! and backward-differentiation formulas of orders 2..4 in their explicit form.
//! Multistep methods are started with RK4.
use crate::Utils::logger::{save_matrix_to_csv, save_trajectory_txt};
use crate::Utils::plots::plots;
use crate::numerical::ODE_systems::{RHSfn, step_count};
use log::info;
use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;
use std::error::Error;
use std::path::Path;
use std::time::Instant;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum ExplicitMethod {
    /// forward Euler
    RK1,
    /// explicit midpoint
    RK2,
    /// Kutta's third order rule
    RK3,
    RK4,
    AB2,
    AB3,
    AB4,
    BDF2,
    BDF3,
    BDF4,
}

impl ExplicitMethod {
    /// number of previous levels the update formula uses
    pub fn history(&self) -> usize {
        match self {
            ExplicitMethod::RK1 | ExplicitMethod::RK2 | ExplicitMethod::RK3 | ExplicitMethod::RK4 => 1,
            ExplicitMethod::AB2 | ExplicitMethod::BDF2 => 2,
            ExplicitMethod::AB3 | ExplicitMethod::BDF3 => 3,
            ExplicitMethod::AB4 | ExplicitMethod::BDF4 => 4,
        }
    }
    /// order of the global error. The explicit BDF forms evaluate f at t_n instead of t_{n+1},
    /// which leaves them first order.
    pub fn order(&self) -> usize {
        match self {
            ExplicitMethod::RK1 => 1,
            ExplicitMethod::RK2 | ExplicitMethod::AB2 => 2,
            ExplicitMethod::RK3 | ExplicitMethod::AB3 => 3,
            ExplicitMethod::RK4 | ExplicitMethod::AB4 => 4,
            ExplicitMethod::BDF2 | ExplicitMethod::BDF3 | ExplicitMethod::BDF4 => 1,
        }
    }
}

/// Adams-Bashforth weights, newest derivative first, to be multiplied by h
fn adams_bashforth_weights(k: usize) -> &'static [f64] {
    match k {
        2 => &[3.0 / 2.0, -1.0 / 2.0],
        3 => &[23.0 / 12.0, -16.0 / 12.0, 5.0 / 12.0],
        _ => &[55.0 / 24.0, -59.0 / 24.0, 37.0 / 24.0, -9.0 / 24.0],
    }
}

/// BDF weights: (coefficients of y_n, y_{n-1}, ..., coefficient of h f)
fn bdf_weights(k: usize) -> (&'static [f64], f64) {
    match k {
        2 => (&[4.0 / 3.0, -1.0 / 3.0], 2.0 / 3.0),
        3 => (&[18.0 / 11.0, -9.0 / 11.0, 2.0 / 11.0], 6.0 / 11.0),
        _ => (
            &[48.0 / 25.0, -36.0 / 25.0, 16.0 / 25.0, -3.0 / 25.0],
            12.0 / 25.0,
        ),
    }
}

/// One Runge-Kutta step of order 1..4 from (t, y)
pub fn rk_step<F>(method: ExplicitMethod, f: &F, t: f64, y: &DVector<f64>, h: f64) -> DVector<f64>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    match method {
        ExplicitMethod::RK1 => y + h * f(t, y),
        ExplicitMethod::RK2 => {
            let k1 = f(t, y);
            let k2 = f(t + 0.5 * h, &(y + 0.5 * h * &k1));
            y + h * k2
        }
        ExplicitMethod::RK3 => {
            let k1 = f(t, y);
            let k2 = f(t + 0.5 * h, &(y + 0.5 * h * &k1));
            let k3 = f(t + h, &(y - h * &k1 + 2.0 * h * &k2));
            y + (h / 6.0) * (k1 + 4.0 * k2 + k3)
        }
        _ => {
            let k1 = f(t, y);
            let k2 = f(t + 0.5 * h, &(y + 0.5 * h * &k1));
            let k3 = f(t + 0.5 * h, &(y + 0.5 * h * &k2));
            let k4 = f(t + h, &(y + h * &k3));
            y + (h / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4)
        }
    }
}

/// Integrates dy/dt = f(t, y) from t0 to t_end with N = floor((t_end - t0)/h) fixed steps.
/// Returns the time levels and a matrix whose i-th row is the state at t0 + i*h.
pub fn solve_explicit<F>(
    method: ExplicitMethod,
    f: F,
    t0: f64,
    y0: DVector<f64>,
    t_end: f64,
    h: f64,
) -> (DVector<f64>, DMatrix<f64>)
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    let n_steps = step_count(t_end - t0, h);
    let k = method.history();
    let mut levels: Vec<DVector<f64>> = Vec::with_capacity(n_steps + 1);
    // newest first
    let mut y_history: VecDeque<DVector<f64>> = VecDeque::with_capacity(k);
    let mut f_history: VecDeque<DVector<f64>> = VecDeque::with_capacity(k);
    let mut y = y0;
    levels.push(y.clone());

    for i in 0..n_steps {
        let t = t0 + i as f64 * h;
        match method {
            ExplicitMethod::AB2 | ExplicitMethod::AB3 | ExplicitMethod::AB4 => {
                f_history.push_front(f(t, &y));
                f_history.truncate(k);
            }
            ExplicitMethod::BDF2 | ExplicitMethod::BDF3 | ExplicitMethod::BDF4 => {
                y_history.push_front(y.clone());
                y_history.truncate(k);
            }
            _ => {}
        }

        let y_next = if i + 1 < k || k == 1 {
            let starter = if k == 1 { method } else { ExplicitMethod::RK4 };
            rk_step(starter, &f, t, &y, h)
        } else {
            match method {
                ExplicitMethod::AB2 | ExplicitMethod::AB3 | ExplicitMethod::AB4 => {
                    let weights = adams_bashforth_weights(k);
                    let mut increment = DVector::zeros(y.len());
                    for (w, f_j) in weights.iter().zip(f_history.iter()) {
                        increment += *w * f_j;
                    }
                    &y + h * increment
                }
                _ => {
                    let (alphas, beta) = bdf_weights(k);
                    let mut combination = beta * h * f(t, &y);
                    for (a, y_j) in alphas.iter().zip(y_history.iter()) {
                        combination += *a * y_j;
                    }
                    combination
                }
            }
        };
        y = y_next;
        levels.push(y.clone());
    }

    let t_result = DVector::from_fn(levels.len(), |i, _| t0 + i as f64 * h);
    (t_result, levels_to_matrix(&levels))
}

/// stacks state vectors as rows of a matrix
pub fn levels_to_matrix(levels: &[DVector<f64>]) -> DMatrix<f64> {
    let rows = levels.len();
    let cols = levels.first().map(|v| v.len()).unwrap_or(0);
    DMatrix::from_fn(rows, cols, |i, j| levels[i][j])
}

pub struct nonstiffODE {
    fun: RHSfn,
    values: Vec<String>,
    arg: String,
    method: ExplicitMethod,
    t0: f64,
    y0: DVector<f64>,
    t_bound: f64,
    h_step: f64,
    t_result: DVector<f64>,
    y_result: DMatrix<f64>,
}

impl nonstiffODE {
    pub fn new(
        fun: RHSfn,
        values: Vec<String>,
        arg: String,
        method: ExplicitMethod,
        // start point
        t0: f64,
        // initial condition
        y0: DVector<f64>,
        t_bound: f64,
        h_step: f64,
    ) -> Result<Self, String> {
        if values.len() != y0.len() {
            return Err(format!(
                "{} variable names given for {} unknowns",
                values.len(),
                y0.len()
            ));
        }
        Ok(nonstiffODE {
            fun,
            values,
            arg,
            method,
            t0,
            y0,
            t_bound,
            h_step,
            t_result: DVector::zeros(0),
            y_result: DMatrix::zeros(0, 0),
        })
    }

    pub fn solve(&mut self) {
        let start = Instant::now();
        let (t_res, y_res) = solve_explicit(
            self.method,
            &self.fun,
            self.t0,
            self.y0.clone(),
            self.t_bound,
            self.h_step,
        );
        info!(
            "{} computed: {} steps of h = {} in {} ms",
            self.method,
            t_res.len().saturating_sub(1),
            self.h_step,
            start.elapsed().as_millis()
        );
        self.t_result = t_res;
        self.y_result = y_res;
    }

    pub fn get_result(&self) -> (DVector<f64>, DMatrix<f64>) {
        (self.t_result.clone(), self.y_result.clone())
    }

    pub fn method(&self) -> ExplicitMethod {
        self.method
    }

    /// writes `<stem>.txt` (whitespace separated, no header) and `<stem>.csv` into `dir`
    pub fn save_result(&self, dir: &Path, stem: &str) -> Result<(), Box<dyn Error>> {
        save_trajectory_txt(
            &dir.join(format!("{}.txt", stem)),
            &self.t_result,
            &self.y_result,
        )?;
        save_matrix_to_csv(
            &self.y_result,
            &self.values,
            &dir.join(format!("{}.csv", stem)),
            &self.t_result,
            &self.arg,
        )?;
        info!("result of {} saved", self.method);
        Ok(())
    }

    pub fn plot_result(&self, dir: &Path) -> Result<(), Box<dyn Error>> {
        plots(
            &self.arg,
            &self.values,
            &self.t_result,
            &self.y_result,
            dir,
            &self.method.to_string(),
        )?;
        info!("result of {} plotted", self.method);
        Ok(())
    }
}
