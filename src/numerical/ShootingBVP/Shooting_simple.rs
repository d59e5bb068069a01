//! # Shooting method for two-point boundary value problems
//!
//! Solves  y'' = f(x, y, y')  on [a, b] written as the first-order system  u' = F(x, u),
//! u = (y, y').  The unknown initial value (the slope for a Dirichlet left condition, the
//! value for a Neumann one) is found by the secant method started from two guesses; every
//! trial integrates the system with classical RK4 on a uniform mesh.
//!
//! The default problem is  y'' = x sqrt(y),  y(0) = 0,  y(1) = 2,  shot from slopes 1 and 3.
//! [`mesh_study`] repeats the solve on a list of meshes and reports the deviation between
//! successive meshes on the nodes they share.

use crate::numerical::BVP_FD::max_difference_on_common_nodes;
use crate::numerical::NonStiff_api::{ExplicitMethod, solve_explicit};
use log::{debug, error, info};
use nalgebra::{DMatrix, DVector};
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryConditionType {
    /// y = value
    Dirichlet,
    /// y' = value
    Neumann,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryCondition {
    pub value: f64,
    pub bc_type: BoundaryConditionType,
}

impl BoundaryCondition {
    pub fn dirichlet(value: f64) -> Self {
        BoundaryCondition {
            value,
            bc_type: BoundaryConditionType::Dirichlet,
        }
    }
    pub fn neumann(value: f64) -> Self {
        BoundaryCondition {
            value,
            bc_type: BoundaryConditionType::Neumann,
        }
    }
}

pub struct BoundaryValueProblem<F> {
    /// first-order form du/dx = F(x, u), u = (y, y')
    pub ode_system: F,
    pub a: f64,
    pub b: f64,
    pub left_bc: BoundaryCondition,
    pub right_bc: BoundaryCondition,
}

impl<F> BoundaryValueProblem<F>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    pub fn new(
        ode_system: F,
        a: f64,
        b: f64,
        left_bc: BoundaryCondition,
        right_bc: BoundaryCondition,
    ) -> Self {
        Self {
            ode_system,
            a,
            b,
            left_bc,
            right_bc,
        }
    }

    /// Dirichlet conditions at both ends
    pub fn dirichlet(ode_system: F, a: f64, b: f64, alpha: f64, beta: f64) -> Self {
        Self::new(
            ode_system,
            a,
            b,
            BoundaryCondition::dirichlet(alpha),
            BoundaryCondition::dirichlet(beta),
        )
    }

    fn initial_state(&self, unknown: f64) -> DVector<f64> {
        match self.left_bc.bc_type {
            BoundaryConditionType::Dirichlet => DVector::from_vec(vec![self.left_bc.value, unknown]),
            BoundaryConditionType::Neumann => DVector::from_vec(vec![unknown, self.left_bc.value]),
        }
    }

    fn mismatch(&self, end_state: &[f64]) -> f64 {
        match self.right_bc.bc_type {
            BoundaryConditionType::Dirichlet => end_state[0] - self.right_bc.value,
            BoundaryConditionType::Neumann => end_state[1] - self.right_bc.value,
        }
    }
}

/// u = (y, y'):  u1' = u2,  u2' = x sqrt(y).  Negative trial values of y are clipped to zero.
pub fn sqrt_nonlinear_system() -> impl Fn(f64, &DVector<f64>) -> DVector<f64> {
    |x: f64, u: &DVector<f64>| DVector::from_vec(vec![u[1], x * u[0].max(0.0).sqrt()])
}

pub fn sqrt_nonlinear_problem() -> BoundaryValueProblem<impl Fn(f64, &DVector<f64>) -> DVector<f64>> {
    BoundaryValueProblem::dirichlet(sqrt_nonlinear_system(), 0.0, 1.0, 0.0, 2.0)
}

#[derive(Debug, Clone)]
pub struct ShootingMethodResult {
    pub x_mesh: DVector<f64>,
    /// one row per mesh node, columns y and y'
    pub y: DMatrix<f64>,
    /// the initial value found by the secant method
    pub s: f64,
    pub bound_values: DVector<f64>,
    pub iterations: usize,
}

impl Default for ShootingMethodResult {
    fn default() -> Self {
        Self {
            x_mesh: DVector::zeros(0),
            y: DMatrix::zeros(0, 0),
            s: 0.0,
            bound_values: DVector::zeros(0),
            iterations: 0,
        }
    }
}

/// Secant iteration on g(s) = 0 from the two starting points s0, s1.
/// Returns the root and the number of iterations.
pub fn secant_method<F>(
    g: F,
    s0: f64,
    s1: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<(f64, usize), String>
where
    F: Fn(f64) -> f64,
{
    debug!(
        "secant method from s0 = {}, s1 = {}, tolerance = {}, max_iterations = {}",
        s0, s1, tolerance, max_iterations
    );
    let mut s_prev = s0;
    let mut s_curr = s1;
    let mut g_prev = g(s_prev);
    let mut g_curr = g(s_curr);
    for iteration in 0..max_iterations {
        if !g_curr.is_finite() {
            return Err(format!("non-finite mismatch at s = {}", s_curr));
        }
        if g_curr.abs() < tolerance {
            info!(
                "secant method converged after {} iterations: s = {}, g(s) = {:e}",
                iteration, s_curr, g_curr
            );
            return Ok((s_curr, iteration));
        }
        let slope = g_curr - g_prev;
        if slope == 0.0 {
            return Err(format!(
                "secant method stalled: equal mismatches at s = {} and s = {}",
                s_prev, s_curr
            ));
        }
        let s_next = s_curr - g_curr * (s_curr - s_prev) / slope;
        debug!("iteration {}: s = {}, g(s) = {:e}", iteration, s_next, g_curr);
        s_prev = s_curr;
        g_prev = g_curr;
        s_curr = s_next;
        g_curr = g(s_curr);
    }
    error!("secant method did not converge after {} iterations", max_iterations);
    Err(format!(
        "secant method did not converge after {} iterations",
        max_iterations
    ))
}

/// RK4 over [x0, x_end]; returns the mesh and a matrix with one row per node.
pub fn rk4_ivp_solver<F>(
    x0: f64,
    y0: DVector<f64>,
    x_end: f64,
    step_size: f64,
    ode_system: F,
) -> (DVector<f64>, DMatrix<f64>)
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    solve_explicit(ExplicitMethod::RK4, ode_system, x0, y0, x_end, step_size)
}

pub struct ShootingMethodSolver {
    pub first_guess: f64,
    pub second_guess: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub step_size: f64,
    pub result: ShootingMethodResult,
}

impl Default for ShootingMethodSolver {
    fn default() -> Self {
        Self::new(1.0, 3.0, 1e-6, 100, 0.01)
    }
}

impl ShootingMethodSolver {
    pub fn new(
        first_guess: f64,
        second_guess: f64,
        tolerance: f64,
        max_iterations: usize,
        step_size: f64,
    ) -> Self {
        Self {
            first_guess,
            second_guess,
            tolerance,
            max_iterations,
            step_size,
            result: ShootingMethodResult::default(),
        }
    }

    pub fn solve<F>(&mut self, problem: &BoundaryValueProblem<F>) -> Result<ShootingMethodResult, String>
    where
        F: Fn(f64, &DVector<f64>) -> DVector<f64>,
    {
        if !(self.step_size > 0.0) || problem.b <= problem.a {
            return Err(format!(
                "invalid shooting setup: interval [{}, {}], step {}",
                problem.a, problem.b, self.step_size
            ));
        }
        info!(
            "shooting on [{}, {}] with guesses {} and {}, step {}",
            problem.a, problem.b, self.first_guess, self.second_guess, self.step_size
        );
        let mismatch = |guess: f64| -> f64 {
            let (_, y) = rk4_ivp_solver(
                problem.a,
                problem.initial_state(guess),
                problem.b,
                self.step_size,
                &problem.ode_system,
            );
            let last = y.row(y.nrows() - 1);
            let value = problem.mismatch(&[last[0], last[1]]);
            debug!("guess {} gives mismatch {:e}", guess, value);
            value
        };
        let (s, iterations) = secant_method(
            mismatch,
            self.first_guess,
            self.second_guess,
            self.tolerance,
            self.max_iterations,
        )?;

        let (x_mesh, y) = rk4_ivp_solver(
            problem.a,
            problem.initial_state(s),
            problem.b,
            self.step_size,
            &problem.ode_system,
        );
        let bound_values = y.row(y.nrows() - 1).transpose();
        info!(
            "shooting result: s = {}, y({}) = {}, y'({}) = {}",
            s, problem.b, bound_values[0], problem.b, bound_values[1]
        );
        self.result = ShootingMethodResult {
            x_mesh,
            y,
            s,
            bound_values,
            iterations,
        };
        Ok(self.result.clone())
    }

    pub fn get_solution(&self) -> ShootingMethodResult {
        self.result.clone()
    }
    pub fn get_y(&self) -> DMatrix<f64> {
        self.result.y.clone()
    }
    pub fn get_x(&self) -> DVector<f64> {
        self.result.x_mesh.clone()
    }
}

pub const MESH_STUDY_N: [usize; 7] = [100, 200, 400, 500, 750, 800, 1000];

#[derive(Debug, Clone)]
pub struct MeshStudyRow {
    pub n: usize,
    pub slope: f64,
    /// max |y_n - y_previous| on the nodes shared with the previous mesh of the list
    pub difference: Option<f64>,
}

/// Solves `problem` on every mesh of [a, b] with n intervals, n from `n_list`, and compares
/// each solution with the one on the preceding mesh.
pub fn mesh_study<F>(
    problem: &BoundaryValueProblem<F>,
    template: &ShootingMethodSolver,
    n_list: &[usize],
) -> Result<Vec<MeshStudyRow>, String>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    let mut rows = Vec::with_capacity(n_list.len());
    let mut previous: Option<Vec<f64>> = None;
    for &n in n_list {
        if n == 0 {
            return Err("mesh with zero intervals".to_string());
        }
        let h = (problem.b - problem.a) / n as f64;
        let mut solver = ShootingMethodSolver::new(
            template.first_guess,
            template.second_guess,
            template.tolerance,
            template.max_iterations,
            h,
        );
        let result = solver.solve(problem)?;
        let values: Vec<f64> = result.y.column(0).iter().copied().collect();
        let difference = previous
            .as_ref()
            .map(|prev| max_difference_on_common_nodes(prev, &values));
        rows.push(MeshStudyRow {
            n,
            slope: result.s,
            difference,
        });
        previous = Some(values);
    }
    Ok(rows)
}

pub fn mesh_study_table(rows: &[MeshStudyRow]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["N", "y'(0)", "max |y_N - y_prev|"]);
    for row in rows {
        builder.push_record([
            row.n.to_string(),
            format!("{:.8}", row.slope),
            row.difference
                .map(|d| format!("{:.3e}", d))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::BVP_FD::quasilinearization;
    use approx::assert_relative_eq;

    #[test]
    fn test_secant_on_quadratic() {
        let (root, iterations) = secant_method(|s| s * s - 2.0, 1.0, 3.0, 1e-12, 50).unwrap();
        assert_relative_eq!(root, 2_f64.sqrt(), epsilon = 1e-10);
        assert!(iterations > 0);
    }

    #[test]
    fn test_secant_stalls_on_flat_function() {
        assert!(secant_method(|_| 1.0, 1.0, 3.0, 1e-12, 50).is_err());
    }

    #[test]
    fn test_linear_problem_exact_slope() {
        // y'' = 0, y(0) = 1, y(2) = 5  ->  y = 1 + 2x
        let problem = BoundaryValueProblem::dirichlet(
            |_x: f64, u: &DVector<f64>| DVector::from_vec(vec![u[1], 0.0]),
            0.0,
            2.0,
            1.0,
            5.0,
        );
        let mut solver = ShootingMethodSolver::default();
        let result = solver.solve(&problem).unwrap();
        assert_relative_eq!(result.s, 2.0, epsilon = 1e-9);
        assert_eq!(result.x_mesh.len(), 201);
        assert_eq!(result.y.nrows(), 201);
        assert_relative_eq!(result.bound_values[0], 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_neumann_right_condition() {
        // y'' = y, y(0) = 0, y'(1) = 1  ->  y = sinh(x)/cosh(1)
        let problem = BoundaryValueProblem::new(
            |_x: f64, u: &DVector<f64>| DVector::from_vec(vec![u[1], u[0]]),
            0.0,
            1.0,
            BoundaryCondition::dirichlet(0.0),
            BoundaryCondition::neumann(1.0),
        );
        let mut solver = ShootingMethodSolver::default();
        let result = solver.solve(&problem).unwrap();
        assert_relative_eq!(result.s, 1.0 / 1_f64.cosh(), epsilon = 1e-6);
        assert_relative_eq!(result.bound_values[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sqrt_problem_agrees_with_quasilinearization() {
        let mut solver = ShootingMethodSolver::default();
        let shot = solver.solve(&sqrt_nonlinear_problem()).unwrap();
        assert_relative_eq!(shot.bound_values[0], 2.0, epsilon = 1e-5);
        let ql = quasilinearization(100, 1e-10, 50).unwrap();
        for i in 0..=100 {
            assert!((shot.y[(i, 0)] - ql.y[i]).abs() < 1e-3);
        }
        assert_eq!(solver.get_x().len(), 101);
        assert_eq!(solver.get_y().ncols(), 2);
    }

    #[test]
    fn test_mesh_study_on_sqrt_problem() {
        let problem = sqrt_nonlinear_problem();
        let template = ShootingMethodSolver::new(1.0, 3.0, 1e-12, 100, 0.01);
        let rows = mesh_study(&problem, &template, &[100, 200, 400]).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].difference.is_none());
        assert!(rows[1].difference.unwrap() < 1e-4);
        assert!(rows[2].difference.unwrap() < 1e-4);
        assert_relative_eq!(rows[0].slope, rows[2].slope, epsilon = 1e-4);
        let table = mesh_study_table(&rows);
        assert!(table.contains("400"));
    }

    #[test]
    fn test_invalid_setup() {
        let mut solver = ShootingMethodSolver::new(1.0, 3.0, 1e-6, 10, 0.0);
        assert!(solver.solve(&sqrt_nonlinear_problem()).is_err());
    }
}
