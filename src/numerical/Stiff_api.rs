//! Common driver for the implicit and linearly implicit integrators: the fixed-step loop,
//! per-run statistics and the `stiffODE` front end with saving and plotting.
use crate::Utils::logger::{
    elapsed_time, save_matrix_to_csv, save_residual_history_csv, save_trajectory_txt,
};
use crate::Utils::plots::{plots, plots_grid};
use crate::numerical::Implicit_Adams::solve_implicit_adams;
use crate::numerical::NR_for_implicit::{NewtonOutcome, NewtonSettings};
use crate::numerical::NonStiff_api::levels_to_matrix;
use crate::numerical::ODE_systems::{JACfn, RHSfn, step_count};
use crate::numerical::Radau::Radau_main::{RadauOrder, solve_radau};
use crate::numerical::Rosenbrock::{RosenbrockMethod, solve_rosenbrock};
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};
use strum_macros::{Display, EnumIter, EnumString};
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    pub steps: usize,
    pub rhs_evaluations: usize,
    pub jacobian_evaluations: usize,
    pub lu_decompositions: usize,
    pub newton_iterations: usize,
    /// steps whose Newton iteration hit the cap or a non-finite residual and kept the last iterate
    pub unconverged_steps: usize,
    pub max_newton_iterations: usize,
    /// residual norms of the step that needed the most Newton iterations
    pub worst_residual_history: Vec<f64>,
    pub wall_time: Duration,
}

impl SolverStats {
    pub fn record_newton(&mut self, outcome: &NewtonOutcome) {
        self.newton_iterations += outcome.iterations;
        if !outcome.converged {
            self.unconverged_steps += 1;
        }
        if outcome.iterations > self.max_newton_iterations || self.worst_residual_history.is_empty()
        {
            self.max_newton_iterations = outcome.iterations;
            self.worst_residual_history = outcome.residual_history.clone();
        }
    }

    pub fn table(&self, title: &str) -> String {
        let mut builder = Builder::default();
        builder.push_record(["statistic".to_string(), title.to_string()]);
        let rows = [
            ("steps", self.steps.to_string()),
            ("RHS evaluations", self.rhs_evaluations.to_string()),
            ("Jacobian evaluations", self.jacobian_evaluations.to_string()),
            ("LU decompositions", self.lu_decompositions.to_string()),
            ("Newton iterations", self.newton_iterations.to_string()),
            ("max Newton iterations per step", self.max_newton_iterations.to_string()),
            ("unconverged steps", self.unconverged_steps.to_string()),
            ("wall time", elapsed_time(self.wall_time)),
        ];
        for (name, value) in rows {
            builder.push_record([name.to_string(), value]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

/// Runs `step` N = floor((t_end - t0)/h) times from (t0, y0) at t_i = t0 + i*h.
/// Row i of the returned matrix is the state at t_i; row 0 is y0.
/// With `progress_every > 0` a debug line is logged every that many steps.
pub fn integrate_fixed<S>(
    t0: f64,
    y0: DVector<f64>,
    t_end: f64,
    h: f64,
    progress_every: usize,
    stats: &mut SolverStats,
    mut step: S,
) -> Result<(DVector<f64>, DMatrix<f64>), String>
where
    S: FnMut(f64, &DVector<f64>, &mut SolverStats) -> Result<DVector<f64>, String>,
{
    let n_steps = step_count(t_end - t0, h);
    let mut levels = Vec::with_capacity(n_steps + 1);
    let mut y = y0;
    levels.push(y.clone());
    for i in 0..n_steps {
        let t = t0 + i as f64 * h;
        y = step(t, &y, stats)?;
        stats.steps += 1;
        levels.push(y.clone());
        if progress_every > 0 && (i + 1) % progress_every == 0 {
            debug!("Step {}/{}", i + 1, n_steps);
        }
    }
    let t_result = DVector::from_fn(levels.len(), |i, _| t0 + i as f64 * h);
    Ok((t_result, levels_to_matrix(&levels)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum StiffMethod {
    /// trapezoidal Adams-Moulton with Newton iteration
    ImplicitAdams,
    /// 2-stage Radau IIA
    Radau3,
    /// 3-stage Radau IIA
    Radau5,
    ROW2,
    ROW3,
}

impl StiffMethod {
    pub fn order(&self) -> usize {
        match self {
            StiffMethod::ImplicitAdams | StiffMethod::ROW2 => 2,
            StiffMethod::Radau3 | StiffMethod::ROW3 => 3,
            StiffMethod::Radau5 => 5,
        }
    }
    pub fn uses_newton(&self) -> bool {
        matches!(
            self,
            StiffMethod::ImplicitAdams | StiffMethod::Radau3 | StiffMethod::Radau5
        )
    }
}

pub struct stiffODE {
    fun: RHSfn,
    jac: JACfn,
    values: Vec<String>,
    arg: String,
    method: StiffMethod,
    t0: f64,
    y0: DVector<f64>,
    t_bound: f64,
    h_step: f64,
    newton: NewtonSettings,
    progress_every: usize,
    t_result: DVector<f64>,
    y_result: DMatrix<f64>,
    stats: SolverStats,
}

impl stiffODE {
    pub fn new(
        fun: RHSfn,
        jac: JACfn,
        values: Vec<String>,
        arg: String,
        method: StiffMethod,
        t0: f64,
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
        Ok(stiffODE {
            fun,
            jac,
            values,
            arg,
            method,
            t0,
            y0,
            t_bound,
            h_step,
            newton: NewtonSettings::default(),
            progress_every: 100,
            t_result: DVector::zeros(0),
            y_result: DMatrix::zeros(0, 0),
            stats: SolverStats::default(),
        })
    }

    pub fn set_newton(&mut self, settings: NewtonSettings) {
        self.newton = settings;
    }

    /// 0 switches the progress lines off
    pub fn set_progress_every(&mut self, progress_every: usize) {
        self.progress_every = progress_every;
    }

    pub fn solve(&mut self) -> Result<(), String> {
        info!(
            "solving with {}: h = {}, t in [{}, {}]",
            self.method, self.h_step, self.t0, self.t_bound
        );
        let start = Instant::now();
        let mut stats = SolverStats::default();
        let (t0, t_end, h) = (self.t0, self.t_bound, self.h_step);
        let (f, jac, y0) = (&self.fun, &self.jac, self.y0.clone());
        let (newton, progress_every) = (&self.newton, self.progress_every);
        let (t_res, y_res) = match self.method {
            StiffMethod::ImplicitAdams => solve_implicit_adams(
                f,
                jac,
                t0,
                y0,
                t_end,
                h,
                newton,
                progress_every,
                &mut stats,
            )?,
            StiffMethod::Radau3 | StiffMethod::Radau5 => {
                let order = if self.method == StiffMethod::Radau3 {
                    RadauOrder::Order3
                } else {
                    RadauOrder::Order5
                };
                solve_radau(
                    order,
                    f,
                    jac,
                    t0,
                    y0,
                    t_end,
                    h,
                    newton,
                    progress_every,
                    &mut stats,
                )?
            }
            StiffMethod::ROW2 | StiffMethod::ROW3 => {
                let method = if self.method == StiffMethod::ROW2 {
                    RosenbrockMethod::ROW2
                } else {
                    RosenbrockMethod::ROW3
                };
                solve_rosenbrock(method, f, jac, t0, y0, t_end, h, progress_every, &mut stats)?
            }
        };
        stats.wall_time = start.elapsed();
        if stats.unconverged_steps > 0 {
            warn!(
                "{}: {} of {} steps kept an unconverged Newton iterate",
                self.method, stats.unconverged_steps, stats.steps
            );
        }
        info!("\n{}", stats.table(&self.method.to_string()));
        self.t_result = t_res;
        self.y_result = y_res;
        self.stats = stats;
        Ok(())
    }

    pub fn get_result(&self) -> (DVector<f64>, DMatrix<f64>) {
        (self.t_result.clone(), self.y_result.clone())
    }

    pub fn get_stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn method(&self) -> StiffMethod {
        self.method
    }

    /// `<stem>.txt`, `<stem>.csv` and, for Newton-based methods, `<stem>_newton.csv`
    /// with the residual history of the hardest step
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
        if self.method.uses_newton() && !self.stats.worst_residual_history.is_empty() {
            save_residual_history_csv(
                &dir.join(format!("{}_newton.csv", stem)),
                &self.stats.worst_residual_history,
            )?;
        }
        info!("result of {} saved", self.method);
        Ok(())
    }

    /// four unknowns go on one 2x2 figure, anything else gets one PNG per unknown
    pub fn plot_result(&self, dir: &Path, stem: &str) -> Result<(), Box<dyn Error>> {
        if self.values.len() == 4 {
            plots_grid(
                &self.arg,
                &self.values,
                &self.t_result,
                &self.y_result,
                &dir.join(format!("{}.png", stem)),
                &self.method.to_string(),
            )?;
        } else {
            plots(
                &self.arg,
                &self.values,
                &self.t_result,
                &self.y_result,
                dir,
                stem,
            )?;
        }
        info!("result of {} plotted", self.method);
        Ok(())
    }
}
