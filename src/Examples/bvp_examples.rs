// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
use crate::Examples::{OutputDirs, or_default};
use crate::Utils::logger::{save_columns_to_csv, save_residual_history_csv};
use crate::Utils::plots::plot_profiles;
use crate::Utils::task_parser::{SectionAccess, SectionMap};
use crate::numerical::BVP_FD::{
    default_forcing, default_p_squared, quasilinearization, solve_periodic_bvp,
};
use crate::numerical::ShootingBVP::Shooting_simple::{
    MESH_STUDY_N, ShootingMethodSolver, mesh_study, mesh_study_table, sqrt_nonlinear_problem,
};
use log::info;
use std::error::Error;

/// The periodic problem y'' - (10 + sin 2 pi x) y = cos 2 pi x and the nonlinear problem
/// y'' = x sqrt(y), y(0) = 0, y(1) = 2 solved by quasilinearization and by shooting.
/// Section `bvp`: `periodic_nodes`, `n`, `tolerance`, `max_iterations`, `first_guess`,
/// `second_guess`, `shooting_tolerance`, `mesh_study` (list).
#[derive(Debug, Clone, PartialEq)]
pub struct BvpTask {
    pub periodic_nodes: usize,
    /// intervals of the mesh shared by quasilinearization and shooting
    pub n: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub first_guess: f64,
    pub second_guess: f64,
    pub shooting_tolerance: f64,
    pub mesh_study: Vec<usize>,
}

impl Default for BvpTask {
    fn default() -> Self {
        BvpTask {
            // h = 0.005
            periodic_nodes: 200,
            n: 1000,
            tolerance: 1e-8,
            max_iterations: 50,
            first_guess: 1.0,
            second_guess: 3.0,
            shooting_tolerance: 1e-6,
            mesh_study: MESH_STUDY_N.to_vec(),
        }
    }
}

impl BvpTask {
    pub fn from_section(section: Option<&SectionMap>) -> Result<Self, String> {
        let d = Self::default();
        let Some(s) = section else {
            return Ok(d);
        };
        Ok(BvpTask {
            periodic_nodes: or_default(s.get_usize("periodic_nodes"), d.periodic_nodes)?,
            n: or_default(s.get_usize("n"), d.n)?,
            tolerance: or_default(s.get_f64("tolerance"), d.tolerance)?,
            max_iterations: or_default(s.get_usize("max_iterations"), d.max_iterations)?,
            first_guess: or_default(s.get_f64("first_guess"), d.first_guess)?,
            second_guess: or_default(s.get_f64("second_guess"), d.second_guess)?,
            shooting_tolerance: or_default(s.get_f64("shooting_tolerance"), d.shooting_tolerance)?,
            mesh_study: or_default(s.get_usize_list("mesh_study"), d.mesh_study)?,
        })
    }

    fn shooting_solver(&self, n: usize) -> ShootingMethodSolver {
        ShootingMethodSolver::new(
            self.first_guess,
            self.second_guess,
            self.shooting_tolerance,
            100,
            1.0 / n as f64,
        )
    }

    pub fn run(&self, out: &OutputDirs) -> Result<(), Box<dyn Error>> {
        let (x, y) = solve_periodic_bvp(default_p_squared, default_forcing, self.periodic_nodes)?;
        save_columns_to_csv(&out.data.join("periodic_bvp.csv"), &["x", "y"], &[&x, &y])?;
        plot_profiles(
            &x,
            &[("y".to_string(), y.clone())],
            "x",
            &out.plots.join("periodic_bvp.png"),
            "y'' - (10 + sin 2 pi x) y = cos 2 pi x",
        )?;

        let ql = quasilinearization(self.n, self.tolerance, self.max_iterations)?;
        info!(
            "quasilinearization: {} iterations, converged = {}, y'(0) ~ {:.8}",
            ql.iterations,
            ql.converged,
            (ql.y[1] - ql.y[0]) * self.n as f64
        );
        save_residual_history_csv(&out.data.join("quasilinearization_updates.csv"), &ql.updates)?;

        let mut solver = self.shooting_solver(self.n);
        let shot = solver.solve(&sqrt_nonlinear_problem())?;
        let y_shot: Vec<f64> = shot.y.column(0).iter().copied().collect();
        let deviation = ql
            .y
            .iter()
            .zip(&y_shot)
            .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()));
        info!(
            "shooting: y'(0) = {:.8} after {} secant iterations, max |y_ql - y_shooting| = {:.3e}",
            shot.s, shot.iterations, deviation
        );
        save_columns_to_csv(
            &out.data.join("sqrt_bvp.csv"),
            &["x", "quasilinearization", "shooting"],
            &[&ql.x, &ql.y, &y_shot],
        )?;
        plot_profiles(
            &ql.x,
            &[
                ("quasilinearization".to_string(), ql.y.clone()),
                ("shooting".to_string(), y_shot),
            ],
            "x",
            &out.plots.join("sqrt_bvp.png"),
            "y'' = x sqrt(y), y(0) = 0, y(1) = 2",
        )?;

        let rows = mesh_study(&sqrt_nonlinear_problem(), &self.shooting_solver(self.n), &self.mesh_study)?;
        info!("\nshooting mesh study\n{}", mesh_study_table(&rows));
        let n: Vec<f64> = rows.iter().map(|r| r.n as f64).collect();
        let slope: Vec<f64> = rows.iter().map(|r| r.slope).collect();
        let difference: Vec<f64> = rows
            .iter()
            .map(|r| r.difference.unwrap_or(f64::NAN))
            .collect();
        save_columns_to_csv(
            &out.data.join("shooting_mesh_study.csv"),
            &["n", "slope", "difference"],
            &[&n, &slope, &difference],
        )?;
        Ok(())
    }
}
