// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
use crate::Examples::{OutputDirs, or_default, parse_methods};
use crate::Utils::task_parser::{SectionAccess, SectionMap};
use crate::numerical::NR_for_implicit::{NEWTON_MAX_ITERATIONS, NEWTON_TOLERANCE, NewtonSettings};
use crate::numerical::ODE_systems::{adaptive_competition, adaptive_competition_jacobian};
use crate::numerical::Stiff_api::{StiffMethod, stiffODE};
use log::info;
use nalgebra::DVector;
use std::error::Error;
use strum::IntoEnumIterator;

/// Adaptive competition model integrated by the implicit and Rosenbrock methods.
/// Section `stiff`: `eps`, `y0` (4 values), `t_end`, `h`, `methods`, `newton_tolerance`,
/// `newton_max_iterations`, `progress_every`.
#[derive(Debug, Clone, PartialEq)]
pub struct StiffTask {
    pub eps: f64,
    pub y0: Vec<f64>,
    pub t_end: f64,
    pub h: f64,
    pub methods: Vec<StiffMethod>,
    pub newton: NewtonSettings,
    pub progress_every: usize,
}

impl Default for StiffTask {
    fn default() -> Self {
        StiffTask {
            eps: 1e-6,
            y0: vec![20.0, 20.0, 0.005, 10.0],
            t_end: 2000.0,
            h: 0.001,
            methods: StiffMethod::iter().collect(),
            newton: NewtonSettings::default(),
            progress_every: 100,
        }
    }
}

impl StiffTask {
    pub fn from_section(section: Option<&SectionMap>) -> Result<Self, String> {
        let d = Self::default();
        let Some(s) = section else {
            return Ok(d);
        };
        let methods = match s.get_string_list("methods") {
            Some(names) => parse_methods(&names)?,
            None => d.methods,
        };
        let task = StiffTask {
            eps: or_default(s.get_f64("eps"), d.eps)?,
            y0: or_default(s.get_f64_list("y0"), d.y0)?,
            t_end: or_default(s.get_f64("t_end"), d.t_end)?,
            h: or_default(s.get_f64("h"), d.h)?,
            methods,
            newton: NewtonSettings {
                tolerance: or_default(s.get_f64("newton_tolerance"), NEWTON_TOLERANCE)?,
                max_iterations: or_default(
                    s.get_usize("newton_max_iterations"),
                    NEWTON_MAX_ITERATIONS,
                )?,
            },
            progress_every: or_default(s.get_usize("progress_every"), d.progress_every)?,
        };
        if task.y0.len() != 4 {
            return Err(format!("stiff: y0 needs 4 values, got {}", task.y0.len()));
        }
        if !(task.h > 0.0) || !(task.t_end > 0.0) {
            return Err(format!(
                "stiff: h and t_end must be positive, got {} and {}",
                task.h, task.t_end
            ));
        }
        Ok(task)
    }

    pub fn solver(&self, method: StiffMethod) -> Result<stiffODE, String> {
        let mut solver = stiffODE::new(
            adaptive_competition(self.eps),
            adaptive_competition_jacobian(self.eps),
            vec![
                "x".to_string(),
                "y".to_string(),
                "a1".to_string(),
                "a2".to_string(),
            ],
            "t".to_string(),
            method,
            0.0,
            DVector::from_vec(self.y0.clone()),
            self.t_end,
            self.h,
        )?;
        solver.set_newton(self.newton);
        solver.set_progress_every(self.progress_every);
        Ok(solver)
    }

    pub fn run(&self, out: &OutputDirs) -> Result<(), Box<dyn Error>> {
        for &method in &self.methods {
            let mut solver = self.solver(method)?;
            solver.solve()?;
            let stem = format!("competition_{}", method);
            solver.save_result(&out.data, &stem)?;
            solver.plot_result(&out.plots, &stem)?;
            let (_, y) = solver.get_result();
            let last = y.row(y.nrows() - 1);
            info!(
                "{} final state: x = {:.5}, y = {:.5}, a1 = {:.5}, a2 = {:.5}",
                method, last[0], last[1], last[2], last[3]
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Utils::task_parser::parse_document;
    use tempfile::tempdir;

    #[test]
    fn test_section_overrides() {
        let doc = parse_document(
            "stiff\n eps: 1e-3\n y0: 1, 2, 3, 4\n methods: radau5, row2\n newton_max_iterations: 7",
        )
        .unwrap();
        let task = StiffTask::from_section(doc.get("stiff")).unwrap();
        assert_eq!(task.eps, 1e-3);
        assert_eq!(task.y0, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(task.methods, vec![StiffMethod::Radau5, StiffMethod::ROW2]);
        assert_eq!(task.newton.max_iterations, 7);
        assert_eq!(task.newton.tolerance, NEWTON_TOLERANCE);
        assert_eq!(task.t_end, 2000.0);

        let bad = parse_document("stiff\n y0: 1, 2").unwrap();
        assert!(StiffTask::from_section(bad.get("stiff")).is_err());
    }

    #[test]
    fn test_short_run_writes_files() {
        let dir = tempdir().unwrap();
        let out = OutputDirs::new(dir.path());
        out.create().unwrap();
        let task = StiffTask {
            t_end: 0.05,
            methods: vec![StiffMethod::ROW3, StiffMethod::Radau3],
            ..StiffTask::default()
        };
        task.run(&out).unwrap();
        assert!(out.data.join("competition_ROW3.csv").exists());
        assert!(out.data.join("competition_Radau3_newton.csv").exists());
        assert!(out.plots.join("competition_Radau3.png").exists());
    }
}
