// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
use crate::Examples::{OutputDirs, or_default, parse_methods};
use crate::Utils::logger::save_trajectory_txt;
use crate::Utils::plots::plot_phase;
use crate::Utils::task_parser::{SectionAccess, SectionMap};
use crate::numerical::NonStiff_api::{ExplicitMethod, nonstiffODE, solve_explicit};
use crate::numerical::ODE_systems::van_der_pol;
use log::info;
use nalgebra::{DMatrix, DVector};
use std::error::Error;
use strum::IntoEnumIterator;

fn vdp_names() -> (Vec<String>, String) {
    (vec!["x".to_string(), "z".to_string()], "t".to_string())
}

fn phase_columns(y: &DMatrix<f64>) -> (Vec<f64>, Vec<f64>) {
    (
        y.column(0).iter().copied().collect(),
        y.column(1).iter().copied().collect(),
    )
}

/// Van der Pol oscillator integrated by every explicit method.
/// Section `van_der_pol`: `e`, `h`, `t_end`, `x0`, `z0`, `methods`.
#[derive(Debug, Clone, PartialEq)]
pub struct VanDerPolTask {
    pub e: f64,
    pub h: f64,
    pub t_end: f64,
    pub x0: f64,
    pub z0: f64,
    pub methods: Vec<ExplicitMethod>,
}

impl Default for VanDerPolTask {
    fn default() -> Self {
        VanDerPolTask {
            e: 0.1,
            h: 0.001,
            t_end: 100.0,
            x0: 2.0,
            z0: 0.0,
            methods: ExplicitMethod::iter().collect(),
        }
    }
}

impl VanDerPolTask {
    pub fn from_section(section: Option<&SectionMap>) -> Result<Self, String> {
        let d = Self::default();
        let Some(s) = section else {
            return Ok(d);
        };
        let methods = match s.get_string_list("methods") {
            Some(names) => parse_methods(&names)?,
            None => d.methods,
        };
        let task = VanDerPolTask {
            e: or_default(s.get_f64("e"), d.e)?,
            h: or_default(s.get_f64("h"), d.h)?,
            t_end: or_default(s.get_f64("t_end"), d.t_end)?,
            x0: or_default(s.get_f64("x0"), d.x0)?,
            z0: or_default(s.get_f64("z0"), d.z0)?,
            methods,
        };
        if !(task.h > 0.0) || !(task.t_end > 0.0) {
            return Err(format!(
                "van_der_pol: h and t_end must be positive, got {} and {}",
                task.h, task.t_end
            ));
        }
        Ok(task)
    }

    pub fn run(&self, out: &OutputDirs) -> Result<(), Box<dyn Error>> {
        let (values, arg) = vdp_names();
        for &method in &self.methods {
            let mut solver = nonstiffODE::new(
                van_der_pol(self.e),
                values.clone(),
                arg.clone(),
                method,
                0.0,
                DVector::from_vec(vec![self.x0, self.z0]),
                self.t_end,
                self.h,
            )?;
            solver.solve();
            let stem = format!("vdp_{}", method);
            solver.save_result(&out.data, &stem)?;
            solver.plot_result(&out.plots)?;
            let (_, y) = solver.get_result();
            let (x, z) = phase_columns(&y);
            plot_phase(
                &x,
                &z,
                &out.plots.join(format!("{}_phase.png", stem)),
                &format!("Van der Pol, {}, e = {}", method, self.e),
            )?;
            let last = y.nrows() - 1;
            info!(
                "{}: x({}) = {:.6}, z({}) = {:.6}",
                method,
                self.t_end,
                y[(last, 0)],
                self.t_end,
                y[(last, 1)]
            );
        }
        Ok(())
    }
}

/// Phase portraits of the Van der Pol oscillator for a sweep of the damping parameter.
/// Section `phase_traces`: `e` (list), `h`, `t_end`, `x0`, `z0`, `method`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTracesTask {
    pub e_values: Vec<f64>,
    pub h: f64,
    pub t_end: f64,
    pub x0: f64,
    pub z0: f64,
    pub method: ExplicitMethod,
}

impl Default for PhaseTracesTask {
    fn default() -> Self {
        PhaseTracesTask {
            e_values: vec![0.01, 0.1, 0.2, 0.5, 0.7, 0.9, 1.0, 2.0, 3.0, 4.0, 5.0],
            h: 0.001,
            t_end: 100.0,
            x0: 2.0,
            z0: 0.0,
            method: ExplicitMethod::RK4,
        }
    }
}

impl PhaseTracesTask {
    pub fn from_section(section: Option<&SectionMap>) -> Result<Self, String> {
        let d = Self::default();
        let Some(s) = section else {
            return Ok(d);
        };
        let method = match s.get_string_list("method") {
            Some(names) => parse_methods(&names)?
                .into_iter()
                .next()
                .ok_or_else(|| "phase_traces: empty method".to_string())?,
            None => d.method,
        };
        Ok(PhaseTracesTask {
            e_values: or_default(s.get_f64_list("e"), d.e_values)?,
            h: or_default(s.get_f64("h"), d.h)?,
            t_end: or_default(s.get_f64("t_end"), d.t_end)?,
            x0: or_default(s.get_f64("x0"), d.x0)?,
            z0: or_default(s.get_f64("z0"), d.z0)?,
            method,
        })
    }

    /// one trajectory per value of e
    pub fn trajectories(&self) -> Vec<(f64, DVector<f64>, DMatrix<f64>)> {
        self.e_values
            .iter()
            .map(|&e| {
                let (t, y) = solve_explicit(
                    self.method,
                    van_der_pol(e),
                    0.0,
                    DVector::from_vec(vec![self.x0, self.z0]),
                    self.t_end,
                    self.h,
                );
                (e, t, y)
            })
            .collect()
    }

    pub fn run(&self, out: &OutputDirs) -> Result<(), Box<dyn Error>> {
        for (e, t, y) in self.trajectories() {
            let stem = format!("phase_e{}", e);
            save_trajectory_txt(&out.data.join(format!("{}.txt", stem)), &t, &y)?;
            let (x, z) = phase_columns(&y);
            plot_phase(
                &x,
                &z,
                &out.plots.join(format!("{}.png", stem)),
                &format!("Van der Pol phase portrait, e = {}", e),
            )?;
            let amplitude = x.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
            info!("e = {}: max |x| = {:.4}", e, amplitude);
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
    fn test_defaults_and_overrides() {
        assert_eq!(VanDerPolTask::from_section(None).unwrap(), VanDerPolTask::default());
        let doc = parse_document("van_der_pol\n e: 1\n h: 0.01\n methods: rk4, ab3").unwrap();
        let task = VanDerPolTask::from_section(doc.get("van_der_pol")).unwrap();
        assert_eq!(task.e, 1.0);
        assert_eq!(task.h, 0.01);
        assert_eq!(task.t_end, 100.0);
        assert_eq!(task.methods, vec![ExplicitMethod::RK4, ExplicitMethod::AB3]);
        let bad = parse_document("van_der_pol\n h: -1").unwrap();
        assert!(VanDerPolTask::from_section(bad.get("van_der_pol")).is_err());
    }

    #[test]
    fn test_short_van_der_pol_run_writes_files() {
        let dir = tempdir().unwrap();
        let out = OutputDirs::new(dir.path());
        out.create().unwrap();
        let task = VanDerPolTask {
            t_end: 1.0,
            h: 0.01,
            methods: vec![ExplicitMethod::RK4],
            ..VanDerPolTask::default()
        };
        task.run(&out).unwrap();
        assert!(out.data.join("vdp_RK4.txt").exists());
        assert!(out.data.join("vdp_RK4.csv").exists());
        assert!(out.plots.join("vdp_RK4_phase.png").exists());
    }

    #[test]
    fn test_phase_sweep_limit_cycle_amplitude() {
        let task = PhaseTracesTask {
            e_values: vec![0.5, 2.0],
            h: 0.01,
            t_end: 40.0,
            ..PhaseTracesTask::default()
        };
        for (e, t, y) in task.trajectories() {
            assert_eq!(t.len(), 4001);
            // the limit cycle of the oscillator has amplitude close to 2 for every e
            let tail_max = y
                .column(0)
                .iter()
                .skip(2000)
                .fold(0.0_f64, |acc, v| acc.max(v.abs()));
            assert!(tail_max > 1.9 && tail_max < 2.1, "e = {}: {}", e, tail_max);
        }
    }
}
