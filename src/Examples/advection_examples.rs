// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
use crate::Examples::{OutputDirs, or_default, parse_methods};
use crate::Utils::logger::{save_columns_to_csv, save_convergence_csv};
use crate::Utils::plots::{plot_convergence, plot_profiles};
use crate::Utils::task_parser::{SectionAccess, SectionMap};
use crate::numerical::Advection::{
    AdvectionParams, AdvectionResult, AdvectionScheme, ConvergenceStudy, STUDY_NX,
    convergence_study, solve_advection,
};
use log::info;
use std::error::Error;
use strum::IntoEnumIterator;

/// Advection of a Gaussian pulse by every scheme, then the grid convergence study.
/// Section `advection`: `length`, `velocity`, `t_end`, `cfl`, `nx` (profile run),
/// `study_nx` (list), `study_t_end`, `schemes`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvectionTask {
    pub params: AdvectionParams,
    pub schemes: Vec<AdvectionScheme>,
    pub study_nx: Vec<usize>,
    /// the study runs to this time; the profile run uses `params.t_end`
    pub study_t_end: f64,
}

impl Default for AdvectionTask {
    fn default() -> Self {
        let params = AdvectionParams::default();
        AdvectionTask {
            study_t_end: params.t_end,
            params,
            schemes: AdvectionScheme::iter().collect(),
            study_nx: STUDY_NX.to_vec(),
        }
    }
}

impl AdvectionTask {
    pub fn from_section(section: Option<&SectionMap>) -> Result<Self, String> {
        let d = Self::default();
        let Some(s) = section else {
            return Ok(d);
        };
        let schemes = match s.get_string_list("schemes") {
            Some(names) => parse_methods(&names)?,
            None => d.schemes,
        };
        let params = AdvectionParams {
            length: or_default(s.get_f64("length"), d.params.length)?,
            velocity: or_default(s.get_f64("velocity"), d.params.velocity)?,
            t_end: or_default(s.get_f64("t_end"), d.params.t_end)?,
            cfl: or_default(s.get_f64("cfl"), d.params.cfl)?,
            nx: or_default(s.get_usize("nx"), d.params.nx)?,
        };
        params.check()?;
        Ok(AdvectionTask {
            study_t_end: or_default(s.get_f64("study_t_end"), params.t_end)?,
            params,
            schemes,
            study_nx: or_default(s.get_usize_list("study_nx"), d.study_nx)?,
        })
    }

    pub fn profiles(&self) -> Result<Vec<AdvectionResult>, String> {
        self.schemes
            .iter()
            .map(|&scheme| solve_advection(scheme, &self.params))
            .collect()
    }

    pub fn studies(&self) -> Result<Vec<ConvergenceStudy>, String> {
        let params = AdvectionParams {
            t_end: self.study_t_end,
            ..self.params.clone()
        };
        self.schemes
            .iter()
            .map(|&scheme| convergence_study(scheme, &params, &self.study_nx))
            .collect()
    }

    pub fn run(&self, out: &OutputDirs) -> Result<(), Box<dyn Error>> {
        let profiles = self.profiles()?;
        if let Some(first) = profiles.first() {
            let mut curves = vec![
                ("initial".to_string(), first.u_initial.clone()),
                ("exact".to_string(), first.u_exact.clone()),
            ];
            let mut headers = vec!["x", "initial", "exact"];
            let names: Vec<String> = profiles.iter().map(|r| r.scheme.to_string()).collect();
            for (result, name) in profiles.iter().zip(&names) {
                info!(
                    "{}: {} steps of tau = {:e} to t = {}, rms error {:.4e}, mass {:.6} -> {:.6}",
                    result.scheme,
                    result.steps,
                    result.tau,
                    result.time_reached,
                    result.rms_error,
                    result.mass_initial,
                    result.mass_final
                );
                curves.push((name.clone(), result.u_final.clone()));
                headers.push(name.as_str());
            }
            let mut columns: Vec<&[f64]> = vec![&first.x];
            columns.extend(curves.iter().map(|c| c.1.as_slice()));
            save_columns_to_csv(&out.data.join("advection_profiles.csv"), &headers, &columns)?;
            plot_profiles(
                &first.x,
                &curves,
                "x",
                &out.plots.join("advection_profiles.png"),
                &format!(
                    "u_t + {} u_x = 0, nx = {}, t = {}",
                    self.params.velocity, self.params.nx, first.time_reached
                ),
            )?;
        }

        let studies = self.studies()?;
        let mut curves = Vec::with_capacity(studies.len());
        for study in &studies {
            save_convergence_csv(
                &out.data.join(format!("convergence_{}.csv", study.scheme)),
                &study.h,
                &study.errors,
            )?;
            curves.push((study.scheme.to_string(), study.h.clone(), study.errors.clone()));
        }
        plot_convergence(
            &curves,
            &out.plots.join("advection_convergence.png"),
            &format!("grid convergence at t = {}", self.study_t_end),
        )?;
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
            "advection\n nx: 200\n study_nx: 50, 100\n study_t_end: 2\n schemes: upwind, laxwendroff",
        )
        .unwrap();
        let task = AdvectionTask::from_section(doc.get("advection")).unwrap();
        assert_eq!(task.params.nx, 200);
        assert_eq!(task.params.t_end, 0.2);
        assert_eq!(task.study_t_end, 2.0);
        assert_eq!(task.study_nx, vec![50, 100]);
        assert_eq!(
            task.schemes,
            vec![AdvectionScheme::Upwind, AdvectionScheme::LaxWendroff]
        );
        let bad = parse_document("advection\n cfl: -0.5").unwrap();
        assert!(AdvectionTask::from_section(bad.get("advection")).is_err());
    }

    #[test]
    fn test_run_writes_profiles_and_study() {
        let dir = tempdir().unwrap();
        let out = OutputDirs::new(dir.path());
        out.create().unwrap();
        let task = AdvectionTask {
            study_nx: vec![40, 80, 160],
            study_t_end: 1.0,
            ..AdvectionTask::default()
        };
        task.run(&out).unwrap();
        assert!(out.data.join("advection_profiles.csv").exists());
        assert!(out.data.join("convergence_Upwind.csv").exists());
        assert!(out.plots.join("advection_convergence.png").exists());
        let text = std::fs::read_to_string(out.data.join("convergence_FTCS.csv")).unwrap();
        assert!(text.starts_with("h,error"));
        assert_eq!(text.lines().count(), 4);
    }
}
