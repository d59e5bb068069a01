// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! The coursework experiments. Each experiment has a task struct holding its constants
//! (defaults are the coursework values, a task file section may override them), a `run`
//! method and writes its data into `<output>/data` and its figures into `<output>/plots`.

/// explicit integrators on the Van der Pol oscillator and the phase portrait sweep
pub mod ivp_examples;
/// implicit and Rosenbrock integrators on the stiff adaptive competition model
pub mod stiff_examples;
/// advection schemes and their grid convergence study
pub mod advection_examples;
/// periodic problem, quasilinearization and shooting
pub mod bvp_examples;

use crate::Utils::logger::{elapsed_time, ensure_dir};
use crate::Utils::task_parser::{DocumentMap, SectionAccess, SectionMap};
use log::{error, info};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputDirs {
    pub data: PathBuf,
    pub plots: PathBuf,
}

impl OutputDirs {
    pub fn new(root: &Path) -> Self {
        OutputDirs {
            data: root.join("data"),
            plots: root.join("plots"),
        }
    }

    /// `output` section, key `dir`; defaults to `results`
    pub fn from_section(section: Option<&SectionMap>) -> Self {
        let root = section
            .and_then(|s| s.get_string_list("dir"))
            .and_then(|dirs| dirs.into_iter().next())
            .unwrap_or_else(|| "results".to_string());
        Self::new(Path::new(&root))
    }

    pub fn create(&self) -> std::io::Result<()> {
        ensure_dir(&self.data)?;
        ensure_dir(&self.plots)
    }
}

/// Parses method names, case-insensitively, into one of the method enums.
pub fn parse_methods<M>(names: &[String]) -> Result<Vec<M>, String>
where
    M: FromStr,
{
    names
        .iter()
        .map(|name| M::from_str(name).map_err(|_| format!("unknown method '{}'", name)))
        .collect()
}

pub(crate) fn or_default<T>(value: Result<Option<T>, String>, default: T) -> Result<T, String> {
    Ok(value?.unwrap_or(default))
}

fn run_logged<F>(name: &str, experiment: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce() -> Result<(), Box<dyn Error>>,
{
    let start = Instant::now();
    info!("experiment {} started", name);
    let result = experiment();
    match &result {
        Ok(()) => info!(
            "experiment {} finished in {}",
            name,
            elapsed_time(start.elapsed())
        ),
        Err(e) => error!("experiment {} failed: {}", name, e),
    }
    result
}

/// Runs every experiment with the settings of `doc`; sections missing from `doc` use the
/// defaults. A failing experiment is logged and the remaining ones still run; the first
/// error is returned at the end.
pub fn run_all(doc: &DocumentMap) -> Result<(), Box<dyn Error>> {
    let out = OutputDirs::from_section(doc.get("output"));
    out.create()?;
    info!(
        "writing results into {} and {}",
        out.data.display(),
        out.plots.display()
    );
    let results = [
        run_logged("van_der_pol", || {
            ivp_examples::VanDerPolTask::from_section(doc.get("van_der_pol"))?.run(&out)
        }),
        run_logged("phase_traces", || {
            ivp_examples::PhaseTracesTask::from_section(doc.get("phase_traces"))?.run(&out)
        }),
        run_logged("stiff", || {
            stiff_examples::StiffTask::from_section(doc.get("stiff"))?.run(&out)
        }),
        run_logged("advection", || {
            advection_examples::AdvectionTask::from_section(doc.get("advection"))?.run(&out)
        }),
        run_logged("bvp", || {
            bvp_examples::BvpTask::from_section(doc.get("bvp"))?.run(&out)
        }),
    ];
    match results.into_iter().find_map(|r| r.err()) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
