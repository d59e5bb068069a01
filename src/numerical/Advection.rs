//! Explicit finite-difference schemes for the linear advection equation
//!     u_t + c u_x = 0
//! on a periodic grid, and a grid-convergence study against the exact solution u0(x - c t).
use crate::numerical::ODE_systems::step_count;
use log::{debug, info};
use strum_macros::{Display, EnumIter, EnumString};
use tabled::{builder::Builder, settings::Style};

/// grid sizes of the convergence study
pub const STUDY_NX: [usize; 9] = [20, 40, 120, 140, 200, 400, 450, 500, 600];

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum AdvectionScheme {
    /// first-order one-sided differences taken against the flow
    Upwind,
    /// forward time, centred space (unconditionally unstable, kept for comparison)
    FTCS,
    LaxWendroff,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvectionParams {
    pub length: f64,
    pub velocity: f64,
    pub t_end: f64,
    pub cfl: f64,
    pub nx: usize,
}

impl Default for AdvectionParams {
    fn default() -> Self {
        AdvectionParams {
            length: 10.0,
            velocity: 1.0,
            t_end: 0.2,
            cfl: 0.5,
            nx: 100,
        }
    }
}

impl AdvectionParams {
    pub fn check(&self) -> Result<(), String> {
        if !(self.length > 0.0) {
            return Err(format!("domain length must be positive, got {}", self.length));
        }
        if self.velocity == 0.0 || !self.velocity.is_finite() {
            return Err(format!("advection velocity must be non-zero, got {}", self.velocity));
        }
        if !(self.cfl > 0.0) {
            return Err(format!("CFL number must be positive, got {}", self.cfl));
        }
        if self.nx < 3 {
            return Err(format!("at least 3 grid nodes required, got {}", self.nx));
        }
        if self.t_end < 0.0 {
            return Err(format!("final time must not be negative, got {}", self.t_end));
        }
        Ok(())
    }

    pub fn spacing(&self) -> f64 {
        self.length / self.nx as f64
    }

    pub fn time_step(&self) -> f64 {
        self.cfl * self.spacing() / self.velocity.abs()
    }

    /// x_i = i L / nx, i = 0..nx-1; node nx coincides with node 0
    pub fn nodes(&self) -> Vec<f64> {
        let h = self.spacing();
        (0..self.nx).map(|i| i as f64 * h).collect()
    }
}

/// exp(-0.5 ((x - L/2)/0.5)^2)
pub fn gaussian_pulse(x: f64, length: f64) -> f64 {
    let s = (x - 0.5 * length) / 0.5;
    (-0.5 * s * s).exp()
}

/// u0 transported by c t and wrapped back into [0, L)
pub fn exact_solution(params: &AdvectionParams, t: f64) -> Vec<f64> {
    params
        .nodes()
        .iter()
        .map(|&x| gaussian_pulse((x - params.velocity * t).rem_euclid(params.length), params.length))
        .collect()
}

/// one time level of `scheme` with Courant number sigma = c tau / h (sign included)
pub fn advection_step(scheme: AdvectionScheme, u: &[f64], sigma: f64) -> Vec<f64> {
    let nx = u.len();
    let mut next = vec![0.0; nx];
    for i in 0..nx {
        let left = u[(i + nx - 1) % nx];
        let right = u[(i + 1) % nx];
        next[i] = match scheme {
            AdvectionScheme::Upwind => {
                if sigma >= 0.0 {
                    u[i] - sigma * (u[i] - left)
                } else {
                    u[i] - sigma * (right - u[i])
                }
            }
            AdvectionScheme::FTCS => u[i] - 0.5 * sigma * (right - left),
            AdvectionScheme::LaxWendroff => {
                u[i] - 0.5 * sigma * (right - left)
                    + 0.5 * sigma * sigma * (right - 2.0 * u[i] + left)
            }
        };
    }
    next
}

/// sum u_i h
pub fn mass(u: &[f64], h: f64) -> f64 {
    u.iter().sum::<f64>() * h
}

/// ||a - b||_2 / sqrt(n)
pub fn rms_error(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().max(1) as f64;
    (a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>() / n).sqrt()
}

#[derive(Debug, Clone)]
pub struct AdvectionResult {
    pub scheme: AdvectionScheme,
    pub x: Vec<f64>,
    pub u_initial: Vec<f64>,
    pub u_final: Vec<f64>,
    /// exact solution at `time_reached`
    pub u_exact: Vec<f64>,
    pub tau: f64,
    pub steps: usize,
    /// steps * tau, which may fall short of t_end
    pub time_reached: f64,
    pub rms_error: f64,
    pub mass_initial: f64,
    pub mass_final: f64,
}

pub fn solve_advection(
    scheme: AdvectionScheme,
    params: &AdvectionParams,
) -> Result<AdvectionResult, String> {
    params.check()?;
    let h = params.spacing();
    let tau = params.time_step();
    let sigma = params.velocity * tau / h;
    let steps = step_count(params.t_end, tau);
    let x = params.nodes();
    let u_initial: Vec<f64> = x.iter().map(|&xi| gaussian_pulse(xi, params.length)).collect();

    let mut u = u_initial.clone();
    for _ in 0..steps {
        u = advection_step(scheme, &u, sigma);
    }
    let time_reached = steps as f64 * tau;
    let u_exact = exact_solution(params, time_reached);
    let rms = rms_error(&u, &u_exact);
    debug!(
        "{} nx = {}: {} steps of tau = {:e}, rms error {:e}",
        scheme, params.nx, steps, tau, rms
    );
    Ok(AdvectionResult {
        scheme,
        mass_initial: mass(&u_initial, h),
        mass_final: mass(&u, h),
        x,
        u_initial,
        u_final: u,
        u_exact,
        tau,
        steps,
        time_reached,
        rms_error: rms,
    })
}

/// slope of the least-squares line through (ln h, ln e); non-positive errors are skipped
pub fn observed_order(h: &[f64], errors: &[f64]) -> Option<f64> {
    let points: Vec<(f64, f64)> = h
        .iter()
        .zip(errors)
        .filter(|(hi, ei)| **hi > 0.0 && **ei > 0.0 && ei.is_finite())
        .map(|(hi, ei)| (hi.ln(), ei.ln()))
        .collect();
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
    if sxx == 0.0 {
        return None;
    }
    Some(sxy / sxx)
}

#[derive(Debug, Clone)]
pub struct ConvergenceStudy {
    pub scheme: AdvectionScheme,
    pub nx: Vec<usize>,
    pub h: Vec<f64>,
    pub errors: Vec<f64>,
    pub observed_order: Option<f64>,
}

impl ConvergenceStudy {
    pub fn table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["nx".to_string(), "h".to_string(), "rms error".to_string()]);
        for ((nx, h), e) in self.nx.iter().zip(&self.h).zip(&self.errors) {
            builder.push_record([nx.to_string(), format!("{:.5}", h), format!("{:.4e}", e)]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

/// Runs `scheme` for every grid size in `nx_list`, everything else taken from `params`
pub fn convergence_study(
    scheme: AdvectionScheme,
    params: &AdvectionParams,
    nx_list: &[usize],
) -> Result<ConvergenceStudy, String> {
    let mut h = Vec::with_capacity(nx_list.len());
    let mut errors = Vec::with_capacity(nx_list.len());
    for &nx in nx_list {
        let run_params = AdvectionParams {
            nx,
            ..params.clone()
        };
        let result = solve_advection(scheme, &run_params)?;
        h.push(run_params.spacing());
        errors.push(result.rms_error);
    }
    let order = observed_order(&h, &errors);
    let study = ConvergenceStudy {
        scheme,
        nx: nx_list.to_vec(),
        h,
        errors,
        observed_order: order,
    };
    info!(
        "\n{} convergence, observed order {:?}\n{}",
        scheme,
        order,
        study.table()
    );
    Ok(study)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strum::IntoEnumIterator;

    fn argmax(u: &[f64]) -> usize {
        let mut best = 0;
        for (i, v) in u.iter().enumerate() {
            if *v > u[best] {
                best = i;
            }
        }
        best
    }

    #[test]
    fn test_grid_is_periodic() {
        let params = AdvectionParams::default();
        let x = params.nodes();
        assert_eq!(x.len(), 100);
        assert_relative_eq!(x[0], 0.0);
        assert_relative_eq!(x[99], 9.9, epsilon = 1e-12);
        assert_relative_eq!(params.time_step(), 0.05, epsilon = 1e-15);
    }

    #[test]
    fn test_upwind_pulse_scenario() {
        // c = 1, L = 10, CFL = 0.5, nx = 100, T = 0.2: 4 steps, the pulse moves to x = 5.2
        let result = solve_advection(AdvectionScheme::Upwind, &AdvectionParams::default()).unwrap();
        assert_eq!(result.steps, 4);
        assert_relative_eq!(result.time_reached, 0.2, epsilon = 1e-12);
        let peak = argmax(&result.u_final);
        assert!((result.x[peak] - 5.2).abs() <= 0.1 + 1e-12, "peak at {}", result.x[peak]);
        let height = result.u_final[peak];
        assert!(height > 0.8 && height <= 1.0, "height {}", height);
    }

    #[test]
    fn test_negative_velocity_moves_left() {
        let params = AdvectionParams {
            velocity: -1.0,
            ..Default::default()
        };
        let result = solve_advection(AdvectionScheme::Upwind, &params).unwrap();
        let peak = argmax(&result.u_final);
        assert!((result.x[peak] - 4.8).abs() <= 0.1 + 1e-12);
        assert!(result.u_final.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_mass_is_conserved() {
        for scheme in AdvectionScheme::iter() {
            let params = AdvectionParams {
                t_end: 3.0,
                ..Default::default()
            };
            let result = solve_advection(scheme, &params).unwrap();
            assert_relative_eq!(result.mass_final, result.mass_initial, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sigma_one_upwind_is_exact_shift() {
        let params = AdvectionParams {
            cfl: 1.0,
            t_end: 1.0,
            ..Default::default()
        };
        let result = solve_advection(AdvectionScheme::Upwind, &params).unwrap();
        assert_eq!(result.steps, 10);
        for (a, b) in result.u_final.iter().zip(result.u_initial.iter().cycle().skip(90)) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_upwind_first_order() {
        let params = AdvectionParams {
            t_end: 2.0,
            ..Default::default()
        };
        let study = convergence_study(AdvectionScheme::Upwind, &params, &[400, 800]).unwrap();
        let ratio = study.errors[0] / study.errors[1];
        assert!(ratio > 1.7 && ratio < 2.3, "ratio {}", ratio);
    }

    #[test]
    fn test_lax_wendroff_second_order() {
        let params = AdvectionParams {
            t_end: 2.0,
            ..Default::default()
        };
        let study = convergence_study(AdvectionScheme::LaxWendroff, &params, &[200, 400]).unwrap();
        let ratio = study.errors[0] / study.errors[1];
        assert!(ratio > 3.4 && ratio < 4.6, "ratio {}", ratio);
        let order = study.observed_order.unwrap();
        assert!((order - 2.0).abs() < 0.2);
    }

    #[test]
    fn test_full_study_orders() {
        let params = AdvectionParams {
            t_end: 2.0,
            ..Default::default()
        };
        let study = convergence_study(AdvectionScheme::LaxWendroff, &params, &STUDY_NX).unwrap();
        assert_eq!(study.errors.len(), STUDY_NX.len());
        assert!(study.errors[0] > study.errors[STUDY_NX.len() - 1]);
        assert!(study.table().contains("600"));
    }

    #[test]
    fn test_coarse_grid_takes_no_step() {
        // tau = 0.25 exceeds T = 0.2: the comparison happens at t = 0 and the error vanishes
        let params = AdvectionParams {
            nx: 20,
            ..Default::default()
        };
        let result = solve_advection(AdvectionScheme::LaxWendroff, &params).unwrap();
        assert_eq!(result.steps, 0);
        assert_eq!(result.time_reached, 0.0);
        assert_eq!(result.rms_error, 0.0);
    }

    #[test]
    fn test_observed_order_of_power_law() {
        let h = [0.1, 0.05, 0.025, 0.0125];
        let e: Vec<f64> = h.iter().map(|x: &f64| 3.0 * x.powi(2)).collect();
        assert_relative_eq!(observed_order(&h, &e).unwrap(), 2.0, epsilon = 1e-12);
        assert!(observed_order(&[0.1], &[0.2]).is_none());
    }

    #[test]
    fn test_invalid_parameters() {
        for params in [
            AdvectionParams {
                velocity: 0.0,
                ..Default::default()
            },
            AdvectionParams {
                nx: 2,
                ..Default::default()
            },
            AdvectionParams {
                cfl: 0.0,
                ..Default::default()
            },
        ] {
            assert!(solve_advection(AdvectionScheme::Upwind, &params).is_err());
        }
    }

    #[test]
    fn test_scheme_names() {
        assert_eq!("laxwendroff".parse::<AdvectionScheme>().unwrap(), AdvectionScheme::LaxWendroff);
        assert_eq!(AdvectionScheme::FTCS.to_string(), "FTCS");
    }
}
