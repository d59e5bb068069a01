//! Newton-Raphson iteration for the algebraic systems of implicit one-step methods.
//! The caller provides the residual F(z) and its Jacobian; each iteration solves
//! J(z) dz = -F(z) by LU decomposition.
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use std::fmt::Display;

pub const NEWTON_TOLERANCE: f64 = 1e-8;
pub const NEWTON_MAX_ITERATIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonSettings {
    /// iteration stops once the Euclidean norm of the residual drops below this
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        NewtonSettings {
            tolerance: NEWTON_TOLERANCE,
            max_iterations: NEWTON_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewtonOutcome {
    pub solution: DVector<f64>,
    /// number of linear solves performed
    pub iterations: usize,
    /// residual norm before every iteration and after the last one
    pub residual_history: Vec<f64>,
    pub converged: bool,
}

impl Display for NewtonOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "converged: {}, iterations: {}, final residual: {:e}",
            self.converged,
            self.iterations,
            self.residual_history.last().copied().unwrap_or(f64::NAN)
        )
    }
}

/// Solves F(z) = 0 from `initial_guess`.
/// Reaching the iteration cap or a non-finite residual is not an error: a warning is logged
/// and the last iterate is returned with `converged = false`. A singular Newton matrix is
/// an error.
pub fn newton_solve<F, J>(
    residual: F,
    jacobian: J,
    initial_guess: DVector<f64>,
    settings: &NewtonSettings,
) -> Result<NewtonOutcome, String>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
    J: Fn(&DVector<f64>) -> DMatrix<f64>,
{
    let mut z = initial_guess;
    let mut residual_history = Vec::with_capacity(settings.max_iterations + 1);
    let mut iterations = 0;
    loop {
        let F_z = residual(&z);
        let norm = F_z.norm();
        residual_history.push(norm);
        if !norm.is_finite() {
            warn!(
                "non-finite Newton residual at iteration {}; last iterate accepted",
                iterations
            );
            return Ok(NewtonOutcome {
                solution: z,
                iterations,
                residual_history,
                converged: false,
            });
        }
        if norm < settings.tolerance {
            debug!("Newton converged in {} iterations, residual {:e}", iterations, norm);
            return Ok(NewtonOutcome {
                solution: z,
                iterations,
                residual_history,
                converged: true,
            });
        }
        if iterations == settings.max_iterations {
            warn!(
                "Newton did not converge in {} iterations, residual {:e}; last iterate accepted",
                iterations, norm
            );
            return Ok(NewtonOutcome {
                solution: z,
                iterations,
                residual_history,
                converged: false,
            });
        }
        let J_z = jacobian(&z);
        let delta = J_z
            .lu()
            .solve(&(-F_z))
            .ok_or_else(|| format!("singular Newton matrix at iteration {}", iterations))?;
        z += delta;
        iterations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // x^2 + y^2 = 4, x = y
    fn circle_residual(z: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(vec![z[0] * z[0] + z[1] * z[1] - 4.0, z[0] - z[1]])
    }
    fn circle_jacobian(z: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 2, &[2.0 * z[0], 2.0 * z[1], 1.0, -1.0])
    }

    #[test]
    fn test_newton_converges_quadratically() {
        let outcome = newton_solve(
            circle_residual,
            circle_jacobian,
            DVector::from_vec(vec![1.0, 0.5]),
            &NewtonSettings::default(),
        )
        .unwrap();
        assert!(outcome.converged);
        let root = 2.0_f64.sqrt();
        assert_relative_eq!(outcome.solution[0], root, epsilon = 1e-9);
        assert_relative_eq!(outcome.solution[1], root, epsilon = 1e-9);
        assert!(outcome.iterations < 10);
        assert_eq!(outcome.residual_history.len(), outcome.iterations + 1);
        // the residual decreases monotonically once close to the root
        let h = &outcome.residual_history;
        for w in h[1..].windows(2) {
            assert!(w[1] < w[0], "residual history {:?}", h);
        }
        assert!(*h.last().unwrap() < NEWTON_TOLERANCE);
    }

    #[test]
    fn test_linear_system_one_step() {
        let A = DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_vec(vec![9.0, 8.0]);
        let A2 = A.clone();
        let outcome = newton_solve(
            move |z: &DVector<f64>| &A * z - &b,
            move |_z: &DVector<f64>| A2.clone(),
            DVector::zeros(2),
            &NewtonSettings::default(),
        )
        .unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 1);
        assert_relative_eq!(outcome.solution[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(outcome.solution[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_iteration_cap_accepts_last_iterate() {
        // x^2 + 1 = 0 has no real root
        let settings = NewtonSettings {
            tolerance: 1e-8,
            max_iterations: 5,
        };
        let outcome = newton_solve(
            |z: &DVector<f64>| DVector::from_vec(vec![z[0] * z[0] + 1.0]),
            |z: &DVector<f64>| DMatrix::from_element(1, 1, 2.0 * z[0]),
            DVector::from_vec(vec![0.7]),
            &settings,
        )
        .unwrap();
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 5);
        assert_eq!(outcome.residual_history.len(), 6);
        assert!(outcome.solution[0].is_finite());
    }

    #[test]
    fn test_non_finite_residual_accepts_last_iterate() {
        // sqrt(z) = 0.1 from z = 4: the first update overshoots to z < 0
        let outcome = newton_solve(
            |z: &DVector<f64>| DVector::from_vec(vec![z[0].sqrt() - 0.1]),
            |z: &DVector<f64>| DMatrix::from_element(1, 1, 0.5 / z[0].sqrt()),
            DVector::from_vec(vec![4.0]),
            &NewtonSettings::default(),
        )
        .unwrap();
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.solution[0] < 0.0);
        assert!(outcome.residual_history.last().unwrap().is_nan());
    }

    #[test]
    fn test_singular_matrix_is_error() {
        let result = newton_solve(
            |z: &DVector<f64>| DVector::from_vec(vec![z[0] + z[1] - 1.0, z[0] + z[1] - 2.0]),
            |_z: &DVector<f64>| DMatrix::from_element(2, 2, 1.0),
            DVector::zeros(2),
            &NewtonSettings::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_converged_guess_needs_no_iteration() {
        let outcome = newton_solve(
            circle_residual,
            circle_jacobian,
            DVector::from_vec(vec![2.0_f64.sqrt(), 2.0_f64.sqrt()]),
            &NewtonSettings::default(),
        )
        .unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 0);
    }
}
