//! Finite-difference solvers for second-order boundary value problems:
//! the Thomas algorithm, the cyclic sweep for periodic three-point systems,
//! the periodic problem  y'' - p^2(x) y = f(x)  and the quasilinearization
//! (Newton-Kantorovich) iteration for  y'' = x sqrt(y), y(0) = 0, y(1) = 2.
use log::{debug, info, warn};
use std::f64::consts::PI;

/// Solves  a_i x_{i-1} + b_i x_i + c_i x_{i+1} = d_i,  i = 0..n-1.
/// `a` is the sub-diagonal (a[i-1] multiplies x_{i-1} in row i) and `c` the super-diagonal,
/// both of length n - 1.
pub fn tridiagonal_solve(a: &[f64], b: &[f64], c: &[f64], d: &[f64]) -> Result<Vec<f64>, String> {
    let n = b.len();
    if n == 0 || d.len() != n || a.len() + 1 != n || c.len() + 1 != n {
        return Err(format!(
            "inconsistent tridiagonal system: sub {}, diag {}, super {}, rhs {}",
            a.len(),
            n,
            c.len(),
            d.len()
        ));
    }
    let mut p = vec![0.0; n];
    let mut q = vec![0.0; n];
    let mut denom = b[0];
    for i in 0..n {
        if i > 0 {
            denom = b[i] - a[i - 1] * p[i - 1];
        }
        if denom == 0.0 || !denom.is_finite() {
            return Err(format!("zero pivot in tridiagonal sweep at row {}", i));
        }
        p[i] = if i + 1 < n { c[i] / denom } else { 0.0 };
        q[i] = if i > 0 {
            (d[i] - a[i - 1] * q[i - 1]) / denom
        } else {
            d[0] / denom
        };
    }
    let mut x = vec![0.0; n];
    x[n - 1] = q[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = q[i] - p[i] * x[i + 1];
    }
    Ok(x)
}

/// Cyclic sweep for the periodic system
///     a_n y_{n-1} - b_n y_n + c_n y_{n+1} = d_n,   n = 0..N-1,   y_{-1} = y_{N-1},  y_N = y_0.
/// Every unknown is expressed through its right neighbour and y_{N-1}, which is carried
/// as a parameter and fixed by the last equation.
pub fn cyclic_sweep(a: &[f64], b: &[f64], c: &[f64], d: &[f64]) -> Result<Vec<f64>, String> {
    let n = b.len();
    if n < 3 || a.len() != n || c.len() != n || d.len() != n {
        return Err(format!(
            "cyclic sweep needs four arrays of equal length >= 3, got {}, {}, {}, {}",
            a.len(),
            n,
            c.len(),
            d.len()
        ));
    }
    // y_{k-1} = alpha[k] y_k + beta[k] + gamma[k] y_{N-1},  k = 1..N-1
    let mut alpha = vec![0.0; n];
    let mut beta = vec![0.0; n];
    let mut gamma = vec![0.0; n];
    let pivot = |value: f64, row: usize| -> Result<f64, String> {
        if value == 0.0 || !value.is_finite() {
            Err(format!("zero pivot in cyclic sweep at row {}", row))
        } else {
            Ok(value)
        }
    };
    let den = pivot(b[0], 0)?;
    alpha[1] = c[0] / den;
    beta[1] = -d[0] / den;
    gamma[1] = a[0] / den;
    for k in 1..n - 1 {
        let den = pivot(b[k] - a[k] * alpha[k], k)?;
        alpha[k + 1] = c[k] / den;
        beta[k + 1] = (a[k] * beta[k] - d[k]) / den;
        gamma[k + 1] = a[k] * gamma[k] / den;
    }
    // y_k = P_k y_{N-1} + Q_k
    let mut P = vec![0.0; n];
    let mut Q = vec![0.0; n];
    P[n - 1] = 1.0;
    for k in (0..n - 1).rev() {
        P[k] = alpha[k + 1] * P[k + 1] + gamma[k + 1];
        Q[k] = alpha[k + 1] * Q[k + 1] + beta[k + 1];
    }
    let last = n - 1;
    let den = pivot(a[last] * P[last - 1] - b[last] + c[last] * P[0], last)?;
    let y_last = (d[last] - a[last] * Q[last - 1] - c[last] * Q[0]) / den;
    Ok((0..n).map(|k| P[k] * y_last + Q[k]).collect())
}

pub fn default_p_squared(x: f64) -> f64 {
    10.0 + (2.0 * PI * x).sin()
}

pub fn default_forcing(x: f64) -> f64 {
    (2.0 * PI * x).cos()
}

/// y'' - p^2(x) y = f(x) on the unit periodic interval with n nodes x_i = i/n.
/// Returns (x, y).
pub fn solve_periodic_bvp<P, F>(p_squared: P, forcing: F, n: usize) -> Result<(Vec<f64>, Vec<f64>), String>
where
    P: Fn(f64) -> f64,
    F: Fn(f64) -> f64,
{
    if n < 3 {
        return Err(format!("periodic problem needs at least 3 nodes, got {}", n));
    }
    let h = 1.0 / n as f64;
    let x: Vec<f64> = (0..n).map(|i| i as f64 * h).collect();
    let a = vec![1.0; n];
    let c = vec![1.0; n];
    let b: Vec<f64> = x.iter().map(|&xi| 2.0 + p_squared(xi) * h * h).collect();
    let d: Vec<f64> = x.iter().map(|&xi| forcing(xi) * h * h).collect();
    let y = cyclic_sweep(&a, &b, &c, &d)?;
    info!("periodic problem solved on {} nodes, h = {}", n, h);
    Ok((x, y))
}

#[derive(Debug, Clone)]
pub struct QuasilinearizationResult {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub iterations: usize,
    /// max |y_{k+1} - y_k| of every iteration
    pub updates: Vec<f64>,
    pub converged: bool,
}

pub const BVP_LEFT: f64 = 0.0;
pub const BVP_RIGHT: f64 = 2.0;

/// Newton-Kantorovich iteration for y'' = x sqrt(y), y(0) = 0, y(1) = 2 on n intervals.
/// Iteration k solves the linear problem
///     y'' - x / (2 sqrt(y_k)) y = x sqrt(y_k) / 2
/// starting from y_0 = 2x. Hitting `max_iterations` logs a warning and keeps the last iterate.
pub fn quasilinearization(
    n: usize,
    tolerance: f64,
    max_iterations: usize,
) -> Result<QuasilinearizationResult, String> {
    if n < 2 {
        return Err(format!("quasilinearization needs at least 2 intervals, got {}", n));
    }
    let h = 1.0 / n as f64;
    let x: Vec<f64> = (0..=n).map(|i| i as f64 * h).collect();
    let mut y: Vec<f64> = x.iter().map(|&xi| 2.0 * xi).collect();
    let m = n - 1; // interior unknowns
    let mut updates = Vec::new();
    let mut converged = false;
    for iteration in 0..max_iterations {
        let sub = vec![1.0; m - 1];
        let sup = vec![1.0; m - 1];
        let mut diag = vec![0.0; m];
        let mut rhs = vec![0.0; m];
        for j in 0..m {
            let i = j + 1;
            let root = y[i].max(1e-12).sqrt();
            diag[j] = -2.0 - h * h * x[i] / (2.0 * root);
            rhs[j] = h * h * x[i] * root / 2.0;
        }
        rhs[0] -= BVP_LEFT;
        rhs[m - 1] -= BVP_RIGHT;
        let interior = tridiagonal_solve(&sub, &diag, &sup, &rhs)?;
        let mut update: f64 = 0.0;
        for j in 0..m {
            update = update.max((interior[j] - y[j + 1]).abs());
            y[j + 1] = interior[j];
        }
        y[0] = BVP_LEFT;
        y[n] = BVP_RIGHT;
        updates.push(update);
        debug!("quasilinearization iteration {}: max update {:e}", iteration + 1, update);
        if update < tolerance {
            converged = true;
            break;
        }
    }
    if !converged {
        warn!(
            "quasilinearization did not reach {:e} in {} iterations; last iterate kept",
            tolerance, max_iterations
        );
    }
    Ok(QuasilinearizationResult {
        x,
        y,
        iterations: updates.len(),
        updates,
        converged,
    })
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Max |y_coarse - y_fine| over the nodes the two uniform meshes of [0, 1] share.
/// `coarse` has n_c + 1 values, `fine` n_f + 1.
pub fn max_difference_on_common_nodes(coarse: &[f64], fine: &[f64]) -> f64 {
    let (n_c, n_f) = (coarse.len() - 1, fine.len() - 1);
    let g = gcd(n_c, n_f);
    let (step_c, step_f) = (n_c / g, n_f / g);
    (0..=g)
        .map(|k| (coarse[k * step_c] - fine[k * step_f]).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn test_tridiagonal_against_dense() {
        let a = [1.0, -2.0, 0.5];
        let b = [4.0, 5.0, 6.0, 3.0];
        let c = [1.5, 1.0, -1.0];
        let d = [1.0, 2.0, 3.0, 4.0];
        let x = tridiagonal_solve(&a, &b, &c, &d).unwrap();
        let mut M = DMatrix::zeros(4, 4);
        for i in 0..4 {
            M[(i, i)] = b[i];
            if i > 0 {
                M[(i, i - 1)] = a[i - 1];
            }
            if i < 3 {
                M[(i, i + 1)] = c[i];
            }
        }
        let dense = M.lu().solve(&DVector::from_row_slice(&d)).unwrap();
        for i in 0..4 {
            assert_relative_eq!(x[i], dense[i], epsilon = 1e-13);
        }
    }

    #[test]
    fn test_tridiagonal_rejects_bad_input() {
        assert!(tridiagonal_solve(&[1.0], &[1.0, 2.0], &[], &[1.0, 1.0]).is_err());
        assert!(tridiagonal_solve(&[1.0], &[0.0, 2.0], &[1.0], &[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_cyclic_sweep_against_dense() {
        let n = 7;
        let a: Vec<f64> = (0..n).map(|i| 1.0 + 0.1 * i as f64).collect();
        let c: Vec<f64> = (0..n).map(|i| 0.5 - 0.05 * i as f64).collect();
        let b: Vec<f64> = (0..n).map(|i| 4.0 + (i % 3) as f64).collect();
        let d: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        let y = cyclic_sweep(&a, &b, &c, &d).unwrap();
        let mut M = DMatrix::zeros(n, n);
        for i in 0..n {
            M[(i, (i + n - 1) % n)] += a[i];
            M[(i, i)] -= b[i];
            M[(i, (i + 1) % n)] += c[i];
        }
        let dense = M.lu().solve(&DVector::from_vec(d.clone())).unwrap();
        for i in 0..n {
            assert_relative_eq!(y[i], dense[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_periodic_constant_coefficient() {
        // p^2 = k: y = -cos(2 pi x) / (4 pi^2 + k)
        let k = 10.0;
        let (x, y) = solve_periodic_bvp(|_| k, default_forcing, 200).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            let exact = -(2.0 * PI * xi).cos() / (4.0 * PI * PI + k);
            assert!((yi - exact).abs() < 1e-5, "x = {}: {} vs {}", xi, yi, exact);
        }
    }

    #[test]
    fn test_periodic_default_problem_residual() {
        let n = 200;
        let (x, y) = solve_periodic_bvp(default_p_squared, default_forcing, n).unwrap();
        let h = 1.0 / n as f64;
        for i in 0..n {
            let second = (y[(i + n - 1) % n] - 2.0 * y[i] + y[(i + 1) % n]) / (h * h);
            let residual = second - default_p_squared(x[i]) * y[i] - default_forcing(x[i]);
            assert!(residual.abs() < 1e-8);
        }
    }

    #[test]
    fn test_quasilinearization_converges() {
        let result = quasilinearization(100, 1e-10, 30).unwrap();
        assert!(result.converged);
        assert!(result.iterations < 15);
        assert_eq!(result.y[0], 0.0);
        assert_eq!(result.y[100], 2.0);
        // discrete equation holds at the interior nodes
        let h = 0.01;
        for i in 1..100 {
            let second = (result.y[i - 1] - 2.0 * result.y[i] + result.y[i + 1]) / (h * h);
            assert!((second - result.x[i] * result.y[i].sqrt()).abs() < 1e-6);
        }
        // Newton: the updates shrink fast once close
        let u = &result.updates;
        assert!(u[u.len() - 1] < u[0]);
    }

    #[test]
    fn test_quasilinearization_cap() {
        let result = quasilinearization(50, 0.0, 2).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 2);
        assert!(result.y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_common_nodes() {
        assert_eq!(gcd(400, 500), 100);
        let coarse: Vec<f64> = (0..=4).map(|i| i as f64 / 4.0).collect();
        let mut fine: Vec<f64> = (0..=6).map(|i| i as f64 / 6.0).collect();
        // nodes shared by meshes of 4 and 6 intervals: x = 0, 1/2, 1
        fine[3] += 0.25;
        fine[1] += 10.0; // not a common node
        assert_relative_eq!(max_difference_on_common_nodes(&coarse, &fine), 0.25, epsilon = 1e-15);
    }
}
