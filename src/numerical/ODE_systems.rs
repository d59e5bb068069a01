//! Right-hand sides and hand-derived Jacobians of the systems integrated in the labs,
//! plus a finite-difference Jacobian used to check the analytic ones.
use nalgebra::{DMatrix, DVector};

/// right-hand side of an autonomous or non-autonomous system: dy/dt = f(t, y)
pub type RHSfn = Box<dyn Fn(f64, &DVector<f64>) -> DVector<f64>>;
/// Jacobian df/dy of the right-hand side
pub type JACfn = Box<dyn Fn(f64, &DVector<f64>) -> DMatrix<f64>>;

/// number of fixed steps of size h that fit into span: floor(span/h).
/// A relative guard keeps 1.0/0.1 from rounding down to 9.
pub fn step_count(span: f64, h: f64) -> usize {
    let ratio = span / h;
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0;
    }
    (ratio * (1.0 + 1e-9)).floor() as usize
}

/// Van der Pol oscillator  x' = z,  z' = e(1 - x^2)z - x
pub fn van_der_pol(e: f64) -> RHSfn {
    Box::new(move |_t: f64, y: &DVector<f64>| {
        let (x, z) = (y[0], y[1]);
        DVector::from_vec(vec![z, e * (1.0 - x * x) * z - x])
    })
}

pub fn van_der_pol_jacobian(e: f64) -> JACfn {
    Box::new(move |_t: f64, y: &DVector<f64>| {
        let (x, z) = (y[0], y[1]);
        DMatrix::from_row_slice(2, 2, &[0.0, 1.0, -2.0 * e * x * z - 1.0, e * (1.0 - x * x)])
    })
}

/// Two competing populations x, y with slowly adapting traits a1, a2.
/// State is (x, y, a1, a2); for small eps the traits are orders of magnitude slower
/// than the populations, which makes the system stiff.
pub fn adaptive_competition(eps: f64) -> RHSfn {
    Box::new(move |_t: f64, v: &DVector<f64>| {
        let (x, y, a1, a2) = (v[0], v[1], v[2], v[3]);
        let a1_2 = a1 * a1;
        let a2_2 = a2 * a2;
        DVector::from_vec(vec![
            x * (2.0 * a1 - 0.5 * x - a1_2 / a2_2 * y),
            y * (2.0 * a2 - a2_2 / a1_2 * x - 0.5 * y),
            eps * (2.0 - 2.0 * a1 * y / a2_2),
            eps * (2.0 - 2.0 * a2 * x / a1_2),
        ])
    })
}

pub fn adaptive_competition_jacobian(eps: f64) -> JACfn {
    Box::new(move |_t: f64, v: &DVector<f64>| {
        let (x, y, a1, a2) = (v[0], v[1], v[2], v[3]);
        let a1_2 = a1 * a1;
        let a2_2 = a2 * a2;
        let a1_3 = a1_2 * a1;
        let a2_3 = a2_2 * a2;
        let mut J = DMatrix::zeros(4, 4);
        // x (2a1 - 0.5x - a1^2 y / a2^2)
        J[(0, 0)] = 2.0 * a1 - x - a1_2 / a2_2 * y;
        J[(0, 1)] = -x * a1_2 / a2_2;
        J[(0, 2)] = x * (2.0 - 2.0 * a1 * y / a2_2);
        J[(0, 3)] = 2.0 * x * a1_2 * y / a2_3;
        // y (2a2 - a2^2 x / a1^2 - 0.5y)
        J[(1, 0)] = -y * a2_2 / a1_2;
        J[(1, 1)] = 2.0 * a2 - a2_2 / a1_2 * x - y;
        J[(1, 2)] = 2.0 * y * a2_2 * x / a1_3;
        J[(1, 3)] = y * (2.0 - 2.0 * a2 * x / a1_2);
        // eps (2 - 2 a1 y / a2^2)
        J[(2, 1)] = -eps * 2.0 * a1 / a2_2;
        J[(2, 2)] = -eps * 2.0 * y / a2_2;
        J[(2, 3)] = eps * 4.0 * a1 * y / a2_3;
        // eps (2 - 2 a2 x / a1^2)
        J[(3, 0)] = -eps * 2.0 * a2 / a1_2;
        J[(3, 2)] = eps * 4.0 * a2 * x / a1_3;
        J[(3, 3)] = -eps * 2.0 * x / a1_2;
        J
    })
}

/// y' = -lambda*y componentwise, exact solution y0*exp(-lambda t)
pub fn exponential_decay(lambda: f64) -> RHSfn {
    Box::new(move |_t: f64, y: &DVector<f64>| -lambda * y)
}

pub fn exponential_decay_jacobian(lambda: f64) -> JACfn {
    Box::new(move |_t: f64, y: &DVector<f64>| -lambda * DMatrix::identity(y.len(), y.len()))
}

/// Central finite-difference approximation of df/dy at (t, y).
/// The perturbation of component j is step*max(1, |y_j|).
pub fn numerical_jacobian<F>(f: F, t: f64, y: &DVector<f64>, step: f64) -> DMatrix<f64>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    let n = y.len();
    let m = f(t, y).len();
    let mut J = DMatrix::zeros(m, n);
    for j in 0..n {
        let dy = step * y[j].abs().max(1.0);
        let mut y_plus = y.clone();
        let mut y_minus = y.clone();
        y_plus[j] += dy;
        y_minus[j] -= dy;
        let column = (f(t, &y_plus) - f(t, &y_minus)) / (2.0 * dy);
        J.set_column(j, &column);
    }
    J
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_step_count() {
        assert_eq!(step_count(1.0, 0.1), 10);
        assert_eq!(step_count(1.0, 0.01), 100);
        assert_eq!(step_count(2000.0, 0.001), 2_000_000);
        assert_eq!(step_count(1.0, 0.3), 3);
        assert_eq!(step_count(0.0, 0.1), 0);
        assert_eq!(step_count(1.0, 0.0), 0);
    }

    #[test]
    fn test_van_der_pol_jacobian_matches_finite_differences() {
        let e = 0.7;
        let f = van_der_pol(e);
        let jac = van_der_pol_jacobian(e);
        for point in [[2.0, 0.0], [0.3, -1.2], [-1.5, 2.5]] {
            let y = DVector::from_row_slice(&point);
            let analytic = jac(0.0, &y);
            let numeric = numerical_jacobian(&f, 0.0, &y, 1e-6);
            for (a, b) in analytic.iter().zip(numeric.iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1e-6, max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn test_adaptive_competition_jacobian_matches_finite_differences() {
        // eps large enough for the slow rows to matter in the comparison
        let eps = 0.01;
        let f = adaptive_competition(eps);
        let jac = adaptive_competition_jacobian(eps);
        let points = [
            [20.0, 20.0, 0.005, 10.0],
            [1.0, 1.0, 0.001, 10.0],
            [3.0, 0.5, 1.2, 0.8],
        ];
        for point in points {
            let y = DVector::from_row_slice(&point);
            let analytic = jac(0.0, &y);
            let numeric = numerical_jacobian(&f, 0.0, &y, 1e-7);
            for (a, b) in analytic.iter().zip(numeric.iter()) {
                let scale = a.abs().max(1.0);
                assert!(
                    (a - b).abs() / scale < 1e-5,
                    "analytic {} vs numeric {} at {:?}",
                    a,
                    b,
                    point
                );
            }
        }
    }

    #[test]
    fn test_adaptive_competition_frozen_traits() {
        // eps = 0 freezes a1, a2; with a1 = a2 = 1 the populations are at rest at x = y = 4/3
        let f = adaptive_competition(0.0);
        let y = DVector::from_vec(vec![4.0 / 3.0, 4.0 / 3.0, 1.0, 1.0]);
        let dy = f(0.0, &y);
        assert_relative_eq!(dy.norm(), 0.0, epsilon = 1e-14);
    }
}
