//! # Fixed-step numerical methods
//!
//! Every solver works with a constant step and returns the trajectory as a time vector
//! of length N + 1 together with a matrix holding one row per time level.
//!
//! Initial value problems:
//! - `NonStiff_api`: explicit Runge-Kutta of orders 1-4, Adams-Bashforth 2-4 and the
//!   explicit backward-difference family, wrapped into the `nonstiffODE` task struct
//! - `Implicit_Adams`: the trapezoidal Adams-Moulton rule with Newton iterations
//! - `Radau`: 2- and 3-stage Radau IIA collocation (orders 3 and 5)
//! - `Rosenbrock`: linearly implicit ROW2 and ROW3 schemes
//! - `Stiff_api`: the `stiffODE` task struct dispatching between the implicit solvers
//!   and collecting evaluation counters
//!
//! Partial and boundary value problems:
//! - `Advection`: upwind, FTCS and Lax-Wendroff schemes for u_t + a u_x = 0 on a
//!   periodic grid and the grid refinement study
//! - `BVP_FD`: Thomas algorithm, cyclic sweep, the periodic two-point problem and
//!   quasilinearization
//! - `ShootingBVP`: the shooting method

/// model right-hand sides, their Jacobians and the step counter shared by all solvers
pub mod ODE_systems;

/// explicit one-step and multistep methods
pub mod NonStiff_api;

/// Newton-Raphson iteration used inside every implicit step
pub mod NR_for_implicit;

/// trapezoidal Adams-Moulton method
pub mod Implicit_Adams;

/// Radau IIA methods
pub mod Radau;

/// Rosenbrock-Wanner methods
pub mod Rosenbrock;

/// common driver, statistics and the task struct for stiff problems
pub mod Stiff_api;

/// linear advection on a periodic grid
pub mod Advection;

/// finite-difference boundary value problems
pub mod BVP_FD;

/// shooting method for two-point problems
pub mod ShootingBVP;
