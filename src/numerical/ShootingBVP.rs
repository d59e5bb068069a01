/// secant shooting with RK4 trials and the mesh comparison study
pub mod Shooting_simple;
