/// Radau IIA tableaux, the stacked Newton step and the fixed-step loop
pub mod Radau_main;
