//! different utility modules used throughout the project
/// logger setup and saving of results into txt/csv files
pub mod logger;
/// plotting of trajectories, phase portraits, profiles and convergence curves
pub mod plots;
/// parse task files with structure like "title1 key1: value1, value2 key2: value2 title2 key3: value3" into HashMap
pub mod task_parser;
