#![allow(non_snake_case)]
use RustedNumLabs::Examples::{OutputDirs, run_all};
use RustedNumLabs::Utils::logger::{ensure_dir, init_logger, timestamped_log_name};
use RustedNumLabs::Utils::task_parser::{DocumentMap, parse_task_file};
use log::{LevelFilter, error, info};
use std::path::Path;
use std::process::ExitCode;

// usage: RustedNumLabs [task_file]
fn main() -> ExitCode {
    let doc = match std::env::args().nth(1) {
        Some(path) => match parse_task_file(Path::new(&path)) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => DocumentMap::new(),
    };
    let out = OutputDirs::from_section(doc.get("output"));
    let log_file = out
        .data
        .parent()
        .filter(|root| ensure_dir(root).is_ok())
        .map(timestamped_log_name);
    init_logger(LevelFilter::Info, log_file.as_deref());
    info!("{} sections in the task document", doc.len());

    match run_all(&doc) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
