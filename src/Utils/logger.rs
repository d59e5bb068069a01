//! Logger initialization and plain-text/CSV writers for trajectories, convergence tables
//! and Newton residual histories.
use chrono::Local;
use csv::Writer;
use log::LevelFilter;
use nalgebra::{DMatrix, DVector};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Console logger plus an optional file logger. A second call is a no-op because the
/// global logger can be set only once per process.
pub fn init_logger(level: LevelFilter, log_file: Option<&Path>) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    if let Some(path) = log_file {
        if let Ok(file) = File::create(path) {
            loggers.push(WriteLogger::new(level, Config::default(), file));
        }
    }
    let _ = CombinedLogger::init(loggers);
}

/// `<dir>/numlabs_YYYY-MM-DD_HH-MM-SS.log`
pub fn timestamped_log_name(dir: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    dir.join(format!("numlabs_{}.log", stamp))
}

/// creates `dir` together with its parents when missing
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// One line per time level: `t y_0 y_1 ...` separated by single spaces, no header.
pub fn save_trajectory_txt(
    filename: &Path,
    t_result: &DVector<f64>,
    y_result: &DMatrix<f64>,
) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(filename)?);
    for (i, row) in y_result.row_iter().enumerate() {
        let mut line = t_result[i].to_string();
        for val in row.iter() {
            line.push(' ');
            line.push_str(&val.to_string());
        }
        writeln!(file, "{}", line)?;
    }
    file.flush()?;
    Ok(())
}

/// CSV with the argument name and the variable names as header
pub fn save_matrix_to_csv(
    matrix: &DMatrix<f64>,
    headers: &[String],
    filename: &Path,
    x_mesh: &DVector<f64>,
    arg: &str,
) -> Result<(), csv::Error> {
    let mut writer = Writer::from_path(filename)?;
    let mut headers_with_x = Vec::with_capacity(headers.len() + 1);
    headers_with_x.push(arg.to_string());
    headers_with_x.extend(headers.iter().cloned());
    writer.write_record(&headers_with_x)?;

    for (i, row) in matrix.row_iter().enumerate() {
        let mut row_data = Vec::with_capacity(row.len() + 1);
        row_data.push(x_mesh[i].to_string());
        row_data.extend(row.iter().map(|&val| val.to_string()));
        writer.write_record(&row_data)?;
    }
    writer.flush()?;
    Ok(())
}

/// Column-oriented CSV: `headers[j]` over `columns[j]`. Columns must have equal length.
pub fn save_columns_to_csv(
    filename: &Path,
    headers: &[&str],
    columns: &[&[f64]],
) -> Result<(), Box<dyn std::error::Error>> {
    if headers.len() != columns.len() {
        return Err(format!(
            "{} headers for {} columns in {}",
            headers.len(),
            columns.len(),
            filename.display()
        )
        .into());
    }
    let rows = columns.first().map(|c| c.len()).unwrap_or(0);
    if columns.iter().any(|c| c.len() != rows) {
        return Err(format!("columns of unequal length in {}", filename.display()).into());
    }
    let mut writer = Writer::from_path(filename)?;
    writer.write_record(headers)?;
    for i in 0..rows {
        writer.write_record(columns.iter().map(|c| c[i].to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// `h,error` table of a convergence study
pub fn save_convergence_csv(
    filename: &Path,
    steps: &[f64],
    errors: &[f64],
) -> Result<(), Box<dyn std::error::Error>> {
    save_columns_to_csv(filename, &["h", "error"], &[steps, errors])
}

/// `iteration,residual` table of a Newton or quasilinearization history
pub fn save_residual_history_csv(
    filename: &Path,
    residuals: &[f64],
) -> Result<(), Box<dyn std::error::Error>> {
    let iterations: Vec<f64> = (0..residuals.len()).map(|i| i as f64).collect();
    save_columns_to_csv(filename, &["iteration", "residual"], &[&iterations, residuals])
}

/// human readable wall time for the statistics tables
pub fn elapsed_time(elapsed: Duration) -> String {
    let time = elapsed.as_millis();
    if time < 1000 {
        format!("{} ms", time)
    } else if time < 60_000 {
        format!("{:.2} s", elapsed.as_secs_f64())
    } else {
        format!("{:.2} min", elapsed.as_secs_f64() / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_trajectory_txt_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rk.txt");
        let t = DVector::from_vec(vec![0.0, 0.5]);
        let y = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 1.5, -0.25]);
        save_trajectory_txt(&path, &t, &y).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["0 2 0", "0.5 1.5 -0.25"]);
    }

    #[test]
    fn test_matrix_csv_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rk.csv");
        let t = DVector::from_vec(vec![0.0, 1.0]);
        let y = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        save_matrix_to_csv(&y, &["x".to_string()], &path, &t, "t").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().next().unwrap(), "t,x");
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_convergence_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conv.csv");
        save_convergence_csv(&path, &[0.1, 0.05], &[1e-2, 2.5e-3]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "h,error");
        assert_eq!(lines[1], "0.1,0.01");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_unequal_columns_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        assert!(save_convergence_csv(&path, &[0.1, 0.05], &[1e-2]).is_err());
    }

    #[test]
    fn test_ensure_dir_nested() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("results").join("data");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // idempotent
        ensure_dir(&nested).unwrap();
    }
}
