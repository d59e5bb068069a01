//! PNG output through plotters. Long series are min-max decimated before drawing so that
//! a two-million-step trajectory does not turn into two million line segments.
use nalgebra::{DMatrix, DVector};
use plotters::prelude::*;
use std::error::Error;
use std::ops::Range;
use std::path::Path;

/// buckets kept per curve; every bucket contributes its min and max point
pub const PLOT_BUCKETS: usize = 2000;

/// Divides the series into `target_points` buckets and keeps the minimum and the maximum of
/// every bucket in their original order, so peaks survive the reduction.
pub fn decimate_minmax(x: &[f64], y: &[f64], target_points: usize) -> (Vec<f64>, Vec<f64>) {
    if x.len() != y.len() || x.is_empty() || target_points == 0 {
        return (Vec::new(), Vec::new());
    }
    if x.len() <= target_points * 2 {
        return (x.to_vec(), y.to_vec());
    }
    let bucket_size = x.len() / target_points;
    let mut dec_x = Vec::with_capacity(target_points * 2);
    let mut dec_y = Vec::with_capacity(target_points * 2);
    for bucket in 0..target_points {
        let start = bucket * bucket_size;
        let end = if bucket == target_points - 1 {
            x.len()
        } else {
            start + bucket_size
        };
        let (mut i_min, mut i_max) = (start, start);
        for i in start..end {
            if y[i] < y[i_min] {
                i_min = i;
            }
            if y[i] > y[i_max] {
                i_max = i;
            }
        }
        let (first, second) = if i_min <= i_max {
            (i_min, i_max)
        } else {
            (i_max, i_min)
        };
        dec_x.push(x[first]);
        dec_y.push(y[first]);
        if second != first {
            dec_x.push(x[second]);
            dec_y.push(y[second]);
        }
    }
    (dec_x, dec_y)
}

/// min..max of the finite values, widened by 5% (and made non-empty for flat data)
fn padded_range<'a>(values: impl Iterator<Item = &'a f64>) -> Range<f64> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for &v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return -1.0..1.0;
    }
    let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.5 * lo.abs().max(1.0) };
    (lo - pad)..(hi + pad)
}

fn series(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    let (dx, dy) = decimate_minmax(x, y, PLOT_BUCKETS);
    dx.into_iter().zip(dy).filter(|(_, v)| v.is_finite()).collect()
}

/// One PNG per variable: `<dir>/<prefix>_<variable>.png`
pub fn plots(
    arg: &str,
    values: &[String],
    t_result: &DVector<f64>,
    y_result: &DMatrix<f64>,
    dir: &Path,
    prefix: &str,
) -> Result<(), Box<dyn Error>> {
    let t: Vec<f64> = t_result.iter().copied().collect();
    for col in 0..y_result.ncols() {
        let y_col: Vec<f64> = y_result.column(col).iter().copied().collect();
        let varname = &values[col];
        let filename = dir.join(format!("{}_{}.png", prefix, varname));
        let root_area = BitMapBackend::new(&filename, (800, 600)).into_drawing_area();
        root_area.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root_area)
            .caption(format!("{}: {}", prefix, varname), ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(padded_range(t.iter()), padded_range(y_col.iter()))?;
        chart.configure_mesh().x_desc(arg).y_desc(varname).draw()?;
        chart
            .draw_series(LineSeries::new(series(&t, &y_col), &Palette99::pick(col)))?
            .label(varname.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(col)));
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
        root_area.present()?;
    }
    Ok(())
}

/// All variables of a trajectory in one PNG, one panel per variable on a 2x2 grid
pub fn plots_grid(
    arg: &str,
    values: &[String],
    t_result: &DVector<f64>,
    y_result: &DMatrix<f64>,
    filename: &Path,
    title: &str,
) -> Result<(), Box<dyn Error>> {
    let t: Vec<f64> = t_result.iter().copied().collect();
    let root_area = BitMapBackend::new(filename, (1200, 900)).into_drawing_area();
    root_area.fill(&WHITE)?;
    let root_area = root_area.titled(title, ("sans-serif", 30))?;
    let panels = root_area.split_evenly((2, 2));
    for (col, panel) in panels.iter().enumerate().take(y_result.ncols()) {
        let y_col: Vec<f64> = y_result.column(col).iter().copied().collect();
        let mut chart = ChartBuilder::on(panel)
            .caption(&values[col], ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(padded_range(t.iter()), padded_range(y_col.iter()))?;
        chart.configure_mesh().x_desc(arg).draw()?;
        chart.draw_series(LineSeries::new(series(&t, &y_col), &Palette99::pick(col)))?;
    }
    root_area.present()?;
    Ok(())
}

/// z against x
pub fn plot_phase(x: &[f64], z: &[f64], filename: &Path, title: &str) -> Result<(), Box<dyn Error>> {
    let root_area = BitMapBackend::new(filename, (800, 800)).into_drawing_area();
    root_area.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root_area)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(padded_range(x.iter()), padded_range(z.iter()))?;
    chart.configure_mesh().x_desc("x").y_desc("z").draw()?;
    // phase curves are not monotone in x, so they are thinned by stride instead of min-max
    let stride = (x.len() / (2 * PLOT_BUCKETS)).max(1);
    chart.draw_series(LineSeries::new(
        x.iter()
            .zip(z.iter())
            .step_by(stride)
            .filter(|(a, b)| a.is_finite() && b.is_finite())
            .map(|(&a, &b)| (a, b)),
        &BLUE,
    ))?;
    root_area.present()?;
    Ok(())
}

/// Log-log error against step size, one curve per entry of `curves`, with O(h) and O(h^2)
/// guide lines anchored at the coarsest point of the first curve.
pub fn plot_convergence(
    curves: &[(String, Vec<f64>, Vec<f64>)],
    filename: &Path,
    title: &str,
) -> Result<(), Box<dyn Error>> {
    let positive = |v: &&f64| v.is_finite() && **v > 0.0;
    let h_all: Vec<f64> = curves.iter().flat_map(|c| c.1.iter().filter(positive).copied()).collect();
    let e_all: Vec<f64> = curves.iter().flat_map(|c| c.2.iter().filter(positive).copied()).collect();
    if h_all.is_empty() || e_all.is_empty() {
        return Err(format!("nothing to plot in {}", filename.display()).into());
    }
    let h_min = h_all.iter().cloned().fold(f64::INFINITY, f64::min);
    let h_max = h_all.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut e_min = e_all.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut e_max = e_all.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    // guides through (h_max, e_ref)
    let e_ref = curves[0]
        .1
        .iter()
        .zip(curves[0].2.iter())
        .filter(|(h, e)| positive(h) && positive(e))
        .max_by(|a, b| a.0.total_cmp(b.0))
        .map(|(_, e)| *e)
        .unwrap_or(e_max);
    let guides = [("O(h)", 1), ("O(h^2)", 2)];
    for (_, p) in guides {
        let low = e_ref * (h_min / h_max).powi(p);
        e_min = e_min.min(low);
        e_max = e_max.max(e_ref);
    }

    let root_area = BitMapBackend::new(filename, (900, 700)).into_drawing_area();
    root_area.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root_area)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (h_min * 0.8..h_max * 1.25).log_scale(),
            (e_min * 0.5..e_max * 2.0).log_scale(),
        )?;
    chart
        .configure_mesh()
        .x_desc("h")
        .y_desc("error")
        .y_label_formatter(&|v| format!("{:.1e}", v))
        .draw()?;

    for (i, (name, h, e)) in curves.iter().enumerate() {
        let color = Palette99::pick(i);
        let points: Vec<(f64, f64)> = h
            .iter()
            .zip(e.iter())
            .filter(|(a, b)| positive(a) && positive(b))
            .map(|(&a, &b)| (a, b))
            .collect();
        chart
            .draw_series(LineSeries::new(points.clone(), &color))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(i)));
        chart.draw_series(points.into_iter().map(|p| Circle::new(p, 3, Palette99::pick(i).filled())))?;
    }
    for (label, p) in guides {
        let style = if p == 1 { BLACK.mix(0.5) } else { RED.mix(0.5) };
        chart
            .draw_series(LineSeries::new(
                vec![(h_max, e_ref), (h_min, e_ref * (h_min / h_max).powi(p))],
                &style,
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &style));
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root_area.present()?;
    Ok(())
}

/// Several curves over a common abscissa, e.g. numerical and exact profiles
pub fn plot_profiles(
    x: &[f64],
    curves: &[(String, Vec<f64>)],
    x_desc: &str,
    filename: &Path,
    title: &str,
) -> Result<(), Box<dyn Error>> {
    let root_area = BitMapBackend::new(filename, (900, 600)).into_drawing_area();
    root_area.fill(&WHITE)?;
    let y_range = padded_range(curves.iter().flat_map(|c| c.1.iter()));
    let mut chart = ChartBuilder::on(&root_area)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(padded_range(x.iter()), y_range)?;
    chart.configure_mesh().x_desc(x_desc).draw()?;
    for (i, (name, y)) in curves.iter().enumerate() {
        chart
            .draw_series(LineSeries::new(series(x, y), &Palette99::pick(i)))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(i)));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root_area.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimation_keeps_short_series() {
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![1.0, -1.0, 0.5];
        let (dx, dy) = decimate_minmax(&x, &y, 10);
        assert_eq!(dx, x);
        assert_eq!(dy, y);
    }

    #[test]
    fn test_decimation_preserves_extremes() {
        let n = 10_000;
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let mut y = vec![0.0; n];
        y[1234] = 5.0;
        y[8765] = -7.0;
        let (dx, dy) = decimate_minmax(&x, &y, 100);
        assert!(dx.len() <= 200);
        assert_eq!(dx.len(), dy.len());
        assert!(dy.contains(&5.0));
        assert!(dy.contains(&-7.0));
        // chronological order
        assert!(dx.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_decimation_rejects_mismatch() {
        let (dx, dy) = decimate_minmax(&[0.0, 1.0], &[0.0], 10);
        assert!(dx.is_empty() && dy.is_empty());
    }

    #[test]
    fn test_padded_range_flat_and_nan() {
        let flat = [3.0, 3.0];
        let r = padded_range(flat.iter());
        assert!(r.start < 3.0 && r.end > 3.0);
        let bad = [f64::NAN];
        let r = padded_range(bad.iter());
        assert_eq!(r, -1.0..1.0);
    }
}
