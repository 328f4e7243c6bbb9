// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
 * Generic chart rendering.
 *
 * Nothing here keeps a "current figure": every routine draws on an
 * explicitly supplied `DrawingArea`, and the `*_to_file` variants make
 * one from a PNG backend, delegate, and present it.
 */

pub mod error;
pub mod spectrum;

pub use error::DrawError;

use std::path::Path;

use itertools::Itertools;
use plotters::coord::Shift;
use plotters::prelude::*;

/// Floor added before taking logs, so zero power stays finite.
const DB_FLOOR: f64 = 1e-20;

/// Convert a linear power value to dB.
pub fn db(x: f64) -> f64 {
    10.0 * (x.abs() + DB_FLOOR).log10()
}

/// Dimensions of standalone figures [pixels].
pub const FIG_X_PIXELS: u32 = 1000;
pub const FIG_Y_PIXELS: u32 = 600;

/// How a series is drawn.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Marker {
    /// Connected line segments.
    Line,
    /// Unconnected points.
    Point,
}

/// One curve on a generic plot.
#[derive(Clone, Debug)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub marker: Marker,
    /// Legend label. The legend is drawn iff any series has one.
    pub label: Option<String>,
}

impl Series {
    /// A line series with no legend entry.
    pub fn line(x: Vec<f64>, y: Vec<f64>) -> Series {
        Series {
            x,
            y,
            marker: Marker::Line,
            label: None,
        }
    }
}

/// Axis and annotation settings shared by the chart layouts.
#[derive(Clone, Debug, Default)]
pub struct PlotConfig {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_limits: Option<(f64, f64)>,
    pub y_limits: Option<(f64, f64)>,
    /// Free text drawn at figure-fraction coordinates (0 to 1 on each
    /// axis, y measured up from the bottom).
    pub annotations: Vec<(f64, f64, String)>,
}

/// Draw `series` as one chart on `area`. Axis ranges come from the
/// config when set, otherwise from the data.
pub fn plot_generic<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    series: &[Series],
    cfg: &PlotConfig,
) -> Result<(), DrawError> {
    let (x_min, x_max) = match cfg.x_limits {
        Some(limits) => limits,
        None => data_range(series.iter().flat_map(|s| s.x.iter().copied())),
    };
    let (y_min, y_max) = match cfg.y_limits {
        Some(limits) => limits,
        None => data_range(series.iter().flat_map(|s| s.y.iter().copied())),
    };

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50);
    if let Some(title) = &cfg.title {
        builder.caption(title, ("sans-serif", 24));
    }
    let mut chart = builder
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| DrawError::Draw(e.to_string()))?;

    let mut mesh = chart.configure_mesh();
    if let Some(x_label) = &cfg.x_label {
        mesh.x_desc(x_label.as_str());
    }
    if let Some(y_label) = &cfg.y_label {
        mesh.y_desc(y_label.as_str());
    }
    mesh.draw().map_err(|e| DrawError::Draw(e.to_string()))?;

    let mut any_label = false;
    for (i, s) in series.iter().enumerate() {
        let colour = Palette99::pick(i).to_rgba();
        let points = s.x.iter().copied().zip(s.y.iter().copied());
        let annotation = match s.marker {
            Marker::Line => chart
                .draw_series(LineSeries::new(points, &colour))
                .map_err(|e| DrawError::Draw(e.to_string()))?,
            Marker::Point => chart
                .draw_series(points.map(|xy| Circle::new(xy, 2, colour.filled())))
                .map_err(|e| DrawError::Draw(e.to_string()))?,
        };
        if let Some(label) = &s.label {
            any_label = true;
            let style = ShapeStyle::from(&colour);
            annotation.label(label.as_str()).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], style)
            });
        }
    }

    if any_label {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(|e| DrawError::Draw(e.to_string()))?;
    }

    draw_annotations(area, &cfg.annotations)
}

/// Draw `series` into a PNG at `path`.
pub fn plot_generic_to_file<T: AsRef<Path>>(
    path: T,
    series: &[Series],
    cfg: &PlotConfig,
) -> Result<(), DrawError> {
    let area = BitMapBackend::new(path.as_ref(), (FIG_X_PIXELS, FIG_Y_PIXELS))
        .into_drawing_area();
    area.fill(&WHITE).map_err(|e| DrawError::Draw(e.to_string()))?;
    plot_generic(&area, series, cfg)?;
    area.present().map_err(|e| DrawError::Draw(e.to_string()))
}

/// Free text at figure-fraction coordinates of `area`.
pub(crate) fn draw_annotations<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    annotations: &[(f64, f64, String)],
) -> Result<(), DrawError> {
    let (width, height) = area.dim_in_pixel();
    for (fx, fy, text) in annotations {
        let px = (fx * width as f64) as i32;
        let py = ((1.0 - fy) * height as f64) as i32;
        area.draw_text(text, &("sans-serif", 16).into_font().color(&BLACK), (px, py))
            .map_err(|e| DrawError::Draw(e.to_string()))?;
    }
    Ok(())
}

/// The finite min/max of `values`, widened when degenerate so the result
/// can always be used as an axis range.
pub(crate) fn data_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    use itertools::MinMaxResult;

    let (min, max) = match values.filter(|v| v.is_finite()).minmax() {
        MinMaxResult::NoElements => (0.0, 1.0),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    if (max - min).abs() < f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn test_db() {
        // 10 * log10(1e-20) with the floor.
        assert_abs_diff_eq!(db(0.0), -200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(db(1.0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(db(100.0), 20.0, epsilon = 1e-9);
        // Monotone in |x|, symmetric in sign.
        assert!(db(0.1) < db(1.0));
        assert!(db(1.0) < db(10.0));
        assert_abs_diff_eq!(db(-2.0), db(2.0));
    }

    #[test]
    fn test_data_range() {
        assert_eq!(data_range(vec![3.0, -1.0, 2.0].into_iter()), (-1.0, 3.0));
        // NaNs and infinities are ignored.
        assert_eq!(
            data_range(vec![f64::NAN, 5.0, f64::INFINITY, 4.0].into_iter()),
            (4.0, 5.0)
        );
        // Degenerate inputs still give a usable range.
        assert_eq!(data_range(std::iter::empty()), (0.0, 1.0));
        assert_eq!(data_range(vec![2.0, 2.0].into_iter()), (1.5, 2.5));
    }

    #[test]
    fn test_plot_generic_draws_something() {
        let x: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> = x.iter().map(|x| x.sin()).collect();
        let mut series = Series::line(x.clone(), y);
        series.label = Some("sin".to_string());
        let cos = Series {
            x: x.clone(),
            y: x.iter().map(|x| x.cos()).collect(),
            marker: Marker::Point,
            label: Some("cos".to_string()),
        };
        let cfg = PlotConfig {
            title: Some("trig".to_string()),
            x_label: Some("x".to_string()),
            y_label: Some("y".to_string()),
            annotations: vec![(0.1, 0.9, "note".to_string())],
            ..Default::default()
        };

        let mut buf = vec![0_u8; (FIG_X_PIXELS * FIG_Y_PIXELS * 3) as usize];
        {
            let area = BitMapBackend::with_buffer(&mut buf, (FIG_X_PIXELS, FIG_Y_PIXELS))
                .into_drawing_area();
            area.fill(&WHITE).unwrap();
            plot_generic(&area, &[series, cos], &cfg).unwrap();
            area.present().unwrap();
        }
        // Something other than the white background got drawn.
        assert!(buf.iter().any(|&b| b != 255));
    }

    #[test]
    fn test_plot_generic_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generic.png");
        let series = Series::line(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 4.0]);
        plot_generic_to_file(&path, &[series], &PlotConfig::default()).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
