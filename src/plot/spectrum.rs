// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
 * Spectrum and spectrogram layouts for filterbank data.
 */

use std::path::Path;

use ndarray::prelude::*;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::{
    data_range, db, plot_generic, DrawError, PlotConfig, Series, FIG_X_PIXELS, FIG_Y_PIXELS,
};
use crate::waterfall::Waterfall;

/// Options shared by the spectrum and spectrogram layouts.
#[derive(Clone, Debug, Default)]
pub struct SpectrumOptions {
    /// Frequency window [MHz]. The full loaded range when absent.
    pub f_limits: Option<(f64, f64)>,
    /// y-axis limits: dB for the dB layouts, linear power otherwise.
    pub power_limits: Option<(f64, f64)>,
    pub title: Option<String>,
    /// Free text at figure-fraction coordinates.
    pub annotations: Vec<(f64, f64, String)>,
    /// Plot the frequency axis as kHz offset from the window midpoint.
    pub rel_freq: bool,
}

/// The window of `wf` selected by `f_limits`, in file channel order.
fn windowed_data(wf: &Waterfall, f_limits: Option<(f64, f64)>) -> (Vec<f64>, Array2<f32>) {
    match f_limits {
        Some((f_start, f_stop)) => wf.grab_data(f_start, f_stop),
        None => wf.all_data(),
    }
}

/// Time-average the window of `wf`, in ascending frequency order, and
/// report the frequency limits the x axis should span [MHz].
fn windowed_spectrum(
    wf: &Waterfall,
    f_limits: Option<(f64, f64)>,
    logged: bool,
) -> (Vec<f64>, Vec<f64>, (f64, f64)) {
    let (mut freqs, mut spectrum) = match f_limits {
        Some((f_start, f_stop)) => {
            let (freqs, data) = wf.grab_data(f_start, f_stop);
            let spectrum = match data.mean_axis(Axis(0)) {
                Some(mean) => mean.iter().map(|&x| x as f64).collect(),
                None => Vec::new(),
            };
            (freqs, spectrum)
        }
        None => (wf.freqs(), wf.mean_spectrum()),
    };
    if logged {
        for value in spectrum.iter_mut() {
            *value = db(*value);
        }
    }
    // Ascending frequency for all plots.
    if wf.header.foff < 0.0 {
        freqs.reverse();
        spectrum.reverse();
    }
    let window = match f_limits {
        Some(limits) => limits,
        None => (
            freqs.first().copied().unwrap_or(0.0),
            freqs.last().copied().unwrap_or(1.0),
        ),
    };
    (freqs, spectrum, window)
}

fn plot_psd<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    wf: &Waterfall,
    opts: &SpectrumOptions,
    logged: bool,
) -> Result<(), DrawError> {
    let (mut freqs, spectrum, window) = windowed_spectrum(wf, opts.f_limits, logged);
    let f_mid = (window.0 + window.1) / 2.0;
    let (x_limits, x_label) = if opts.rel_freq {
        for f in freqs.iter_mut() {
            *f = (*f - f_mid) * 1e3;
        }
        (
            ((window.0 - f_mid) * 1e3, (window.1 - f_mid) * 1e3),
            format!("Frequency (kHz) offset from {:.6} MHz", f_mid),
        )
    } else {
        (window, "Frequency (MHz)".to_string())
    };

    let cfg = PlotConfig {
        title: opts.title.clone(),
        x_label: Some(x_label),
        y_label: Some(
            if logged {
                "Spectrum Level (dB)"
            } else {
                "Spectrum Power Level (linear)"
            }
            .to_string(),
        ),
        x_limits: Some(x_limits),
        y_limits: opts.power_limits,
        annotations: opts.annotations.clone(),
    };
    plot_generic(area, &[Series::line(freqs, spectrum)], &cfg)
}

/// Draw the time-averaged dB power spectrum of `wf` on `area`.
pub fn plot_psd_db<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    wf: &Waterfall,
    opts: &SpectrumOptions,
) -> Result<(), DrawError> {
    plot_psd(area, wf, opts, true)
}

/// Draw the time-averaged linear power spectrum of `wf` on `area`.
pub fn plot_psd_linear<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    wf: &Waterfall,
    opts: &SpectrumOptions,
) -> Result<(), DrawError> {
    plot_psd(area, wf, opts, false)
}

/// Draw the spectrogram of `wf` on `area`: frequency across, time up,
/// dB-scaled and min/max-normalised through the viridis colormap.
pub fn plot_waterfall<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    wf: &Waterfall,
    opts: &SpectrumOptions,
) -> Result<(), DrawError> {
    let (mut freqs, mut data) = windowed_data(wf, opts.f_limits);
    if wf.header.foff < 0.0 {
        freqs.reverse();
        data.invert_axis(Axis(1));
    }

    let scaled = data.mapv(|x| db(x as f64));
    let (db_min, db_max) = data_range(scaled.iter().copied());

    let (f_lo, f_hi) = data_range(freqs.iter().copied());
    let t_span = scaled.nrows() as f64 * wf.header.tsamp;
    let chan_width = if freqs.len() > 1 {
        freqs[1] - freqs[0]
    } else {
        f_hi - f_lo
    };

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50);
    if let Some(title) = &opts.title {
        builder.caption(title, ("sans-serif", 24));
    }
    let mut chart = builder
        .build_cartesian_2d(f_lo..f_hi, 0.0..t_span)
        .map_err(|e| DrawError::Draw(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Frequency (MHz)")
        .y_desc("Time (s)")
        .draw()
        .map_err(|e| DrawError::Draw(e.to_string()))?;

    let tsamp = wf.header.tsamp;
    chart
        .draw_series(scaled.indexed_iter().map(|((row, col), &value)| {
            let t0 = row as f64 * tsamp;
            let f0 = freqs[col];
            let colour = viridis((value - db_min) / (db_max - db_min));
            Rectangle::new(
                [(f0, t0), (f0 + chan_width, t0 + tsamp)],
                colour.filled(),
            )
        }))
        .map_err(|e| DrawError::Draw(e.to_string()))?;

    Ok(())
}

/// Draw the dB spectrum stacked above the spectrogram, sharing one
/// frequency window.
pub fn plot_psd_sg<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    wf: &Waterfall,
    opts: &SpectrumOptions,
) -> Result<(), DrawError> {
    let panels = area.split_evenly((2, 1));
    plot_psd_db(&panels[0], wf, opts)?;
    // The title and annotations go on the top panel only.
    let sg_opts = SpectrumOptions {
        title: None,
        annotations: Vec::new(),
        ..opts.clone()
    };
    plot_waterfall(&panels[1], wf, &sg_opts)
}

macro_rules! to_file {
    ($name:ident, $draw:ident, $doc:literal) => {
        #[doc = $doc]
        pub fn $name<T: AsRef<Path>>(
            path: T,
            wf: &Waterfall,
            opts: &SpectrumOptions,
        ) -> Result<(), DrawError> {
            let area = BitMapBackend::new(path.as_ref(), (FIG_X_PIXELS, FIG_Y_PIXELS))
                .into_drawing_area();
            area.fill(&WHITE).map_err(|e| DrawError::Draw(e.to_string()))?;
            $draw(&area, wf, opts)?;
            area.present().map_err(|e| DrawError::Draw(e.to_string()))
        }
    };
}

to_file!(plot_psd_db_to_file, plot_psd_db, "Render the dB power spectrum to a PNG at `path`.");
to_file!(
    plot_psd_linear_to_file,
    plot_psd_linear,
    "Render the linear power spectrum to a PNG at `path`."
);
to_file!(plot_waterfall_to_file, plot_waterfall, "Render the spectrogram to a PNG at `path`.");
to_file!(
    plot_psd_sg_to_file,
    plot_psd_sg,
    "Render the spectrum-over-spectrogram panel to a PNG at `path`."
);

/// Polynomial approximation of the viridis colormap over [0, 1].
fn viridis(t: f64) -> RGBColor {
    let t = t.max(0.0).min(1.0);
    let r = (0.267 + t * (0.329 + t * (1.451 + t * (-1.808 + t * 0.758)))).max(0.0).min(1.0);
    let g = (0.004 + t * (1.513 + t * (-0.838 + t * (0.731 - t * 0.466)))).max(0.0).min(1.0);
    let b = (0.329 + t * (1.442 + t * (-2.642 + t * (1.963 - t * 0.440)))).max(0.0).min(1.0);
    RGBColor((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    use crate::waterfall::FilHeader;

    /// 4 channels from 1500 MHz descending; per-channel power is the
    /// file channel index, constant over 3 time steps.
    fn test_waterfall() -> Waterfall {
        let header = FilHeader {
            fch1: 1500.0,
            foff: -1.0,
            tsamp: 0.5,
            nchans: 4,
            tstart: 59103.0,
            source_name: None,
        };
        Waterfall::from_parts(header, Array2::from_shape_fn((3, 4), |(_, c)| c as f32))
    }

    #[test]
    fn test_windowed_spectrum_ascending() {
        let wf = test_waterfall();
        let (freqs, spectrum, window) = windowed_spectrum(&wf, None, false);
        // foff < 0, so the output must be reversed into ascending order.
        assert_abs_diff_eq!(freqs[0], 1497.0);
        assert_abs_diff_eq!(freqs[3], 1500.0);
        assert_abs_diff_eq!(spectrum[0], 3.0);
        assert_abs_diff_eq!(spectrum[3], 0.0);
        assert_abs_diff_eq!(window.0, 1497.0);
        assert_abs_diff_eq!(window.1, 1500.0);
    }

    #[test]
    fn test_windowed_spectrum_db() {
        let wf = test_waterfall();
        let (_, spectrum, _) = windowed_spectrum(&wf, None, true);
        // Channel 0 has zero power; with the floor that's -200 dB.
        assert_abs_diff_eq!(spectrum[3], -200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(spectrum[0], 10.0 * 3.0_f64.log10(), epsilon = 1e-9);
    }

    #[test]
    fn test_windowed_spectrum_sub_range() {
        let wf = test_waterfall();
        let (freqs, spectrum, window) = windowed_spectrum(&wf, Some((1498.0, 1499.0)), false);
        assert_eq!(freqs.len(), 2);
        assert_abs_diff_eq!(freqs[0], 1498.0);
        assert_abs_diff_eq!(freqs[1], 1499.0);
        assert_abs_diff_eq!(spectrum[0], 2.0);
        assert_abs_diff_eq!(spectrum[1], 1.0);
        // The requested limits become the axis window.
        assert_abs_diff_eq!(window.0, 1498.0);
        assert_abs_diff_eq!(window.1, 1499.0);
    }

    #[test]
    fn test_viridis_spans_colours() {
        let lo = viridis(0.0);
        let hi = viridis(1.0);
        assert_ne!((lo.0, lo.1, lo.2), (hi.0, hi.1, hi.2));
        // Out-of-range input clamps rather than wrapping.
        let over = viridis(2.0);
        assert_eq!((over.0, over.1, over.2), (hi.0, hi.1, hi.2));
    }

    #[test]
    fn test_layouts_draw() {
        let wf = test_waterfall();
        let opts = SpectrumOptions {
            title: Some("test".to_string()),
            rel_freq: true,
            ..Default::default()
        };

        macro_rules! check_draws {
            ($draw:ident) => {{
                let mut buf = vec![0_u8; (FIG_X_PIXELS * FIG_Y_PIXELS * 3) as usize];
                {
                    let area =
                        BitMapBackend::with_buffer(&mut buf, (FIG_X_PIXELS, FIG_Y_PIXELS))
                            .into_drawing_area();
                    area.fill(&WHITE).unwrap();
                    $draw(&area, &wf, &opts).unwrap();
                    area.present().unwrap();
                }
                assert!(buf.iter().any(|&b| b != 255));
            }};
        }

        check_draws!(plot_psd_db);
        check_draws!(plot_psd_linear);
        check_draws!(plot_waterfall);
        check_draws!(plot_psd_sg);
    }

    #[test]
    fn test_to_file_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let wf = test_waterfall();
        let opts = SpectrumOptions::default();

        let path = dir.path().join("psd.png");
        plot_psd_db_to_file(&path, &wf, &opts).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);

        let path = dir.path().join("combined.png");
        plot_psd_sg_to_file(&path, &wf, &opts).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
