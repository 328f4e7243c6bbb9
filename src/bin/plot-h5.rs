// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use anyhow::bail;
use structopt::StructOpt;

use quoll::plot::spectrum::{self, SpectrumOptions};
use quoll::waterfall::Waterfall;

/// Render a spectrum or spectrogram layout from a filterbank h5 file to
/// a PNG.
#[derive(StructOpt, Debug)]
#[structopt(name = "plot-h5")]
struct Opts {
    /// The filterbank h5 file to plot.
    #[structopt(parse(from_os_str))]
    h5_file: PathBuf,

    /// The layout to render.
    #[structopt(
        short,
        long,
        default_value = "psd-db",
        possible_values = &["psd-db", "psd-linear", "waterfall", "psd-sg"]
    )]
    kind: String,

    /// Lower frequency limit [MHz]. Must be given with --f-stop.
    #[structopt(long)]
    f_start: Option<f64>,

    /// Upper frequency limit [MHz]. Must be given with --f-start.
    #[structopt(long)]
    f_stop: Option<f64>,

    /// Lower y-axis limit (dB for the dB layouts, linear power
    /// otherwise). Must be given with --max-power.
    #[structopt(long)]
    min_power: Option<f64>,

    /// Upper y-axis limit. Must be given with --min-power.
    #[structopt(long)]
    max_power: Option<f64>,

    /// Plot the frequency axis as kHz offset from the window midpoint.
    #[structopt(short, long)]
    rel_freq: bool,

    /// The figure title.
    #[structopt(short, long)]
    title: Option<String>,

    /// Where to write the PNG. The default is the input file name with
    /// the layout and ".png" appended.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let opts = Opts::from_args();

    let f_limits = match (opts.f_start, opts.f_stop) {
        (Some(f_start), Some(f_stop)) => Some((f_start, f_stop)),
        (None, None) => None,
        _ => bail!("--f-start and --f-stop must be given together"),
    };
    let power_limits = match (opts.min_power, opts.max_power) {
        (Some(min), Some(max)) => Some((min, max)),
        (None, None) => None,
        _ => bail!("--min-power and --max-power must be given together"),
    };

    // Restricting the frequency range at open time keeps big files out
    // of memory; the layouts then get the whole loaded window.
    let wf = match f_limits {
        Some((f_start, f_stop)) => Waterfall::open_range(&opts.h5_file, f_start, f_stop)?,
        None => Waterfall::open(&opts.h5_file)?,
    };

    let output = opts.output.clone().unwrap_or_else(|| {
        let stem = opts
            .h5_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("plot");
        PathBuf::from(format!("{}_{}.png", stem, opts.kind))
    });

    let plot_opts = SpectrumOptions {
        f_limits,
        power_limits,
        title: opts.title.clone(),
        annotations: Vec::new(),
        rel_freq: opts.rel_freq,
    };

    match opts.kind.as_str() {
        "psd-db" => spectrum::plot_psd_db_to_file(&output, &wf, &plot_opts)?,
        "psd-linear" => spectrum::plot_psd_linear_to_file(&output, &wf, &plot_opts)?,
        "waterfall" => spectrum::plot_waterfall_to_file(&output, &wf, &plot_opts)?,
        "psd-sg" => spectrum::plot_psd_sg_to_file(&output, &wf, &plot_opts)?,
        k => bail!("Unhandled layout: {}", k),
    }
    println!("Wrote {}", output.display());

    Ok(())
}
