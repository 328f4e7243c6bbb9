// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use structopt::StructOpt;

use quoll::raw::RunParams;

/// Scan a group of raw voltage files named <stem>.NNNN.raw (indices
/// contiguous from 0000) and print the observation run parameters derived
/// from the first file's header. Set RUST_LOG=debug to see the per-file
/// scan.
#[derive(StructOpt, Debug)]
#[structopt(name = "raw-info")]
struct Opts {
    /// The file stem shared by the group.
    stem: String,

    /// The directory containing the raw files.
    #[structopt(short, long, default_value = ".")]
    dir: PathBuf,

    /// The fine FFT size applied to each coarse channel.
    #[structopt(short, long, default_value = "1024")]
    fine_fft_size: usize,

    /// The number of fine spectra averaged per short-term integration.
    #[structopt(short, long, default_value = "16")]
    n_sti: usize,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let opts = Opts::from_args();

    let params = RunParams::derive(&opts.dir, &opts.stem, opts.fine_fft_size, opts.n_sti)?;
    println!("{}", params);

    Ok(())
}
