// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
 * Filterbank (h5) files as time-by-frequency power arrays.
 *
 * The header lives in attributes on the `data` dataset; the data itself
 * is 2-D (time x channel) or 3-D (time x pol x channel) power values.
 */

pub mod error;

pub use error::WaterfallError;

use std::path::Path;

use hdf5::File as H5File;
use ndarray::prelude::*;

/// Header metadata of a filterbank file.
#[derive(Clone, Debug)]
pub struct FilHeader {
    /// Frequency of the first channel [MHz].
    pub fch1: f64,
    /// Per-channel frequency step [MHz]; negative when channels run from
    /// high to low frequency.
    pub foff: f64,
    /// Time between successive spectra [s].
    pub tsamp: f64,
    /// Number of frequency channels in the file.
    pub nchans: usize,
    /// Observation start [MJD].
    pub tstart: f64,
    /// The observed source, when the file records one.
    pub source_name: Option<String>,
}

impl FilHeader {
    /// The frequency of channel `i` [MHz].
    pub fn channel_freq(&self, i: usize) -> f64 {
        self.fch1 + i as f64 * self.foff
    }
}

/// A filterbank file's power data with its frequency axis.
#[derive(Debug)]
pub struct Waterfall {
    pub header: FilHeader,
    /// Index of the first channel held in `data`, relative to the file.
    chan_offset: usize,
    /// Power data, time x channel, in file channel order. Files with a
    /// polarisation axis contribute polarisation 0 only.
    pub data: Array2<f32>,
}

impl Waterfall {
    /// Open a filterbank h5 file in full.
    pub fn open<T: AsRef<Path>>(file: T) -> Result<Waterfall, WaterfallError> {
        Waterfall::open_inner(file.as_ref(), None)
    }

    /// Open a filterbank h5 file, loading only the channels between
    /// `f_start` and `f_stop` [MHz]. The limits aren't validated; a
    /// window covering no channels yields an empty data array.
    pub fn open_range<T: AsRef<Path>>(
        file: T,
        f_start: f64,
        f_stop: f64,
    ) -> Result<Waterfall, WaterfallError> {
        Waterfall::open_inner(file.as_ref(), Some((f_start, f_stop)))
    }

    fn open_inner(
        file: &Path,
        f_limits: Option<(f64, f64)>,
    ) -> Result<Waterfall, WaterfallError> {
        let h5 = H5File::open(file)?;
        let dataset = h5.dataset("data")?;

        let header = FilHeader {
            fch1: dataset.attr("fch1")?.read_scalar()?,
            foff: dataset.attr("foff")?.read_scalar()?,
            tsamp: dataset.attr("tsamp")?.read_scalar()?,
            nchans: dataset.attr("nchans")?.read_scalar::<i64>()? as usize,
            tstart: dataset.attr("tstart")?.read_scalar()?,
            source_name: read_string_attr(&dataset, "source_name"),
        };

        let (i_lo, i_hi) = match f_limits {
            Some((f_start, f_stop)) => channel_window(&header, f_start, f_stop),
            None => (0, header.nchans),
        };

        let shape = dataset.shape();
        let data = match shape.len() {
            2 => dataset.read_slice_2d(s![.., i_lo..i_hi])?,
            3 => {
                let pol0: Array3<f32> = dataset.read_slice(s![.., 0..1, i_lo..i_hi])?;
                pol0.index_axis_move(Axis(1), 0)
            }
            n => {
                return Err(WaterfallError::BadShape {
                    file: file.to_path_buf(),
                    ndim: n,
                })
            }
        };

        Ok(Waterfall {
            header,
            chan_offset: i_lo,
            data,
        })
    }

    /// The frequency axis [MHz] of the channels held in `data`, in file
    /// channel order.
    pub fn freqs(&self) -> Vec<f64> {
        (0..self.data.ncols())
            .map(|i| self.header.channel_freq(self.chan_offset + i))
            .collect()
    }

    /// The (frequencies, power) selection between `f_start` and `f_stop`
    /// [MHz] of the loaded data, in file channel order.
    pub fn grab_data(&self, f_start: f64, f_stop: f64) -> (Vec<f64>, Array2<f32>) {
        let (f_lo, f_hi) = if f_start <= f_stop {
            (f_start, f_stop)
        } else {
            (f_stop, f_start)
        };
        let freqs = self.freqs();
        let selected: Vec<usize> = (0..freqs.len())
            .filter(|&i| freqs[i] >= f_lo && freqs[i] <= f_hi)
            .collect();
        match (selected.first(), selected.last()) {
            (Some(&lo), Some(&hi)) => (
                freqs[lo..=hi].to_vec(),
                self.data.slice(s![.., lo..=hi]).to_owned(),
            ),
            _ => (Vec::new(), Array2::zeros((self.data.nrows(), 0))),
        }
    }

    /// The full loaded (frequencies, power) pair.
    pub fn all_data(&self) -> (Vec<f64>, Array2<f32>) {
        (self.freqs(), self.data.clone())
    }

    /// The time-averaged power spectrum of the loaded data, per channel,
    /// in file channel order.
    pub fn mean_spectrum(&self) -> Vec<f64> {
        match self.data.mean_axis(Axis(0)) {
            Some(mean) => mean.iter().map(|&x| x as f64).collect(),
            None => Vec::new(),
        }
    }

    /// A waterfall built from parts rather than a file.
    #[cfg(test)]
    pub(crate) fn from_parts(header: FilHeader, data: Array2<f32>) -> Waterfall {
        Waterfall {
            header,
            chan_offset: 0,
            data,
        }
    }
}

fn read_string_attr(dataset: &hdf5::Dataset, name: &str) -> Option<String> {
    let attr = dataset.attr(name).ok()?;
    attr.read_scalar::<hdf5::types::VarLenUnicode>()
        .ok()
        .map(|s| s.to_string())
}

/// The channel index range `[lo, hi)` whose frequencies fall between
/// `f_start` and `f_stop` [MHz], in file channel order.
fn channel_window(header: &FilHeader, f_start: f64, f_stop: f64) -> (usize, usize) {
    let (f_lo, f_hi) = if f_start <= f_stop {
        (f_start, f_stop)
    } else {
        (f_stop, f_start)
    };
    let mut i_lo = header.nchans;
    let mut i_hi = 0;
    for i in 0..header.nchans {
        let f = header.channel_freq(i);
        if f >= f_lo && f <= f_hi {
            i_lo = i_lo.min(i);
            i_hi = i_hi.max(i + 1);
        }
    }
    if i_lo >= i_hi {
        (0, 0)
    } else {
        (i_lo, i_hi)
    }
}
