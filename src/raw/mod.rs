// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
 * Raw voltage file groups and the observation parameters derived from
 * their headers.
 */

pub mod error;
pub mod header;

pub use error::RawError;
pub use header::RawHeader;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use hifitime::Epoch;
use log::{debug, warn};

/// The path of the `i`th file of the group with `stem` in `dir`.
fn raw_file_path(dir: &Path, stem: &str, i: usize) -> PathBuf {
    dir.join(format!("{}.{:04}.raw", stem, i))
}

/// A contiguously numbered group of raw files sharing one header.
///
/// Files are named `<stem>.NNNN.raw` with indices starting at 0000; the
/// first missing index ends the group.
#[derive(Debug)]
pub struct RawFileGroup {
    /// The header of the `.0000.` file. The block structure of every file
    /// in the group is taken from here.
    pub header: RawHeader,
    /// The header's padded on-disk length [bytes].
    pub header_len: u64,
    /// The data block size [bytes] (BLOCSIZE).
    pub block_size: u64,
    /// The size of the `.0000.` file [bytes].
    pub base_file_size: u64,
    /// How many files the group contains.
    pub n_raw_files: usize,
    /// The total number of data blocks across the group.
    pub n_blocks: u64,
}

impl RawFileGroup {
    /// Scan `<dir>/<stem>.NNNN.raw` for indices 0, 1, 2, … until a file
    /// is missing, counting the data blocks in each file found.
    ///
    /// A file whose size leaves no room for a whole block after the
    /// header contributes zero blocks; that's worth a warning (it usually
    /// means a truncated capture) but doesn't stop the scan.
    pub fn scan(dir: &Path, stem: &str) -> Result<RawFileGroup, RawError> {
        let base_file = raw_file_path(dir, stem, 0);
        let header = RawHeader::read(&base_file)?;
        let header_len = header.padded_len();
        let block_size = header.get_u64("BLOCSIZE")?;
        let base_file_size = std::fs::metadata(&base_file)?.len();

        let mut n_raw_files = 0;
        let mut n_blocks = 0;
        for i in 0.. {
            let file = raw_file_path(dir, stem, i);
            if !file.is_file() {
                debug!(
                    "{} not found; {} file(s) in the group, {} block(s) total",
                    file.display(),
                    n_raw_files,
                    n_blocks
                );
                break;
            }
            let size = std::fs::metadata(&file)?.len();
            let blocks =
                ((size as f64 - header_len as f64) / block_size as f64).round() as i64;
            if blocks <= 0 {
                warn!(
                    "{} contains no complete blocks (size {}, header {}, block size {}); truncated capture?",
                    file.display(),
                    size,
                    header_len,
                    block_size
                );
            } else {
                n_blocks += blocks as u64;
            }
            n_raw_files = i + 1;
            debug!("{} found, {} block(s), {} total", file.display(), blocks, n_blocks);
        }

        Ok(RawFileGroup {
            header,
            header_len,
            block_size,
            base_file_size,
            n_raw_files,
            n_blocks,
        })
    }
}

/// Observation run parameters derived from a raw file group's header and
/// sizes. A computed snapshot: fully populated on construction, never
/// updated.
#[derive(Clone, Debug)]
pub struct RunParams {
    /// The file stem shared by the group.
    pub raw_file_stem: String,
    /// The directory the group was scanned in.
    pub raw_dir: PathBuf,
    /// Size of the `.0000.` file [MB].
    pub raw_size_mb: f64,
    pub n_raw_files: usize,

    /// The telescope that took the recording (TELESCOP).
    pub telescop: String,
    /// Wall-clock DAQ timestamp (DAQPULSE), local to the telescope.
    pub time_string: String,
    /// MJD day of the observation start (STT_IMJD).
    pub mjd_day: i64,
    /// The observed source (SRC_NAME).
    pub src_name: String,
    pub ra_deg: f64,
    pub dec_deg: f64,

    /// Centre frequency [MHz] (OBSFREQ).
    pub ctr_freq_mhz: f64,
    /// Observation bandwidth [MHz], negative for descending channel
    /// order (OBSBW).
    pub obs_bw_mhz: f64,
    pub obs_bw_sign: i32,
    pub f_min_mhz: f64,
    pub f_max_mhz: f64,

    /// Bits per real sample component (NBITS).
    pub n_bits: u64,
    /// Per-channel bandwidth [Hz] (CHAN_BW, scaled from MHz).
    pub chan_bw: f64,
    /// Polarisation count; a 4-element dual-pol recording collapses to 2
    /// (NPOL).
    pub n_pols: u64,
    pub n_antennas: u64,
    /// Coarse channels per antenna (OBSNCHAN / NANTS).
    pub n_coarse_channels: u64,
    /// Data block size [bytes] (BLOCSIZE).
    pub block_size: u64,

    /// Coarse sample period [s] (TBIN).
    pub t_coarse: f64,
    /// Fine sample period [s]: `t_coarse * fine_fft_size`.
    pub t_fine: f64,
    /// Output resolution period [s]: `t_fine * n_sti`.
    pub t_res: f64,
    pub fs_coarse: f64,
    pub fs_fine: f64,

    /// The caller-supplied fine FFT size. Taken on faith; not validated.
    pub fine_fft_size: usize,
    /// The caller-supplied short-term integration count. Taken on faith.
    pub n_sti: usize,

    /// Coarse samples per channel per block.
    pub samples_per_block: f64,
    /// Coarse samples per channel across the group.
    pub n_coarse_samples: f64,
    /// Fine spectra across the group: `n_coarse_samples / fine_fft_size`.
    pub n_fine_samples: f64,
    /// Long-term integration count: `⌊n_fine_samples / n_sti⌋`.
    pub n_lti: f64,
    /// Fine spectra that contribute to the averaged output:
    /// `n_lti * n_sti`.
    pub n_avg: f64,
    /// Total observation time [s]: `t_fine * n_avg`.
    pub t_obs: f64,
    pub obs_time_per_block: f64,

    /// Data blocks across the whole group.
    pub n_blocks: u64,
    /// Data blocks in the `.0000.` file alone.
    pub n_blocks_base: u64,
}

impl RunParams {
    /// Scan the raw group for `stem` in `dir` and derive the full
    /// parameter set.
    ///
    /// `fine_fft_size` and `n_sti` come from the caller's processing
    /// setup, not from the files; a zero shows up as inf/NaN in the
    /// derived chain rather than as an error.
    pub fn derive(
        dir: &Path,
        stem: &str,
        fine_fft_size: usize,
        n_sti: usize,
    ) -> Result<RunParams, RawError> {
        let group = RawFileGroup::scan(dir, stem)?;
        let header = &group.header;

        let telescop = header.get_str("TELESCOP")?.to_string();
        let time_string = header.get_str("DAQPULSE")?.to_string();
        let mjd_day = header.get_i64("STT_IMJD")?;
        let src_name = header.get_str("SRC_NAME")?.to_string();
        let ra_deg = header.get_f64("RA")?;
        let dec_deg = header.get_f64("DEC")?;

        let ctr_freq_mhz = header.get_f64("OBSFREQ")?;
        let obs_bw_mhz = header.get_f64("OBSBW")?;
        let obs_bw_sign = if obs_bw_mhz > 0.0 { 1 } else { -1 };
        let f_min_mhz = ctr_freq_mhz - obs_bw_mhz.abs() / 2.0;
        let f_max_mhz = ctr_freq_mhz + obs_bw_mhz.abs() / 2.0;

        let n_bits = header.get_u64("NBITS")?;
        let chan_bw = header.get_f64("CHAN_BW")? * 1e6;
        let n_pols = match header.get_u64("NPOL")? {
            4 => 2,
            n => n,
        };
        let n_antennas = header.n_antennas()?;
        let n_coarse_channels = header.get_u64("OBSNCHAN")? / n_antennas;

        let t_coarse = header.get_f64("TBIN")?;
        let t_fine = t_coarse * fine_fft_size as f64;
        let t_res = t_fine * n_sti as f64;
        // A complex sample is two components of n_bits each.
        let samples_per_block = group.block_size as f64
            / n_pols as f64
            / n_coarse_channels as f64
            / n_antennas as f64
            / (2.0 * n_bits as f64 / 8.0);
        let n_coarse_samples = group.n_blocks as f64 * samples_per_block;
        let n_fine_samples = n_coarse_samples / fine_fft_size as f64;
        let n_lti = (n_fine_samples / n_sti as f64).floor();
        let n_avg = n_lti * n_sti as f64;
        let t_obs = t_fine * n_avg;
        let obs_time_per_block = t_obs / group.n_blocks as f64;

        Ok(RunParams {
            raw_file_stem: stem.to_string(),
            raw_dir: dir.to_path_buf(),
            raw_size_mb: group.base_file_size as f64 / 1024.0 / 1024.0,
            n_raw_files: group.n_raw_files,
            telescop,
            time_string,
            mjd_day,
            src_name,
            ra_deg,
            dec_deg,
            ctr_freq_mhz,
            obs_bw_mhz,
            obs_bw_sign,
            f_min_mhz,
            f_max_mhz,
            n_bits,
            chan_bw,
            n_pols,
            n_antennas,
            n_coarse_channels,
            block_size: group.block_size,
            t_coarse,
            t_fine,
            t_res,
            fs_coarse: 1.0 / t_coarse,
            fs_fine: 1.0 / t_fine,
            fine_fft_size,
            n_sti,
            samples_per_block,
            n_coarse_samples,
            n_fine_samples,
            n_lti,
            n_avg,
            t_obs,
            obs_time_per_block,
            n_blocks: group.n_blocks,
            n_blocks_base: group.base_file_size.saturating_sub(group.header_len)
                / group.block_size,
        })
    }

    /// The group payload size implied by the derived sample counts [MB],
    /// excluding headers.
    pub fn expected_payload_mb(&self) -> f64 {
        self.n_antennas as f64
            * self.n_pols as f64
            * self.n_coarse_channels as f64
            * self.n_coarse_samples
            * 2.0
            / 1024.0
            / 1024.0
    }

    /// The observation start as a UTC epoch, from the MJD day field.
    pub fn start_epoch(&self) -> Epoch {
        Epoch::from_mjd_utc(self.mjd_day as f64)
    }
}

impl fmt::Display for RunParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, month, day, ..) = self.start_epoch().to_gregorian_utc();
        writeln!(
            f,
            r#"// Run parameters for {stem} in {dir}
// Generated by quoll v{version} at {now} UTC

Raw file size = {size:.0} MB, n_raw_files = {n_files}, expected payload = {expected:.0} MB excl. headers

{telescop}, {time_string}, MJD {mjd} ({year}-{month:02}-{day:02}), {src}, ra_deg = {ra:.3}, dec_deg = {dec:.3}
ctr_freq_MHz = {ctr:.3}, obs_bw_MHz = {bw}, f_min_MHz = {f_min:.3}, f_max_MHz = {f_max:.3}

t_obs = {t_obs:.3}, n_antennas = {n_ant}, n_coarse_channels = {n_chan}, n_pols = {n_pols}, n_bits = {n_bits}, chan_bw = {chan_bw:.3}
fs_coarse = {fs_coarse:.3}, fine_fft_size = {fft}, n_sti = {n_sti}, n_lti = {n_lti}, n_avg = {n_avg}
t_coarse = {t_coarse:.3e}, t_fine = {t_fine:.3e}, t_res = {t_res:.3e}
fs_fine = {fs_fine:.3}
n_coarse_samples = {n_cs}, n_fine_samples = {n_fs}
samples_per_block = {spb}, n_blocks = {n_blocks}, n_blocks_base = {n_blocks_base}, block_size = {block_size}, obs_time_per_block = {otpb:.3}"#,
            stem = self.raw_file_stem,
            dir = self.raw_dir.display(),
            version = env!("CARGO_PKG_VERSION"),
            now = Utc::now().format("%Y-%m-%d %H:%M:%S"),
            size = self.raw_size_mb,
            n_files = self.n_raw_files,
            expected = self.expected_payload_mb(),
            telescop = self.telescop,
            time_string = self.time_string,
            mjd = self.mjd_day,
            year = year,
            month = month,
            day = day,
            src = self.src_name,
            ra = self.ra_deg,
            dec = self.dec_deg,
            ctr = self.ctr_freq_mhz,
            bw = self.obs_bw_mhz,
            f_min = self.f_min_mhz,
            f_max = self.f_max_mhz,
            t_obs = self.t_obs,
            n_ant = self.n_antennas,
            n_chan = self.n_coarse_channels,
            n_pols = self.n_pols,
            n_bits = self.n_bits,
            chan_bw = self.chan_bw,
            fs_coarse = self.fs_coarse,
            fft = self.fine_fft_size,
            n_sti = self.n_sti,
            n_lti = self.n_lti,
            n_avg = self.n_avg,
            t_coarse = self.t_coarse,
            t_fine = self.t_fine,
            t_res = self.t_res,
            fs_fine = self.fs_fine,
            n_cs = self.n_coarse_samples,
            n_fs = self.n_fine_samples,
            spb = self.samples_per_block,
            n_blocks = self.n_blocks,
            n_blocks_base = self.n_blocks_base,
            block_size = self.block_size,
            otpb = self.obs_time_per_block,
        )
    }
}
