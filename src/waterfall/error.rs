// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
 * Error handling for filterbank file functions.
 */

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaterfallError {
    /// The data dataset isn't shaped like filterbank power data.
    #[error("{file}: the data dataset has {ndim} dimensions; expected 2 (time x channel) or 3 (time x pol x channel)")]
    BadShape { file: PathBuf, ndim: usize },

    /// An error associated with the hdf5 crate.
    #[error("{0}")]
    Hdf5(#[from] hdf5::Error),
}
