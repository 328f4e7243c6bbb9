// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
 * Error handling for plotting functions.
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrawError {
    /// An error from the plotters library while building or drawing a
    /// chart. Plotters errors are generic over the backend, so only the
    /// rendered message is kept.
    #[error("Error from the plotters library: {0}")]
    Draw(String),

    /// An IO error.
    #[error("{0}")]
    IO(#[from] std::io::Error),
}
