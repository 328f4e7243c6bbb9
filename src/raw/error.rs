// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
 * Error handling for raw file functions.
 */

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RawError {
    /// The file ended before an END record was seen.
    #[error("{0}: the header ended without an END record")]
    UnterminatedHeader(PathBuf),

    /// A header record that isn't END and has no '=' separator.
    #[error("Malformed header record: '{0}'")]
    BadRecord(String),

    /// A header keyword that should be present, but isn't.
    #[error("Header keyword {0} is missing")]
    MissingKey(String),

    /// A header value that couldn't be parsed as the expected type.
    #[error("Header keyword {key} has value '{value}'; expected {expected}")]
    BadValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// An IO error.
    #[error("{0}")]
    IO(#[from] std::io::Error),
}
