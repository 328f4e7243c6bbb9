// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
 * Reading of raw voltage file headers.
 *
 * A raw header is a sequence of 80-byte ASCII records, each `KEYWORD =
 * value`, terminated by a record beginning with END. String values are
 * single-quoted and space-padded; numeric values are plain literals. On
 * disk the whole header is padded out to a multiple of 512 bytes.
 */

use std::fs::File;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;

use super::error::RawError;

/// Length of one serialised header record [bytes].
pub const RECORD_LEN: usize = 80;

/// Headers are padded out to a multiple of this length [bytes].
pub const HEADER_ALIGN: u64 = 512;

/// The key/value entries of a raw file header, in file order.
#[derive(Clone, Debug)]
pub struct RawHeader {
    entries: IndexMap<String, String>,
}

impl RawHeader {
    /// Read the header at the start of `file`. Quotes and padding are
    /// stripped from the values; no type conversion is done here.
    pub fn read<T: AsRef<Path>>(file: T) -> Result<RawHeader, RawError> {
        let path = file.as_ref();
        let mut f = File::open(path)?;
        let mut entries = IndexMap::new();
        let mut record = [0_u8; RECORD_LEN];
        loop {
            if let Err(e) = f.read_exact(&mut record) {
                return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    RawError::UnterminatedHeader(path.to_path_buf())
                } else {
                    RawError::from(e)
                });
            }
            let text = String::from_utf8_lossy(&record);
            if text.starts_with("END") {
                break;
            }
            let (key, value) = match text.find('=') {
                Some(i) => (text[..i].trim(), text[i + 1..].trim()),
                None => return Err(RawError::BadRecord(text.trim_end().to_string())),
            };
            entries.insert(
                key.to_string(),
                value.trim_matches('\'').trim().to_string(),
            );
        }
        Ok(RawHeader { entries })
    }

    /// The number of key/value entries. The END record is not counted.
    pub fn n_entries(&self) -> usize {
        self.entries.len()
    }

    /// The length of the header on disk: the smallest multiple of 512
    /// bytes holding every record plus the END record.
    pub fn padded_len(&self) -> u64 {
        let bytes = (RECORD_LEN * (self.entries.len() + 1)) as u64;
        (bytes + HEADER_ALIGN - 1) / HEADER_ALIGN * HEADER_ALIGN
    }

    /// Get a raw value string, if the keyword is present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|v| v.as_str())
    }

    pub fn get_str(&self, key: &str) -> Result<&str, RawError> {
        self.get(key)
            .ok_or_else(|| RawError::MissingKey(key.to_string()))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, RawError> {
        let value = self.get_str(key)?;
        value.parse().map_err(|_| RawError::BadValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a float",
        })
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, RawError> {
        let value = self.get_str(key)?;
        value.parse().map_err(|_| RawError::BadValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "an integer",
        })
    }

    pub fn get_u64(&self, key: &str) -> Result<u64, RawError> {
        let value = self.get_str(key)?;
        value.parse().map_err(|_| RawError::BadValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a non-negative integer",
        })
    }

    /// The number of antennas. Headers written before multi-antenna
    /// recorders existed have no NANTS keyword; its absence means 1.
    pub fn n_antennas(&self) -> Result<u64, RawError> {
        match self.get("NANTS") {
            Some(_) => self.get_u64("NANTS"),
            None => Ok(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_header(file: &mut impl Write, entries: &[(&str, &str)]) {
        let mut buf = Vec::new();
        for (key, value) in entries {
            let record = format!("{:<8}= {}", key, value);
            assert!(record.len() <= RECORD_LEN);
            buf.extend_from_slice(record.as_bytes());
            buf.resize(buf.len() + RECORD_LEN - record.len(), b' ');
        }
        buf.extend_from_slice(b"END");
        buf.resize(buf.len() + RECORD_LEN - 3, b' ');
        let padded = (buf.len() as u64 + HEADER_ALIGN - 1) / HEADER_ALIGN * HEADER_ALIGN;
        buf.resize(padded as usize, b' ');
        file.write_all(&buf).unwrap();
    }

    #[test]
    fn test_read_header() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write_header(
            &mut f,
            &[
                ("TELESCOP", "'GBT     '"),
                ("SRC_NAME", "'KEPLER-160'"),
                ("OBSFREQ", "845.21484375"),
                ("STT_IMJD", "59103"),
                ("BLOCSIZE", "131072"),
            ],
        );
        f.flush().unwrap();

        let header = RawHeader::read(f.path()).unwrap();
        assert_eq!(header.n_entries(), 5);
        // Quotes and padding are stripped.
        assert_eq!(header.get_str("TELESCOP").unwrap(), "GBT");
        assert_eq!(header.get_str("SRC_NAME").unwrap(), "KEPLER-160");
        assert_eq!(header.get_f64("OBSFREQ").unwrap(), 845.21484375);
        assert_eq!(header.get_i64("STT_IMJD").unwrap(), 59103);
        assert_eq!(header.get_u64("BLOCSIZE").unwrap(), 131072);
        // 6 records of 80 bytes round up to one 512-byte unit.
        assert_eq!(header.padded_len(), 512);
    }

    #[test]
    fn test_padded_len_spans_units() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        // 6 entries + END = 560 bytes, which needs two 512-byte units.
        let entries: Vec<(String, String)> =
            (0..6).map(|i| (format!("KEY{}", i), format!("{}", i))).collect();
        let entries: Vec<(&str, &str)> = entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        write_header(&mut f, &entries);
        f.flush().unwrap();

        let header = RawHeader::read(f.path()).unwrap();
        assert_eq!(header.n_entries(), 6);
        assert_eq!(header.padded_len(), 1024);
    }

    #[test]
    fn test_missing_and_bad_keys() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write_header(&mut f, &[("NBITS", "8"), ("DAQPULSE", "'Thu Sep 10 20:33:03 2020'")]);
        f.flush().unwrap();

        let header = RawHeader::read(f.path()).unwrap();
        match header.get_f64("OBSFREQ") {
            Err(RawError::MissingKey(key)) => assert_eq!(key, "OBSFREQ"),
            other => panic!("Expected MissingKey, got {:?}", other),
        }
        match header.get_u64("DAQPULSE") {
            Err(RawError::BadValue { key, .. }) => assert_eq!(key, "DAQPULSE"),
            other => panic!("Expected BadValue, got {:?}", other),
        }
    }

    #[test]
    fn test_nants_defaults_to_one() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write_header(&mut f, &[("NBITS", "8")]);
        f.flush().unwrap();
        let header = RawHeader::read(f.path()).unwrap();
        assert_eq!(header.n_antennas().unwrap(), 1);

        let mut f = tempfile::NamedTempFile::new().unwrap();
        write_header(&mut f, &[("NANTS", "64")]);
        f.flush().unwrap();
        let header = RawHeader::read(f.path()).unwrap();
        assert_eq!(header.n_antennas().unwrap(), 64);
    }

    #[test]
    fn test_unterminated_header() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        // One valid record, then EOF with no END.
        let record = format!("{:<8}= {:<70}", "NBITS", "8");
        f.write_all(record.as_bytes()).unwrap();
        f.flush().unwrap();

        match RawHeader::read(f.path()) {
            Err(RawError::UnterminatedHeader(_)) => (),
            other => panic!("Expected UnterminatedHeader, got {:?}", other),
        }
    }
}
