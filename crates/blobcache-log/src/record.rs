//! Fixed-width record appends shared by the index and manifest logs.
//!
//! Both logs keep their body a syntactically valid JSON array: each append
//! overwrites the trailing `]`, writes an optional `,\n` separator plus one
//! padded JSON object, and re-appends the `]`. Records are padded with `#`
//! to a fixed width so that file size is a reliable multiple of the record
//! count; the first record omits the separator and is two bytes shorter.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{LogError, LogResult};

/// Padding needed to bring a serialized record of `base_len` bytes (with an
/// empty padding field) up to `width` including the two separator bytes.
pub(crate) fn padding_for(base_len: usize, width: usize) -> LogResult<String> {
    let pad = (width - 2)
        .checked_sub(base_len)
        .ok_or(LogError::RecordTooLarge(base_len))?;
    Ok("#".repeat(pad))
}

/// Append one padded record, keeping the closing `]` in place. Returns the
/// record bytes written (excluding the re-appended `]`).
///
/// A width mismatch after the write means the file is no longer parsable and
/// is reported as corruption, not a recoverable error.
pub(crate) fn append_record(
    path: &Path,
    record_json: &str,
    first: bool,
    width: usize,
) -> LogResult<u64> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::End(-1))?;

    let mut buf = Vec::with_capacity(width + 1);
    if !first {
        buf.extend_from_slice(b",\n");
    }
    buf.extend_from_slice(record_json.as_bytes());
    buf.push(b']');
    file.write_all(&buf)?;

    let written = (buf.len() - 1) as u64;
    let expected = if first { width as u64 - 2 } else { width as u64 };
    if written != expected {
        return Err(LogError::corrupt(
            path,
            format!("fixed-width record wrote {written} bytes, expected {expected}"),
        ));
    }
    Ok(written)
}
