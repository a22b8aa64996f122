//! HTTP byte range handling for file resources.
//!
//! Parses the single-range forms of an RFC 7233 `Range` header value
//! (`bytes=0-1023`, `bytes=500-`, `bytes=-100`) and resolves them against the
//! size of the served file.

#![allow(clippy::module_name_repetitions)]

use thiserror::Error;

/// A byte range as written by the client. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseRangeError {
    #[error("Unsupported range unit: {0}")]
    Unit(String),
    #[error("Could not parse range value: {0}")]
    Parse(String),
    #[error("Too few range values: {0}")]
    TooFewValues(String),
    #[error("Too many range values: {0}")]
    TooManyValues(String),
    #[error("Multiple ranges are not supported: {0}")]
    MultipleRanges(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Range {start:?}-{end:?} is not satisfiable for size {size}")]
pub struct UnsatisfiableRangeError {
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub size: u64,
}

/// Parses a single range spec such as `0-1023`, `500-` or `-100`.
///
/// # Errors
///
/// * If a value is not an unsigned integer
/// * If the spec does not have exactly two `-` separated values
pub fn parse_range(range: &str) -> Result<Range, ParseRangeError> {
    let ends = range
        .trim()
        .split('-')
        .map(|x| {
            if x.is_empty() {
                Ok(None)
            } else {
                x.parse::<u64>()
                    .map(Some)
                    .map_err(|_| ParseRangeError::Parse(x.to_string()))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    match ends.as_slice() {
        [None, None] => Err(ParseRangeError::TooFewValues(range.to_string())),
        [start, end] => Ok(Range {
            start: *start,
            end: *end,
        }),
        [] | [_] => Err(ParseRangeError::TooFewValues(range.to_string())),
        _ => Err(ParseRangeError::TooManyValues(range.to_string())),
    }
}

/// Parses a `Range` header value.
///
/// # Errors
///
/// * If the unit is not `bytes`
/// * If more than one range is requested
/// * If the range spec is malformed
pub fn parse_range_header(value: &str) -> Result<Range, ParseRangeError> {
    let Some(ranges) = value.trim().strip_prefix("bytes=") else {
        return Err(ParseRangeError::Unit(value.to_string()));
    };

    if ranges.contains(',') {
        return Err(ParseRangeError::MultipleRanges(value.to_string()));
    }

    parse_range(ranges)
}

impl Range {
    /// Resolves the range to an inclusive `(first, last)` byte pair within a
    /// resource of `size` bytes.
    ///
    /// # Errors
    ///
    /// * If the range starts past the end of the resource or is inverted
    pub fn resolve(&self, size: u64) -> Result<(u64, u64), UnsatisfiableRangeError> {
        let err = || UnsatisfiableRangeError {
            start: self.start,
            end: self.end,
            size,
        };

        if size == 0 {
            return Err(err());
        }

        let last_byte = size - 1;

        let (first, last) = match (self.start, self.end) {
            (Some(start), end) => (start, end.map_or(last_byte, |x| x.min(last_byte))),
            (None, Some(suffix)) if suffix > 0 => (size.saturating_sub(suffix), last_byte),
            (None, _) => return Err(err()),
        };

        if first > last {
            return Err(err());
        }

        Ok((first, last))
    }
}
