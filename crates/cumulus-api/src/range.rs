//! `Range` header parsing and validation.
//!
//! Parses a single `bytes=<a>-<b>` spec against a known object size.
//! Multi-range requests are not supported and fail like any other malformed
//! spec. The resolved range is valid iff `0 <= a <= b < size`.

use crate::error::ApiError;

/// A validated byte range within an object of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpRange {
    /// First byte offset (inclusive).
    pub offset: u64,
    /// Number of bytes in the range.
    pub length: u64,
    /// Total size of the object the range was resolved against.
    pub size: u64,
}

impl HttpRange {
    /// Parse a `Range` header value against the object size.
    ///
    /// Accepted forms after the `bytes=` prefix:
    ///
    /// - `a-b` -- bytes `a` through `b`, both inclusive
    /// - `a-`  -- bytes `a` through the end
    /// - `-n`  -- the last `n` bytes
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRange` [`ApiError`] for multi-range specs, any
    /// non-decimal bound, and any spec that does not resolve to
    /// `0 <= a <= b < size` (including the literal `bytes=7-6`).
    pub fn parse(header: &str, size: u64) -> Result<Self, ApiError> {
        let spec = header
            .strip_prefix("bytes=")
            .ok_or_else(ApiError::invalid_range)?;

        // Multi-range is unsupported.
        if spec.contains(',') {
            return Err(ApiError::invalid_range());
        }

        let (first, second) = spec.split_once('-').ok_or_else(ApiError::invalid_range)?;

        let (offset, end) = match (first.is_empty(), second.is_empty()) {
            // `a-b`
            (false, false) => (parse_bound(first)?, parse_bound(second)?),
            // `a-`: through the last byte.
            (false, true) => {
                let a = parse_bound(first)?;
                (a, size.saturating_sub(1))
            }
            // `-n`: the last n bytes.
            (true, false) => {
                let n = parse_bound(second)?;
                let a = size.checked_sub(n).ok_or_else(ApiError::invalid_range)?;
                (a, size.saturating_sub(1))
            }
            (true, true) => return Err(ApiError::invalid_range()),
        };

        if offset > end || end >= size {
            return Err(ApiError::invalid_range());
        }

        Ok(Self {
            offset,
            length: end - offset + 1,
            size,
        })
    }

    /// Last byte offset (inclusive).
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.length - 1
    }

    /// The `Content-Range` header value: `bytes a-b/size`.
    #[must_use]
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.offset, self.end(), self.size)
    }
}

/// Parse one decimal range bound.
fn parse_bound(s: &str) -> Result<u64, ApiError> {
    s.parse::<u64>().map_err(|_| ApiError::invalid_range())
}
