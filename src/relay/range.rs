//! Byte-range window arithmetic for partial-content responses.

use thiserror::Error;

/// Why a `Range` header could not be turned into a window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    /// Header not in the single-range `bytes=<start>-[<end>]` form
    #[error("Malformed Range header: {0}")]
    Malformed(String),
    /// Window starts or ends beyond the object
    #[error("Range not satisfiable for object of {size} bytes")]
    Unsatisfiable {
        /// Total size of the object
        size: u64,
    },
}

/// A satisfiable byte window within a remote object.
/// Invariant: `start <= end <= total_size - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    /// First byte offset, inclusive
    pub start: u64,
    /// Last byte offset, inclusive
    pub end: u64,
    /// Total size of the object
    pub total_size: u64,
}

impl RangeWindow {
    /// Parse a single-range `bytes=<start>-[<end>]` header against an object
    /// of `size` bytes.
    ///
    /// An omitted end is defaulted to `start + chunk_size - 1`, capped at the
    /// final byte, so an open-ended request never pulls more than one chunk.
    /// A start at or past the object size is unsatisfiable; so is an explicit
    /// end past the final byte (rejected, not clamped).
    pub fn parse(header: &str, size: u64, chunk_size: u64) -> Result<Self, RangeError> {
        let malformed = || RangeError::Malformed(header.to_string());

        let spec = header.strip_prefix("bytes=").ok_or_else(malformed)?;
        let (start_str, end_str) = spec.split_once('-').ok_or_else(malformed)?;

        let start: u64 = start_str.trim().parse().map_err(|_| malformed())?;
        if start >= size {
            return Err(RangeError::Unsatisfiable { size });
        }

        // A zero chunk constant would make an open-ended range degenerate.
        let chunk_size = chunk_size.max(1);

        let end = match end_str.trim() {
            "" => (start.saturating_add(chunk_size) - 1).min(size - 1),
            explicit => {
                let end: u64 = explicit.parse().map_err(|_| malformed())?;
                if end < start {
                    return Err(malformed());
                }
                if end >= size {
                    return Err(RangeError::Unsatisfiable { size });
                }
                end
            }
        };

        Ok(Self {
            start,
            end,
            total_size: size,
        })
    }

    /// Number of bytes in the window
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a partial-content response
    #[must_use]
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}
