//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout romkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Detection never surfaces these: a format that fails to parse is simply
/// not selected. They are returned by the lazy loaders of a handler that
/// did validate, and never invalidate the handler itself.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The handler has no open file to read from.
    #[error("file is not open")]
    NotOpen,
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
    /// A declared region extends past the end of the file.
    #[error("unexpected end of file")]
    Truncated,
    /// A magic/signature field did not match the expected value.
    #[error("bad magic value")]
    BadMagic,
    /// A format version is present in the data but not supported.
    #[error("unsupported version: {0:#x}")]
    UnsupportedVersion(u32),
    /// A declared length or count exceeds its sanity ceiling.
    #[error("{what} size {size} is out of range (max {max})")]
    OutOfRange {
        /// Which structure declared the size.
        what: &'static str,
        /// Declared size.
        size: u64,
        /// Ceiling that was exceeded.
        max: u64,
    },
    /// No catalog entry matched the file.
    #[error("unsupported file format")]
    UnsupportedFormat,
    /// A text field could not be decoded.
    #[error("unknown text encoding")]
    UnknownEncoding,
    /// The requested item does not apply to this format.
    #[error("not applicable to this format")]
    NotApplicable,
    /// A structural constraint was violated (message describes which one).
    #[error("parse error: {0}")]
    Parse(&'static str),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated
        } else {
            Error::Io(e)
        }
    }
}

impl Error {
    pub(crate) fn out_of_range(what: &'static str, size: u64, max: u64) -> Self {
        Error::OutOfRange { what, size, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_maps_to_truncated() {
        let e: Error = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(e, Error::Truncated));

        let e: Error = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(e, Error::Io(_)));
    }

    #[test]
    fn test_display() {
        let e = Error::out_of_range("string table", 2 << 20, 1 << 20);
        assert_eq!(
            e.to_string(),
            "string table size 2097152 is out of range (max 1048576)"
        );
    }
}
