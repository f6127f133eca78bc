/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 02/10/2026
Last Modified: 14/10/2026
License: MIT
*/

//! Error types shared by the Shapefile codecs, the spatial index and the provider.

use std::io;
use thiserror::Error;

/// Errors raised while reading, writing or querying a Shapefile.
#[derive(Error, Debug)]
pub enum ShapeError {
    /// The file is missing, has the wrong magic code, or a side-car is malformed.
    #[error("Shapefile is invalid: {0}")]
    ShapeFileIsInvalid(String),

    /// A record is structurally inconsistent (bad part indices, length mismatch).
    #[error("Shapefile is corrupt: {0}")]
    ShapeFileCorrupt(String),

    /// Z/M shape types and unrecognized shape codes.
    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),

    /// A persisted index was written by an incompatible version; rebuild it.
    #[error("Obsolete index file format: {0}")]
    ObsoleteIndexFileFormat(String),

    /// A persisted spatial index failed its structural checks; rebuild it.
    #[error("Spatial index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("The operation is not valid while the provider is closed")]
    InvalidOperationInClosedState,

    #[error("A data reader is already active on this provider")]
    ConcurrentReaderActive,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The stream ended before a fixed-size field was fully read.
    #[error("Truncated data: {0}")]
    TruncatedData(String),

    #[error("Feature {0} was not found")]
    FeatureNotFound(u32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(io::Error),
}

impl ShapeError {
    /// True for errors the provider heals by discarding and rebuilding an index.
    pub fn is_recoverable_index_error(&self) -> bool {
        matches!(
            self,
            ShapeError::ObsoleteIndexFileFormat(_) | ShapeError::IndexCorrupt(_)
        )
    }
}

impl From<io::Error> for ShapeError {
    fn from(err: io::Error) -> ShapeError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ShapeError::TruncatedData(err.to_string())
        } else {
            ShapeError::Io(err)
        }
    }
}

/// Result type for Shapefile operations.
pub type Result<T> = std::result::Result<T, ShapeError>;

#[cfg(test)]
mod test {
    use super::ShapeError;
    use std::io;

    #[test]
    fn test_eof_maps_to_truncated_data() {
        let err: ShapeError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, ShapeError::TruncatedData(_)));

        let err: ShapeError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ShapeError::Io(_)));
    }

    #[test]
    fn test_recoverable_index_errors() {
        assert!(ShapeError::IndexCorrupt("x".to_string()).is_recoverable_index_error());
        assert!(ShapeError::ObsoleteIndexFileFormat("x".to_string()).is_recoverable_index_error());
        assert!(!ShapeError::ShapeFileCorrupt("x".to_string()).is_recoverable_index_error());
    }
}
