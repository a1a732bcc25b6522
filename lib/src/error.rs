//! Error taxonomy for the feature pipeline

use thiserror::Error;

/// Errors raised by the analysis, feature and reconstruction stages
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Arrays with mismatched or unsupported shapes
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
    /// The forward or inverse transform could not run
    #[error("Transform failure: {0}")]
    Transform(String),
    /// A parameter was rejected at call time
    #[error("Invalid parameter: {0}")]
    Parameter(String),
    /// Writing an output file failed
    #[error("I/O failure: {0}")]
    Io(String),
}

impl Error {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Error::InvalidShape(msg.into())
    }

    pub(crate) fn transform(msg: impl Into<String>) -> Self {
        Error::Transform(msg.into())
    }

    pub(crate) fn parameter(msg: impl Into<String>) -> Self {
        Error::Parameter(msg.into())
    }

    #[cfg(feature = "image")]
    pub(crate) fn io(msg: impl Into<String>) -> Self {
        Error::Io(msg.into())
    }
}
