use thiserror::Error;

use fragments_core::{FragmentError, MediaType};

/// Errors from the conversion engine.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The pair is not in the reachability table.
    #[error("unsupported conversion from {from} to {to}")]
    Unsupported { from: MediaType, to: MediaType },

    /// A legal conversion failed on the input bytes.
    #[error("conversion failed: {0}")]
    Failed(String),
}

/// Uploaded bytes that do not match their declared type.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(String),

    #[error("declared {declared} but content is {}", .detected.as_deref().unwrap_or("not a recognized image"))]
    ImageMismatch {
        declared: MediaType,
        detected: Option<String>,
    },

    #[error("{declared} could not be decoded: {reason}")]
    UndecodableImage { declared: MediaType, reason: String },
}

impl From<ConvertError> for FragmentError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::Unsupported { from, to } => FragmentError::UnsupportedConversion {
                from: from.to_string(),
                to: to.to_string(),
            },
            ConvertError::Failed(reason) => FragmentError::Conversion(reason),
        }
    }
}

impl From<ValidationError> for FragmentError {
    fn from(err: ValidationError) -> Self {
        FragmentError::ContentMismatch(err.to_string())
    }
}
