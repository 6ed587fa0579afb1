//! Error type shared by the X.509 layer and the command-line workflow.

use std::path::Path;

use thiserror::Error;

/// Represents errors that can occur while issuing development certificates.
///
/// The first group mirrors the failure points of the X.509 machinery, the second group
/// the phases of the command-line workflow.
#[derive(Debug, Error)]
pub enum DevCertsError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error related to certificate operations.
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),

    /// Error from RSA PKCS1 operations.
    #[error("RSA PKCS1 error: {0}")]
    RsaPkcs1Error(String),

    /// Bad command line.
    #[error("{0}")]
    Usage(String),

    /// Arguments that parse but cannot be acted upon.
    #[error("{0}")]
    Validation(String),

    /// The resolved subject is unusable, e.g. no common name.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or terminal I/O failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed extensions file.
    #[error("Extensions file line {line}: {message}")]
    ExtensionConfig { line: usize, message: String },

    /// Trust store registration failed on every available strategy.
    #[error("Could not trust the CA certificate: {0}")]
    Trust(String),

    /// No trust store strategy exists for this operating system.
    #[error("Trusting certificates is not supported on {0}")]
    UnsupportedPlatform(String),
}

impl DevCertsError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(action: &str, path: &Path, source: std::io::Error) -> Self {
        DevCertsError::Io {
            context: format!("{action} {}", path.display()),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DevCertsError>;

impl From<der::Error> for DevCertsError {
    /// Converts a `der::Error` into a `DevCertsError`.
    fn from(err: der::Error) -> Self {
        DevCertsError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for DevCertsError {
    fn from(err: rsa::Error) -> Self {
        DevCertsError::RsaError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for DevCertsError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        DevCertsError::RsaPkcs1Error(err.to_string())
    }
}

impl From<pkcs8::Error> for DevCertsError {
    fn from(err: pkcs8::Error) -> Self {
        DevCertsError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for DevCertsError {
    fn from(err: pkcs8::spki::Error) -> Self {
        DevCertsError::EncodingError(err.to_string())
    }
}

impl From<pem::PemError> for DevCertsError {
    fn from(err: pem::PemError) -> Self {
        DevCertsError::DecodingError(err.to_string())
    }
}
