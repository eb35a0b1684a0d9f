//! Error types for the certificate authority and store.

use thiserror::Error;

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CertError>;

/// Failure kinds a caller of this crate needs to distinguish, per the
/// error-handling policy: initialization errors are fatal, `add_cert_file`
/// errors are local to the operator flag being processed, and `get_cert`
/// never produces one (a signing failure there is a bug, not an error).
#[derive(Error, Debug)]
pub enum CertError {
    /// Missing confdir, unreadable file, or any other filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying OpenSSL failure: malformed PEM/DER, bad extension, failed
    /// signing operation, and so on.
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    /// A PEM blob didn't contain what the caller expected (e.g. no
    /// certificate at all, or an unrecognized key type).
    #[error("failed to parse {0}")]
    Parse(String),

    /// An operator-supplied certificate and private key have different
    /// public keys.
    #[error("certificate and private key do not match")]
    KeyMismatch,

    /// The private key is encrypted and the supplied passphrase (if any)
    /// does not decrypt it.
    #[error("incorrect or missing passphrase for encrypted private key")]
    BadPassphrase,

    /// The DH parameter file exists but could not be parsed.
    #[error("invalid DH parameters: {0}")]
    DhParam(String),
}
