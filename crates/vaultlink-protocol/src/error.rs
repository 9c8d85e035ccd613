use thiserror::Error;

/// Error taxonomy shared across the vault, protocol, and client crates.
///
/// `Connection` and `Timeout` are transient and safe for the caller to
/// retry; everything else is fatal to the current operation. The core
/// itself never retries.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Vault already exists at {0}; pass force to overwrite")]
    VaultExists(String),

    #[error("No vault found at {0}")]
    VaultNotFound(String),

    #[error("Relay refused to issue a challenge: {0}")]
    Challenge(String),

    #[error("Registration failed ({code}): {message}")]
    Registration { code: String, message: String },

    #[error("Alias '{0}' is already taken on this relay")]
    AliasTaken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Relay error ({code}): {message}")]
    Relay { code: String, message: String },

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// True for errors a caller may safely retry (network-level only).
    pub fn is_transient(&self) -> bool {
        matches!(self, RelayError::Connection(_) | RelayError::Timeout(_))
    }
}
