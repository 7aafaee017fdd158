use thiserror::Error;

/// All errors that can occur in Lockbox.
///
/// None of these are retried internally. `KeyStore::list_keys` is the only
/// operation that downgrades a per-key failure to a logged skip.
#[derive(Debug, Error)]
pub enum LockboxError {
    // --- Startup errors ---
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Master key provider error: {0}")]
    ProviderError(String),

    // --- Key lookup and policy ---
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("Key '{0}' is disabled")]
    KeyDisabled(String),

    #[error("Invalid key id '{0}': expected a 36-character lowercase UUID")]
    InvalidKeyId(String),

    // --- Crypto errors ---
    #[error("Authentication failed: data was modified or sealed under another key")]
    AuthenticationFailed,

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Master key sources ---
    #[error("Keyfile error: {0}")]
    KeyfileError(String),

    #[error("Keyring error: {0}")]
    KeyringError(String),

    // --- Persistence ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Failed to persist key: {0}")]
    PersistenceError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for Lockbox results.
pub type Result<T> = std::result::Result<T, LockboxError>;
