pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod logging;
pub mod provider;
pub mod store;

pub use errors::{LockboxError, Result};
pub use provider::{MasterKeyProvider, Provider};
pub use store::{KeyId, KeyMetadata, KeyStore, StoreConfig};
