//! Configuration loaded from `.lockbox.toml`.

pub mod settings;

pub use settings::{ExternalSettings, LocalSettings, LocalSourceKind, ProviderKind, Settings};
