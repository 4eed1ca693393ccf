//! Error types for the wvwlink engine.
//!
//! Each domain owns a small `thiserror` enum and [`Error`] aggregates them so components can
//! propagate with `?`. Account API failures carry an [`account::ErrorKind`] which decides
//! whether a key is revoked, retried or left alone.

pub mod account;
pub mod config;
pub mod key;
pub mod platform;
pub mod policy;
pub mod retry;
pub mod store;
pub mod worker;

use thiserror::Error;

use crate::server::error::{
    account::AccountError, config::ConfigError, key::KeyError, platform::PlatformError,
    policy::PolicyError, store::StoreError, worker::WorkerError,
};

/// Main error type for the wvwlink engine.
///
/// # Error Categories
/// - Configuration errors (missing/invalid environment variables)
/// - Account API errors (credential, transient and parse failures)
/// - Key registration errors (token naming, permissions, account uniqueness)
/// - Group policy errors (missing target realm or owner account)
/// - Group platform and store errors
/// - Worker queue and schema migration errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing or invalid environment variables).
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    /// Account API error, see [`AccountError::kind`].
    #[error(transparent)]
    AccountError(#[from] AccountError),
    /// Key registration was refused.
    #[error(transparent)]
    KeyError(#[from] KeyError),
    /// A group policy cannot be evaluated as configured.
    #[error(transparent)]
    PolicyError(#[from] PolicyError),
    /// Group platform request failed.
    #[error(transparent)]
    PlatformError(#[from] PlatformError),
    /// Persistent store error.
    #[error(transparent)]
    StoreError(#[from] StoreError),
    /// Worker queue error.
    #[error(transparent)]
    WorkerError(#[from] WorkerError),
    /// Schema migration failed; the process must not start.
    #[error(transparent)]
    MigrationError(#[from] migration::MigrationError),
    /// No consistent realm topology could be built.
    #[error("Realm topology is unavailable after {0} attempts")]
    TopologyUnavailable(u32),
    /// Parse error (failed to parse a value from string or other format).
    #[error("Failed to parse value: {0:?}")]
    ParseError(String),
    /// Internal error indicating a bug in wvwlink's code.
    #[error("Internal error with wvwlink's code, this indicates a bug: {0:?}")]
    InternalError(String),
}
