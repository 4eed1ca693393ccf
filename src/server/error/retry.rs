use crate::server::error::{
    account::{AccountError, ErrorKind},
    store::StoreError,
    Error,
};

/// Strategy for handling errors in a retry context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorRetryStrategy {
    /// Retry with exponential backoff (upstream trouble)
    Retry,
    /// Failed permanently
    Fail,
}

/// Errors that know whether retrying them can help.
pub trait Retryable {
    fn to_retry_strategy(&self) -> ErrorRetryStrategy;
}

impl Retryable for AccountError {
    fn to_retry_strategy(&self) -> ErrorRetryStrategy {
        match self.kind() {
            // Server errors, network errors and unexpected statuses
            ErrorKind::Transient => ErrorRetryStrategy::Retry,

            // A garbled body can be an upstream hiccup as well
            ErrorKind::Parse => ErrorRetryStrategy::Retry,

            // Rejected key, retrying only confirms it
            ErrorKind::Credential => ErrorRetryStrategy::Fail,
        }
    }
}

impl Retryable for Error {
    fn to_retry_strategy(&self) -> ErrorRetryStrategy {
        match self {
            Self::AccountError(err) => err.to_retry_strategy(),

            // Connection errors - transient, should retry
            Self::StoreError(StoreError::Redis(_)) => ErrorRetryStrategy::Retry,
            Self::StoreError(StoreError::Unavailable) => ErrorRetryStrategy::Retry,

            // Corrupt documents and type mismatches won't resolve with retry
            Self::StoreError(_) => ErrorRetryStrategy::Fail,

            // Platform hiccups may resolve, refusals won't
            Self::PlatformError(crate::server::error::platform::PlatformError::Http(_)) => {
                ErrorRetryStrategy::Retry
            }
            Self::PlatformError(_) => ErrorRetryStrategy::Fail,

            Self::TopologyUnavailable(_) => ErrorRetryStrategy::Retry,

            // Configuration, registration and policy errors need a human
            Self::ConfigError(_) => ErrorRetryStrategy::Fail,
            Self::KeyError(_) => ErrorRetryStrategy::Fail,
            Self::PolicyError(_) => ErrorRetryStrategy::Fail,

            Self::WorkerError(_) => ErrorRetryStrategy::Fail,
            Self::MigrationError(_) => ErrorRetryStrategy::Fail,
            Self::ParseError(_) => ErrorRetryStrategy::Fail,

            // InternalError - permanent failures (internal error within wvwlink's code)
            Self::InternalError(_) => ErrorRetryStrategy::Fail,
        }
    }
}
