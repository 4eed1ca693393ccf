use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    /// The very first version check failed; the process must not start.
    #[error("Failed to determine schema version: {0}")]
    VersionCheck(#[source] Box<MigrationError>),
    #[error("Schema version {0:?} is not a number")]
    InvalidVersion(String),
    #[error("Schema version {0} is not known to this build")]
    UnknownVersion(i64),
    #[error("Failed to decode document {key}: {source}")]
    Document {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl MigrationError {
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}
