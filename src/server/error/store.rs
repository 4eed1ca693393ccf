use entity::prelude::Namespace;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] fred::prelude::Error),
    #[error("Failed to decode {namespace}:{key}: {source}")]
    Document {
        namespace: Namespace,
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// A string operation hit a set or the other way around.
    #[error("Key {namespace}:{key} holds the wrong kind of value")]
    WrongType { namespace: Namespace, key: String },
    #[error("Key {namespace}:{key} does not exist")]
    MissingKey { namespace: Namespace, key: String },
    #[error("Store is unavailable")]
    Unavailable,
}
