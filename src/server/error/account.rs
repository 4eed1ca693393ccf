use thiserror::Error;

/// How a failed account API call must be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The key was rejected; once confirmed the key is revoked.
    Credential,
    /// Upstream or network trouble; nothing is revoked or removed.
    Transient,
    /// The response could not be decoded. Treated like a transient failure but logged loudly.
    Parse,
}

#[derive(Error, Debug)]
pub enum AccountError {
    /// The account API rejected the API key.
    #[error("Account API rejected the API key on {endpoint}")]
    InvalidKey { endpoint: String },
    /// The account API answered with a server error.
    #[error("Account API server error {status} on {endpoint}")]
    Server { endpoint: String, status: u16 },
    /// The account API answered with a status we have no mapping for.
    #[error("Account API returned unexpected status {status} on {endpoint}: {body}")]
    Unexpected {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The request never produced a response.
    #[error("Account API request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Failed to parse account API response from {endpoint}: {source}")]
    Parse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKey { .. } => ErrorKind::Credential,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Server { .. } | Self::Unexpected { .. } | Self::Network(_) => {
                ErrorKind::Transient
            }
        }
    }

    pub fn is_credential(&self) -> bool {
        self.kind() == ErrorKind::Credential
    }
}
