use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    /// The platform refused or failed a request.
    #[error("Platform request {operation} failed: {reason}")]
    Request {
        operation: &'static str,
        reason: String,
    },
    #[error("Group {0} is unknown to the platform")]
    UnknownGroup(String),
    /// A live role with the wanted name carries elevated permissions and is never adopted.
    #[error("Role {name:?} in group {group} has elevated permissions and will not be managed")]
    RoleNotAdoptable { group: String, name: String },
    #[error("Platform HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse platform response for {operation}: {source}")]
    Parse {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
