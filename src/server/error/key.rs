use thiserror::Error;

/// Reasons an API key registration is refused.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("API key name {name:?} must contain both \"wvw\" and \"bot\"")]
    InvalidName { name: String },
    #[error("API key is missing the {0:?} permission")]
    MissingPermission(String),
    /// The account is already linked to another user.
    #[error("Account {account_name} is already linked to user {holder}")]
    AlreadyTaken { account_name: String, holder: String },
}
