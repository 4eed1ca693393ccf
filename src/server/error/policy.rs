use thiserror::Error;

use crate::server::error::account::AccountError;

/// A group policy that cannot be evaluated. The group is skipped for this refresh.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Group {0} is in a verification mode but has no target realm configured")]
    MissingTargetRealm(String),
    #[error("Group {0} derives its realm from an owner account but has no owner key configured")]
    MissingTargetAccount(String),
    #[error("Owner account of group {group} could not be fetched: {source}")]
    OwnerAccountUnavailable {
        group: String,
        #[source]
        source: AccountError,
    },
}
