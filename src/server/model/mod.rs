//! Data models shared by the engine's components.
//!
//! Wire shapes of the account API, the realm topology snapshot, aggregated per-user account
//! data, work items and the outcome of a reconciliation.

pub mod account;
pub mod reconcile;
pub mod topology;
pub mod user;
pub mod worker;
