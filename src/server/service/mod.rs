//! Service layer of the synchronization engine.
//!
//! The account client and its rate limiter sit at the bottom; the topology, the account
//! resolver and the reconciler build on them. Key registration and group events are the
//! ingress points used by the surrounding bot.

pub mod account;
pub mod group;
pub mod key;
pub mod rate_limit;
pub mod reconcile;
pub mod retry;
pub mod topology;
pub mod user;
