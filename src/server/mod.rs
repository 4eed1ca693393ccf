//! Synchronization engine.
//!
//! Links accounts of the game's account API to groups on a chat platform and keeps the
//! members' world roles in sync: a scheduler emits per-user work items, a worker pool resolves
//! each user's accounts through the rate limited client and reconciles their roles in every
//! group.

pub mod config;
pub mod error;
pub mod model;
pub mod platform;
pub mod scheduler;
pub mod service;
pub mod startup;
pub mod store;
pub mod util;
pub mod worker;
