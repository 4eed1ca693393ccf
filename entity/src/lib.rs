//! Persisted document shapes for wvwlink.
//!
//! These types describe what lives in the key-value store: one [`GroupPolicy`] document per
//! group, one JSON-encoded [`ManagedRole`] per set member in the roles namespace, and the
//! namespaces themselves ([`Namespace`]). Both the engine and the migration crate read and
//! write through these shapes so that a document written by one is always readable by the
//! other.

pub mod group_policy;
pub mod layout;
pub mod managed_role;

pub mod prelude {
    pub use crate::group_policy::{ExtraLinkedRealm, GroupPolicy, Mode};
    pub use crate::layout::{Namespace, CURRENT_SCHEMA_VERSION, LEGACY_GUILDS_KEY, VERSION_KEY};
    pub use crate::managed_role::ManagedRole;
}
