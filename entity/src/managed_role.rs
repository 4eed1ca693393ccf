use serde::{Deserialize, Serialize};

/// A role wvwlink created or adopted inside one group.
///
/// Identity within a group is the role name; the id is whatever the platform assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedRole {
    pub id: String,
    pub name: String,
}

impl ManagedRole {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
