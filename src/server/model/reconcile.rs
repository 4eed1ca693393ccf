/// What a single reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The user is not a member of the group, nothing was touched.
    pub skipped: bool,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Roles that were wanted but could not be resolved or assigned.
    pub failed: Vec<String>,
    pub renamed: bool,
}

impl ReconcileOutcome {
    pub fn not_a_member() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    /// No role or nickname changed.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && !self.renamed
    }
}
