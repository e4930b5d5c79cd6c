use std::collections::HashMap;

use orgauth_application::AuditEvent;
use orgauth_core::{EmployeeId, OrgNodeId, PermissionId, RoleId};
use orgauth_domain::{Assignment, EmployeeLifecycle, OrgNode, PermissionDefinition, Role};
use tokio::sync::RwLock;

mod assignments;
mod audit;
mod catalog;
mod lifecycle;
mod org_tree;

#[cfg(test)]
mod tests;

#[derive(Debug, Default)]
struct OrganizationState {
    nodes: HashMap<OrgNodeId, OrgNode>,
    assignments: Vec<Assignment>,
    permissions: HashMap<PermissionId, PermissionDefinition>,
    roles: HashMap<RoleId, Role>,
    lifecycles: HashMap<EmployeeId, EmployeeLifecycle>,
    audit_events: Vec<AuditEvent>,
}

/// In-memory implementation of every organization port.
///
/// One lock guards the whole state so a lifecycle commit touching two
/// employees and their assignments is applied atomically.
#[derive(Debug, Default)]
pub struct InMemoryOrganizationStore {
    state: RwLock<OrganizationState>,
}

impl InMemoryOrganizationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every audit event appended so far, oldest first.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.state.read().await.audit_events.clone()
    }
}
