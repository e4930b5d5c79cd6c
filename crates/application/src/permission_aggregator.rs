//! Effective permission computation.
//!
//! An employee's effective set is what they hold directly (role plus
//! overrides) merged with every role held below them in the tree, then
//! narrowed to the permissions meaningful for their department.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use orgauth_core::{AppError, AppResult, EmployeeId, OrgNodeId, PermissionId, RoleId};
use orgauth_domain::{
    Assignment, DepartmentCode, EmptyStatusScopePolicy, OrgNode, PermissionDefinition,
    PermissionOverride,
};
use serde::{Deserialize, Serialize};

use crate::{
    AssignmentRepository, OrgTreeRepository, OrgTreeService, PermissionCache,
    PermissionRepository, RoleRepository,
};

/// Behavioural knobs for permission evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    /// How a permission with no department scope is treated.
    pub empty_status_scope: EmptyStatusScopePolicy,
}

/// Aggregated permissions of one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    /// Employee the set belongs to.
    pub employee_id: EmployeeId,
    /// Org node of the active assignment.
    pub org_node_id: Option<OrgNodeId>,
    /// Department of the active assignment.
    pub department: Option<DepartmentCode>,
    /// Whether the employee sees every department.
    pub is_executive: bool,
    /// Role permissions plus overrides.
    pub direct: Vec<PermissionDefinition>,
    /// Role permissions held anywhere below the employee.
    pub inherited: Vec<PermissionDefinition>,
    /// Direct and inherited, after the department filter.
    pub effective: Vec<PermissionDefinition>,
    /// The assignment's own override copies.
    pub overrides: Vec<PermissionOverride>,
}

impl EffectivePermissions {
    /// Returns the empty set for an employee without a usable placement.
    #[must_use]
    pub fn empty(employee_id: EmployeeId) -> Self {
        Self {
            employee_id,
            org_node_id: None,
            department: None,
            is_executive: false,
            direct: Vec::new(),
            inherited: Vec::new(),
            effective: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Finds the effective permission for `action`.
    #[must_use]
    pub fn find(&self, action: &str) -> Option<&PermissionDefinition> {
        self.effective
            .iter()
            .find(|permission| permission.action() == action)
    }

    /// Returns whether `action` is effective.
    #[must_use]
    pub fn contains(&self, action: &str) -> bool {
        self.find(action).is_some()
    }

    /// Returns the employee's override copy of a permission.
    #[must_use]
    pub fn override_for(&self, permission_id: PermissionId) -> Option<&PermissionOverride> {
        self.overrides
            .iter()
            .find(|value| value.permission_id == permission_id)
    }

    /// Returns the effective action names.
    #[must_use]
    pub fn actions(&self) -> Vec<&str> {
        self.effective
            .iter()
            .map(PermissionDefinition::action)
            .collect()
    }
}

/// Computes effective permissions and owns cache invalidation.
#[derive(Clone)]
pub struct PermissionAggregator {
    org_tree: OrgTreeService,
    assignments: Arc<dyn AssignmentRepository>,
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
    cache: Option<Arc<dyn PermissionCache>>,
    policy: AuthorizationPolicy,
}

impl PermissionAggregator {
    /// Creates an aggregator without a cache.
    #[must_use]
    pub fn new(
        org_tree: Arc<dyn OrgTreeRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
        policy: AuthorizationPolicy,
    ) -> Self {
        Self {
            org_tree: OrgTreeService::new(org_tree),
            assignments,
            roles,
            permissions,
            cache: None,
            policy,
        }
    }

    /// Attaches a cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn PermissionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the configured policy.
    #[must_use]
    pub fn policy(&self) -> AuthorizationPolicy {
        self.policy
    }

    /// Returns the employee's effective permissions.
    ///
    /// Missing assignments, org nodes or roles degrade to fewer permissions;
    /// only store failures are errors.
    pub async fn effective_permissions(
        &self,
        employee_id: EmployeeId,
    ) -> AppResult<EffectivePermissions> {
        let Some(cache) = &self.cache else {
            return self.compute(employee_id).await;
        };

        match cache.get(employee_id).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(employee_id = %employee_id, error = %error, "permission cache read failed");
            }
        }

        let generation = match cache.generation().await {
            Ok(generation) => Some(generation),
            Err(error) => {
                tracing::warn!(error = %error, "permission cache generation read failed");
                None
            }
        };

        let permissions = self.compute(employee_id).await?;

        if let Some(generation) = generation
            && let Err(error) = cache.put(permissions.clone(), generation).await
        {
            tracing::warn!(employee_id = %employee_id, error = %error, "permission cache write failed");
        }

        Ok(permissions)
    }

    /// Drops cached sets for employees placed at `node_ids` and everyone above them.
    ///
    /// Falls back to a full flush when the targeted invalidation fails.
    pub async fn invalidate_around(
        &self,
        employee_ids: &[EmployeeId],
        node_ids: &[OrgNodeId],
    ) -> AppResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        let targeted = async {
            let mut chain_nodes = BTreeSet::new();
            for node_id in node_ids {
                match self.org_tree.path_to_root(*node_id).await {
                    Ok(chain) => chain_nodes.extend(chain.iter().map(OrgNode::id)),
                    Err(AppError::NotFound(_)) => {
                        chain_nodes.insert(*node_id);
                    }
                    Err(error) => return Err(error),
                }
            }

            let chain_nodes: Vec<OrgNodeId> = chain_nodes.into_iter().collect();
            let mut affected: BTreeSet<EmployeeId> = employee_ids.iter().copied().collect();
            affected.extend(
                self.assignments
                    .list_active_at_nodes(&chain_nodes)
                    .await?
                    .iter()
                    .map(Assignment::employee_id),
            );

            let affected: Vec<EmployeeId> = affected.into_iter().collect();
            cache.invalidate(&affected).await
        };

        if let Err(error) = targeted.await {
            tracing::warn!(error = %error, "targeted permission cache invalidation failed, flushing");
            return self.invalidate_all().await;
        }

        Ok(())
    }

    /// Drops every cached set.
    pub async fn invalidate_all(&self) -> AppResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        cache.invalidate_all().await.inspect_err(|error| {
            tracing::error!(error = %error, "permission cache flush failed");
        })
    }

    async fn compute(&self, employee_id: EmployeeId) -> AppResult<EffectivePermissions> {
        let Some(assignment) = self.assignments.find_active(employee_id).await? else {
            return Ok(EffectivePermissions::empty(employee_id));
        };

        let mut result = EffectivePermissions::empty(employee_id);
        result.org_node_id = Some(assignment.org_node_id());
        result.department = Some(assignment.department());
        result.is_executive = assignment.department().is_wildcard();
        result.overrides = assignment.permission_overrides().to_vec();

        let direct_ids = self.direct_permission_ids(&assignment).await?;

        let inherited_ids = match self.org_tree.node(assignment.org_node_id()).await? {
            Some(node) => self.inherited_permission_ids(&node).await?,
            None => {
                tracing::warn!(
                    employee_id = %employee_id,
                    org_node_id = %assignment.org_node_id(),
                    "active assignment points at a missing org node"
                );
                BTreeSet::new()
            }
        };

        let all_ids: Vec<PermissionId> = direct_ids.union(&inherited_ids).copied().collect();
        let definitions: BTreeMap<PermissionId, PermissionDefinition> = self
            .permissions
            .find_permissions(&all_ids)
            .await?
            .into_iter()
            .map(|permission| (permission.id(), permission))
            .collect();

        result.direct = collect_sorted(&definitions, &direct_ids);
        result.inherited = collect_sorted(&definitions, &inherited_ids);

        let merged: BTreeSet<PermissionId> = direct_ids.union(&inherited_ids).copied().collect();
        let department = assignment.department();
        result.effective = collect_sorted(&definitions, &merged)
            .into_iter()
            .filter(|permission| {
                department.is_wildcard()
                    || permission
                        .status_scope()
                        .admits(department, self.policy.empty_status_scope)
            })
            .collect();

        Ok(result)
    }

    async fn direct_permission_ids(&self, assignment: &Assignment) -> AppResult<BTreeSet<PermissionId>> {
        let mut ids: BTreeSet<PermissionId> = assignment
            .permission_overrides()
            .iter()
            .map(|value| value.permission_id)
            .collect();

        if let Some(role_id) = assignment.role_id() {
            for role in self.roles.find_roles(&[role_id]).await? {
                ids.extend(role.permission_ids().iter().copied());
            }
        }

        Ok(ids)
    }

    /// Role permissions held on strict descendants; peers on the same node
    /// do not contribute.
    async fn inherited_permission_ids(&self, node: &OrgNode) -> AppResult<BTreeSet<PermissionId>> {
        let descendant_ids: Vec<OrgNodeId> = self
            .org_tree
            .descendants(node.id())
            .await?
            .iter()
            .map(OrgNode::id)
            .collect();
        if descendant_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let role_ids: BTreeSet<RoleId> = self
            .assignments
            .list_active_at_nodes(&descendant_ids)
            .await?
            .iter()
            .filter_map(Assignment::role_id)
            .collect();
        let role_ids: Vec<RoleId> = role_ids.into_iter().collect();

        Ok(self
            .roles
            .find_roles(&role_ids)
            .await?
            .iter()
            .flat_map(|role| role.permission_ids().iter().copied())
            .collect())
    }
}

fn collect_sorted(
    definitions: &BTreeMap<PermissionId, PermissionDefinition>,
    ids: &BTreeSet<PermissionId>,
) -> Vec<PermissionDefinition> {
    let mut selected: Vec<PermissionDefinition> = ids
        .iter()
        .filter_map(|id| definitions.get(id).cloned())
        .collect();
    selected.sort_by(|left, right| left.action().cmp(right.action()));
    selected
}
