//! In-memory fakes shared by service tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgauth_core::{
    ActorIdentity, AppError, AppResult, AssignmentId, EmployeeId, OrgNodeId, PermissionId, RoleId,
};
use orgauth_domain::{
    ActionType, Assignment, DepartmentCode, EmployeeLifecycle, GrantState, HierarchyScope,
    LifecycleState, OrgNode, OrgPath, OrgTree, PermissionDefinition, PermissionOverride, Role,
    StatusScope,
};
use tokio::sync::Mutex;

use crate::{
    AssignmentListQuery, AssignmentRepository, AssignmentService, AuditEvent, AuditRepository,
    AuthorizationPolicy, DepartmentGuard, EffectivePermissions, HierarchyGuard, LifecycleCommit,
    LifecycleRepository, LifecycleService, Notification, NotificationSender, OrgTreeRepository,
    OrgTreeService, PermissionAggregator, PermissionCache, PermissionRepository, RoleRepository,
    SecurityAdminDependencies, SecurityAdminService, StatusSweepService,
};

#[derive(Default)]
struct FakeState {
    nodes: HashMap<OrgNodeId, OrgNode>,
    assignments: Vec<Assignment>,
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, PermissionDefinition>,
    lifecycles: HashMap<EmployeeId, EmployeeLifecycle>,
}

#[derive(Default)]
pub(crate) struct FakeStore {
    state: Mutex<FakeState>,
}

impl FakeStore {
    pub(crate) async fn active_grants(&self, employee_id: EmployeeId) -> Option<GrantState> {
        self.state
            .lock()
            .await
            .assignments
            .iter()
            .find(|assignment| assignment.is_active() && assignment.employee_id() == employee_id)
            .map(|assignment| assignment.grants().clone())
    }

    pub(crate) async fn active_count(&self, employee_id: EmployeeId) -> usize {
        self.state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|assignment| assignment.is_active() && assignment.employee_id() == employee_id)
            .count()
    }

    pub(crate) async fn stored_lifecycle(&self, employee_id: EmployeeId) -> Option<EmployeeLifecycle> {
        self.state.lock().await.lifecycles.get(&employee_id).cloned()
    }

    pub(crate) async fn overwrite_lifecycle(&self, lifecycle: EmployeeLifecycle) {
        self.state
            .lock()
            .await
            .lifecycles
            .insert(lifecycle.employee_id(), lifecycle);
    }

    pub(crate) async fn remove_node(&self, node_id: OrgNodeId) {
        self.state.lock().await.nodes.remove(&node_id);
    }
}

#[async_trait]
impl OrgTreeRepository for FakeStore {
    async fn find_node(&self, node_id: OrgNodeId) -> AppResult<Option<OrgNode>> {
        Ok(self.state.lock().await.nodes.get(&node_id).cloned())
    }

    async fn list_descendants(&self, path: &OrgPath) -> AppResult<Vec<OrgNode>> {
        Ok(self
            .state
            .lock()
            .await
            .nodes
            .values()
            .filter(|node| path.is_ancestor_of(node.path()))
            .cloned()
            .collect())
    }

    async fn load_tree(&self) -> AppResult<OrgTree> {
        OrgTree::from_nodes(self.state.lock().await.nodes.values().cloned())
    }

    async fn insert_node(&self, node: OrgNode) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let mut tree = OrgTree::from_nodes(state.nodes.values().cloned())?;
        tree.insert(node.clone())?;
        state.nodes.insert(node.id(), node);
        Ok(())
    }

    async fn save_nodes(&self, nodes: Vec<OrgNode>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        for node in nodes {
            state.nodes.insert(node.id(), node);
        }
        Ok(())
    }
}

#[async_trait]
impl AssignmentRepository for FakeStore {
    async fn find_active(&self, employee_id: EmployeeId) -> AppResult<Option<Assignment>> {
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .iter()
            .find(|assignment| assignment.is_active() && assignment.employee_id() == employee_id)
            .cloned())
    }

    async fn list_active_at_nodes(&self, node_ids: &[OrgNodeId]) -> AppResult<Vec<Assignment>> {
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|assignment| {
                assignment.is_active() && node_ids.contains(&assignment.org_node_id())
            })
            .cloned()
            .collect())
    }

    async fn list_active(&self, query: AssignmentListQuery) -> AppResult<Vec<Assignment>> {
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|assignment| assignment.is_active())
            .filter(|assignment| {
                query
                    .department
                    .is_none_or(|department| assignment.department() == department)
            })
            .filter(|assignment| {
                query
                    .org_node_id
                    .is_none_or(|node_id| assignment.org_node_id() == node_id)
            })
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn replace_active(&self, assignment: Assignment) -> AppResult<Option<Assignment>> {
        let mut state = self.state.lock().await;
        let now = assignment.effective_from();
        let mut previous = None;
        for existing in state.assignments.iter_mut() {
            if existing.is_active() && existing.employee_id() == assignment.employee_id() {
                existing.deactivate(now);
                previous = Some(existing.clone());
            }
        }
        state.assignments.push(assignment);
        Ok(previous)
    }

    async fn deactivate(&self, assignment_id: AssignmentId, at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let assignment = state
            .assignments
            .iter_mut()
            .find(|assignment| assignment.id() == assignment_id)
            .ok_or_else(|| AppError::NotFound(format!("assignment '{assignment_id}'")))?;
        assignment.deactivate(at);
        Ok(())
    }

    async fn update_grants(&self, assignment_id: AssignmentId, grants: GrantState) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let assignment = state
            .assignments
            .iter_mut()
            .find(|assignment| assignment.id() == assignment_id && assignment.is_active())
            .ok_or_else(|| AppError::Conflict(format!("assignment '{assignment_id}' inactive")))?;
        assignment.set_grants(grants);
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for FakeStore {
    async fn find_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionDefinition>> {
        Ok(self.state.lock().await.permissions.get(&permission_id).cloned())
    }

    async fn find_permission_by_action(
        &self,
        action: &str,
    ) -> AppResult<Option<PermissionDefinition>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .values()
            .find(|permission| permission.action() == action)
            .cloned())
    }

    async fn find_permissions(
        &self,
        permission_ids: &[PermissionId],
    ) -> AppResult<Vec<PermissionDefinition>> {
        let state = self.state.lock().await;
        Ok(permission_ids
            .iter()
            .filter_map(|id| state.permissions.get(id).cloned())
            .collect())
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        let mut permissions: Vec<_> = self
            .state
            .lock()
            .await
            .permissions
            .values()
            .cloned()
            .collect();
        permissions.sort_by(|left, right| left.action().cmp(right.action()));
        Ok(permissions)
    }

    async fn insert_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .permissions
            .values()
            .any(|existing| existing.action() == permission.action())
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.action()
            )));
        }
        state.permissions.insert(permission.id(), permission);
        Ok(())
    }

    async fn save_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        self.state
            .lock()
            .await
            .permissions
            .insert(permission.id(), permission);
        Ok(())
    }

    async fn delete_permission(&self, permission_id: PermissionId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.permissions.remove(&permission_id);
        for role in state.roles.values_mut() {
            role.revoke(permission_id);
        }
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for FakeStore {
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.state.lock().await.roles.get(&role_id).cloned())
    }

    async fn find_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let state = self.state.lock().await;
        Ok(role_ids
            .iter()
            .filter_map(|id| state.roles.get(id).cloned())
            .collect())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.state.lock().await.roles.values().cloned().collect())
    }

    async fn insert_role(&self, role: Role) -> AppResult<()> {
        self.state.lock().await.roles.insert(role.id(), role);
        Ok(())
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        self.state.lock().await.roles.insert(role.id(), role);
        Ok(())
    }
}

#[async_trait]
impl LifecycleRepository for FakeStore {
    async fn find(&self, employee_id: EmployeeId) -> AppResult<Option<EmployeeLifecycle>> {
        Ok(self.state.lock().await.lifecycles.get(&employee_id).cloned())
    }

    async fn commit(&self, commit: LifecycleCommit) -> AppResult<()> {
        let mut state = self.state.lock().await;

        for record in &commit.records {
            let stored = state
                .lifecycles
                .get(&record.employee_id())
                .map_or(0, EmployeeLifecycle::version);
            if stored != record.version() {
                return Err(AppError::Conflict(format!(
                    "lifecycle of '{}' changed concurrently",
                    record.employee_id()
                )));
            }
        }
        for update in &commit.grants {
            if !state
                .assignments
                .iter()
                .any(|assignment| assignment.id() == update.assignment_id && assignment.is_active())
            {
                return Err(AppError::Conflict(format!(
                    "assignment '{}' is no longer active",
                    update.assignment_id
                )));
            }
        }

        for record in commit.records {
            let version = record.version() + 1;
            state
                .lifecycles
                .insert(record.employee_id(), record.with_version(version));
        }
        for update in commit.grants {
            if let Some(assignment) = state
                .assignments
                .iter_mut()
                .find(|assignment| assignment.id() == update.assignment_id)
            {
                assignment.set_grants(update.grants);
            }
        }

        Ok(())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> AppResult<Vec<EmployeeLifecycle>> {
        Ok(self
            .state
            .lock()
            .await
            .lifecycles
            .values()
            .filter(|lifecycle| lifecycle.next_due_at().is_some_and(|due| due <= now))
            .cloned()
            .collect())
    }

    async fn list_on_accepted_leave(&self) -> AppResult<Vec<EmployeeLifecycle>> {
        Ok(self
            .state
            .lock()
            .await
            .lifecycles
            .values()
            .filter(|lifecycle| lifecycle.state() == LifecycleState::OnLeaveAccepted)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeNotificationSender {
    pub(crate) sent: Mutex<Vec<Notification>>,
    pub(crate) fail: bool,
}

#[async_trait]
impl NotificationSender for FakeNotificationSender {
    async fn send(&self, notification: Notification) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("smtp relay unreachable".to_owned()));
        }
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakePermissionCache {
    state: Mutex<(u64, HashMap<EmployeeId, EffectivePermissions>)>,
}

impl FakePermissionCache {
    pub(crate) async fn cached(&self, employee_id: EmployeeId) -> bool {
        self.state.lock().await.1.contains_key(&employee_id)
    }
}

#[async_trait]
impl PermissionCache for FakePermissionCache {
    async fn generation(&self) -> AppResult<u64> {
        Ok(self.state.lock().await.0)
    }

    async fn get(&self, employee_id: EmployeeId) -> AppResult<Option<EffectivePermissions>> {
        Ok(self.state.lock().await.1.get(&employee_id).cloned())
    }

    async fn put(&self, permissions: EffectivePermissions, generation: u64) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.0 == generation {
            state.1.insert(permissions.employee_id, permissions);
        }
        Ok(())
    }

    async fn invalidate(&self, employee_ids: &[EmployeeId]) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.0 += 1;
        for employee_id in employee_ids {
            state.1.remove(employee_id);
        }
        Ok(())
    }

    async fn invalidate_all(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.0 += 1;
        state.1.clear();
        Ok(())
    }
}

/// Fully wired services over one [`FakeStore`].
pub(crate) struct Harness {
    pub(crate) store: Arc<FakeStore>,
    pub(crate) audit: Arc<FakeAuditRepository>,
    pub(crate) notifications: Arc<FakeNotificationSender>,
    pub(crate) cache: Arc<FakePermissionCache>,
    pub(crate) aggregator: PermissionAggregator,
    pub(crate) guard: HierarchyGuard,
    pub(crate) department_guard: DepartmentGuard,
    pub(crate) org_tree: OrgTreeService,
    pub(crate) lifecycle: LifecycleService,
    pub(crate) sweep: StatusSweepService,
    pub(crate) admin: SecurityAdminService,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::build(AuthorizationPolicy::default(), false, false)
    }

    pub(crate) fn with_policy(policy: AuthorizationPolicy) -> Self {
        Self::build(policy, false, false)
    }

    pub(crate) fn with_cache() -> Self {
        Self::build(AuthorizationPolicy::default(), true, false)
    }

    pub(crate) fn with_failing_notifications() -> Self {
        Self::build(AuthorizationPolicy::default(), false, true)
    }

    fn build(policy: AuthorizationPolicy, cached: bool, failing_notifications: bool) -> Self {
        let store = Arc::new(FakeStore::default());
        let audit = Arc::new(FakeAuditRepository::default());
        let notifications = Arc::new(FakeNotificationSender {
            sent: Mutex::new(Vec::new()),
            fail: failing_notifications,
        });
        let cache = Arc::new(FakePermissionCache::default());

        let mut aggregator = PermissionAggregator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            policy,
        );
        if cached {
            aggregator = aggregator.with_cache(cache.clone());
        }

        let guard = HierarchyGuard::new(aggregator.clone(), store.clone(), store.clone());
        let department_guard = DepartmentGuard::new(store.clone());
        let org_tree = OrgTreeService::new(store.clone());
        let lifecycle = LifecycleService::new(
            guard.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            audit.clone(),
            notifications.clone(),
        );
        let sweep = StatusSweepService::new(lifecycle.clone(), store.clone());
        let admin = SecurityAdminService::new(SecurityAdminDependencies {
            guard: guard.clone(),
            department_guard: department_guard.clone(),
            assignment_service: AssignmentService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            ),
            org_tree: org_tree.clone(),
            permissions: store.clone(),
            roles: store.clone(),
            lifecycles: store.clone(),
            audit_repository: audit.clone(),
        });

        Self {
            store,
            audit,
            notifications,
            cache,
            aggregator,
            guard,
            department_guard,
            org_tree,
            lifecycle,
            sweep,
            admin,
        }
    }

    /// Sweep service of a second process over the same store, optionally
    /// sharing this harness's permission cache.
    pub(crate) fn detached_sweep(&self, shared_cache: bool) -> StatusSweepService {
        let mut aggregator = PermissionAggregator::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            AuthorizationPolicy::default(),
        );
        if shared_cache {
            aggregator = aggregator.with_cache(self.cache.clone());
        }

        let guard = HierarchyGuard::new(aggregator, self.store.clone(), self.store.clone());
        let lifecycle = LifecycleService::new(
            guard,
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.audit.clone(),
            self.notifications.clone(),
        );
        StatusSweepService::new(lifecycle, self.store.clone())
    }

    pub(crate) async fn node(
        &self,
        parent: Option<&OrgNode>,
        name: &str,
        department: DepartmentCode,
    ) -> OrgNode {
        let node = match parent {
            None => OrgNode::root(name, department),
            Some(parent) => OrgNode::child_of(parent, name, department),
        }
        .unwrap_or_else(|_| unreachable!());
        let inserted = self.store.insert_node(node.clone()).await;
        assert!(inserted.is_ok());
        node
    }

    pub(crate) async fn permission(
        &self,
        action: &str,
        action_type: ActionType,
        hierarchy_scope: HierarchyScope,
        status_scope: &[DepartmentCode],
    ) -> PermissionDefinition {
        let permission = PermissionDefinition::new(
            PermissionId::new(),
            action,
            action_type,
            hierarchy_scope,
            StatusScope::new(status_scope.iter().copied()),
            "employee",
        )
        .unwrap_or_else(|_| unreachable!());
        let inserted = self.store.insert_permission(permission.clone()).await;
        assert!(inserted.is_ok());
        permission
    }

    pub(crate) async fn role(&self, name: &str, permissions: &[&PermissionDefinition]) -> Role {
        let role = Role::new(
            RoleId::new(),
            name,
            "staff",
            permissions.iter().map(|permission| permission.id()),
        )
        .unwrap_or_else(|_| unreachable!());
        let inserted = self.store.insert_role(role.clone()).await;
        assert!(inserted.is_ok());
        role
    }

    pub(crate) async fn place(
        &self,
        role: &Role,
        node: &OrgNode,
        department: DepartmentCode,
        overrides: &[PermissionOverride],
    ) -> EmployeeId {
        let employee_id = EmployeeId::new();
        let assignment = Assignment::new(
            employee_id,
            role.id(),
            node.id(),
            department,
            overrides.iter().copied(),
            Utc::now(),
        );
        let replaced = self.store.replace_active(assignment).await;
        assert!(replaced.is_ok());
        employee_id
    }
}

pub(crate) fn actor(employee_id: EmployeeId) -> ActorIdentity {
    ActorIdentity::new(employee_id, "tester", None)
}
