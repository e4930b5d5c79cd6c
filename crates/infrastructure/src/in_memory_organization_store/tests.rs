use chrono::{Duration, Utc};
use orgauth_application::{
    AssignmentListQuery, AssignmentRepository, GrantUpdate, LifecycleCommit, LifecycleRepository,
    OrgTreeRepository, PermissionRepository, RoleRepository,
};
use orgauth_core::{AppError, EmployeeId, PermissionId, RoleId};
use orgauth_domain::{
    ActionType, Assignment, DepartmentCode, EmployeeLifecycle, GrantState, HierarchyScope,
    LeaveWindow, LifecycleState, OrgNode, PermissionDefinition, PermissionOverride, Role,
    StatusScope,
};

use super::InMemoryOrganizationStore;

fn org_node(result: Result<OrgNode, AppError>) -> OrgNode {
    result.unwrap_or_else(|_| unreachable!())
}

async fn seeded_tree(store: &InMemoryOrganizationStore) -> (OrgNode, OrgNode, OrgNode) {
    let chairman = org_node(OrgNode::root("CHAIRMAN", DepartmentCode::All));
    let finance = org_node(OrgNode::child_of(&chairman, "FINANCE", DepartmentCode::Finance));
    let accounting = org_node(OrgNode::child_of(
        &finance,
        "ACCOUNTING",
        DepartmentCode::Finance,
    ));

    for node in [&chairman, &finance, &accounting] {
        assert!(store.insert_node(node.clone()).await.is_ok());
    }

    (chairman, finance, accounting)
}

fn permission(action: &str) -> PermissionDefinition {
    PermissionDefinition::new(
        PermissionId::new(),
        action,
        ActionType::Functional,
        HierarchyScope::Department,
        StatusScope::new([DepartmentCode::Finance]),
        "ledger",
    )
    .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn a_second_root_is_a_conflict() {
    let store = InMemoryOrganizationStore::new();
    seeded_tree(&store).await;

    let shadow = org_node(OrgNode::root("SHADOW", DepartmentCode::All));
    let result = store.insert_node(shadow).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn duplicate_paths_are_conflicts() {
    let store = InMemoryOrganizationStore::new();
    let (chairman, _, _) = seeded_tree(&store).await;

    let twin = org_node(OrgNode::child_of(&chairman, "FINANCE", DepartmentCode::Finance));
    let result = store.insert_node(twin).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn descendants_exclude_lookalike_prefixes() {
    let store = InMemoryOrganizationStore::new();
    let (chairman, finance, accounting) = seeded_tree(&store).await;
    let lookalike = org_node(OrgNode::child_of(
        &chairman,
        "FINANCEOPS",
        DepartmentCode::Finance,
    ));
    assert!(store.insert_node(lookalike).await.is_ok());

    let descendants = store
        .list_descendants(finance.path())
        .await
        .unwrap_or_else(|_| unreachable!());

    let ids: Vec<_> = descendants.iter().map(OrgNode::id).collect();
    assert_eq!(ids, vec![accounting.id()]);
}

#[tokio::test]
async fn saving_an_unknown_node_is_not_found() {
    let store = InMemoryOrganizationStore::new();
    let (chairman, _, _) = seeded_tree(&store).await;
    let stray = org_node(OrgNode::child_of(&chairman, "STRAY", DepartmentCode::Legal));

    let result = store.save_nodes(vec![stray]).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn replacing_keeps_one_active_assignment() {
    let store = InMemoryOrganizationStore::new();
    let (_, finance, accounting) = seeded_tree(&store).await;
    let employee_id = EmployeeId::new();
    let started = Utc::now() - Duration::days(30);

    let first = Assignment::new(
        employee_id,
        RoleId::new(),
        accounting.id(),
        DepartmentCode::Finance,
        [],
        started,
    );
    let first_id = first.id();
    let previous = store.replace_active(first).await;
    assert!(matches!(previous, Ok(None)));

    let second = Assignment::new(
        employee_id,
        RoleId::new(),
        finance.id(),
        DepartmentCode::Finance,
        [],
        Utc::now(),
    );
    let previous = store
        .replace_active(second)
        .await
        .unwrap_or_else(|_| unreachable!());

    let previous = previous.unwrap_or_else(|| unreachable!());
    assert_eq!(previous.id(), first_id);
    assert!(!previous.is_active());
    assert!(previous.effective_until().is_some());

    let listed = store
        .list_active(AssignmentListQuery::default())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].org_node_id(), finance.id());
}

#[tokio::test]
async fn listing_filters_by_department() {
    let store = InMemoryOrganizationStore::new();
    let (chairman, _, accounting) = seeded_tree(&store).await;

    for (node, department) in [
        (&accounting, DepartmentCode::Finance),
        (&chairman, DepartmentCode::Executive),
    ] {
        let assignment = Assignment::new(
            EmployeeId::new(),
            RoleId::new(),
            node.id(),
            department,
            [],
            Utc::now(),
        );
        assert!(store.replace_active(assignment).await.is_ok());
    }

    let finance_only = store
        .list_active(AssignmentListQuery {
            department: Some(DepartmentCode::Finance),
            ..AssignmentListQuery::default()
        })
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(finance_only.len(), 1);
    assert_eq!(finance_only[0].department(), DepartmentCode::Finance);
}

#[tokio::test]
async fn deleting_a_permission_revokes_it_from_roles() {
    let store = InMemoryOrganizationStore::new();
    let close_books = permission("books.close");
    let post_entry = permission("books.post");
    assert!(store.insert_permission(close_books.clone()).await.is_ok());
    assert!(store.insert_permission(post_entry.clone()).await.is_ok());

    let role = Role::new(
        RoleId::new(),
        "Accountant",
        "staff",
        [close_books.id(), post_entry.id()],
    )
    .unwrap_or_else(|_| unreachable!());
    assert!(store.insert_role(role.clone()).await.is_ok());

    assert!(store.delete_permission(close_books.id()).await.is_ok());

    let stored = store
        .find_role(role.id())
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(stored.permission_ids().len(), 1);
    assert!(stored.permission_ids().contains(&post_entry.id()));
}

#[tokio::test]
async fn duplicate_actions_and_unknown_role_grants_are_rejected() {
    let store = InMemoryOrganizationStore::new();
    assert!(store.insert_permission(permission("books.close")).await.is_ok());

    let duplicate = store.insert_permission(permission("books.close")).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let role = Role::new(RoleId::new(), "Ghost", "staff", [PermissionId::new()])
        .unwrap_or_else(|_| unreachable!());
    let result = store.insert_role(role).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn stale_commit_leaves_no_partial_state() {
    let store = InMemoryOrganizationStore::new();
    let (_, _, accounting) = seeded_tree(&store).await;
    let first = EmployeeId::new();
    let second = EmployeeId::new();

    let assignment = Assignment::new(
        first,
        RoleId::new(),
        accounting.id(),
        DepartmentCode::Finance,
        [],
        Utc::now(),
    );
    let assignment_id = assignment.id();
    assert!(store.replace_active(assignment).await.is_ok());

    let initial = LifecycleCommit {
        records: vec![EmployeeLifecycle::new(second)],
        grants: Vec::new(),
    };
    assert!(store.commit(initial).await.is_ok());

    // The second record still claims version 0 although version 1 is stored.
    let stale = LifecycleCommit {
        records: vec![EmployeeLifecycle::new(first), EmployeeLifecycle::new(second)],
        grants: vec![GrantUpdate {
            assignment_id,
            grants: GrantState::cleared(),
        }],
    };
    let result = store.commit(stale).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let untouched = store.find(first).await.unwrap_or_else(|_| unreachable!());
    assert!(untouched.is_none());
    let active = store
        .find_active(first)
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert!(active.role_id().is_some());
}

#[tokio::test]
async fn committed_records_advance_their_version() {
    let store = InMemoryOrganizationStore::new();
    let employee_id = EmployeeId::new();

    let commit = LifecycleCommit {
        records: vec![EmployeeLifecycle::new(employee_id)],
        grants: Vec::new(),
    };
    assert!(store.commit(commit).await.is_ok());

    let stored = store
        .find(employee_id)
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(stored.version(), 1);

    let again = LifecycleCommit {
        records: vec![stored],
        grants: Vec::new(),
    };
    assert!(store.commit(again).await.is_ok());
    let stored = store.find(employee_id).await.unwrap_or_else(|_| unreachable!());
    assert_eq!(stored.map(|lifecycle| lifecycle.version()), Some(2));
}

#[tokio::test]
async fn due_records_are_listed_once_their_leave_ends() {
    let store = InMemoryOrganizationStore::new();
    let employee_id = EmployeeId::new();
    let now = Utc::now();

    let mut lifecycle = EmployeeLifecycle::new(employee_id);
    let window = LeaveWindow::new(now - Duration::days(5), now - Duration::days(1))
        .unwrap_or_else(|_| unreachable!());
    assert!(lifecycle.apply_leave(window, "family event", now).is_ok());
    assert_eq!(lifecycle.state(), LifecycleState::OnLeavePending);

    let commit = LifecycleCommit {
        records: vec![lifecycle],
        grants: Vec::new(),
    };
    assert!(store.commit(commit).await.is_ok());

    let due = store.list_due(now).await.unwrap_or_else(|_| unreachable!());
    assert_eq!(due.len(), 1);
    let not_yet = store
        .list_due(now - Duration::days(2))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(not_yet.is_empty());
    let accepted = store
        .list_on_accepted_leave()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(accepted.is_empty());
}

#[tokio::test]
async fn overrides_round_trip_through_grant_updates() {
    let store = InMemoryOrganizationStore::new();
    let (_, _, accounting) = seeded_tree(&store).await;
    let employee_id = EmployeeId::new();
    let assignment = Assignment::new(
        employee_id,
        RoleId::new(),
        accounting.id(),
        DepartmentCode::Finance,
        [],
        Utc::now(),
    );
    let assignment_id = assignment.id();
    assert!(store.replace_active(assignment).await.is_ok());

    let granted = PermissionOverride {
        permission_id: PermissionId::new(),
        bypass_hierarchy: true,
    };
    let grants = GrantState::new(None, [granted]);
    assert!(store.update_grants(assignment_id, grants.clone()).await.is_ok());

    let active = store
        .find_active(employee_id)
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(active.grants(), &grants);

    assert!(store.deactivate(assignment_id, Utc::now()).await.is_ok());
    let result = store.update_grants(assignment_id, GrantState::cleared()).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}
