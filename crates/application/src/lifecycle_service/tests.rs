use chrono::{Duration, Utc};
use orgauth_core::{AppError, EmployeeId};
use orgauth_domain::{
    ActionType, AuditAction, DecisionStatus, DepartmentCode, EmployeeLifecycle, GrantState,
    HierarchyScope, LeaveRelease, LifecycleState, PermissionOverride, ReasonCode, StatusRelease,
    actions,
};

use super::{ApplyLeaveInput, RestrictionInput};
use crate::NotificationKind;
use crate::test_support::{Harness, actor};

struct Team {
    harness: Harness,
    manager: EmployeeId,
    /// Leave-taker; holds an override on top of their role.
    accountant: EmployeeId,
    /// Delegate on the same desk.
    clerk: EmployeeId,
}

async fn team(harness: Harness) -> Team {
    let root = harness.node(None, "CHAIRMAN", DepartmentCode::All).await;
    let finance = harness
        .node(Some(&root), "FINANCE", DepartmentCode::Finance)
        .await;
    let desk = harness
        .node(Some(&finance), "ACCOUNTING", DepartmentCode::Finance)
        .await;

    let mut managerial = Vec::new();
    for action in [
        actions::LEAVE_APPROVE,
        actions::EMPLOYEE_SUSPEND,
        actions::EMPLOYEE_BLOCK,
        actions::EMPLOYEE_TERMINATE,
        actions::EMPLOYEE_RESTORE,
    ] {
        managerial.push(
            harness
                .permission(
                    action,
                    ActionType::Administrative,
                    HierarchyScope::Descendant,
                    &[DepartmentCode::All],
                )
                .await,
        );
    }
    let read = harness
        .permission(
            actions::PERMISSION_READ,
            ActionType::Informational,
            HierarchyScope::Organization,
            &[DepartmentCode::All],
        )
        .await;
    let apply = harness
        .permission(
            actions::LEAVE_APPLY,
            ActionType::Functional,
            HierarchyScope::OwnRecord,
            &[DepartmentCode::All],
        )
        .await;
    let post = harness
        .permission(
            "ledger.post",
            ActionType::Functional,
            HierarchyScope::Department,
            &[DepartmentCode::Finance],
        )
        .await;
    let close = harness
        .permission(
            "books.close",
            ActionType::Functional,
            HierarchyScope::Department,
            &[DepartmentCode::Finance],
        )
        .await;
    let enter = harness
        .permission(
            "invoice.enter",
            ActionType::Functional,
            HierarchyScope::Department,
            &[DepartmentCode::Finance],
        )
        .await;

    let mut manager_permissions: Vec<_> = managerial.iter().collect();
    manager_permissions.extend([&read, &apply]);
    let manager_role = harness.role("Finance Manager", &manager_permissions).await;
    let accountant_role = harness.role("Accountant", &[&post, &apply]).await;
    let clerk_role = harness.role("Clerk", &[&enter, &apply]).await;

    let manager = harness
        .place(&manager_role, &finance, DepartmentCode::Finance, &[])
        .await;
    let accountant = harness
        .place(
            &accountant_role,
            &desk,
            DepartmentCode::Finance,
            &[PermissionOverride {
                permission_id: close.id(),
                bypass_hierarchy: true,
            }],
        )
        .await;
    let clerk = harness
        .place(&clerk_role, &desk, DepartmentCode::Finance, &[])
        .await;

    Team {
        harness,
        manager,
        accountant,
        clerk,
    }
}

fn leave_input(days: i64) -> ApplyLeaveInput {
    let starts_at = Utc::now();
    ApplyLeaveInput {
        starts_at,
        ends_at: starts_at + Duration::days(days),
        reason: "family matters".to_owned(),
    }
}

async fn grants(team: &Team, employee_id: EmployeeId) -> GrantState {
    team.harness
        .store
        .active_grants(employee_id)
        .await
        .unwrap_or_else(|| unreachable!())
}

async fn lifecycle(team: &Team, employee_id: EmployeeId) -> EmployeeLifecycle {
    team.harness
        .store
        .stored_lifecycle(employee_id)
        .await
        .unwrap_or_else(|| unreachable!())
}

async fn start_delegated_leave(team: &Team, days: i64) {
    let applied = team
        .harness
        .lifecycle
        .apply_leave(&actor(team.accountant), team.accountant, leave_input(days))
        .await;
    assert!(applied.is_ok());

    let accepted = team
        .harness
        .lifecycle
        .accept_leave(&actor(team.manager), team.accountant, team.clerk)
        .await;
    assert!(accepted.is_ok());
}

#[tokio::test]
async fn leave_round_trip_restores_both_employees_exactly() {
    let team = team(Harness::new()).await;
    let accountant_before = grants(&team, team.accountant).await;
    let clerk_before = grants(&team, team.clerk).await;

    start_delegated_leave(&team, 5).await;

    assert_eq!(grants(&team, team.accountant).await, GrantState::cleared());
    let delegated = team
        .harness
        .aggregator
        .effective_permissions(team.clerk)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(delegated.contains("ledger.post"));
    assert!(delegated.contains("books.close"));
    assert!(delegated.contains("invoice.enter"));
    assert_eq!(
        lifecycle(&team, team.accountant).await.state(),
        LifecycleState::OnLeaveAccepted
    );

    let released = team
        .harness
        .lifecycle
        .take_back_leave(&actor(team.accountant), team.accountant)
        .await;
    assert!(matches!(
        released,
        Ok(LeaveRelease::Restored { delegate_id, .. }) if delegate_id == team.clerk
    ));

    assert_eq!(grants(&team, team.accountant).await, accountant_before);
    assert_eq!(grants(&team, team.clerk).await, clerk_before);
    let accountant = lifecycle(&team, team.accountant).await;
    assert_eq!(accountant.state(), LifecycleState::Normal);
    assert!(accountant.snapshot().is_none());
    assert!(lifecycle(&team, team.clerk).await.delegation_hold().is_none());

    let repeated = team
        .harness
        .lifecycle
        .take_back_leave(&actor(team.manager), team.accountant)
        .await;
    assert!(matches!(repeated, Ok(LeaveRelease::AlreadyRestored)));
    assert_eq!(grants(&team, team.clerk).await, clerk_before);
}

#[tokio::test]
async fn accepting_leave_needs_authority_over_the_leave_taker() {
    let team = team(Harness::new()).await;
    let applied = team
        .harness
        .lifecycle
        .apply_leave(&actor(team.accountant), team.accountant, leave_input(3))
        .await;
    assert!(applied.is_ok());

    let result = team
        .harness
        .lifecycle
        .accept_leave(&actor(team.clerk), team.accountant, team.clerk)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(
        lifecycle(&team, team.accountant).await.state(),
        LifecycleState::OnLeavePending
    );
}

#[tokio::test]
async fn self_delegation_is_rejected() {
    let team = team(Harness::new()).await;
    let applied = team
        .harness
        .lifecycle
        .apply_leave(&actor(team.accountant), team.accountant, leave_input(3))
        .await;
    assert!(applied.is_ok());

    let result = team
        .harness
        .lifecycle
        .accept_leave(&actor(team.manager), team.accountant, team.accountant)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn rejected_leave_leaves_grants_untouched() {
    let team = team(Harness::new()).await;
    let before = grants(&team, team.accountant).await;
    let applied = team
        .harness
        .lifecycle
        .apply_leave(&actor(team.accountant), team.accountant, leave_input(3))
        .await;
    assert!(applied.is_ok());

    let rejected = team
        .harness
        .lifecycle
        .reject_leave(&actor(team.manager), team.accountant, "quarter close")
        .await;
    assert!(rejected.is_ok());

    assert_eq!(grants(&team, team.accountant).await, before);
    let stored = lifecycle(&team, team.accountant).await;
    assert_eq!(stored.state(), LifecycleState::Normal);
    assert!(stored.leave().is_some_and(|leave| leave.rejected));
}

#[tokio::test]
async fn notification_failure_does_not_undo_the_transition() {
    let team = team(Harness::with_failing_notifications()).await;
    let applied = team
        .harness
        .lifecycle
        .apply_leave(&actor(team.accountant), team.accountant, leave_input(3))
        .await;

    assert!(applied.is_ok());
    assert_eq!(
        lifecycle(&team, team.accountant).await.state(),
        LifecycleState::OnLeavePending
    );
    assert_eq!(team.harness.audit.events.lock().await.len(), 1);
}

#[tokio::test]
async fn acceptance_notifies_both_employees_and_is_audited() {
    let team = team(Harness::new()).await;
    start_delegated_leave(&team, 3).await;

    let sent = team.harness.notifications.sent.lock().await;
    assert!(sent.iter().any(|notification| {
        notification.recipient == team.accountant && notification.kind == NotificationKind::LeaveAccepted
    }));
    assert!(sent.iter().any(|notification| {
        notification.recipient == team.clerk
            && notification.kind == NotificationKind::DelegationReceived
    }));

    let actions: Vec<AuditAction> = team
        .harness
        .audit
        .events
        .lock()
        .await
        .iter()
        .map(|event| event.action)
        .collect();
    assert_eq!(actions, vec![AuditAction::LeaveApplied, AuditAction::LeaveAccepted]);
}

#[tokio::test]
async fn block_withdraws_grants_until_restored() {
    let team = team(Harness::new()).await;
    let before = grants(&team, team.accountant).await;

    let blocked = team
        .harness
        .lifecycle
        .block(
            &actor(team.manager),
            team.accountant,
            RestrictionInput {
                reason: "policy breach".to_owned(),
                ends_at: None,
            },
        )
        .await;
    assert!(blocked.is_ok());
    assert_eq!(grants(&team, team.accountant).await, GrantState::cleared());
    let permissions = team
        .harness
        .aggregator
        .effective_permissions(team.accountant)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(permissions.effective.is_empty());

    let restored = team
        .harness
        .lifecycle
        .restore(&actor(team.manager), team.accountant)
        .await;
    assert!(matches!(restored, Ok(StatusRelease::Restored(_))));
    assert_eq!(grants(&team, team.accountant).await, before);
    assert_eq!(
        lifecycle(&team, team.accountant).await.decision_status(),
        DecisionStatus::Restored
    );

    let repeated = team
        .harness
        .lifecycle
        .restore(&actor(team.manager), team.accountant)
        .await;
    assert!(matches!(repeated, Ok(StatusRelease::AlreadyRestored)));
}

#[tokio::test]
async fn suspension_keeps_grants_in_place() {
    let team = team(Harness::new()).await;
    let before = grants(&team, team.clerk).await;

    let suspended = team
        .harness
        .lifecycle
        .suspend(
            &actor(team.manager),
            team.clerk,
            RestrictionInput {
                reason: "investigation".to_owned(),
                ends_at: Some(Utc::now() + Duration::days(7)),
            },
        )
        .await;

    assert!(suspended.is_ok_and(|lifecycle| lifecycle.state() == LifecycleState::Suspended));
    assert_eq!(grants(&team, team.clerk).await, before);
}

#[tokio::test]
async fn delegate_cannot_be_restricted_while_covering() {
    let team = team(Harness::new()).await;
    start_delegated_leave(&team, 3).await;

    let result = team
        .harness
        .lifecycle
        .terminate(
            &actor(team.manager),
            team.clerk,
            RestrictionInput {
                reason: "restructuring".to_owned(),
                ends_at: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn peers_cannot_read_each_others_lifecycle() {
    let team = team(Harness::new()).await;

    let own = team
        .harness
        .lifecycle
        .lifecycle_for(&actor(team.clerk), team.clerk)
        .await;
    assert!(own.is_ok());

    let peer = team
        .harness
        .lifecycle
        .lifecycle_for(&actor(team.clerk), team.accountant)
        .await;
    assert!(matches!(peer, Err(AppError::Forbidden(_))));

    let manager = team
        .harness
        .lifecycle
        .lifecycle_for(&actor(team.manager), team.accountant)
        .await;
    assert!(manager.is_ok());
}

#[tokio::test]
async fn sweep_expires_leave_and_manual_take_back_is_then_a_no_op() {
    let team = team(Harness::new()).await;
    let clerk_before = grants(&team, team.clerk).await;
    let accountant_before = grants(&team, team.accountant).await;
    start_delegated_leave(&team, 1).await;

    let report = team
        .harness
        .sweep
        .sweep(Utc::now() + Duration::days(2))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(report.examined, 1);
    assert_eq!(report.leaves_expired, 1);
    assert_eq!(report.failures, 0);
    assert_eq!(grants(&team, team.clerk).await, clerk_before);
    assert_eq!(grants(&team, team.accountant).await, accountant_before);

    let manual = team
        .harness
        .lifecycle
        .take_back_leave(&actor(team.accountant), team.accountant)
        .await;
    assert!(matches!(manual, Ok(LeaveRelease::AlreadyRestored)));
    assert_eq!(grants(&team, team.clerk).await, clerk_before);
}

async fn delegate_posts_for_leave_taker(team: &Team) -> ReasonCode {
    team.harness
        .guard
        .can_perform_action(team.clerk, team.accountant, "ledger.post")
        .await
        .unwrap_or_else(|_| unreachable!())
        .reason()
}

#[tokio::test]
async fn sweep_from_another_process_reaches_a_shared_cache() {
    let team = team(Harness::with_cache()).await;
    start_delegated_leave(&team, 1).await;
    assert_eq!(
        delegate_posts_for_leave_taker(&team).await,
        ReasonCode::FunctionalAllowed
    );
    assert!(team.harness.cache.cached(team.clerk).await);

    let report = team
        .harness
        .detached_sweep(true)
        .sweep(Utc::now() + Duration::days(2))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(report.leaves_expired, 1);

    assert_eq!(
        delegate_posts_for_leave_taker(&team).await,
        ReasonCode::NoPermission
    );
}

#[tokio::test]
async fn uncached_reads_see_another_process_sweep_immediately() {
    let team = team(Harness::new()).await;
    start_delegated_leave(&team, 1).await;
    assert_eq!(
        delegate_posts_for_leave_taker(&team).await,
        ReasonCode::FunctionalAllowed
    );

    let report = team
        .harness
        .detached_sweep(false)
        .sweep(Utc::now() + Duration::days(2))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(report.leaves_expired, 1);

    assert_eq!(
        delegate_posts_for_leave_taker(&team).await,
        ReasonCode::NoPermission
    );
}

#[tokio::test]
async fn sweep_withdraws_pending_leave_and_lifts_lapsed_restrictions() {
    let team = team(Harness::new()).await;
    let applied = team
        .harness
        .lifecycle
        .apply_leave(&actor(team.accountant), team.accountant, leave_input(1))
        .await;
    assert!(applied.is_ok());
    let suspended = team
        .harness
        .lifecycle
        .suspend(
            &actor(team.manager),
            team.clerk,
            RestrictionInput {
                reason: "investigation".to_owned(),
                ends_at: Some(Utc::now() + Duration::hours(1)),
            },
        )
        .await;
    assert!(suspended.is_ok());

    let early = team
        .harness
        .sweep
        .sweep(Utc::now())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(early.examined, 0);

    let report = team
        .harness
        .sweep
        .sweep(Utc::now() + Duration::days(2))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(report.leaves_withdrawn, 1);
    assert_eq!(report.suspensions_lifted, 1);
    assert_eq!(
        lifecycle(&team, team.clerk).await.decision_status(),
        DecisionStatus::Restored
    );
}

#[tokio::test]
async fn sweep_flags_accepted_leave_without_delegate_hold() {
    let team = team(Harness::new()).await;
    start_delegated_leave(&team, 5).await;

    let clerk = lifecycle(&team, team.clerk).await;
    team.harness
        .store
        .overwrite_lifecycle(EmployeeLifecycle::new(team.clerk).with_version(clerk.version()))
        .await;

    let report = team
        .harness
        .sweep
        .sweep(Utc::now())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(report.inconsistencies, 1);
}
