use orgauth_core::{AppError, EmployeeId};
use orgauth_domain::{
    ActionType, AuthorizationVerdict, DecisionStep, DepartmentCode, HierarchyScope,
    PermissionOverride, ReasonCode,
};

use crate::test_support::Harness;

const DISCIPLINE: &str = "employee.discipline";
const EXPENSE_APPROVE: &str = "expense.approve";
const DIRECTORY_READ: &str = "directory.read";
const LEAVE_APPLY: &str = "leave.apply";

struct Org {
    harness: Harness,
    chairman: EmployeeId,
    /// Level 2, Finance, heads TREASURY.
    treasurer: EmployeeId,
    /// Level 4 below TREASURY, Finance.
    payroll_clerk: EmployeeId,
    /// Level 4 below TREASURY, tagged HR.
    seconded_clerk: EmployeeId,
    /// Level 4 in the AUDIT branch, Finance.
    sampler: EmployeeId,
    /// Level 2 in the AUDIT branch, Finance.
    auditor: EmployeeId,
    /// Level 2, HR branch.
    recruiter: EmployeeId,
    /// Level 2, Finance, bypass override on expense approval.
    controller: EmployeeId,
}

async fn org() -> Org {
    let harness = Harness::new();
    let root = harness.node(None, "CHAIRMAN", DepartmentCode::All).await;
    let finance = harness
        .node(Some(&root), "FINANCE", DepartmentCode::Finance)
        .await;
    let treasury = harness
        .node(Some(&finance), "TREASURY", DepartmentCode::Finance)
        .await;
    let accounting = harness
        .node(Some(&treasury), "ACCOUNTING", DepartmentCode::Finance)
        .await;
    let payroll = harness
        .node(Some(&accounting), "PAYROLL", DepartmentCode::Finance)
        .await;
    let audit = harness
        .node(Some(&finance), "AUDIT", DepartmentCode::Finance)
        .await;
    let internal = harness
        .node(Some(&audit), "INTERNAL", DepartmentCode::Finance)
        .await;
    let sampling = harness
        .node(Some(&internal), "SAMPLING", DepartmentCode::Finance)
        .await;
    let hr = harness
        .node(Some(&root), "HR", DepartmentCode::HumanResources)
        .await;
    let talent = harness
        .node(Some(&hr), "TALENT", DepartmentCode::HumanResources)
        .await;

    let discipline = harness
        .permission(
            DISCIPLINE,
            ActionType::Administrative,
            HierarchyScope::Descendant,
            &[DepartmentCode::Finance, DepartmentCode::HumanResources],
        )
        .await;
    let approve = harness
        .permission(
            EXPENSE_APPROVE,
            ActionType::Functional,
            HierarchyScope::Department,
            &[DepartmentCode::Finance, DepartmentCode::HumanResources],
        )
        .await;
    let directory = harness
        .permission(
            DIRECTORY_READ,
            ActionType::Informational,
            HierarchyScope::Organization,
            &[DepartmentCode::All],
        )
        .await;
    let leave = harness
        .permission(
            LEAVE_APPLY,
            ActionType::Functional,
            HierarchyScope::OwnRecord,
            &[DepartmentCode::All],
        )
        .await;

    let executive = harness.role("Executive", &[]).await;
    let manager = harness
        .role("Manager", &[&discipline, &approve, &directory, &leave])
        .await;
    let staff = harness.role("Staff", &[&leave]).await;

    let chairman = harness
        .place(&executive, &root, DepartmentCode::All, &[])
        .await;
    let treasurer = harness
        .place(&manager, &treasury, DepartmentCode::Finance, &[])
        .await;
    let payroll_clerk = harness
        .place(&staff, &payroll, DepartmentCode::Finance, &[])
        .await;
    let seconded_clerk = harness
        .place(&staff, &payroll, DepartmentCode::HumanResources, &[])
        .await;
    let sampler = harness
        .place(&staff, &sampling, DepartmentCode::Finance, &[])
        .await;
    let auditor = harness
        .place(&manager, &audit, DepartmentCode::Finance, &[])
        .await;
    let recruiter = harness
        .place(&staff, &talent, DepartmentCode::HumanResources, &[])
        .await;
    let controller = harness
        .place(
            &staff,
            &audit,
            DepartmentCode::Finance,
            &[PermissionOverride {
                permission_id: approve.id(),
                bypass_hierarchy: true,
            }],
        )
        .await;

    Org {
        harness,
        chairman,
        treasurer,
        payroll_clerk,
        seconded_clerk,
        sampler,
        auditor,
        recruiter,
        controller,
    }
}

async fn verdict(org: &Org, actor: EmployeeId, target: EmployeeId, action: &str) -> AuthorizationVerdict {
    org.harness
        .guard
        .can_perform_action(actor, target, action)
        .await
        .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn senior_manager_governs_their_own_subtree() {
    let org = org().await;
    let verdict = verdict(&org, org.treasurer, org.payroll_clerk, DISCIPLINE).await;

    assert!(verdict.allowed());
    assert_eq!(verdict.reason(), ReasonCode::AdministrativeAllowed);
}

#[tokio::test]
async fn administrative_action_across_departments_is_denied() {
    let org = org().await;
    let verdict = verdict(&org, org.treasurer, org.seconded_clerk, DISCIPLINE).await;

    assert!(!verdict.allowed());
    assert_eq!(verdict.reason(), ReasonCode::DepartmentViolation);
    assert_eq!(verdict.step(), DecisionStep::DepartmentAlignment);
}

#[tokio::test]
async fn administrative_action_outside_subtree_is_denied() {
    let org = org().await;
    let verdict = verdict(&org, org.treasurer, org.sampler, DISCIPLINE).await;

    assert!(!verdict.allowed());
    assert_eq!(verdict.reason(), ReasonCode::SubtreeViolation);
    assert_eq!(verdict.step(), DecisionStep::SubtreeContainment);
}

#[tokio::test]
async fn peers_cannot_act_administratively_on_each_other() {
    let org = org().await;
    let verdict = verdict(&org, org.treasurer, org.auditor, DISCIPLINE).await;

    assert_eq!(verdict.reason(), ReasonCode::HierarchyLevelViolation);
    assert_eq!(verdict.step(), DecisionStep::HierarchyLevel);
}

#[tokio::test]
async fn juniors_cannot_act_upwards() {
    let org = org().await;
    let verdict = verdict(&org, org.auditor, org.chairman, DISCIPLINE).await;

    assert_eq!(verdict.reason(), ReasonCode::HierarchyLevelViolation);
}

#[tokio::test]
async fn self_action_depends_on_own_record_scope() {
    let org = org().await;

    let own = verdict(&org, org.treasurer, org.treasurer, LEAVE_APPLY).await;
    assert!(own.allowed());
    assert_eq!(own.reason(), ReasonCode::SelfActionAllowed);

    let disciplinary = verdict(&org, org.treasurer, org.treasurer, DISCIPLINE).await;
    assert!(!disciplinary.allowed());
    assert_eq!(disciplinary.reason(), ReasonCode::SelfActionDenied);
}

#[tokio::test]
async fn functional_action_requires_matching_department() {
    let org = org().await;

    let same = verdict(&org, org.treasurer, org.sampler, EXPENSE_APPROVE).await;
    assert!(same.allowed());
    assert_eq!(same.reason(), ReasonCode::FunctionalAllowed);

    let foreign = verdict(&org, org.treasurer, org.recruiter, EXPENSE_APPROVE).await;
    assert!(!foreign.allowed());
    assert_eq!(foreign.reason(), ReasonCode::FunctionalDepartmentMismatch);
}

#[tokio::test]
async fn executive_passes_functional_checks_anywhere() {
    let org = org().await;
    let verdict = verdict(&org, org.chairman, org.recruiter, EXPENSE_APPROVE).await;

    assert!(verdict.allowed());
    assert_eq!(verdict.reason(), ReasonCode::ExecutiveAccess);
}

#[tokio::test]
async fn override_bypass_skips_department_alignment() {
    let org = org().await;
    let verdict = verdict(&org, org.controller, org.recruiter, EXPENSE_APPROVE).await;

    assert!(verdict.allowed());
    assert_eq!(verdict.reason(), ReasonCode::HierarchyBypassed);
}

#[tokio::test]
async fn informational_action_is_allowed_once_held() {
    let org = org().await;
    let verdict = verdict(&org, org.treasurer, org.recruiter, DIRECTORY_READ).await;

    assert!(verdict.allowed());
    assert_eq!(verdict.reason(), ReasonCode::InformationalAllowed);
}

#[tokio::test]
async fn missing_permission_is_checked_first() {
    let org = org().await;
    let verdict = verdict(&org, org.recruiter, EmployeeId::new(), DISCIPLINE).await;

    assert_eq!(verdict.reason(), ReasonCode::NoPermission);
    assert_eq!(verdict.step(), DecisionStep::PermissionExistence);
}

#[tokio::test]
async fn unplaced_target_is_denied() {
    let org = org().await;
    let verdict = verdict(&org, org.treasurer, EmployeeId::new(), DISCIPLINE).await;

    assert_eq!(verdict.reason(), ReasonCode::NoAssignment);
    assert_eq!(verdict.step(), DecisionStep::AssignmentResolution);
}

#[tokio::test]
async fn dangling_org_node_is_a_misconfiguration() {
    let org = org().await;
    let sampler_node = org
        .harness
        .guard
        .aggregator()
        .effective_permissions(org.sampler)
        .await
        .unwrap_or_else(|_| unreachable!())
        .org_node_id
        .unwrap_or_else(|| unreachable!());
    org.harness.store.remove_node(sampler_node).await;

    let verdict = verdict(&org, org.chairman, org.sampler, DIRECTORY_READ).await;
    assert_eq!(verdict.reason(), ReasonCode::NoOrgunit);

    let required = org
        .harness
        .guard
        .require_action(org.chairman, org.sampler, DIRECTORY_READ)
        .await;
    assert!(matches!(required, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn require_action_turns_denials_into_forbidden() {
    let org = org().await;
    let result = org
        .harness
        .guard
        .require_action(org.treasurer, org.sampler, DISCIPLINE)
        .await;

    match result {
        Err(AppError::Forbidden(message)) => assert!(message.starts_with("SUBTREE_VIOLATION")),
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn require_permission_checks_holding_only() {
    let org = org().await;

    assert!(
        org.harness
            .guard
            .require_permission(org.treasurer, DISCIPLINE)
            .await
            .is_ok()
    );
    assert!(matches!(
        org.harness
            .guard
            .require_permission(org.recruiter, DISCIPLINE)
            .await,
        Err(AppError::Forbidden(_))
    ));
}
