//! The "power gap" decision protocol.

use std::sync::Arc;

use orgauth_core::{AppError, AppResult, EmployeeId};
use orgauth_domain::{
    ActionType, Assignment, AuthorizationVerdict, DecisionStep, HierarchyScope, OrgNode,
    PermissionDefinition, ReasonCode,
};

use crate::{AssignmentRepository, EffectivePermissions, OrgTreeRepository, PermissionAggregator};

/// Decides whether an actor may act on a target.
#[derive(Clone)]
pub struct HierarchyGuard {
    aggregator: PermissionAggregator,
    assignments: Arc<dyn AssignmentRepository>,
    org_tree: Arc<dyn OrgTreeRepository>,
}

struct Placement {
    assignment: Assignment,
    node: OrgNode,
}

impl HierarchyGuard {
    /// Creates a guard over the aggregator and stores.
    #[must_use]
    pub fn new(
        aggregator: PermissionAggregator,
        assignments: Arc<dyn AssignmentRepository>,
        org_tree: Arc<dyn OrgTreeRepository>,
    ) -> Self {
        Self {
            aggregator,
            assignments,
            org_tree,
        }
    }

    /// Returns the aggregator this guard evaluates against.
    #[must_use]
    pub fn aggregator(&self) -> &PermissionAggregator {
        &self.aggregator
    }

    /// Evaluates `action` for `actor_id` on `target_id`.
    ///
    /// Denials are verdicts; only store failures are errors.
    pub async fn can_perform_action(
        &self,
        actor_id: EmployeeId,
        target_id: EmployeeId,
        action: &str,
    ) -> AppResult<AuthorizationVerdict> {
        let verdict = self.evaluate(actor_id, target_id, action).await?;

        if verdict.allowed() {
            tracing::trace!(
                actor_id = %actor_id,
                target_id = %target_id,
                action,
                reason = verdict.reason().as_str(),
                "authorization allowed"
            );
        } else {
            tracing::debug!(
                actor_id = %actor_id,
                target_id = %target_id,
                action,
                reason = verdict.reason().as_str(),
                step = verdict.step().as_str(),
                "authorization denied"
            );
        }

        Ok(verdict)
    }

    /// Same as [`Self::can_perform_action`], turning a denial into `Forbidden`.
    pub async fn require_action(
        &self,
        actor_id: EmployeeId,
        target_id: EmployeeId,
        action: &str,
    ) -> AppResult<AuthorizationVerdict> {
        let verdict = self.can_perform_action(actor_id, target_id, action).await?;
        if verdict.allowed() {
            return Ok(verdict);
        }

        if verdict.reason().is_misconfiguration() {
            return Err(AppError::Internal(format!(
                "cannot authorize '{action}': {}",
                verdict.details()
            )));
        }

        Err(AppError::Forbidden(format!(
            "{} at {}: {}",
            verdict.reason().as_str(),
            verdict.step().as_str(),
            verdict.details()
        )))
    }

    /// Ensures the actor holds `action` at all, without a target.
    pub async fn require_permission(&self, actor_id: EmployeeId, action: &str) -> AppResult<()> {
        let permissions = self.aggregator.effective_permissions(actor_id).await?;
        if permissions.contains(action) {
            return Ok(());
        }

        tracing::debug!(actor_id = %actor_id, action, "permission missing");
        Err(AppError::Forbidden(format!(
            "{}: employee '{actor_id}' lacks permission '{action}'",
            ReasonCode::NoPermission.as_str()
        )))
    }

    async fn evaluate(
        &self,
        actor_id: EmployeeId,
        target_id: EmployeeId,
        action: &str,
    ) -> AppResult<AuthorizationVerdict> {
        let effective = self.aggregator.effective_permissions(actor_id).await?;
        let Some(permission) = effective.find(action).cloned() else {
            return Ok(AuthorizationVerdict::deny(
                ReasonCode::NoPermission,
                DecisionStep::PermissionExistence,
                format!("employee '{actor_id}' lacks permission '{action}'"),
            ));
        };

        let actor = match self.resolve(actor_id, "actor").await? {
            Ok(placement) => placement,
            Err(verdict) => return Ok(verdict),
        };
        let target = match self.resolve(target_id, "target").await? {
            Ok(placement) => placement,
            Err(verdict) => return Ok(verdict),
        };

        if actor_id == target_id {
            return Ok(evaluate_self_action(&permission));
        }

        Ok(match permission.action_type() {
            ActionType::Administrative => evaluate_administrative(&actor, &target),
            ActionType::Functional => {
                evaluate_functional(&permission, &effective, &actor, &target)
            }
            ActionType::Informational => AuthorizationVerdict::allow(
                ReasonCode::InformationalAllowed,
                DecisionStep::Informational,
                format!("'{action}' is read-only"),
            ),
        })
    }

    async fn resolve(
        &self,
        employee_id: EmployeeId,
        role: &str,
    ) -> AppResult<Result<Placement, AuthorizationVerdict>> {
        let Some(assignment) = self.assignments.find_active(employee_id).await? else {
            return Ok(Err(AuthorizationVerdict::deny(
                ReasonCode::NoAssignment,
                DecisionStep::AssignmentResolution,
                format!("{role} '{employee_id}' has no active assignment"),
            )));
        };

        let Some(node) = self.org_tree.find_node(assignment.org_node_id()).await? else {
            tracing::error!(
                employee_id = %employee_id,
                org_node_id = %assignment.org_node_id(),
                "active assignment references a missing org node"
            );
            return Ok(Err(AuthorizationVerdict::deny(
                ReasonCode::NoOrgunit,
                DecisionStep::AssignmentResolution,
                format!(
                    "{role} '{employee_id}' is placed at missing org node '{}'",
                    assignment.org_node_id()
                ),
            )));
        };

        Ok(Ok(Placement { assignment, node }))
    }
}

fn evaluate_self_action(permission: &PermissionDefinition) -> AuthorizationVerdict {
    if permission.hierarchy_scope() == HierarchyScope::OwnRecord {
        AuthorizationVerdict::allow(
            ReasonCode::SelfActionAllowed,
            DecisionStep::SelfAction,
            format!("'{}' applies to the actor's own record", permission.action()),
        )
    } else {
        AuthorizationVerdict::deny(
            ReasonCode::SelfActionDenied,
            DecisionStep::SelfAction,
            format!(
                "'{}' has scope {} and cannot target the actor",
                permission.action(),
                permission.hierarchy_scope().as_str()
            ),
        )
    }
}

fn evaluate_administrative(actor: &Placement, target: &Placement) -> AuthorizationVerdict {
    if actor.node.level() >= target.node.level() {
        return AuthorizationVerdict::deny(
            ReasonCode::HierarchyLevelViolation,
            DecisionStep::HierarchyLevel,
            format!(
                "actor level {} is not above target level {}",
                actor.node.level(),
                target.node.level()
            ),
        );
    }

    let actor_department = actor.assignment.department();
    let target_department = target.assignment.department();
    if !actor_department.is_wildcard() && actor_department != target_department {
        return AuthorizationVerdict::deny(
            ReasonCode::DepartmentViolation,
            DecisionStep::DepartmentAlignment,
            format!(
                "actor department {} differs from target department {}",
                actor_department.as_str(),
                target_department.as_str()
            ),
        );
    }

    if !actor.node.path().contains(target.node.path()) {
        return AuthorizationVerdict::deny(
            ReasonCode::SubtreeViolation,
            DecisionStep::SubtreeContainment,
            format!(
                "'{}' is outside the subtree of '{}'",
                target.node.path(),
                actor.node.path()
            ),
        );
    }

    AuthorizationVerdict::allow(
        ReasonCode::AdministrativeAllowed,
        DecisionStep::SubtreeContainment,
        format!("'{}' governs '{}'", actor.node.path(), target.node.path()),
    )
}

fn evaluate_functional(
    permission: &PermissionDefinition,
    effective: &EffectivePermissions,
    actor: &Placement,
    target: &Placement,
) -> AuthorizationVerdict {
    let override_bypass = effective
        .override_for(permission.id())
        .is_some_and(|value| value.bypass_hierarchy);
    if permission.bypass_hierarchy() || override_bypass {
        return AuthorizationVerdict::allow(
            ReasonCode::HierarchyBypassed,
            DecisionStep::Functional,
            format!("'{}' bypasses hierarchy checks", permission.action()),
        );
    }

    let actor_department = actor.assignment.department();
    if actor_department.is_wildcard() {
        return AuthorizationVerdict::allow(
            ReasonCode::ExecutiveAccess,
            DecisionStep::Functional,
            "actor has organization-wide access",
        );
    }

    let target_department = target.assignment.department();
    if actor_department == target_department {
        return AuthorizationVerdict::allow(
            ReasonCode::FunctionalAllowed,
            DecisionStep::Functional,
            format!("both employees are in {}", actor_department.as_str()),
        );
    }

    AuthorizationVerdict::deny(
        ReasonCode::FunctionalDepartmentMismatch,
        DecisionStep::Functional,
        format!(
            "actor department {} differs from target department {}",
            actor_department.as_str(),
            target_department.as_str()
        ),
    )
}

#[cfg(test)]
mod tests;
