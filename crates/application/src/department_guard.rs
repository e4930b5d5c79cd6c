use std::sync::Arc;

use orgauth_core::{AppError, AppResult, EmployeeId};
use orgauth_domain::{AuthorizationVerdict, DecisionStep, DepartmentCode, DepartmentScope, ReasonCode};

use crate::{AssignmentListQuery, AssignmentRepository};

/// Outcome of a department isolation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepartmentEvaluation {
    /// Request may proceed within the scope.
    Admitted(DepartmentScope),
    /// Request was denied.
    Denied(AuthorizationVerdict),
}

impl DepartmentEvaluation {
    /// Converts a denial into `Forbidden`.
    pub fn into_scope(self) -> AppResult<DepartmentScope> {
        match self {
            Self::Admitted(scope) => Ok(scope),
            Self::Denied(verdict) => Err(AppError::Forbidden(format!(
                "{}: {}",
                verdict.reason().as_str(),
                verdict.details()
            ))),
        }
    }
}

/// Request-scoped department isolation.
#[derive(Clone)]
pub struct DepartmentGuard {
    assignments: Arc<dyn AssignmentRepository>,
}

impl DepartmentGuard {
    /// Creates a guard over the assignment store.
    #[must_use]
    pub fn new(assignments: Arc<dyn AssignmentRepository>) -> Self {
        Self { assignments }
    }

    /// Checks that `actor_id` may address `target_department`.
    pub async fn evaluate(
        &self,
        actor_id: EmployeeId,
        target_department: Option<DepartmentCode>,
    ) -> AppResult<DepartmentEvaluation> {
        let Some(assignment) = self.assignments.find_active(actor_id).await? else {
            return Ok(DepartmentEvaluation::Denied(AuthorizationVerdict::deny(
                ReasonCode::NoAssignment,
                DecisionStep::DepartmentIsolation,
                format!("actor '{actor_id}' has no active assignment"),
            )));
        };

        let scope = DepartmentScope::for_department(assignment.department());
        if let (DepartmentScope::Restricted(own), Some(requested)) = (scope, target_department)
            && !requested.is_wildcard()
            && requested != own
        {
            tracing::debug!(
                actor_id = %actor_id,
                own = own.as_str(),
                requested = requested.as_str(),
                "cross-department request denied"
            );
            return Ok(DepartmentEvaluation::Denied(AuthorizationVerdict::deny(
                ReasonCode::CrossDepartmentDenied,
                DecisionStep::DepartmentIsolation,
                format!(
                    "{} staff cannot access {} data",
                    own.as_str(),
                    requested.as_str()
                ),
            )));
        }

        Ok(DepartmentEvaluation::Admitted(scope))
    }

    /// Narrows a listing to the actor's department unless they are unrestricted.
    pub async fn department_filter(
        &self,
        actor_id: EmployeeId,
        query: AssignmentListQuery,
    ) -> AppResult<AssignmentListQuery> {
        let scope = self.evaluate(actor_id, query.department).await?.into_scope()?;
        Ok(narrow_query(scope, query))
    }
}

/// Applies an already-evaluated scope to a listing query.
#[must_use]
pub fn narrow_query(scope: DepartmentScope, mut query: AssignmentListQuery) -> AssignmentListQuery {
    match scope.narrowed_to() {
        Some(department) => query.department = Some(department),
        None => {
            if query.department.is_some_and(|department| department.is_wildcard()) {
                query.department = None;
            }
        }
    }

    query
}
