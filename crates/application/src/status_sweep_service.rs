use std::sync::Arc;

use chrono::{DateTime, Utc};
use orgauth_core::{AppResult, EmployeeId};
use orgauth_domain::{DueRestoration, LeaveRelease, RestrictionKind, StatusRelease};

use crate::{LifecycleRepository, LifecycleService};

/// Counters produced by one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records whose end date had passed.
    pub examined: usize,
    /// Accepted leaves ended.
    pub leaves_expired: usize,
    /// Pending leaves withdrawn because their window passed.
    pub leaves_withdrawn: usize,
    /// Suspensions lifted.
    pub suspensions_lifted: usize,
    /// Blocks lifted.
    pub blocks_lifted: usize,
    /// Terminations lifted.
    pub terminations_lifted: usize,
    /// Records already restored by a concurrent request.
    pub already_restored: usize,
    /// Restorations that failed.
    pub failures: usize,
    /// Accepted leaves whose delegate holds no matching delegation.
    pub inconsistencies: usize,
}

/// Periodic restoration of lapsed leaves and restrictions.
#[derive(Clone)]
pub struct StatusSweepService {
    lifecycle_service: LifecycleService,
    lifecycles: Arc<dyn LifecycleRepository>,
}

impl StatusSweepService {
    /// Creates a new sweep service.
    #[must_use]
    pub fn new(lifecycle_service: LifecycleService, lifecycles: Arc<dyn LifecycleRepository>) -> Self {
        Self {
            lifecycle_service,
            lifecycles,
        }
    }

    /// Restores every record whose end date is at or before `now`.
    ///
    /// One employee's failure is counted and logged; the sweep continues.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();

        for lifecycle in self.lifecycles.list_due(now).await? {
            let Some(due) = lifecycle.due_restoration(now) else {
                continue;
            };
            report.examined += 1;
            self.restore_one(lifecycle.employee_id(), due, now, &mut report)
                .await;
        }

        report.inconsistencies = self.check_delegations().await?;

        if report.failures > 0 || report.inconsistencies > 0 {
            tracing::warn!(?report, "status sweep finished with problems");
        } else {
            tracing::info!(?report, "status sweep finished");
        }

        Ok(report)
    }

    async fn restore_one(
        &self,
        employee_id: EmployeeId,
        due: DueRestoration,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) {
        match due {
            DueRestoration::LeaveExpired => {
                match self.lifecycle_service.expire_leave(employee_id, now).await {
                    Ok(LeaveRelease::Restored { .. }) => report.leaves_expired += 1,
                    Ok(LeaveRelease::Withdrawn) => report.leaves_withdrawn += 1,
                    Ok(LeaveRelease::AlreadyRestored) => report.already_restored += 1,
                    Err(error) => {
                        report.failures += 1;
                        tracing::error!(employee_id = %employee_id, error = %error, "leave expiry failed");
                    }
                }
            }
            DueRestoration::RestrictionLapsed(kind) => {
                match self.lifecycle_service.lapse_restriction(employee_id).await {
                    Ok(StatusRelease::Restored(_)) => match kind {
                        RestrictionKind::Suspension => report.suspensions_lifted += 1,
                        RestrictionKind::Block => report.blocks_lifted += 1,
                        RestrictionKind::Termination => report.terminations_lifted += 1,
                    },
                    Ok(StatusRelease::AlreadyRestored) => report.already_restored += 1,
                    Err(error) => {
                        report.failures += 1;
                        tracing::error!(
                            employee_id = %employee_id,
                            restriction = kind.as_str(),
                            error = %error,
                            "restriction lapse failed"
                        );
                    }
                }
            }
        }
    }

    /// Counts accepted leaves whose delegate does not hold the matching delegation.
    async fn check_delegations(&self) -> AppResult<usize> {
        let mut inconsistencies = 0;

        for lifecycle in self.lifecycles.list_on_accepted_leave().await? {
            let leave_taker_id = lifecycle.employee_id();
            let Some(delegate_id) = lifecycle
                .leave()
                .and_then(|leave| leave.transferred_role_to)
            else {
                inconsistencies += 1;
                tracing::error!(leave_taker_id = %leave_taker_id, "accepted leave has no delegate");
                continue;
            };

            let held = self
                .lifecycles
                .find(delegate_id)
                .await?
                .and_then(|delegate| delegate.delegation_hold().map(|hold| hold.leave_taker_id));
            if held != Some(leave_taker_id) {
                inconsistencies += 1;
                tracing::error!(
                    leave_taker_id = %leave_taker_id,
                    delegate_id = %delegate_id,
                    "accepted leave without a matching delegate hold"
                );
            }
        }

        Ok(inconsistencies)
    }
}
