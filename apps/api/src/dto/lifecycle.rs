use chrono::{DateTime, Utc};
use orgauth_application::{ApplyLeaveInput, RestrictionInput};
use orgauth_domain::{
    DelegationRecord, EmployeeLifecycle, LeaveRelease, StatusRelease, StatusRestriction,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for a leave request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/apply-leave-request.ts"
)]
pub struct ApplyLeaveRequest {
    #[ts(type = "string")]
    pub starts_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub ends_at: DateTime<Utc>,
    pub reason: String,
}

impl From<ApplyLeaveRequest> for ApplyLeaveInput {
    fn from(value: ApplyLeaveRequest) -> Self {
        Self {
            starts_at: value.starts_at,
            ends_at: value.ends_at,
            reason: value.reason,
        }
    }
}

/// Incoming payload for accepting a leave.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/accept-leave-request.ts"
)]
pub struct AcceptLeaveRequest {
    pub delegate_id: String,
}

/// Incoming payload for rejecting a leave.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/reject-leave-request.ts"
)]
pub struct RejectLeaveRequest {
    pub reason: String,
}

/// Incoming payload for suspend, block and terminate.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/restriction-request.ts"
)]
pub struct RestrictionRequest {
    pub reason: String,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<RestrictionRequest> for RestrictionInput {
    fn from(value: RestrictionRequest) -> Self {
        Self {
            reason: value.reason,
            ends_at: value.ends_at,
        }
    }
}

/// Leave request as seen by clients.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/leave-response.ts"
)]
pub struct LeaveResponse {
    pub starts_at: String,
    pub ends_at: String,
    pub reason: String,
    pub on_leave: bool,
    pub accepted: bool,
    pub rejected: bool,
    pub rejection_reason: Option<String>,
    pub delegate_id: Option<String>,
}

impl From<&DelegationRecord> for LeaveResponse {
    fn from(value: &DelegationRecord) -> Self {
        Self {
            starts_at: value.window.starts_at().to_rfc3339(),
            ends_at: value.window.ends_at().to_rfc3339(),
            reason: value.reason.clone(),
            on_leave: value.on_leave,
            accepted: value.accepted,
            rejected: value.rejected,
            rejection_reason: value.rejection_reason.clone(),
            delegate_id: value.transferred_role_to.map(|id| id.to_string()),
        }
    }
}

/// Active restriction as seen by clients.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/restriction-response.ts"
)]
pub struct RestrictionResponse {
    pub kind: String,
    pub reason: String,
    pub imposed_by: String,
    pub starts_at: String,
    pub ends_at: Option<String>,
}

impl From<&StatusRestriction> for RestrictionResponse {
    fn from(value: &StatusRestriction) -> Self {
        Self {
            kind: value.kind.as_str().to_owned(),
            reason: value.reason.clone(),
            imposed_by: value.imposed_by.to_string(),
            starts_at: value.starts_at.to_rfc3339(),
            ends_at: value.ends_at.map(|ends_at| ends_at.to_rfc3339()),
        }
    }
}

/// Lifecycle record of one employee.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/lifecycle-response.ts"
)]
pub struct LifecycleResponse {
    pub employee_id: String,
    pub state: String,
    pub decision_status: String,
    pub has_snapshot: bool,
    pub leave: Option<LeaveResponse>,
    pub restriction: Option<RestrictionResponse>,
    pub holding_delegation_for: Option<String>,
    pub version: u64,
}

impl From<EmployeeLifecycle> for LifecycleResponse {
    fn from(value: EmployeeLifecycle) -> Self {
        Self {
            employee_id: value.employee_id().to_string(),
            state: value.state().as_str().to_owned(),
            decision_status: value.decision_status().as_str().to_owned(),
            has_snapshot: value.snapshot().is_some(),
            leave: value.leave().map(LeaveResponse::from),
            restriction: value.restriction().map(RestrictionResponse::from),
            holding_delegation_for: value
                .delegation_hold()
                .map(|hold| hold.leave_taker_id.to_string()),
            version: value.version(),
        }
    }
}

/// Outcome of taking back a leave.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/leave-release-response.ts"
)]
pub struct LeaveReleaseResponse {
    #[ts(type = "\"restored\" | \"withdrawn\" | \"already_restored\"")]
    pub outcome: &'static str,
    pub delegate_id: Option<String>,
}

impl From<LeaveRelease> for LeaveReleaseResponse {
    fn from(value: LeaveRelease) -> Self {
        match value {
            LeaveRelease::Restored { delegate_id, .. } => Self {
                outcome: "restored",
                delegate_id: Some(delegate_id.to_string()),
            },
            LeaveRelease::Withdrawn => Self {
                outcome: "withdrawn",
                delegate_id: None,
            },
            LeaveRelease::AlreadyRestored => Self {
                outcome: "already_restored",
                delegate_id: None,
            },
        }
    }
}

/// Outcome of restoring an employee.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/status-release-response.ts"
)]
pub struct StatusReleaseResponse {
    #[ts(type = "\"restored\" | \"already_restored\"")]
    pub outcome: &'static str,
    pub previous_decision_status: Option<String>,
}

impl From<StatusRelease> for StatusReleaseResponse {
    fn from(value: StatusRelease) -> Self {
        match value {
            StatusRelease::Restored(snapshot) => Self {
                outcome: "restored",
                previous_decision_status: Some(snapshot.decision_status.as_str().to_owned()),
            },
            StatusRelease::AlreadyRestored => Self {
                outcome: "already_restored",
                previous_decision_status: None,
            },
        }
    }
}
