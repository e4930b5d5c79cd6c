use async_trait::async_trait;
use orgauth_core::{AppResult, EmployeeId};

use crate::EffectivePermissions;

/// Optional cache port for aggregated permissions.
///
/// Every invalidation advances a generation counter; `put` drops values
/// computed under an older generation so a racing recompute cannot reinstate
/// stale grants.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Returns the current generation.
    async fn generation(&self) -> AppResult<u64>;

    /// Returns the cached permissions for one employee.
    async fn get(&self, employee_id: EmployeeId) -> AppResult<Option<EffectivePermissions>>;

    /// Stores permissions computed while `generation` was current.
    async fn put(&self, permissions: EffectivePermissions, generation: u64) -> AppResult<()>;

    /// Drops cached entries for the given employees.
    async fn invalidate(&self, employee_ids: &[EmployeeId]) -> AppResult<()>;

    /// Drops every cached entry.
    async fn invalidate_all(&self) -> AppResult<()>;
}
