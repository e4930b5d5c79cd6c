use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use orgauth_application::{EffectivePermissions, PermissionCache};
use orgauth_core::{AppResult, EmployeeId};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct PermissionCacheEntry {
    permissions: EffectivePermissions,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct PermissionCacheState {
    generation: u64,
    entries: HashMap<EmployeeId, PermissionCacheEntry>,
}

/// In-process permission cache with a fixed time to live.
#[derive(Debug)]
pub struct InMemoryPermissionCache {
    ttl: Duration,
    state: RwLock<PermissionCacheState>,
}

impl InMemoryPermissionCache {
    /// Creates an empty cache; a zero `ttl_seconds` stores nothing.
    #[must_use]
    pub fn new(ttl_seconds: u32) -> Self {
        Self {
            ttl: Duration::from_secs(u64::from(ttl_seconds)),
            state: RwLock::new(PermissionCacheState::default()),
        }
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn generation(&self) -> AppResult<u64> {
        Ok(self.state.read().await.generation)
    }

    async fn get(&self, employee_id: EmployeeId) -> AppResult<Option<EffectivePermissions>> {
        {
            let state = self.state.read().await;
            match state.entries.get(&employee_id) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.permissions.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut state = self.state.write().await;
        if state
            .entries
            .get(&employee_id)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            state.entries.remove(&employee_id);
        }

        Ok(None)
    }

    async fn put(&self, permissions: EffectivePermissions, generation: u64) -> AppResult<()> {
        if self.ttl.is_zero() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        if state.generation != generation {
            tracing::debug!(
                employee_id = %permissions.employee_id,
                generation,
                current = state.generation,
                "dropping permissions computed under a stale cache generation"
            );
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now.checked_add(self.ttl).unwrap_or(now);
        state.entries.insert(
            permissions.employee_id,
            PermissionCacheEntry {
                permissions,
                expires_at,
            },
        );

        Ok(())
    }

    async fn invalidate(&self, employee_ids: &[EmployeeId]) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.generation += 1;
        for employee_id in employee_ids {
            state.entries.remove(employee_id);
        }

        Ok(())
    }

    async fn invalidate_all(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.entries.clear();

        Ok(())
    }
}
