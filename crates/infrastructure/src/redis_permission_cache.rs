//! Redis-backed permission cache shared by every API instance.

use async_trait::async_trait;
use orgauth_application::{EffectivePermissions, PermissionCache};
use orgauth_core::{AppError, AppResult, EmployeeId};
use redis::{AsyncCommands, Script};

// Entry keys embed the epoch so a global invalidation orphans every entry at once.
const GET_ENTRY_SCRIPT: &str = r#"
local epoch = redis.call('GET', KEYS[1]) or '0'
return redis.call('GET', ARGV[1] .. ':' .. epoch .. ':' .. ARGV[2])
"#;

const PUT_ENTRY_SCRIPT: &str = r#"
if (redis.call('GET', KEYS[1]) or '0') ~= ARGV[1] then
  return 0
end
local epoch = redis.call('GET', KEYS[2]) or '0'
redis.call('SET', ARGV[2] .. ':' .. epoch .. ':' .. ARGV[3], ARGV[4], 'EX', ARGV[5])
return 1
"#;

const INVALIDATE_SCRIPT: &str = r#"
redis.call('INCR', KEYS[1])
local epoch = redis.call('GET', KEYS[2]) or '0'
for index = 2, #ARGV do
  redis.call('DEL', ARGV[1] .. ':' .. epoch .. ':' .. ARGV[index])
end
return 1
"#;

const INVALIDATE_ALL_SCRIPT: &str = r#"
redis.call('INCR', KEYS[2])
redis.call('INCR', KEYS[1])
return 1
"#;

/// Redis implementation of the permission cache port.
#[derive(Clone)]
pub struct RedisPermissionCache {
    client: redis::Client,
    key_prefix: String,
    ttl_seconds: u32,
}

impl RedisPermissionCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>, ttl_seconds: u32) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            ttl_seconds,
        }
    }

    fn generation_key(&self) -> String {
        format!("{}:generation", self.key_prefix)
    }

    fn epoch_key(&self) -> String {
        format!("{}:epoch", self.key_prefix)
    }

    fn entry_base(&self) -> String {
        format!("{}:entry", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn generation(&self) -> AppResult<u64> {
        let mut connection = self.connection().await?;
        let generation: Option<u64> =
            connection
                .get(self.generation_key())
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to read permission cache generation: {error}"))
                })?;

        Ok(generation.unwrap_or(0))
    }

    async fn get(&self, employee_id: EmployeeId) -> AppResult<Option<EffectivePermissions>> {
        let script = Script::new(GET_ENTRY_SCRIPT);
        let mut connection = self.connection().await?;
        let encoded: Option<String> = script
            .key(self.epoch_key())
            .arg(self.entry_base())
            .arg(employee_id.to_string())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read permission cache entry: {error}"))
            })?;

        encoded
            .map(|value| {
                serde_json::from_str::<EffectivePermissions>(value.as_str()).map_err(|error| {
                    AppError::Internal(format!(
                        "invalid permission cache entry for employee '{employee_id}': {error}"
                    ))
                })
            })
            .transpose()
    }

    async fn put(&self, permissions: EffectivePermissions, generation: u64) -> AppResult<()> {
        if self.ttl_seconds == 0 {
            return Ok(());
        }

        let value = serde_json::to_string(&permissions).map_err(|error| {
            AppError::Internal(format!("failed to encode permission cache entry: {error}"))
        })?;
        let script = Script::new(PUT_ENTRY_SCRIPT);
        let mut connection = self.connection().await?;

        let stored = script
            .key(self.generation_key())
            .key(self.epoch_key())
            .arg(generation.to_string())
            .arg(self.entry_base())
            .arg(permissions.employee_id.to_string())
            .arg(value)
            .arg(i64::from(self.ttl_seconds))
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write permission cache entry: {error}"))
            })?;

        if stored == 0 {
            tracing::debug!(
                employee_id = %permissions.employee_id,
                generation,
                "dropping permissions computed under a stale cache generation"
            );
        }

        Ok(())
    }

    async fn invalidate(&self, employee_ids: &[EmployeeId]) -> AppResult<()> {
        let script = Script::new(INVALIDATE_SCRIPT);
        let mut connection = self.connection().await?;
        let mut invocation = script.prepare_invoke();
        invocation
            .key(self.generation_key())
            .key(self.epoch_key())
            .arg(self.entry_base());
        for employee_id in employee_ids {
            invocation.arg(employee_id.to_string());
        }

        invocation
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to invalidate permission cache: {error}"))
            })?;

        Ok(())
    }

    async fn invalidate_all(&self) -> AppResult<()> {
        let script = Script::new(INVALIDATE_ALL_SCRIPT);
        let mut connection = self.connection().await?;
        script
            .key(self.generation_key())
            .key(self.epoch_key())
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to invalidate permission cache: {error}"))
            })?;

        Ok(())
    }
}
