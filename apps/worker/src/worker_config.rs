use std::env;
use std::str::FromStr;

use orgauth_core::{AppError, AppResult};
use orgauth_domain::EmptyStatusScopePolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpWorkerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub to_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerNotifications {
    Console,
    Smtp(SmtpWorkerConfig),
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub permission_cache_ttl_seconds: u32,
    pub empty_status_scope_policy: EmptyStatusScopePolicy,
    pub sweep_interval_seconds: u64,
    pub notifications: WorkerNotifications,
}

impl WorkerConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        if let Some(backend) = lookup("STORE_BACKEND")
            && backend != "postgres"
        {
            return Err(AppError::Validation(format!(
                "orgauth-worker needs a shared store; STORE_BACKEND must be 'postgres', got '{backend}'"
            )));
        }

        let database_url = required_non_empty(&lookup, "DATABASE_URL")?;
        let redis_url = lookup("REDIS_URL").filter(|value| !value.trim().is_empty());
        let permission_cache_ttl_seconds =
            parse_or(&lookup, "PERMISSION_CACHE_TTL_SECONDS", 60_u32)?;
        let empty_status_scope_policy = lookup("EMPTY_STATUS_SCOPE_POLICY")
            .filter(|value| !value.trim().is_empty())
            .map(|value| EmptyStatusScopePolicy::from_str(value.as_str()))
            .transpose()?
            .unwrap_or_default();
        let sweep_interval_seconds = parse_or(&lookup, "SWEEP_INTERVAL_SECONDS", 300_u64)?;

        if sweep_interval_seconds == 0 {
            return Err(AppError::Validation(
                "SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let notifications = match lookup("NOTIFICATION_PROVIDER")
            .unwrap_or_else(|| "console".to_owned())
            .as_str()
        {
            "console" => WorkerNotifications::Console,
            "smtp" => WorkerNotifications::Smtp(SmtpWorkerConfig {
                host: required_non_empty(&lookup, "SMTP_HOST")?,
                port: parse_or(&lookup, "SMTP_PORT", 587_u16)?,
                username: required_non_empty(&lookup, "SMTP_USERNAME")?,
                password: required_non_empty(&lookup, "SMTP_PASSWORD")?,
                from_address: required_non_empty(&lookup, "SMTP_FROM_ADDRESS")?,
                to_address: required_non_empty(&lookup, "SMTP_TO_ADDRESS")?,
            }),
            other => {
                return Err(AppError::Validation(format!(
                    "NOTIFICATION_PROVIDER must be either 'console' or 'smtp', got '{other}'"
                )));
            }
        };

        Ok(Self {
            database_url,
            redis_url,
            permission_cache_ttl_seconds,
            empty_status_scope_policy,
            sweep_interval_seconds,
            notifications,
        })
    }
}

fn required_non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use orgauth_core::AppResult;
    use orgauth_domain::EmptyStatusScopePolicy;

    use super::{WorkerConfig, WorkerNotifications};

    fn load(pairs: &[(&str, &str)]) -> AppResult<WorkerConfig> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        WorkerConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/orgauth")]);
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert_eq!(config.sweep_interval_seconds, 300);
        assert_eq!(config.permission_cache_ttl_seconds, 60);
        assert_eq!(
            config.empty_status_scope_policy,
            EmptyStatusScopePolicy::FailOpen
        );
        assert_eq!(config.notifications, WorkerNotifications::Console);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn memory_backend_is_rejected() {
        let result = load(&[
            ("STORE_BACKEND", "memory"),
            ("DATABASE_URL", "postgres://localhost/orgauth"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/orgauth"),
            ("SWEEP_INTERVAL_SECONDS", "0"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn database_url_is_required() {
        assert!(load(&[]).is_err());
    }
}
