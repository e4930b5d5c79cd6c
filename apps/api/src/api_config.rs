use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use orgauth_core::{AppError, EmployeeId};
use orgauth_domain::EmptyStatusScopePolicy;
use tracing_subscriber::EnvFilter;

const DEFAULT_PERMISSION_CACHE_TTL_SECONDS: u32 = 60;

/// What the binary was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCommand {
    Serve,
    Migrate,
    Bootstrap,
}

impl ApiCommand {
    pub fn from_argument(argument: Option<&str>) -> Result<Self, AppError> {
        match argument {
            None | Some("serve") => Ok(Self::Serve),
            Some("migrate") => Ok(Self::Migrate),
            Some("bootstrap") => Ok(Self::Bootstrap),
            Some(other) => Err(AppError::Validation(format!(
                "unknown command '{other}', expected 'serve', 'migrate' or 'bootstrap'"
            ))),
        }
    }
}

/// Where organization state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackendConfig {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpRuntimeConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub to_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationProviderConfig {
    Console,
    Smtp(SmtpRuntimeConfig),
}

/// Seed used by `orgauth-api bootstrap` and by in-memory deployments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub root_name: String,
    pub chairman_id: EmployeeId,
    pub role_name: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub command: ApiCommand,
    pub store_backend: StoreBackendConfig,
    pub api_host: String,
    pub api_port: u16,
    pub redis_url: Option<String>,
    pub permission_cache_ttl_seconds: u32,
    pub empty_status_scope_policy: EmptyStatusScopePolicy,
    pub notification_provider: NotificationProviderConfig,
    pub bootstrap: Option<BootstrapConfig>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let command = ApiCommand::from_argument(env::args().nth(1).as_deref())?;
        Self::from_lookup(command, |name| env::var(name).ok())
    }

    pub fn from_lookup(
        command: ApiCommand,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let store_backend = load_store_backend(&lookup)?;
        if command == ApiCommand::Migrate && store_backend == StoreBackendConfig::Memory {
            return Err(AppError::Validation(
                "migrate requires STORE_BACKEND=postgres".to_owned(),
            ));
        }

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = optional_parsed::<u16>(&lookup, "API_PORT")?.unwrap_or(3001);
        let redis_url = lookup("REDIS_URL").filter(|value| !value.trim().is_empty());
        let permission_cache_ttl_seconds =
            optional_parsed::<u32>(&lookup, "PERMISSION_CACHE_TTL_SECONDS")?
                .unwrap_or(DEFAULT_PERMISSION_CACHE_TTL_SECONDS);
        let empty_status_scope_policy = lookup("EMPTY_STATUS_SCOPE_POLICY")
            .filter(|value| !value.trim().is_empty())
            .map(|value| EmptyStatusScopePolicy::from_str(value.as_str()))
            .transpose()?
            .unwrap_or_default();

        let notification_provider = match lookup("NOTIFICATION_PROVIDER")
            .unwrap_or_else(|| "console".to_owned())
            .as_str()
        {
            "console" => NotificationProviderConfig::Console,
            "smtp" => {
                let port = required_non_empty(&lookup, "SMTP_PORT")?
                    .parse::<u16>()
                    .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;
                NotificationProviderConfig::Smtp(SmtpRuntimeConfig {
                    host: required_non_empty(&lookup, "SMTP_HOST")?,
                    port,
                    username: required_non_empty(&lookup, "SMTP_USERNAME")?,
                    password: required_non_empty(&lookup, "SMTP_PASSWORD")?,
                    from_address: required_non_empty(&lookup, "SMTP_FROM_ADDRESS")?,
                    to_address: required_non_empty(&lookup, "SMTP_TO_ADDRESS")?,
                })
            }
            other => {
                return Err(AppError::Validation(format!(
                    "NOTIFICATION_PROVIDER must be either 'console' or 'smtp', got '{other}'"
                )));
            }
        };

        let bootstrap = load_bootstrap(&lookup)?;
        if command == ApiCommand::Bootstrap && bootstrap.is_none() {
            return Err(AppError::Validation(
                "bootstrap requires BOOTSTRAP_CHAIRMAN_ID".to_owned(),
            ));
        }

        Ok(Self {
            command,
            store_backend,
            api_host,
            api_port,
            redis_url,
            permission_cache_ttl_seconds,
            empty_status_scope_policy,
            notification_provider,
            bootstrap,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_store_backend(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<StoreBackendConfig, AppError> {
    match lookup("STORE_BACKEND")
        .unwrap_or_else(|| "postgres".to_owned())
        .as_str()
    {
        "postgres" => Ok(StoreBackendConfig::Postgres {
            database_url: required_non_empty(lookup, "DATABASE_URL")?,
        }),
        "memory" => Ok(StoreBackendConfig::Memory),
        other => Err(AppError::Validation(format!(
            "STORE_BACKEND must be either 'postgres' or 'memory', got '{other}'"
        ))),
    }
}

fn load_bootstrap(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<BootstrapConfig>, AppError> {
    let Some(chairman_id) = lookup("BOOTSTRAP_CHAIRMAN_ID").filter(|value| !value.trim().is_empty())
    else {
        return Ok(None);
    };

    Ok(Some(BootstrapConfig {
        root_name: lookup("BOOTSTRAP_ROOT_NAME").unwrap_or_else(|| "CHAIRMAN".to_owned()),
        chairman_id: EmployeeId::from_str(chairman_id.as_str())?,
        role_name: lookup("BOOTSTRAP_ROLE_NAME").unwrap_or_else(|| "Chairman".to_owned()),
    }))
}

fn required_non_empty(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, AppError> {
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn optional_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
        })
        .transpose()
}
