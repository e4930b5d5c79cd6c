//! Organization authorization status sweep worker.

#![forbid(unsafe_code)]

mod worker_config;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use orgauth_application::{
    AuthorizationPolicy, HierarchyGuard, LifecycleService, NotificationSender,
    PermissionAggregator, StatusSweepService,
};
use orgauth_core::{AppError, AppResult};
use orgauth_infrastructure::{
    ConsoleNotificationSender, PostgresAssignmentRepository, PostgresAuditRepository,
    PostgresCatalogRepository, PostgresLifecycleRepository, PostgresOrgTreeRepository,
    RedisPermissionCache, SmtpNotificationConfig, SmtpNotificationSender,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::worker_config::{WorkerConfig, WorkerNotifications};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let sweep_service = build_sweep_service(pool, &config)?;

    info!(
        sweep_interval_seconds = config.sweep_interval_seconds,
        shared_cache = config.redis_url.is_some(),
        "orgauth-worker started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.sweep_interval_seconds));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match sweep_service.sweep(Utc::now()).await {
            Ok(report) => info!(
                examined = report.examined,
                leaves_expired = report.leaves_expired,
                leaves_withdrawn = report.leaves_withdrawn,
                suspensions_lifted = report.suspensions_lifted,
                blocks_lifted = report.blocks_lifted,
                terminations_lifted = report.terminations_lifted,
                already_restored = report.already_restored,
                failures = report.failures,
                inconsistencies = report.inconsistencies,
                "status sweep completed"
            ),
            Err(error) => warn!(error = %error, "status sweep failed"),
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_sweep_service(pool: PgPool, config: &WorkerConfig) -> AppResult<StatusSweepService> {
    let org_tree = Arc::new(PostgresOrgTreeRepository::new(pool.clone()));
    let assignments = Arc::new(PostgresAssignmentRepository::new(pool.clone()));
    let catalog = Arc::new(PostgresCatalogRepository::new(pool.clone()));
    let lifecycles = Arc::new(PostgresLifecycleRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool));

    let mut aggregator = PermissionAggregator::new(
        org_tree.clone(),
        assignments.clone(),
        catalog.clone(),
        catalog.clone(),
        AuthorizationPolicy {
            empty_status_scope: config.empty_status_scope_policy,
        },
    );
    // Restorations must reach the API's cached permission sets.
    if let Some(redis_url) = config.redis_url.as_deref() {
        let client = redis::Client::open(redis_url)
            .map_err(|error| AppError::Internal(format!("invalid REDIS_URL: {error}")))?;
        aggregator = aggregator.with_cache(Arc::new(RedisPermissionCache::new(
            client,
            "orgauth:permissions",
            config.permission_cache_ttl_seconds.max(1),
        )));
    }

    let guard = HierarchyGuard::new(aggregator, assignments.clone(), org_tree);
    let lifecycle_service = LifecycleService::new(
        guard,
        lifecycles.clone(),
        assignments,
        catalog,
        audit_repository,
        build_notification_sender(&config.notifications),
    );

    Ok(StatusSweepService::new(lifecycle_service, lifecycles))
}

fn build_notification_sender(notifications: &WorkerNotifications) -> Arc<dyn NotificationSender> {
    match notifications {
        WorkerNotifications::Console => Arc::new(ConsoleNotificationSender::new()),
        WorkerNotifications::Smtp(smtp) => {
            Arc::new(SmtpNotificationSender::new(SmtpNotificationConfig {
                host: smtp.host.clone(),
                port: smtp.port,
                username: smtp.username.clone(),
                password: smtp.password.clone(),
                from_address: smtp.from_address.clone(),
                to_address: smtp.to_address.clone(),
            }))
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
