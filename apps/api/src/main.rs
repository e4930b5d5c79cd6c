//! Organization authorization engine HTTP API.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use orgauth_application::BootstrapInput;
use orgauth_core::AppError;
use tracing::info;

use crate::api_config::{ApiCommand, ApiConfig, BootstrapConfig, StoreBackendConfig, init_tracing};
use crate::api_services::{RepositorySet, build_app_state, connect, run_migrations};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let repositories = match &config.store_backend {
        StoreBackendConfig::Postgres { database_url } => {
            let pool = connect(database_url).await?;
            run_migrations(&pool).await?;
            if config.command == ApiCommand::Migrate {
                info!("database migrations applied successfully");
                return Ok(());
            }
            RepositorySet::postgres(&pool)
        }
        StoreBackendConfig::Memory => {
            tracing::warn!("using the in-memory store; organization state is lost on exit");
            RepositorySet::in_memory()
        }
    };

    let app_state = build_app_state(repositories, &config)?;

    match (config.command, &config.store_backend, &config.bootstrap) {
        (ApiCommand::Bootstrap, _, Some(seed)) => {
            bootstrap(&app_state, seed).await?;
            if config.store_backend != StoreBackendConfig::Memory {
                return Ok(());
            }
        }
        (ApiCommand::Serve, StoreBackendConfig::Memory, Some(seed)) => {
            bootstrap(&app_state, seed).await?;
        }
        _ => {}
    }

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {address}: {error}")))?;

    info!(%address, "orgauth api listening");
    axum::serve(listener, api_router::build_router(app_state))
        .await
        .map_err(|error| AppError::Internal(format!("api server failed: {error}")))
}

async fn bootstrap(app_state: &AppState, seed: &BootstrapConfig) -> Result<(), AppError> {
    let outcome = app_state
        .security_admin_service
        .bootstrap(BootstrapInput {
            root_name: seed.root_name.clone(),
            chairman_id: seed.chairman_id,
            role_name: seed.role_name.clone(),
        })
        .await?;

    info!(
        root = %outcome.root.path(),
        chairman_id = %outcome.assignment.employee_id(),
        role = outcome.role.name(),
        permissions = outcome.permissions.len(),
        "organization bootstrapped"
    );
    Ok(())
}
