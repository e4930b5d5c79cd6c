mod database;
mod redis;
mod state_builder;

pub use database::{connect, run_migrations};
pub use redis::build_redis_client;
pub use state_builder::{RepositorySet, build_app_state};
