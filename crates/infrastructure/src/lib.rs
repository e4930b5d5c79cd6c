//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_notification_sender;
mod in_memory_organization_store;
mod in_memory_permission_cache;
mod postgres_assignment_repository;
mod postgres_audit_repository;
mod postgres_catalog_repository;
mod postgres_lifecycle_repository;
mod postgres_org_tree_repository;
mod redis_permission_cache;
mod smtp_notification_sender;

#[cfg(test)]
mod postgres_test_support;

pub use console_notification_sender::ConsoleNotificationSender;
pub use in_memory_organization_store::InMemoryOrganizationStore;
pub use in_memory_permission_cache::InMemoryPermissionCache;
pub use postgres_assignment_repository::PostgresAssignmentRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_catalog_repository::PostgresCatalogRepository;
pub use postgres_lifecycle_repository::PostgresLifecycleRepository;
pub use postgres_org_tree_repository::PostgresOrgTreeRepository;
pub use redis_permission_cache::RedisPermissionCache;
pub use smtp_notification_sender::{SmtpNotificationConfig, SmtpNotificationSender};
