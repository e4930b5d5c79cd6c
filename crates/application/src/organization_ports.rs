mod assignments;
mod audit;
mod cache;
mod catalog;
mod lifecycle;
mod notifications;
mod org_tree;

pub use assignments::{AssignmentListQuery, AssignmentRepository};
pub use audit::{AuditEvent, AuditRepository};
pub use cache::PermissionCache;
pub use catalog::{PermissionRepository, RoleRepository};
pub use lifecycle::{GrantUpdate, LifecycleCommit, LifecycleRepository};
pub use notifications::{Notification, NotificationKind, NotificationSender};
pub use org_tree::OrgTreeRepository;
