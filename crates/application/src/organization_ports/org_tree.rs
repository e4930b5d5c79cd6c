use async_trait::async_trait;
use orgauth_core::{AppResult, OrgNodeId};
use orgauth_domain::{OrgNode, OrgPath, OrgTree};

/// Repository port for the organization tree.
#[async_trait]
pub trait OrgTreeRepository: Send + Sync {
    /// Finds one node by id.
    async fn find_node(&self, node_id: OrgNodeId) -> AppResult<Option<OrgNode>>;

    /// Lists nodes whose path starts with `path` followed by the separator.
    async fn list_descendants(&self, path: &OrgPath) -> AppResult<Vec<OrgNode>>;

    /// Loads the whole tree into an arena.
    async fn load_tree(&self) -> AppResult<OrgTree>;

    /// Inserts a new node; duplicate paths and second roots are conflicts.
    async fn insert_node(&self, node: OrgNode) -> AppResult<()>;

    /// Overwrites existing nodes in one atomic unit.
    async fn save_nodes(&self, nodes: Vec<OrgNode>) -> AppResult<()>;
}
