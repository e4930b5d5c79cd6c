use async_trait::async_trait;
use orgauth_application::OrgTreeRepository;
use orgauth_core::{AppError, AppResult, OrgNodeId};
use orgauth_domain::{OrgNode, OrgPath, OrgTree};

use super::InMemoryOrganizationStore;

#[async_trait]
impl OrgTreeRepository for InMemoryOrganizationStore {
    async fn find_node(&self, node_id: OrgNodeId) -> AppResult<Option<OrgNode>> {
        Ok(self.state.read().await.nodes.get(&node_id).cloned())
    }

    async fn list_descendants(&self, path: &OrgPath) -> AppResult<Vec<OrgNode>> {
        let state = self.state.read().await;
        let mut nodes: Vec<OrgNode> = state
            .nodes
            .values()
            .filter(|node| path.is_ancestor_of(node.path()))
            .cloned()
            .collect();
        nodes.sort_by(|left, right| left.path().as_str().cmp(right.path().as_str()));

        Ok(nodes)
    }

    async fn load_tree(&self) -> AppResult<OrgTree> {
        OrgTree::from_nodes(self.state.read().await.nodes.values().cloned())
    }

    async fn insert_node(&self, node: OrgNode) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state
            .nodes
            .values()
            .any(|existing| existing.path() == node.path())
        {
            return Err(AppError::Conflict(format!(
                "org path '{}' already exists",
                node.path()
            )));
        }

        let mut tree = OrgTree::from_nodes(state.nodes.values().cloned())?;
        tree.insert(node.clone())?;
        state.nodes.insert(node.id(), node);

        Ok(())
    }

    async fn save_nodes(&self, nodes: Vec<OrgNode>) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(missing) = nodes.iter().find(|node| !state.nodes.contains_key(&node.id())) {
            return Err(AppError::NotFound(format!(
                "org node '{}' was not found",
                missing.id()
            )));
        }

        for node in nodes {
            state.nodes.insert(node.id(), node);
        }

        Ok(())
    }
}
