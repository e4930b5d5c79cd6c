use std::sync::Arc;

use orgauth_core::{AppError, AppResult, OrgNodeId};
use orgauth_domain::{DepartmentCode, NodeRelation, OrgNode};

use crate::OrgTreeRepository;

/// Read and write access to the organization tree.
#[derive(Clone)]
pub struct OrgTreeService {
    repository: Arc<dyn OrgTreeRepository>,
}

impl OrgTreeService {
    /// Creates a new service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn OrgTreeRepository>) -> Self {
        Self { repository }
    }

    /// Returns one node.
    pub async fn node(&self, node_id: OrgNodeId) -> AppResult<Option<OrgNode>> {
        self.repository.find_node(node_id).await
    }

    /// Returns one node or `NotFound`.
    pub async fn require_node(&self, node_id: OrgNodeId) -> AppResult<OrgNode> {
        self.repository
            .find_node(node_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("org node '{node_id}' was not found")))
    }

    /// Returns the nodes from `node_id` up to and including the root.
    ///
    /// A parent link that does not resolve is reported as `NotFound`, never
    /// truncated. A chain longer than the node's depth is a corrupted tree.
    pub async fn path_to_root(&self, node_id: OrgNodeId) -> AppResult<Vec<OrgNode>> {
        let start = self.require_node(node_id).await?;
        let max_len = start.level() as usize + 1;
        let mut chain = vec![start];

        while let Some(parent_id) = chain.last().and_then(OrgNode::parent_id) {
            if chain.len() >= max_len {
                tracing::error!(node_id = %node_id, "org tree parent chain exceeds node depth");
                return Err(AppError::Internal(format!(
                    "parent chain of org node '{node_id}' is longer than its depth"
                )));
            }

            let parent = self.repository.find_node(parent_id).await?.ok_or_else(|| {
                tracing::error!(node_id = %node_id, missing = %parent_id, "org tree parent link is broken");
                AppError::NotFound(format!(
                    "org node '{parent_id}' referenced while walking up from '{node_id}' was not found"
                ))
            })?;
            chain.push(parent);
        }

        Ok(chain)
    }

    /// Returns the root node, if the tree has been seeded.
    pub async fn root(&self) -> AppResult<Option<OrgNode>> {
        Ok(self.repository.load_tree().await?.root().cloned())
    }

    /// Returns every node below `node_id` by materialized-path prefix.
    pub async fn descendants(&self, node_id: OrgNodeId) -> AppResult<Vec<OrgNode>> {
        let node = self.require_node(node_id).await?;
        self.repository.list_descendants(node.path()).await
    }

    /// Returns whether `ancestor_id` lies strictly above `descendant_id`.
    pub async fn is_ancestor_of(
        &self,
        ancestor_id: OrgNodeId,
        descendant_id: OrgNodeId,
    ) -> AppResult<bool> {
        Ok(self.relation(ancestor_id, descendant_id).await? == NodeRelation::Ancestor)
    }

    /// Returns how `from_id` relates to `to_id`.
    pub async fn relation(&self, from_id: OrgNodeId, to_id: OrgNodeId) -> AppResult<NodeRelation> {
        let from = self.require_node(from_id).await?;
        let to = self.require_node(to_id).await?;
        Ok(from.relation_to(&to))
    }

    pub(crate) async fn create_node(
        &self,
        parent_id: Option<OrgNodeId>,
        name: &str,
        department: DepartmentCode,
    ) -> AppResult<OrgNode> {
        let node = match parent_id {
            None => OrgNode::root(name, department)?,
            Some(parent_id) => {
                let parent = self.require_node(parent_id).await?;
                if !parent.is_active() {
                    return Err(AppError::Validation(format!(
                        "cannot create a node below inactive org node '{}'",
                        parent.path()
                    )));
                }
                if !parent.department().covers(department) {
                    return Err(AppError::Validation(format!(
                        "department '{}' does not fit below '{}' ({})",
                        department.as_str(),
                        parent.path(),
                        parent.department().as_str()
                    )));
                }
                OrgNode::child_of(&parent, name, department)?
            }
        };

        self.repository.insert_node(node.clone()).await?;
        Ok(node)
    }

    /// Moves a subtree; returns the rewritten nodes, moved node first.
    pub(crate) async fn reparent(
        &self,
        node_id: OrgNodeId,
        new_parent_id: OrgNodeId,
    ) -> AppResult<Vec<OrgNode>> {
        let tree = self.repository.load_tree().await?;
        let moved = tree.plan_reparent(node_id, new_parent_id)?;
        self.repository.save_nodes(moved.clone()).await?;
        Ok(moved)
    }

    pub(crate) async fn deactivate(&self, node_id: OrgNodeId) -> AppResult<OrgNode> {
        let mut node = self.require_node(node_id).await?;
        if node.is_root() {
            return Err(AppError::Validation(
                "the root org node cannot be deactivated".to_owned(),
            ));
        }

        let active_children = self
            .repository
            .list_descendants(node.path())
            .await?
            .into_iter()
            .any(|descendant| descendant.is_active());
        if active_children {
            return Err(AppError::Conflict(format!(
                "org node '{}' still has active nodes below it",
                node.path()
            )));
        }

        node.deactivate();
        self.repository.save_nodes(vec![node.clone()]).await?;
        Ok(node)
    }
}
