use super::*;

use orgauth_domain::actions;

use crate::AssignmentListQuery;

/// Input payload for creating an org node below an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrgNodeInput {
    /// Parent node.
    pub parent_id: OrgNodeId,
    /// Node name; becomes the last path segment.
    pub name: String,
    /// Department of the node.
    pub department: DepartmentCode,
}

impl SecurityAdminService {
    /// Creates an org node inside the actor's subtree.
    pub async fn create_org_node(
        &self,
        actor: &ActorIdentity,
        input: CreateOrgNodeInput,
    ) -> AppResult<OrgNode> {
        self.guard
            .require_permission(actor.employee_id(), actions::ORG_STRUCTURE_MANAGE)
            .await?;
        self.ensure_within_reach(actor, input.parent_id, Some(input.department))
            .await?;

        let node = self
            .org_tree
            .create_node(Some(input.parent_id), input.name.as_str(), input.department)
            .await?;

        self.append_audit(
            actor.subject(),
            AuditAction::OrgNodeCreated,
            "org_node",
            node.id().to_string(),
            format!("created '{}'", node.path()),
        )
        .await?;

        Ok(node)
    }

    /// Moves a subtree below a new parent, rewriting every path in one unit.
    pub async fn reparent_org_node(
        &self,
        actor: &ActorIdentity,
        node_id: OrgNodeId,
        new_parent_id: OrgNodeId,
    ) -> AppResult<Vec<OrgNode>> {
        self.guard
            .require_permission(actor.employee_id(), actions::ORG_STRUCTURE_MANAGE)
            .await?;
        self.ensure_within_reach(actor, node_id, None).await?;
        self.ensure_within_reach(actor, new_parent_id, None).await?;

        let moved = self.org_tree.reparent(node_id, new_parent_id).await?;
        self.guard.aggregator().invalidate_all().await?;
        tracing::info!(org_node_id = %node_id, moved = moved.len(), "org subtree re-parented");

        let new_path = moved
            .first()
            .map(|node| node.path().to_string())
            .unwrap_or_default();
        self.append_audit(
            actor.subject(),
            AuditAction::OrgNodeReparented,
            "org_node",
            node_id.to_string(),
            format!("moved to '{new_path}' with {} node(s)", moved.len()),
        )
        .await?;

        Ok(moved)
    }

    /// Deactivates an org node with nothing active at or below it.
    pub async fn deactivate_org_node(
        &self,
        actor: &ActorIdentity,
        node_id: OrgNodeId,
    ) -> AppResult<OrgNode> {
        self.guard
            .require_permission(actor.employee_id(), actions::ORG_STRUCTURE_MANAGE)
            .await?;
        let node = self.ensure_within_reach(actor, node_id, None).await?;

        let occupied = self
            .assignment_service
            .list(AssignmentListQuery {
                org_node_id: Some(node_id),
                limit: 1,
                ..AssignmentListQuery::default()
            })
            .await?;
        if !occupied.is_empty() {
            return Err(AppError::Conflict(format!(
                "org node '{}' still has active assignments",
                node.path()
            )));
        }

        let node = self.org_tree.deactivate(node_id).await?;
        self.append_audit(
            actor.subject(),
            AuditAction::OrgNodeDeactivated,
            "org_node",
            node_id.to_string(),
            format!("deactivated '{}'", node.path()),
        )
        .await?;

        Ok(node)
    }
}
