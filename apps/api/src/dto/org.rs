use orgauth_domain::OrgNode;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// API representation of an org node.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/org-node-response.ts"
)]
pub struct OrgNodeResponse {
    pub node_id: String,
    pub name: String,
    pub level: u32,
    pub department: String,
    pub path: String,
    pub parent_id: Option<String>,
    pub is_active: bool,
}

impl From<OrgNode> for OrgNodeResponse {
    fn from(value: OrgNode) -> Self {
        Self {
            node_id: value.id().to_string(),
            name: value.name().to_owned(),
            level: value.level(),
            department: value.department().as_str().to_owned(),
            path: value.path().as_str().to_owned(),
            parent_id: value.parent_id().map(|parent_id| parent_id.to_string()),
            is_active: value.is_active(),
        }
    }
}

/// Incoming payload for creating an org node.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-org-node-request.ts"
)]
pub struct CreateOrgNodeRequest {
    pub parent_id: String,
    pub name: String,
    pub department: String,
}

/// Incoming payload for moving a subtree.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/reparent-org-node-request.ts"
)]
pub struct ReparentOrgNodeRequest {
    pub new_parent_id: String,
}
