//! Organizational tree model.
//!
//! Nodes are kept in an arena keyed by identifier. Each node carries its
//! parent link, its depth and a materialized path (`CHAIRMAN.FINANCE.ACCOUNTING`)
//! so subtree membership is a string-prefix test rather than a recursive walk.

use std::collections::HashMap;

use orgauth_core::{AppError, AppResult, NonEmptyString, OrgNodeId};
use serde::{Deserialize, Serialize};

use crate::DepartmentCode;

/// Separator between segments of a materialized path.
pub const PATH_SEPARATOR: char = '.';

/// Materialized path from the root to one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrgPath(String);

impl OrgPath {
    /// Creates the single-segment path of a root node.
    pub fn root(name: &str) -> AppResult<Self> {
        validate_segment(name)?;
        Ok(Self(name.to_owned()))
    }

    /// Parses a stored path, validating every segment.
    pub fn parse(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        for segment in value.split(PATH_SEPARATOR) {
            validate_segment(segment)?;
        }

        Ok(Self(value))
    }

    /// Returns the path of a child named `name` below this path.
    pub fn child(&self, name: &str) -> AppResult<Self> {
        validate_segment(name)?;
        Ok(Self(format!("{}{PATH_SEPARATOR}{name}", self.0)))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the last segment, which is the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(self.0.as_str())
    }

    /// Returns the depth encoded by the path; the root is depth zero.
    #[must_use]
    pub fn depth(&self) -> u32 {
        let separators = self.0.matches(PATH_SEPARATOR).count();
        u32::try_from(separators).unwrap_or(u32::MAX)
    }

    /// Returns the prefix every proper descendant path starts with.
    #[must_use]
    pub fn descendant_prefix(&self) -> String {
        format!("{}{PATH_SEPARATOR}", self.0)
    }

    /// Returns whether `other` is a proper descendant of this path.
    ///
    /// Identical paths are the same node, not an ancestor relation.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &OrgPath) -> bool {
        other.0.starts_with(self.descendant_prefix().as_str())
    }

    /// Returns whether `other` is this path or lies below it.
    #[must_use]
    pub fn contains(&self, other: &OrgPath) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    /// Re-roots a path that lies below `from` so it lies below `to` instead.
    #[must_use]
    pub fn rebase(&self, from: &OrgPath, to: &OrgPath) -> Option<OrgPath> {
        if self == from {
            return Some(to.clone());
        }

        self.0
            .strip_prefix(from.descendant_prefix().as_str())
            .map(|suffix| Self(format!("{}{PATH_SEPARATOR}{suffix}", to.0)))
    }
}

impl TryFrom<String> for OrgPath {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<OrgPath> for String {
    fn from(value: OrgPath) -> Self {
        value.0
    }
}

impl std::fmt::Display for OrgPath {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

fn validate_segment(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation(
            "org node name must not be empty".to_owned(),
        ));
    }

    if name.contains(PATH_SEPARATOR) {
        return Err(AppError::Validation(format!(
            "org node name '{name}' must not contain '{PATH_SEPARATOR}'"
        )));
    }

    if name.trim() != name {
        return Err(AppError::Validation(format!(
            "org node name '{name}' must not have surrounding whitespace"
        )));
    }

    Ok(())
}

/// Relationship between two nodes derived from their paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRelation {
    /// Both references point at the same node.
    SameNode,
    /// The first node is a proper ancestor of the second.
    Ancestor,
    /// The first node is a proper descendant of the second.
    Descendant,
    /// Neither contains the other.
    Unrelated,
}

/// One position in the organizational tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgNode {
    id: OrgNodeId,
    name: NonEmptyString,
    level: u32,
    department: DepartmentCode,
    path: OrgPath,
    parent_id: Option<OrgNodeId>,
    is_active: bool,
}

impl OrgNode {
    /// Creates the root node at level zero.
    pub fn root(name: &str, department: DepartmentCode) -> AppResult<Self> {
        Ok(Self {
            id: OrgNodeId::new(),
            name: NonEmptyString::new(name)?,
            level: 0,
            department,
            path: OrgPath::root(name)?,
            parent_id: None,
            is_active: true,
        })
    }

    /// Creates an active child of `parent`, deriving level and path.
    pub fn child_of(parent: &OrgNode, name: &str, department: DepartmentCode) -> AppResult<Self> {
        if !parent.is_active {
            return Err(AppError::Validation(format!(
                "cannot attach '{name}' below inactive org node '{}'",
                parent.path
            )));
        }

        Ok(Self {
            id: OrgNodeId::new(),
            name: NonEmptyString::new(name)?,
            level: parent.level.saturating_add(1),
            department,
            path: parent.path.child(name)?,
            parent_id: Some(parent.id),
            is_active: true,
        })
    }

    /// Rehydrates a stored node, checking the fields are self-consistent.
    pub fn from_parts(
        id: OrgNodeId,
        name: &str,
        level: u32,
        department: DepartmentCode,
        path: OrgPath,
        parent_id: Option<OrgNodeId>,
        is_active: bool,
    ) -> AppResult<Self> {
        if path.name() != name || path.depth() != level {
            return Err(AppError::Validation(format!(
                "org node '{id}' has path '{path}' inconsistent with name '{name}' and level {level}"
            )));
        }

        if (level == 0) != parent_id.is_none() {
            return Err(AppError::Validation(format!(
                "org node '{id}' must have a parent unless it is the level 0 root"
            )));
        }

        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            level,
            department,
            path,
            parent_id,
            is_active,
        })
    }

    /// Returns the node identifier.
    #[must_use]
    pub fn id(&self) -> OrgNodeId {
        self.id
    }

    /// Returns the display name, which is also the last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the depth; the root is level zero.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Returns the department this node belongs to.
    #[must_use]
    pub fn department(&self) -> DepartmentCode {
        self.department
    }

    /// Returns the materialized path.
    #[must_use]
    pub fn path(&self) -> &OrgPath {
        &self.path
    }

    /// Returns the parent node, absent only for the root.
    #[must_use]
    pub fn parent_id(&self) -> Option<OrgNodeId> {
        self.parent_id
    }

    /// Returns whether the node is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns whether this is the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Marks the node inactive. Nodes are never hard-deleted.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Returns how this node relates to `other`.
    #[must_use]
    pub fn relation_to(&self, other: &OrgNode) -> NodeRelation {
        if self.id == other.id || self.path == other.path {
            NodeRelation::SameNode
        } else if self.path.is_ancestor_of(&other.path) {
            NodeRelation::Ancestor
        } else if other.path.is_ancestor_of(&self.path) {
            NodeRelation::Descendant
        } else {
            NodeRelation::Unrelated
        }
    }

    /// Returns whether `child` is correctly linked below this node.
    #[must_use]
    pub fn is_parent_of(&self, child: &OrgNode) -> bool {
        child.parent_id == Some(self.id)
            && child.level == self.level.saturating_add(1)
            && self
                .path
                .child(child.name())
                .is_ok_and(|expected| expected == child.path)
    }

    fn moved(&self, path: OrgPath, parent_id: Option<OrgNodeId>) -> Self {
        Self {
            level: path.depth(),
            path,
            parent_id,
            ..self.clone()
        }
    }
}

/// Arena of org nodes with a single root.
#[derive(Debug, Clone, Default)]
pub struct OrgTree {
    nodes: HashMap<OrgNodeId, OrgNode>,
    root_id: Option<OrgNodeId>,
}

impl OrgTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from stored nodes, validating every parent link.
    pub fn from_nodes(nodes: impl IntoIterator<Item = OrgNode>) -> AppResult<Self> {
        let mut ordered: Vec<OrgNode> = nodes.into_iter().collect();
        ordered.sort_by_key(OrgNode::level);

        let mut tree = Self::new();
        for node in ordered {
            tree.insert(node)?;
        }

        Ok(tree)
    }

    /// Inserts a node whose parent is already present.
    pub fn insert(&mut self, node: OrgNode) -> AppResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(AppError::Conflict(format!(
                "org node '{}' already exists",
                node.id
            )));
        }

        if self.nodes.values().any(|existing| existing.path == node.path) {
            return Err(AppError::Conflict(format!(
                "org path '{}' already exists",
                node.path
            )));
        }

        match node.parent_id {
            None => {
                if let Some(root_id) = self.root_id {
                    return Err(AppError::Conflict(format!(
                        "organization already has root '{root_id}'"
                    )));
                }
                if node.level != 0 || node.path.depth() != 0 {
                    return Err(AppError::Validation(format!(
                        "root org node '{}' must be at level 0",
                        node.id
                    )));
                }
                self.root_id = Some(node.id);
            }
            Some(parent_id) => {
                let parent = self.nodes.get(&parent_id).ok_or_else(|| {
                    AppError::NotFound(format!(
                        "parent org node '{parent_id}' of '{}' was not found",
                        node.id
                    ))
                })?;
                if !parent.is_parent_of(&node) {
                    return Err(AppError::Validation(format!(
                        "org node '{}' violates the path invariant below '{}'",
                        node.path, parent.path
                    )));
                }
            }
        }

        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Returns the node with `id`.
    #[must_use]
    pub fn get(&self, id: OrgNodeId) -> Option<&OrgNode> {
        self.nodes.get(&id)
    }

    /// Returns the root node, if the tree is not empty.
    #[must_use]
    pub fn root(&self) -> Option<&OrgNode> {
        self.root_id.and_then(|id| self.nodes.get(&id))
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over every node in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &OrgNode> {
        self.nodes.values()
    }

    /// Returns the nodes from `id` up to and including the root.
    ///
    /// A missing node or a dangling parent link is reported as `NotFound`
    /// rather than truncating the walk.
    pub fn path_to_root(&self, id: OrgNodeId) -> AppResult<Vec<&OrgNode>> {
        let mut current = self
            .nodes
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("org node '{id}' was not found")))?;
        let mut chain = vec![current];

        while let Some(parent_id) = current.parent_id {
            if chain.len() > self.nodes.len() {
                return Err(AppError::Internal(format!(
                    "org hierarchy above '{id}' contains a cycle"
                )));
            }

            current = self.nodes.get(&parent_id).ok_or_else(|| {
                AppError::NotFound(format!(
                    "ancestor org node '{parent_id}' of '{}' was not found",
                    current.id
                ))
            })?;
            chain.push(current);
        }

        Ok(chain)
    }

    /// Returns every proper descendant of `id`, ordered by path.
    pub fn descendants(&self, id: OrgNodeId) -> AppResult<Vec<&OrgNode>> {
        let anchor = self
            .nodes
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("org node '{id}' was not found")))?;

        let mut descendants: Vec<&OrgNode> = self
            .nodes
            .values()
            .filter(|node| anchor.path.is_ancestor_of(&node.path))
            .collect();
        descendants.sort_by(|left, right| left.path.cmp(&right.path));

        Ok(descendants)
    }

    /// Returns whether `ancestor` is a proper ancestor of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: OrgNodeId, descendant: OrgNodeId) -> AppResult<bool> {
        let ancestor = self.require(ancestor)?;
        let descendant = self.require(descendant)?;

        Ok(ancestor.relation_to(descendant) == NodeRelation::Ancestor)
    }

    /// Computes the rewritten nodes for moving `node_id` below `new_parent_id`.
    ///
    /// The moved node comes first, followed by its descendants. The tree is
    /// left untouched; call [`OrgTree::apply`] with the result to commit.
    pub fn plan_reparent(
        &self,
        node_id: OrgNodeId,
        new_parent_id: OrgNodeId,
    ) -> AppResult<Vec<OrgNode>> {
        let node = self.require(node_id)?;
        let new_parent = self.require(new_parent_id)?;

        if node.is_root() {
            return Err(AppError::Validation(
                "the root org node cannot be re-parented".to_owned(),
            ));
        }

        if node.path.contains(&new_parent.path) {
            return Err(AppError::Validation(format!(
                "moving '{}' below '{}' would create a cycle",
                node.path, new_parent.path
            )));
        }

        if !new_parent.is_active {
            return Err(AppError::Validation(format!(
                "cannot move '{}' below inactive org node '{}'",
                node.path, new_parent.path
            )));
        }

        let new_path = new_parent.path.child(node.name())?;
        if self.nodes.values().any(|existing| existing.path == new_path) {
            return Err(AppError::Conflict(format!(
                "org path '{new_path}' already exists"
            )));
        }

        let mut moved = vec![node.moved(new_path.clone(), Some(new_parent.id))];
        for descendant in self.descendants(node_id)? {
            let rebased = descendant.path.rebase(&node.path, &new_path).ok_or_else(|| {
                AppError::Internal(format!(
                    "descendant '{}' does not lie below '{}'",
                    descendant.path, node.path
                ))
            })?;
            moved.push(descendant.moved(rebased, descendant.parent_id));
        }

        Ok(moved)
    }

    /// Replaces stored nodes with updated versions.
    pub fn apply(&mut self, nodes: Vec<OrgNode>) {
        for node in nodes {
            self.nodes.insert(node.id, node);
        }
    }

    fn require(&self, id: OrgNodeId) -> AppResult<&OrgNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("org node '{id}' was not found")))
    }
}
