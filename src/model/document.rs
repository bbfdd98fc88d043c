// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use super::ids::NodeId;
use super::node::{NodeState, TrajectoryNode};

/// Document-wide layout direction hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    LeftRight,
    BottomTop,
    RightLeft,
}

impl Direction {
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::TopDown => "TD",
            Self::LeftRight => "LR",
            Self::BottomTop => "BT",
            Self::RightLeft => "RL",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopDown),
            "LR" => Some(Self::LeftRight),
            "BT" => Some(Self::BottomTop),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }
}

/// A directed "led to" relationship between two nodes.
///
/// Edges have no identity beyond their endpoints and declaration order, and
/// duplicates between the same pair are permitted. The connector token is
/// decorative and preserved only so the writer can echo it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrajectoryEdge {
    from_node_id: NodeId,
    to_node_id: NodeId,
    connector: String,
}

impl TrajectoryEdge {
    pub fn new(from_node_id: NodeId, to_node_id: NodeId) -> Self {
        Self::new_with(from_node_id, to_node_id, "-->")
    }

    pub fn new_with(
        from_node_id: NodeId,
        to_node_id: NodeId,
        connector: impl Into<String>,
    ) -> Self {
        Self {
            from_node_id,
            to_node_id,
            connector: connector.into(),
        }
    }

    pub fn from_node_id(&self) -> &NodeId {
        &self.from_node_id
    }

    pub fn to_node_id(&self) -> &NodeId {
        &self.to_node_id
    }

    pub fn connector(&self) -> &str {
        &self.connector
    }
}

/// The in-memory trajectory graph: one per project.
///
/// Declaration order is significant (it drives default layout and the
/// "most recent node" inference), so the node map is paired with an order
/// vector maintained by the parser and mutator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrajectoryDocument {
    direction: Direction,
    nodes: BTreeMap<NodeId, TrajectoryNode>,
    node_order: Vec<NodeId>,
    edges: Vec<TrajectoryEdge>,
    last_active_node_id: Option<NodeId>,
}

impl TrajectoryDocument {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, TrajectoryNode> {
        &self.nodes
    }

    pub fn node(&self, node_id: &NodeId) -> Option<&TrajectoryNode> {
        self.nodes.get(node_id)
    }

    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut TrajectoryNode> {
        self.nodes.get_mut(node_id)
    }

    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Node ids in declaration order (stubs at the point of first reference).
    pub fn node_order(&self) -> &[NodeId] {
        &self.node_order
    }

    pub fn edges(&self) -> &[TrajectoryEdge] {
        &self.edges
    }

    pub fn last_active_node_id(&self) -> Option<&NodeId> {
        self.last_active_node_id.as_ref()
    }

    pub fn set_last_active_node_id(&mut self, node_id: Option<NodeId>) {
        self.last_active_node_id = node_id;
    }

    /// Inserts a node, registering declaration order on first sight. An
    /// existing entry is returned untouched.
    pub fn insert_node(&mut self, node_id: NodeId, node: TrajectoryNode) -> &mut TrajectoryNode {
        if !self.nodes.contains_key(&node_id) {
            self.node_order.push(node_id.clone());
        }
        self.nodes.entry(node_id).or_insert(node)
    }

    pub fn push_edge(&mut self, edge: TrajectoryEdge) {
        self.edges.push(edge);
    }

    /// The most recently declared node, used when no `lastActive` marker is
    /// present.
    pub fn latest_node_id(&self) -> Option<&NodeId> {
        self.node_order.last()
    }

    pub fn open_node_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| node.state() == NodeState::Opened)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, TrajectoryDocument, TrajectoryEdge};
    use crate::model::node::{NodeState, NodeType, TrajectoryNode};
    use crate::model::NodeId;

    fn node_id(raw: &str) -> NodeId {
        NodeId::new(raw).expect("valid node id")
    }

    #[test]
    fn direction_parses_both_top_down_spellings() {
        assert_eq!(Direction::parse("TD"), Some(Direction::TopDown));
        assert_eq!(Direction::parse("TB"), Some(Direction::TopDown));
        assert_eq!(Direction::parse("LR"), Some(Direction::LeftRight));
        assert_eq!(Direction::parse("XX"), None);
    }

    #[test]
    fn insert_node_tracks_declaration_order_once() {
        let mut document = TrajectoryDocument::default();
        let start = node_id("start");
        let task = node_id("node_1");

        document.insert_node(start.clone(), TrajectoryNode::new("Start", NodeType::Start));
        document.insert_node(task.clone(), TrajectoryNode::new("Task", NodeType::AiTask));
        // Re-inserting must not duplicate the order entry or replace the node.
        document.insert_node(task.clone(), TrajectoryNode::new("Other", NodeType::Blocker));

        assert_eq!(document.node_order(), &[start, task.clone()]);
        assert_eq!(document.node(&task).map(|node| node.label()), Some("Task"));
        assert_eq!(document.latest_node_id(), Some(&task));
    }

    #[test]
    fn open_node_count_ignores_closed_nodes() {
        let mut document = TrajectoryDocument::default();
        let a = node_id("a");
        let b = node_id("b");
        document.insert_node(a.clone(), TrajectoryNode::new("A", NodeType::AiTask));
        let mut closed = TrajectoryNode::new("B", NodeType::AiTask);
        closed.set_state(NodeState::Closed);
        document.insert_node(b.clone(), closed);
        document.push_edge(TrajectoryEdge::new(a, b));

        assert_eq!(document.open_node_count(), 1);
        assert_eq!(document.edges().len(), 1);
        assert!(!document.is_empty());
    }
}
