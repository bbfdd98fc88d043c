// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Render adapter: maps the document model onto renderable elements and maps
//! rendered element ids back to node ids.

use std::collections::BTreeMap;

use crate::model::{
    Direction, NodeId, NodeShape, NodeState, NodeType, TrajectoryDocument,
};

/// Rendered element ids are decorated with this prefix; clicks come back as
/// element ids and are stripped to node ids.
pub const ELEMENT_ID_PREFIX: &str = "flow-";

pub fn element_id(node_id: &NodeId) -> String {
    format!("{ELEMENT_ID_PREFIX}{node_id}")
}

pub fn node_id_from_element_id(element_id: &str) -> Option<NodeId> {
    let raw = element_id.strip_prefix(ELEMENT_ID_PREFIX)?;
    NodeId::new(raw).ok()
}

pub fn shape_delimiters(shape: NodeShape) -> (&'static str, &'static str) {
    match shape {
        NodeShape::Stadium => ("([", "])"),
        NodeShape::Rect => ("[", "]"),
        NodeShape::Diamond => ("{", "}"),
        NodeShape::Hexagon => ("{{", "}}"),
    }
}

/// One renderable node, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderNode {
    element_id: String,
    node_id: NodeId,
    label: String,
    node_type: NodeType,
    state: NodeState,
    shape: NodeShape,
    description: Option<String>,
    predecessors: Vec<NodeId>,
    last_active: bool,
}

impl RenderNode {
    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn shape(&self) -> NodeShape {
        self.shape
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    pub fn is_last_active(&self) -> bool {
        self.last_active
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderGraph {
    direction: Direction,
    nodes: Vec<RenderNode>,
    focus: Option<usize>,
}

impl RenderGraph {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn nodes(&self) -> &[RenderNode] {
        &self.nodes
    }

    /// Index of the `lastActive` node. `None` when the pointer is absent or
    /// dangling; focusing then is a no-op.
    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn position_of(&self, node_id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.node_id() == node_id)
    }
}

pub fn render_graph(document: &TrajectoryDocument) -> RenderGraph {
    let mut predecessors: BTreeMap<&NodeId, Vec<NodeId>> = BTreeMap::new();
    for edge in document.edges() {
        predecessors
            .entry(edge.to_node_id())
            .or_default()
            .push(edge.from_node_id().clone());
    }

    let nodes = document
        .node_order()
        .iter()
        .filter_map(|node_id| {
            let node = document.node(node_id)?;
            Some(RenderNode {
                element_id: element_id(node_id),
                node_id: node_id.clone(),
                label: node.label().to_owned(),
                node_type: node.node_type(),
                state: node.state(),
                shape: node.node_type().shape(),
                description: node.description().map(str::to_owned),
                predecessors: predecessors.get(node_id).cloned().unwrap_or_default(),
                last_active: document.last_active_node_id() == Some(node_id),
            })
        })
        .collect::<Vec<_>>();

    let focus = document
        .last_active_node_id()
        .and_then(|node_id| nodes.iter().position(|node| node.node_id() == node_id));

    RenderGraph {
        direction: document.direction(),
        nodes,
        focus,
    }
}

/// Deterministic one-line-per-node text rendering, used by the MCP
/// `trajectory.render_text` tool and suitable for diffing.
pub fn render_text(document: &TrajectoryDocument) -> String {
    let graph = render_graph(document);
    let mut out = format!(
        "Trajectory ({}): {} nodes, {} edges\n",
        graph.direction().as_token(),
        graph.nodes().len(),
        document.edges().len(),
    );

    for node in graph.nodes() {
        let (open, close) = shape_delimiters(node.shape());
        let focus_mark = if node.is_last_active() { '>' } else { ' ' };
        out.push_str(&format!(
            "{focus_mark} {open} {} {close}  #{}",
            node.label(),
            node.node_id()
        ));
        if node.state() == NodeState::Closed {
            out.push_str("  [closed]");
        }
        out.push('\n');
        for predecessor in node.predecessors() {
            out.push_str(&format!("      <- {predecessor}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{
        element_id, node_id_from_element_id, render_graph, render_text, shape_delimiters,
    };
    use crate::format::parser::parse_document;
    use crate::model::{NodeId, NodeShape, NodeType};

    fn node_id(raw: &str) -> NodeId {
        NodeId::new(raw).expect("valid node id")
    }

    const SAMPLE: &str = "flowchart TD\n\
        %% @node_17 [ai-task, closed]: Added form and validation\n\
        %% @lastActive: node_17\n\
        start([\"Project Start\"])\n\
        node_17[\"Implemented login\"]\n\
        start --> node_17\n\
        style start fill:#dcfce7\n";

    #[test]
    fn element_ids_round_trip() {
        let id = node_id("node_17");
        let element = element_id(&id);
        assert_eq!(element, "flow-node_17");
        assert_eq!(node_id_from_element_id(&element), Some(id));
        assert_eq!(node_id_from_element_id("unrelated"), None);
        assert_eq!(node_id_from_element_id("flow-"), None);
    }

    #[test]
    fn graph_preserves_declaration_order_and_predecessors() {
        let parsed = parse_document(SAMPLE);
        let graph = render_graph(parsed.document());

        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.nodes()[0].node_id(), &node_id("start"));
        assert_eq!(graph.nodes()[1].node_id(), &node_id("node_17"));
        assert_eq!(graph.nodes()[1].predecessors(), &[node_id("start")]);
        assert_eq!(graph.nodes()[1].node_type(), NodeType::AiTask);
        assert!(graph.nodes()[1].is_last_active());
        assert_eq!(graph.focus(), Some(1));
    }

    #[test]
    fn dangling_last_active_yields_no_focus() {
        let parsed = parse_document("flowchart TD\n%% @lastActive: ghost\na[One]\n");
        let graph = render_graph(parsed.document());
        assert_eq!(graph.focus(), None);
        assert_eq!(graph.nodes().len(), 1);
    }

    #[test]
    fn delimiters_follow_the_shape_table() {
        assert_eq!(shape_delimiters(NodeShape::Stadium), ("([", "])"));
        assert_eq!(shape_delimiters(NodeShape::Rect), ("[", "]"));
        assert_eq!(shape_delimiters(NodeShape::Diamond), ("{", "}"));
        assert_eq!(shape_delimiters(NodeShape::Hexagon), ("{{", "}}"));
    }

    #[test]
    fn text_render_is_deterministic_and_marks_focus() {
        let parsed = parse_document(SAMPLE);
        let text = render_text(parsed.document());
        assert_eq!(
            text,
            "Trajectory (TD): 2 nodes, 1 edges\n  \
             ([ Project Start ])  #start\n\
             > [ Implemented login ]  #node_17  [closed]\n      \
             <- start\n"
        );
        assert_eq!(text, render_text(parse_document(SAMPLE).document()));
    }
}
