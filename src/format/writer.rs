// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::model::{NodeId, NodeShape, NodeState, NodeType};

/// Labels longer than this get truncated before they hit the document;
/// runaway labels blow up every downstream layout.
pub const MAX_LABEL_CHARS: usize = 80;

pub fn default_style_spec(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Start | NodeType::End => "fill:#dcfce7,stroke:#16a34a,color:#14532d",
        NodeType::AiTask => "fill:#dbeafe,stroke:#2563eb,color:#1e3a8a",
        NodeType::HumanTask => "fill:#fef3c7,stroke:#d97706,color:#92400e",
        NodeType::Condition => "fill:#ede9fe,stroke:#7c3aed,color:#4c1d95",
        NodeType::Blocker => "fill:#fee2e2,stroke:#dc2626,color:#7f1d1d",
    }
}

/// Normalizes a label for embedding in a quoted shape declaration: quotes
/// become apostrophes, newlines become spaces, and the result is bounded to
/// [`MAX_LABEL_CHARS`].
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len().min(MAX_LABEL_CHARS));
    for ch in label.chars().take(MAX_LABEL_CHARS) {
        match ch {
            '"' => out.push('\''),
            '\n' | '\r' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out.trim().to_owned()
}

/// Metadata markers are one line per node, so multi-line descriptions are
/// flattened onto a single line.
pub fn flatten_description(description: &str) -> String {
    description
        .replace("\r\n", "; ")
        .replace(['\n', '\r'], "; ")
        .trim()
        .to_owned()
}

pub fn shape_line(node_id: &NodeId, node_type: NodeType, label: &str) -> String {
    let (open, close) = match node_type.shape() {
        NodeShape::Stadium => ("([", "])"),
        NodeShape::Rect => ("[", "]"),
        NodeShape::Diamond => ("{", "}"),
        NodeShape::Hexagon => ("{{", "}}"),
    };
    format!("{node_id}{open}\"{label}\"{close}")
}

pub fn connector_line(from_node_id: &NodeId, to_node_id: &NodeId) -> String {
    format!("{from_node_id} --> {to_node_id}")
}

pub fn style_line(node_id: &NodeId, node_type: NodeType) -> String {
    format!("style {node_id} {}", default_style_spec(node_type))
}

pub fn last_active_line(node_id: &NodeId) -> String {
    format!("%% @lastActive: {node_id}")
}

/// Renders a metadata marker line. Fields are positional and optional from
/// the right, so earlier fields are materialized whenever a later one is
/// present (an empty slot parses back to "absent").
pub fn metadata_marker_line(
    node_id: &NodeId,
    node_type: NodeType,
    state: Option<NodeState>,
    date: Option<&str>,
    author: Option<&str>,
    description: Option<&str>,
) -> String {
    let mut fields = vec![node_type.as_str().to_owned()];
    if state.is_some() || date.is_some() || author.is_some() {
        fields.push(state.unwrap_or_default().as_str().to_owned());
    }
    if date.is_some() || author.is_some() {
        fields.push(date.unwrap_or_default().to_owned());
    }
    if let Some(author) = author {
        fields.push(author.to_owned());
    }

    let mut line = format!("%% @{node_id} [{}]", fields.join(", "));
    if let Some(description) = description {
        let flattened = flatten_description(description);
        if !flattened.is_empty() {
            line.push_str(": ");
            line.push_str(&flattened);
        }
    }
    line
}

/// The document scaffolded by `init`: a header and a single seed node.
pub fn seed_document() -> String {
    let start = NodeId::new("start").expect("hard-coded seed node id is valid");
    format!(
        "flowchart TD\n{}\n{}\n{}\n",
        last_active_line(&start),
        shape_line(&start, NodeType::Start, "Project Start"),
        style_line(&start, NodeType::Start),
    )
}

#[cfg(test)]
mod tests {
    use super::{
        flatten_description, metadata_marker_line, sanitize_label, seed_document, shape_line,
        MAX_LABEL_CHARS,
    };
    use crate::format::line::{classify_line, LineKind};
    use crate::format::parser::parse_document;
    use crate::model::{NodeId, NodeState, NodeType};

    fn node_id(raw: &str) -> NodeId {
        NodeId::new(raw).expect("valid node id")
    }

    #[test]
    fn shape_lines_use_the_type_bracket_table() {
        let id = node_id("n");
        assert_eq!(shape_line(&id, NodeType::Start, "Go"), "n([\"Go\"])");
        assert_eq!(shape_line(&id, NodeType::AiTask, "Do"), "n[\"Do\"]");
        assert_eq!(shape_line(&id, NodeType::Condition, "If"), "n{\"If\"}");
        assert_eq!(shape_line(&id, NodeType::Blocker, "Stuck"), "n{{\"Stuck\"}}");
    }

    #[test]
    fn sanitize_label_normalizes_quotes_and_newlines() {
        assert_eq!(sanitize_label("say \"hi\"\nthere"), "say 'hi' there");
    }

    #[test]
    fn sanitize_label_truncates_long_labels() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_label(&long).chars().count(), MAX_LABEL_CHARS);
    }

    #[test]
    fn flatten_description_joins_lines() {
        assert_eq!(
            flatten_description("Added form\nand validation\r\nplus tests"),
            "Added form; and validation; plus tests"
        );
    }

    #[test]
    fn marker_line_round_trips_through_the_classifier() {
        let line = metadata_marker_line(
            &node_id("node_17"),
            NodeType::AiTask,
            Some(NodeState::Closed),
            Some("2023-11-14"),
            Some("claude"),
            Some("Added form and validation"),
        );
        match classify_line(&line).kind {
            LineKind::MetadataMarker(marker) => {
                assert_eq!(marker.node_type, Some(NodeType::AiTask));
                assert_eq!(marker.state, Some(NodeState::Closed));
                assert_eq!(marker.date.as_deref(), Some("2023-11-14"));
                assert_eq!(marker.author.as_deref(), Some("claude"));
                assert_eq!(
                    marker.description.as_deref(),
                    Some("Added form and validation")
                );
            }
            other => panic!("expected metadata marker, got {other:?}"),
        }
    }

    #[test]
    fn marker_line_with_author_but_no_date_keeps_positions() {
        let line = metadata_marker_line(
            &node_id("n"),
            NodeType::HumanTask,
            None,
            None,
            Some("alex"),
            None,
        );
        match classify_line(&line).kind {
            LineKind::MetadataMarker(marker) => {
                assert_eq!(marker.state, Some(NodeState::Opened));
                assert_eq!(marker.date, None);
                assert_eq!(marker.author.as_deref(), Some("alex"));
            }
            other => panic!("expected metadata marker, got {other:?}"),
        }
    }

    #[test]
    fn marker_line_with_only_a_type_stays_minimal() {
        let line = metadata_marker_line(&node_id("n"), NodeType::AiTask, None, None, None, None);
        assert_eq!(line, "%% @n [ai-task]");
    }

    #[test]
    fn seed_document_parses_cleanly() {
        let parsed = parse_document(&seed_document());
        assert!(parsed.warnings().is_empty());
        let document = parsed.document();
        assert_eq!(document.nodes().len(), 1);
        assert_eq!(document.last_active_node_id(), Some(&node_id("start")));
        assert_eq!(
            document.node(&node_id("start")).map(|n| n.node_type()),
            Some(NodeType::Start)
        );
    }
}
