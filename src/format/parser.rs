// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use super::line::{LineKind, LineWarning, SourceLine};
use crate::model::{
    NodeId, NodeShape, NodeType, TrajectoryDocument, TrajectoryEdge, TrajectoryNode,
};

/// A recoverable parse observation. Parsing itself never fails; these point a
/// human at lines the classifier could not fully use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line_no: usize,
    pub warning: LineWarning,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_no, self.warning)
    }
}

/// The result of parsing: the semantic document, the lossless line sequence
/// it was built from, and the warning channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTrajectory {
    document: TrajectoryDocument,
    lines: Vec<SourceLine>,
    warnings: Vec<ParseWarning>,
}

impl ParsedTrajectory {
    pub fn document(&self) -> &TrajectoryDocument {
        &self.document
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Re-serializes the document. Byte-identical to the parsed input.
    pub fn to_text(&self) -> String {
        let raws = self.lines.iter().map(SourceLine::raw).collect::<Vec<_>>();
        raws.join("\n")
    }
}

/// Parse trajectory text. Tolerant by contract: unrecognized lines are kept
/// verbatim, dangling references become stub nodes, and problems surface on
/// the warning channel instead of failing.
pub fn parse_document(text: &str) -> ParsedTrajectory {
    let mut lines = Vec::new();
    let mut warnings = Vec::new();

    for (idx, raw) in text.split('\n').enumerate() {
        let (line, warning) = SourceLine::classified(raw);
        if let Some(warning) = warning {
            warnings.push(ParseWarning {
                line_no: idx + 1,
                warning,
            });
        }
        lines.push(line);
    }

    let document = build_document(&lines);

    ParsedTrajectory {
        document,
        lines,
        warnings,
    }
}

/// Shape-based type inference, used only when no metadata marker overrides
/// it. The stadium pair is shared by `start` and `end`; the id convention
/// disambiguates.
fn infer_node_type(shape: NodeShape, node_id: &NodeId) -> NodeType {
    match shape {
        NodeShape::Stadium => {
            if node_id.as_str().eq_ignore_ascii_case("end") {
                NodeType::End
            } else {
                NodeType::Start
            }
        }
        NodeShape::Rect => NodeType::AiTask,
        NodeShape::Diamond => NodeType::Condition,
        NodeShape::Hexagon => NodeType::Blocker,
    }
}

fn ensure_stub(document: &mut TrajectoryDocument, node_id: &NodeId) {
    if !document.contains_node(node_id) {
        document.insert_node(node_id.clone(), TrajectoryNode::stub(node_id.as_str()));
    }
}

fn build_document(lines: &[SourceLine]) -> TrajectoryDocument {
    let mut document = TrajectoryDocument::default();
    let mut saw_header = false;

    for line in lines {
        match line.kind() {
            LineKind::Header { direction } => {
                if !saw_header {
                    saw_header = true;
                    if let Some(direction) = direction {
                        document.set_direction(*direction);
                    }
                }
            }
            LineKind::ShapeDecl {
                node_id,
                shape,
                label,
            } => {
                let inferred = infer_node_type(*shape, node_id);
                if !document.contains_node(node_id) {
                    document.insert_node(
                        node_id.clone(),
                        TrajectoryNode::new(label.clone(), inferred),
                    );
                } else if let Some(existing) = document.node_mut(node_id) {
                    // A stub gets upgraded; duplicate declarations keep the
                    // first shape line.
                    if !existing.is_declared() {
                        existing.set_label(label.clone());
                        existing.set_node_type(inferred);
                        existing.mark_declared();
                    }
                }
            }
            LineKind::Connector {
                from_node_id,
                to_node_id,
                connector,
            } => {
                ensure_stub(&mut document, from_node_id);
                ensure_stub(&mut document, to_node_id);
                document.push_edge(TrajectoryEdge::new_with(
                    from_node_id.clone(),
                    to_node_id.clone(),
                    connector.clone(),
                ));
            }
            LineKind::StyleDecl { node_id } => {
                ensure_stub(&mut document, node_id);
            }
            LineKind::LastActiveMarker { node_id } => {
                // Multiple markers are tolerated; the last one wins.
                document.set_last_active_node_id(Some(node_id.clone()));
            }
            LineKind::MetadataMarker(_)
            | LineKind::Blank
            | LineKind::Comment
            | LineKind::Opaque => {}
        }
    }

    // Metadata is merged in a second pass so markers apply no matter where
    // they sit relative to the shape declarations they annotate.
    for line in lines {
        let LineKind::MetadataMarker(marker) = line.kind() else {
            continue;
        };
        let Some(node) = document.node_mut(&marker.node_id) else {
            continue;
        };

        if let Some(node_type) = marker.node_type {
            node.set_node_type(node_type);
        }
        node.set_state(marker.state.unwrap_or_default());
        node.set_date(marker.date.clone());
        node.set_author(marker.author.clone());
        node.set_description(marker.description.clone());
    }

    document
}
