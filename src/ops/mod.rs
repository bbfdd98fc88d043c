// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Append-only trajectory mutations.
//!
//! Every operation takes the current document text and returns a new full
//! text; nothing is mutated in place. Existing nodes and edges are never
//! removed or reordered, which is what lets human edits and automated
//! appends coexist without a merge algorithm.

use std::fmt;

use crate::format::line::{LineKind, SourceLine};
use crate::format::parser::parse_document;
use crate::format::writer;
use crate::model::{NodeId, NodeState, NodeType, TrajectoryDocument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    NodeExists { node_id: NodeId },
    NodeNotFound { node_id: NodeId },
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeExists { node_id } => write!(f, "node already exists: {node_id}"),
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
        }
    }
}

impl std::error::Error for ApplyError {}

/// What to append. The id must be unique within the document; callers
/// without one use [`generate_node_id`] first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    node_id: NodeId,
    node_type: NodeType,
    label: String,
    description: Option<String>,
    state: Option<NodeState>,
    date: Option<String>,
    author: Option<String>,
}

impl NodeSpec {
    pub fn new(node_id: NodeId, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            node_id,
            node_type,
            label: label.into(),
            description: None,
            state: None,
            date: None,
            author: None,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description<T: Into<String>>(&mut self, description: Option<T>) {
        self.description = description.map(Into::into);
    }

    pub fn state(&self) -> Option<NodeState> {
        self.state
    }

    pub fn set_state(&mut self, state: Option<NodeState>) {
        self.state = state;
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn set_date<T: Into<String>>(&mut self, date: Option<T>) {
        self.date = date.map(Into::into);
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn set_author<T: Into<String>>(&mut self, author: Option<T>) {
        self.author = author.map(Into::into);
    }
}

/// Appends one node as a contiguous patch: optional metadata marker, one
/// shape declaration, at most one connector, one style line. The patch goes
/// immediately before the first existing style line so declarations stay
/// grouped above the style block; with no style block it goes to the end.
pub fn append_node(
    text: &str,
    spec: &NodeSpec,
    connect_from: Option<&NodeId>,
) -> Result<String, ApplyError> {
    let parsed = parse_document(text);
    if parsed.document().contains_node(spec.node_id()) {
        return Err(ApplyError::NodeExists {
            node_id: spec.node_id().clone(),
        });
    }

    let label = {
        let sanitized = writer::sanitize_label(spec.label());
        if sanitized.is_empty() {
            spec.node_id().as_str().to_owned()
        } else {
            sanitized
        }
    };

    let mut patch = Vec::new();
    let wants_marker = spec.description().is_some()
        || spec.state().is_some()
        || spec.date().is_some()
        || spec.author().is_some();
    if wants_marker {
        patch.push(writer::metadata_marker_line(
            spec.node_id(),
            spec.node_type(),
            spec.state(),
            spec.date(),
            spec.author(),
            spec.description(),
        ));
    }
    patch.push(writer::shape_line(spec.node_id(), spec.node_type(), &label));
    if let Some(from) = connect_from {
        patch.push(writer::connector_line(from, spec.node_id()));
    }
    patch.push(writer::style_line(spec.node_id(), spec.node_type()));

    let lines = parsed.lines();
    let insert_at = lines
        .iter()
        .position(|line| matches!(line.kind(), LineKind::StyleDecl { .. }))
        .unwrap_or_else(|| end_insert_index(lines));

    Ok(splice_lines(lines, insert_at, &patch))
}

/// Moves the `lastActive` pointer: rewrites the existing marker in place, or
/// inserts one right after the header.
pub fn set_last_active(text: &str, node_id: &NodeId) -> String {
    let parsed = parse_document(text);
    let lines = parsed.lines();
    let marker = writer::last_active_line(node_id);

    if let Some(idx) = lines
        .iter()
        .rposition(|line| matches!(line.kind(), LineKind::LastActiveMarker { .. }))
    {
        let mut raws = lines.iter().map(|l| l.raw().to_owned()).collect::<Vec<_>>();
        raws[idx] = marker;
        return raws.join("\n");
    }

    let insert_at = lines
        .iter()
        .position(|line| matches!(line.kind(), LineKind::Header { .. }))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    splice_lines(lines, insert_at, &[marker])
}

/// Flips a node's open/closed state by rewriting its metadata marker (or
/// inserting a minimal one next to its shape declaration). Exactly one line
/// changes or is added.
pub fn set_node_state(
    text: &str,
    node_id: &NodeId,
    state: NodeState,
) -> Result<String, ApplyError> {
    let parsed = parse_document(text);
    let Some(node) = parsed.document().node(node_id) else {
        return Err(ApplyError::NodeNotFound {
            node_id: node_id.clone(),
        });
    };
    let node_type = node.node_type();
    let lines = parsed.lines();

    let marker_idx = lines.iter().rposition(|line| {
        matches!(line.kind(), LineKind::MetadataMarker(marker) if &marker.node_id == node_id)
    });

    if let Some(idx) = marker_idx {
        let LineKind::MetadataMarker(marker) = lines[idx].kind() else {
            unreachable!("rposition matched a metadata marker");
        };
        let rewritten = writer::metadata_marker_line(
            node_id,
            marker.node_type.unwrap_or(node_type),
            Some(state),
            marker.date.as_deref(),
            marker.author.as_deref(),
            marker.description.as_deref(),
        );
        let mut raws = lines.iter().map(|l| l.raw().to_owned()).collect::<Vec<_>>();
        raws[idx] = rewritten;
        return Ok(raws.join("\n"));
    }

    let marker = writer::metadata_marker_line(node_id, node_type, Some(state), None, None, None);
    let insert_at = lines
        .iter()
        .position(|line| {
            matches!(line.kind(), LineKind::ShapeDecl { node_id: decl_id, .. } if decl_id == node_id)
        })
        .unwrap_or_else(|| {
            lines
                .iter()
                .position(|line| matches!(line.kind(), LineKind::Header { .. }))
                .map(|idx| idx + 1)
                .unwrap_or(0)
        });
    Ok(splice_lines(lines, insert_at, &[marker]))
}

/// Produces a fresh unique id of the form `node_<millis>`, disambiguating
/// with a numeric suffix so two appends within the same clock tick cannot
/// collide. Callers pass the clock.
pub fn generate_node_id(now_millis: u128, document: &TrajectoryDocument) -> NodeId {
    let base = format!("node_{now_millis}");
    let mut candidate = base.clone();
    let mut suffix = 0usize;
    while document.nodes().contains_key(candidate.as_str()) {
        suffix += 1;
        candidate = format!("{base}_{suffix}");
    }
    NodeId::new(candidate).expect("generated node id is a valid token")
}

/// End-of-document insertion goes before the final empty segment when the
/// text ends with a newline, so appended lines keep the trailing newline
/// convention intact.
fn end_insert_index(lines: &[SourceLine]) -> usize {
    match lines.last() {
        Some(last) if last.raw().is_empty() => lines.len() - 1,
        _ => lines.len(),
    }
}

fn splice_lines(lines: &[SourceLine], insert_at: usize, patch: &[String]) -> String {
    let mut raws = Vec::with_capacity(lines.len() + patch.len());
    for line in &lines[..insert_at] {
        raws.push(line.raw());
    }
    for line in patch {
        raws.push(line.as_str());
    }
    for line in &lines[insert_at..] {
        raws.push(line.raw());
    }
    raws.join("\n")
}

#[cfg(test)]
mod tests;
