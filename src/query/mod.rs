// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only trajectory queries backing the MCP surface.

use regex::Regex;

use crate::model::{NodeId, NodeState, NodeType, TrajectoryDocument};

/// Open work items: everything still `opened`, excluding the `start`/`end`
/// milestones. Blockers sort first; declaration order otherwise.
pub fn open_nodes(document: &TrajectoryDocument) -> Vec<NodeId> {
    let mut open = document
        .node_order()
        .iter()
        .filter(|node_id| {
            document.node(node_id).is_some_and(|node| {
                node.state() == NodeState::Opened
                    && !matches!(node.node_type(), NodeType::Start | NodeType::End)
            })
        })
        .cloned()
        .collect::<Vec<_>>();

    let is_blocker = |node_id: &NodeId| {
        document
            .node(node_id)
            .is_some_and(|node| node.node_type() == NodeType::Blocker)
    };
    open.sort_by_key(|node_id| !is_blocker(node_id));
    open
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Label,
    Description,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Description => "description",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub node_id: NodeId,
    pub field: SearchField,
}

/// Pattern search over labels and descriptions, in declaration order. A node
/// matches at most once, label taking precedence.
pub fn search(document: &TrajectoryDocument, pattern: &Regex) -> Vec<SearchMatch> {
    document
        .node_order()
        .iter()
        .filter_map(|node_id| {
            let node = document.node(node_id)?;
            if pattern.is_match(node.label()) {
                return Some(SearchMatch {
                    node_id: node_id.clone(),
                    field: SearchField::Label,
                });
            }
            if node.description().is_some_and(|desc| pattern.is_match(desc)) {
                return Some(SearchMatch {
                    node_id: node_id.clone(),
                    field: SearchField::Description,
                });
            }
            None
        })
        .collect()
}
