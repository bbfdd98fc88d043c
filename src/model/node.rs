// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

/// The fixed vocabulary of trajectory node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeType {
    Start,
    End,
    AiTask,
    HumanTask,
    Condition,
    Blocker,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::AiTask => "ai-task",
            Self::HumanTask => "human-task",
            Self::Condition => "condition",
            Self::Blocker => "blocker",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "ai-task" => Some(Self::AiTask),
            "human-task" => Some(Self::HumanTask),
            "condition" => Some(Self::Condition),
            "blocker" => Some(Self::Blocker),
            _ => None,
        }
    }

    pub fn shape(&self) -> NodeShape {
        match self {
            Self::Start | Self::End => NodeShape::Stadium,
            Self::AiTask | Self::HumanTask => NodeShape::Rect,
            Self::Condition => NodeShape::Diamond,
            Self::Blocker => NodeShape::Hexagon,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering shape, as encoded by the bracket pair of a shape declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Stadium,
    Rect,
    Diamond,
    Hexagon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub enum NodeState {
    /// Planned or in progress.
    #[default]
    Opened,
    /// Done.
    Closed,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "opened" => Some(Self::Opened),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded unit of work or milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrajectoryNode {
    label: String,
    node_type: NodeType,
    state: NodeState,
    description: Option<String>,
    date: Option<String>,
    author: Option<String>,
    declared: bool,
}

impl TrajectoryNode {
    pub fn new(label: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            label: label.into(),
            node_type,
            state: NodeState::default(),
            description: None,
            date: None,
            author: None,
            declared: true,
        }
    }

    /// A node known only by reference (connector or style line); keeps edges
    /// resolvable when the declaring shape line is missing or not yet written.
    pub fn stub(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            node_type: NodeType::AiTask,
            state: NodeState::default(),
            description: None,
            date: None,
            author: None,
            declared: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.node_type = node_type;
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description<T: Into<String>>(&mut self, description: Option<T>) {
        self.description = description.map(Into::into);
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

    pub fn is_declared(&self) -> bool {
        self.declared
    }

    pub fn mark_declared(&mut self) {
        self.declared = true;
    }
}
