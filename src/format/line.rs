// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use crate::model::{Direction, NodeId, NodeShape, NodeState, NodeType};

pub const COMMENT_PREFIX: &str = "%%";
pub const LAST_ACTIVE_KEYWORD: &str = "lastActive";

/// One line of a trajectory document: the verbatim text plus its
/// classification. Serialization re-emits `raw`, so a document survives a
/// parse/serialize cycle byte-identically no matter how many lines end up
/// classified as `Opaque`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    raw: String,
    kind: LineKind,
}

impl SourceLine {
    pub fn new(raw: impl Into<String>, kind: LineKind) -> Self {
        Self {
            raw: raw.into(),
            kind,
        }
    }

    pub fn classified(raw: impl Into<String>) -> (Self, Option<LineWarning>) {
        let raw = raw.into();
        let Classified { kind, warning } = classify_line(&raw);
        (Self { raw, kind }, warning)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &LineKind {
        &self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// `flowchart TD` / `graph LR`: the direction carrier.
    Header { direction: Option<Direction> },
    MetadataMarker(MetadataMarker),
    LastActiveMarker { node_id: NodeId },
    ShapeDecl {
        node_id: NodeId,
        shape: NodeShape,
        label: String,
    },
    Connector {
        from_node_id: NodeId,
        to_node_id: NodeId,
        connector: String,
    },
    StyleDecl { node_id: NodeId },
    Blank,
    /// A `%%` line that carries no marker.
    Comment,
    /// Anything the classifier does not recognize; retained verbatim.
    Opaque,
}

/// Parsed out-of-band node metadata: `%% @<id> [<type>, <state>?, <date>?,
/// <author>?]: <description>`. Fields are positional and optional from the
/// right; a legacy variant omits `<state>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataMarker {
    pub node_id: NodeId,
    pub node_type: Option<NodeType>,
    pub state: Option<NodeState>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineWarning {
    UnknownDirection { token: String },
    MalformedMarker,
    UnknownNodeType { token: String },
    InvalidId { token: String },
    UnbalancedShape { token: String },
}

impl fmt::Display for LineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDirection { token } => {
                write!(f, "unknown direction '{token}' (expected TD/TB/LR/RL/BT)")
            }
            Self::MalformedMarker => f.write_str("malformed metadata marker"),
            Self::UnknownNodeType { token } => write!(f, "unknown node type '{token}'"),
            Self::InvalidId { token } => write!(f, "invalid node id '{token}'"),
            Self::UnbalancedShape { token } => {
                write!(f, "unbalanced shape declaration '{token}'")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: LineKind,
    pub warning: Option<LineWarning>,
}

impl Classified {
    fn plain(kind: LineKind) -> Self {
        Self {
            kind,
            warning: None,
        }
    }

    fn with_warning(kind: LineKind, warning: LineWarning) -> Self {
        Self {
            kind,
            warning: Some(warning),
        }
    }
}

pub fn classify_line(raw: &str) -> Classified {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Classified::plain(LineKind::Blank);
    }

    if let Some(rest) = trimmed.strip_prefix(COMMENT_PREFIX) {
        return classify_comment(rest);
    }

    let first_token = trimmed.split_whitespace().next().unwrap_or(trimmed);
    if first_token == "flowchart" || first_token == "graph" {
        return classify_header(trimmed);
    }

    if let Some(rest) = trimmed.strip_prefix("style ") {
        return classify_style(rest);
    }

    if let Some(classified) = classify_connector(trimmed) {
        return classified;
    }

    classify_shape_decl(trimmed)
}

fn classify_header(trimmed: &str) -> Classified {
    let mut parts = trimmed.split_whitespace();
    let _keyword = parts.next();
    match parts.next() {
        None => Classified::plain(LineKind::Header { direction: None }),
        Some(token) => match Direction::parse(token) {
            Some(direction) => Classified::plain(LineKind::Header {
                direction: Some(direction),
            }),
            None => Classified::with_warning(
                LineKind::Header { direction: None },
                LineWarning::UnknownDirection {
                    token: token.to_owned(),
                },
            ),
        },
    }
}

fn classify_comment(rest: &str) -> Classified {
    let rest = rest.trim();
    let Some(after_at) = rest.strip_prefix('@') else {
        return Classified::plain(LineKind::Comment);
    };

    if let Some(after_keyword) = after_at.strip_prefix(LAST_ACTIVE_KEYWORD) {
        let Some(after_colon) = after_keyword.trim_start().strip_prefix(':') else {
            return Classified::with_warning(LineKind::Comment, LineWarning::MalformedMarker);
        };
        let token = after_colon.trim();
        return match NodeId::new(token) {
            Ok(node_id) => Classified::plain(LineKind::LastActiveMarker { node_id }),
            Err(_) => Classified::with_warning(
                LineKind::Comment,
                LineWarning::InvalidId {
                    token: token.to_owned(),
                },
            ),
        };
    }

    classify_metadata_marker(after_at)
}

fn classify_metadata_marker(after_at: &str) -> Classified {
    let Some(open_idx) = after_at.find('[') else {
        return Classified::with_warning(LineKind::Comment, LineWarning::MalformedMarker);
    };
    let id_token = after_at[..open_idx].trim();
    let node_id = match NodeId::new(id_token) {
        Ok(node_id) => node_id,
        Err(_) => {
            return Classified::with_warning(
                LineKind::Comment,
                LineWarning::InvalidId {
                    token: id_token.to_owned(),
                },
            );
        }
    };

    let after_open = &after_at[open_idx + 1..];
    let Some(close_idx) = after_open.find(']') else {
        return Classified::with_warning(LineKind::Comment, LineWarning::MalformedMarker);
    };
    let fields_raw = &after_open[..close_idx];
    let after_close = after_open[close_idx + 1..].trim_start();

    let description = after_close
        .strip_prefix(':')
        .map(str::trim)
        .filter(|desc| !desc.is_empty())
        .map(str::to_owned);

    let mut fields = fields_raw.split(',').map(str::trim);
    let mut warning = None;

    let node_type = match fields.next() {
        Some(token) if !token.is_empty() => {
            let parsed = NodeType::parse(token);
            if parsed.is_none() {
                warning = Some(LineWarning::UnknownNodeType {
                    token: token.to_owned(),
                });
            }
            parsed
        }
        _ => None,
    };

    // The second field is the state when it parses as one; otherwise this is
    // the legacy layout and the remaining fields shift left to date/author.
    let mut state = None;
    let mut date = None;
    let mut author = None;
    if let Some(token) = fields.next() {
        match NodeState::parse(token) {
            Some(parsed) => {
                state = Some(parsed);
                date = fields.next().filter(|t| !t.is_empty()).map(str::to_owned);
                author = fields.next().filter(|t| !t.is_empty()).map(str::to_owned);
            }
            None => {
                date = Some(token).filter(|t| !t.is_empty()).map(str::to_owned);
                author = fields.next().filter(|t| !t.is_empty()).map(str::to_owned);
            }
        }
    }

    Classified {
        kind: LineKind::MetadataMarker(MetadataMarker {
            node_id,
            node_type,
            state,
            date,
            author,
            description,
        }),
        warning,
    }
}

fn classify_style(rest: &str) -> Classified {
    let token = rest.split_whitespace().next().unwrap_or("");
    match NodeId::new(token) {
        Ok(node_id) => Classified::plain(LineKind::StyleDecl { node_id }),
        Err(_) => Classified::with_warning(
            LineKind::Opaque,
            LineWarning::InvalidId {
                token: token.to_owned(),
            },
        ),
    }
}

fn is_edge_op_start_char(ch: char) -> bool {
    matches!(ch, '<' | '-' | '=' | '.')
}

fn is_edge_op_char(ch: char) -> bool {
    matches!(ch, '<' | '>' | '-' | '=' | '.' | 'o' | 'x')
}

fn is_probable_edge_operator(op: &str) -> bool {
    op.chars().filter(|ch| matches!(ch, '-' | '=' | '.')).count() >= 2
}

/// Splits `<lhs> <op> <rhs>` at the first plausible edge operator outside any
/// bracketed label region. Returns `None` when the line carries no operator.
fn split_once_edge_operator(line: &str) -> Option<(&str, &str, &str)> {
    let mut in_label: Option<char> = None;
    let mut op_start: Option<usize> = None;

    for (idx, ch) in line.char_indices() {
        if let Some(close) = in_label {
            if ch == close {
                in_label = None;
            }
            continue;
        }

        match ch {
            '[' => in_label = Some(']'),
            '(' => in_label = Some(')'),
            '{' => in_label = Some('}'),
            _ => {}
        }

        if in_label.is_some() {
            continue;
        }

        if is_edge_op_start_char(ch) {
            op_start = Some(idx);
            break;
        }
    }

    let start = op_start?;
    let mut end = line.len();
    for (idx, ch) in line[start..].char_indices() {
        if !is_edge_op_char(ch) {
            end = start + idx;
            break;
        }
    }

    let lhs = &line[..start];
    let op = &line[start..end];
    let rhs = &line[end..];
    if lhs.trim().is_empty() || !is_probable_edge_operator(op) {
        return None;
    }

    Some((lhs, op, rhs))
}

fn classify_connector(trimmed: &str) -> Option<Classified> {
    let (lhs_raw, op, rhs_raw) = split_once_edge_operator(trimmed)?;

    // An inline `|label|` after the operator is tolerated but not modeled.
    let rhs_raw = rhs_raw.trim_start();
    let rhs_raw = match rhs_raw.strip_prefix('|') {
        Some(after) => after.find('|').map(|end| after[end + 1..].trim_start())?,
        None => rhs_raw,
    };

    // Only plain `<id> <op> <id>` lines are modeled as edges. Shaped
    // endpoints, chains, and anything else stay opaque (and verbatim).
    let lhs = NodeId::new(lhs_raw.trim()).ok()?;
    let rhs = NodeId::new(rhs_raw.trim()).ok()?;

    let reversed = op.contains('<') && !op.contains('>');
    let (from_node_id, to_node_id) = if reversed { (rhs, lhs) } else { (lhs, rhs) };

    Some(Classified::plain(LineKind::Connector {
        from_node_id,
        to_node_id,
        connector: op.to_owned(),
    }))
}

fn classify_shape_decl(trimmed: &str) -> Classified {
    let Some(open_idx) = trimmed.find(['[', '(', '{']) else {
        return Classified::plain(LineKind::Opaque);
    };

    let id_token = trimmed[..open_idx].trim();
    let node_id = match NodeId::new(id_token) {
        Ok(node_id) => node_id,
        Err(_) => {
            return Classified::with_warning(
                LineKind::Opaque,
                LineWarning::InvalidId {
                    token: id_token.to_owned(),
                },
            );
        }
    };

    let tail = &trimmed[open_idx..];
    let (open, close, shape) = if tail.starts_with("([") {
        ("([", "])", NodeShape::Stadium)
    } else if tail.starts_with('(') {
        ("(", ")", NodeShape::Stadium)
    } else if tail.starts_with("{{") {
        ("{{", "}}", NodeShape::Hexagon)
    } else if tail.starts_with('{') {
        ("{", "}", NodeShape::Diamond)
    } else {
        ("[", "]", NodeShape::Rect)
    };

    let inner = &tail[open.len()..];
    let Some(label_raw) = inner.strip_suffix(close) else {
        return Classified::with_warning(
            LineKind::Opaque,
            LineWarning::UnbalancedShape {
                token: trimmed.to_owned(),
            },
        );
    };

    let label = unquote_label(label_raw.trim());
    if label.is_empty() {
        return Classified::with_warning(
            LineKind::Opaque,
            LineWarning::UnbalancedShape {
                token: trimmed.to_owned(),
            },
        );
    }

    Classified::plain(LineKind::ShapeDecl {
        node_id,
        shape,
        label: label.to_owned(),
    })
}

fn unquote_label(label: &str) -> &str {
    if label.len() >= 2 {
        if let Some(stripped) = label.strip_prefix('"').and_then(|l| l.strip_suffix('"')) {
            return stripped;
        }
        if let Some(stripped) = label.strip_prefix('\'').and_then(|l| l.strip_suffix('\'')) {
            return stripped;
        }
    }
    label
}
