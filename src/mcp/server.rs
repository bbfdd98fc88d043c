// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt};

use crate::format::parser::{parse_document, ParsedTrajectory};
use crate::model::{NodeId, NodeState, NodeType};
use crate::ops::{self, NodeSpec};
use crate::query;
use crate::store::TrajectoryFile;
use crate::sync::{handle_turn_finished, TurnSignal, MIN_TRANSCRIPT_CHARS};
use crate::viewer;

use super::types::*;

/// The trajectory MCP server. Stateless between calls on purpose: the file
/// is the single source of truth, so every tool re-reads it rather than
/// trusting an in-memory copy that concurrent writers may have outdated.
#[derive(Clone)]
pub struct TrailmapMcp {
    file: Arc<TrajectoryFile>,
    tool_router: ToolRouter<Self>,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn parse_node_id(raw: &str) -> Result<NodeId, ErrorData> {
    NodeId::new(raw)
        .map_err(|err| ErrorData::invalid_params(format!("invalid node id '{raw}': {err}"), None))
}

fn parse_node_type(raw: &str) -> Result<NodeType, ErrorData> {
    NodeType::parse(raw).ok_or_else(|| {
        ErrorData::invalid_params(
            format!(
                "unknown node type '{raw}' (expected start, end, ai-task, human-task, condition, or blocker)"
            ),
            None,
        )
    })
}

fn parse_node_state(raw: &str) -> Result<NodeState, ErrorData> {
    NodeState::parse(raw).ok_or_else(|| {
        ErrorData::invalid_params(
            format!("unknown node state '{raw}' (expected opened or closed)"),
            None,
        )
    })
}

fn summary_of(parsed: &ParsedTrajectory) -> TrajectorySummary {
    let document = parsed.document();
    TrajectorySummary {
        direction: document.direction().as_token().to_owned(),
        node_count: document.nodes().len() as u64,
        edge_count: document.edges().len() as u64,
        open_count: document.open_node_count() as u64,
        last_active_node_id: document
            .last_active_node_id()
            .map(|node_id| node_id.as_str().to_owned()),
        warning_count: parsed.warnings().len() as u64,
    }
}

#[tool_router]
impl TrailmapMcp {
    pub fn new(file: TrajectoryFile) -> Self {
        Self {
            file: Arc::new(file),
            tool_router: Self::tool_router(),
        }
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    fn load_text(&self) -> Result<String, ErrorData> {
        // A missing document reads as an empty trajectory, not an error.
        self.file
            .load_document()
            .map(Option::unwrap_or_default)
            .map_err(|err| {
                ErrorData::internal_error(format!("failed to read trajectory: {err}"), None)
            })
    }

    fn save_text(&self, text: &str) -> Result<(), ErrorData> {
        self.file.save_document(text).map_err(|err| {
            ErrorData::internal_error(format!("failed to write trajectory: {err}"), None)
        })
    }

    /// Read the whole trajectory: raw text plus a structural summary. Start
    /// here to learn the current ids before appending.
    #[tool(name = "trajectory.read")]
    async fn trajectory_read(&self) -> Result<Json<TrajectoryReadResponse>, ErrorData> {
        let text = self.load_text()?;
        let parsed = parse_document(&text);
        Ok(Json(TrajectoryReadResponse {
            summary: summary_of(&parsed),
            text,
        }))
    }

    /// Append one node (and optionally one connector from a predecessor).
    /// Append-only: existing nodes and edges are never touched. The new node
    /// becomes the `lastActive` focus.
    #[tool(name = "trajectory.append_node")]
    async fn trajectory_append_node(
        &self,
        params: Parameters<AppendNodeParams>,
    ) -> Result<Json<AppendNodeResponse>, ErrorData> {
        let AppendNodeParams {
            node_id,
            node_type,
            label,
            description,
            connect_from,
            state,
            date,
            author,
        } = params.0;

        let node_type = parse_node_type(&node_type)?;
        let state = state.as_deref().map(parse_node_state).transpose()?;
        let connect_from = connect_from
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(parse_node_id)
            .transpose()?;

        let text = self.load_text()?;
        let parsed = parse_document(&text);

        let node_id = match node_id.as_deref().filter(|raw| !raw.is_empty()) {
            Some(raw) => parse_node_id(raw)?,
            None => ops::generate_node_id(now_millis(), parsed.document()),
        };

        let mut spec = NodeSpec::new(node_id.clone(), node_type, label);
        spec.set_description(description);
        spec.set_state(state);
        spec.set_date(date);
        spec.set_author(author);

        let appended = ops::append_node(&text, &spec, connect_from.as_ref())
            .map_err(|err| ErrorData::invalid_params(err.to_string(), None))?;
        let updated = ops::set_last_active(&appended, &node_id);
        self.save_text(&updated)?;

        let parsed = parse_document(&updated);
        Ok(Json(AppendNodeResponse {
            node_id: node_id.into_string(),
            connected_from: connect_from.map(NodeId::into_string),
            summary: summary_of(&parsed),
        }))
    }

    /// Point the viewer focus (`lastActive`) at an existing node.
    #[tool(name = "trajectory.set_last_active")]
    async fn trajectory_set_last_active(
        &self,
        params: Parameters<SetLastActiveParams>,
    ) -> Result<Json<SetLastActiveResponse>, ErrorData> {
        let node_id = parse_node_id(&params.0.node_id)?;

        let text = self.load_text()?;
        if !parse_document(&text).document().contains_node(&node_id) {
            return Err(ErrorData::invalid_params(
                format!("node not found: {node_id}"),
                None,
            ));
        }

        let updated = ops::set_last_active(&text, &node_id);
        self.save_text(&updated)?;
        Ok(Json(SetLastActiveResponse {
            node_id: node_id.into_string(),
        }))
    }

    /// Mark a node done (`closed`) or re-open it. Rewrites only that node's
    /// metadata marker.
    #[tool(name = "trajectory.set_node_state")]
    async fn trajectory_set_node_state(
        &self,
        params: Parameters<SetNodeStateParams>,
    ) -> Result<Json<SetNodeStateResponse>, ErrorData> {
        let node_id = parse_node_id(&params.0.node_id)?;
        let state = parse_node_state(&params.0.state)?;

        let text = self.load_text()?;
        let updated = ops::set_node_state(&text, &node_id, state)
            .map_err(|err| ErrorData::invalid_params(err.to_string(), None))?;
        self.save_text(&updated)?;

        Ok(Json(SetNodeStateResponse {
            node_id: node_id.into_string(),
            state: state.as_str().to_owned(),
        }))
    }

    /// List open work items, blockers first.
    #[tool(name = "trajectory.open_tasks")]
    async fn trajectory_open_tasks(&self) -> Result<Json<OpenTasksResponse>, ErrorData> {
        let text = self.load_text()?;
        let parsed = parse_document(&text);
        let document = parsed.document();

        let tasks = query::open_nodes(document)
            .into_iter()
            .filter_map(|node_id| {
                let node = document.node(&node_id)?;
                Some(OpenTaskEntry {
                    node_id: node_id.as_str().to_owned(),
                    node_type: node.node_type().as_str().to_owned(),
                    label: node.label().to_owned(),
                    blocker: node.node_type() == NodeType::Blocker,
                })
            })
            .collect();

        Ok(Json(OpenTasksResponse { tasks }))
    }

    /// Regex search over node labels and descriptions.
    #[tool(name = "trajectory.search")]
    async fn trajectory_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<Json<SearchResponse>, ErrorData> {
        let pattern = regex::Regex::new(&params.0.pattern).map_err(|err| {
            ErrorData::invalid_params(format!("invalid search pattern: {err}"), None)
        })?;

        let text = self.load_text()?;
        let parsed = parse_document(&text);
        let document = parsed.document();

        let matches = query::search(document, &pattern)
            .into_iter()
            .filter_map(|found| {
                let node = document.node(&found.node_id)?;
                Some(SearchMatchEntry {
                    node_id: found.node_id.as_str().to_owned(),
                    field: found.field.as_str().to_owned(),
                    label: node.label().to_owned(),
                })
            })
            .collect();

        Ok(Json(SearchResponse { matches }))
    }

    /// Deterministic text rendering of the graph, one line per node.
    #[tool(name = "trajectory.render_text")]
    async fn trajectory_render_text(&self) -> Result<Json<RenderTextResponse>, ErrorData> {
        let text = self.load_text()?;
        let parsed = parse_document(&text);
        Ok(Json(RenderTextResponse {
            text: viewer::render_text(parsed.document()),
        }))
    }

    /// The automation trigger: report a finished turn and learn whether to
    /// prompt for a trajectory update. Loop-guarded to at most one request
    /// per completed unit of work; never errors on the suppress path.
    #[tool(name = "trajectory.turn_finished")]
    async fn trajectory_turn_finished(
        &self,
        params: Parameters<TurnFinishedParams>,
    ) -> Result<Json<TurnFinishedResponse>, ErrorData> {
        let signal = TurnSignal {
            reentrant: params.0.reentrant.unwrap_or(false),
            transcript_chars: params.0.transcript_chars.unwrap_or(MIN_TRANSCRIPT_CHARS),
        };

        let request = handle_turn_finished(&self.file, signal);
        Ok(Json(TurnFinishedResponse {
            update_requested: request.is_some(),
            append_target: request
                .and_then(|request| request.append_target)
                .map(NodeId::into_string),
        }))
    }
}

#[tool_handler]
impl ServerHandler for TrailmapMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Trailmap trajectory server (tools: trajectory.read, trajectory.append_node, trajectory.set_last_active, trajectory.set_node_state, trajectory.open_tasks, trajectory.search, trajectory.render_text, trajectory.turn_finished)"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
