// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrajectorySummary {
    pub direction: String,
    pub node_count: u64,
    pub edge_count: u64,
    pub open_count: u64,
    pub last_active_node_id: Option<String>,
    pub warning_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrajectoryReadResponse {
    pub text: String,
    pub summary: TrajectorySummary,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AppendNodeParams {
    /// Unique node id; omitted ids are generated (`node_<millis>`).
    pub node_id: Option<String>,
    /// One of: start, end, ai-task, human-task, condition, blocker.
    pub node_type: String,
    pub label: String,
    pub description: Option<String>,
    /// Predecessor node id; empty or omitted appends without a connector.
    pub connect_from: Option<String>,
    /// One of: opened, closed. Defaults to opened.
    pub state: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppendNodeResponse {
    pub node_id: String,
    pub connected_from: Option<String>,
    pub summary: TrajectorySummary,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetLastActiveParams {
    pub node_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetLastActiveResponse {
    pub node_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetNodeStateParams {
    pub node_id: String,
    /// One of: opened, closed.
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetNodeStateResponse {
    pub node_id: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OpenTaskEntry {
    pub node_id: String,
    pub node_type: String,
    pub label: String,
    pub blocker: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OpenTasksResponse {
    pub tasks: Vec<OpenTaskEntry>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Regular expression matched against labels and descriptions.
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchMatchEntry {
    pub node_id: String,
    pub field: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse {
    pub matches: Vec<SearchMatchEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderTextResponse {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TurnFinishedParams {
    /// Set when this turn is a re-entrant continuation of a requested update.
    pub reentrant: Option<bool>,
    /// Transcript length hint; short turns request nothing.
    pub transcript_chars: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TurnFinishedResponse {
    pub update_requested: bool,
    pub append_target: Option<String>,
}
