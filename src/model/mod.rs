// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core trajectory model types.

pub mod document;
pub mod ids;
pub mod node;

pub use document::{Direction, TrajectoryDocument, TrajectoryEdge};
pub use ids::{Id, IdError, NodeId};
pub use node::{NodeShape, NodeState, NodeType, TrajectoryNode};
