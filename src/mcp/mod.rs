// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! MCP surface: the trajectory tools exposed to AI tooling over stdio or
//! streamable HTTP.

pub mod server;
pub mod types;

pub use server::TrailmapMcp;
