// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The trajectory text format: a tolerant line classifier, a lossless
//! parser, and the patch-line writer.

pub mod line;
pub mod parser;
pub mod writer;

pub use line::{classify_line, LineKind, LineWarning, MetadataMarker, SourceLine};
pub use parser::{parse_document, ParseWarning, ParsedTrajectory};
