// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Live synchronization between the canonical file, its viewers, and the
//! host automation's turn-finished trigger.

pub mod channel;
pub mod gate;

pub use channel::{
    SyncChannel, ViewerAction, ViewerId, ViewerMessage, ViewerSink, ViewerUpdate, DEBOUNCE_WINDOW,
};
pub use gate::{
    load_gate, save_gate, GateDecision, GatePhase, TurnSignal, UpdateGate, MIN_TRANSCRIPT_CHARS,
};

use crate::format::parser::parse_document;
use crate::model::NodeId;
use crate::store::TrajectoryFile;

/// An emitted auto-update request: the host automation should prompt for one
/// appended node, connected from `append_target` when one is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub append_target: Option<NodeId>,
}

/// The automation trigger path. Every failure mode collapses to `None`:
/// a missing document, an unreadable sidecar, or a suppressed signal must
/// never block the host assistant from completing its turn.
pub fn handle_turn_finished(file: &TrajectoryFile, signal: TurnSignal) -> Option<UpdateRequest> {
    let text = file.load_document().ok()??;

    let state_path = file.state_path();
    let mut gate = gate::load_gate(&state_path);
    let decision = gate.on_turn_finished(signal);
    if decision != GateDecision::Ignore {
        // Persistence is best-effort; an in-memory decision already happened.
        let _ = gate::save_gate(&state_path, gate, file.durability());
    }

    if decision != GateDecision::RequestUpdate {
        return None;
    }

    let parsed = parse_document(&text);
    let document = parsed.document();
    let append_target = document
        .last_active_node_id()
        .filter(|node_id| document.contains_node(node_id))
        .or_else(|| document.latest_node_id())
        .cloned();

    Some(UpdateRequest { append_target })
}

#[cfg(test)]
mod tests {
    use super::{handle_turn_finished, GatePhase, TurnSignal, MIN_TRANSCRIPT_CHARS};
    use crate::format::writer::seed_document;
    use crate::model::NodeId;
    use crate::store::TrajectoryFile;

    fn temp_file(tag: &str) -> TrajectoryFile {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        TrajectoryFile::new(std::env::temp_dir().join(format!(
            "trailmap-trigger-{tag}-{}-{nanos}",
            std::process::id()
        )))
    }

    fn meaningful() -> TurnSignal {
        TurnSignal {
            reentrant: false,
            transcript_chars: MIN_TRANSCRIPT_CHARS,
        }
    }

    #[test]
    fn missing_document_means_nothing_to_do() {
        let file = temp_file("missing");
        assert_eq!(handle_turn_finished(&file, meaningful()), None);
        // The gate was not touched either.
        assert_eq!(super::load_gate(&file.state_path()).phase(), GatePhase::Idle);
    }

    #[test]
    fn requests_alternate_and_survive_process_restarts() {
        let file = temp_file("alternate");
        file.save_document(&seed_document()).expect("save");

        let first = handle_turn_finished(&file, meaningful());
        assert_eq!(
            first.and_then(|request| request.append_target),
            Some(NodeId::new("start").expect("valid node id"))
        );

        // The phase lives in the sidecar, so a "new process" (fresh call)
        // still sees Updating and suppresses.
        assert_eq!(handle_turn_finished(&file, meaningful()), None);
        assert!(handle_turn_finished(&file, meaningful()).is_some());
    }

    #[test]
    fn reentrant_turns_are_silently_suppressed() {
        let file = temp_file("reentrant");
        file.save_document(&seed_document()).expect("save");

        assert!(handle_turn_finished(&file, meaningful()).is_some());
        let reentrant = TurnSignal {
            reentrant: true,
            transcript_chars: MIN_TRANSCRIPT_CHARS,
        };
        assert_eq!(handle_turn_finished(&file, reentrant), None);
        // The reentrant signal reset the gate, so real work requests again.
        assert!(handle_turn_finished(&file, meaningful()).is_some());
    }

    #[test]
    fn short_transcripts_request_nothing() {
        let file = temp_file("short");
        file.save_document(&seed_document()).expect("save");
        let short = TurnSignal {
            reentrant: false,
            transcript_chars: 3,
        };
        assert_eq!(handle_turn_finished(&file, short), None);
        // And the next real signal still gets the Idle -> Updating request.
        assert!(handle_turn_finished(&file, meaningful()).is_some());
    }

    #[test]
    fn dangling_last_active_falls_back_to_the_latest_node() {
        let file = temp_file("dangling");
        file.save_document("flowchart TD\n%% @lastActive: ghost\na[One]\nb[Two]\n")
            .expect("save");

        let request = handle_turn_finished(&file, meaningful()).expect("request");
        assert_eq!(
            request.append_target,
            Some(NodeId::new("b").expect("valid node id"))
        );
    }
}
