// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::store::{write_atomic, StoreError, WriteDurability};

/// Turn-finished signals whose transcript hint falls below this are treated
/// as "nothing meaningful happened" and leave the gate untouched.
pub const MIN_TRANSCRIPT_CHARS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    /// No update in flight; the next completed work unit may request one.
    #[default]
    Idle,
    /// An update was requested; further triggers are suppressed until the
    /// next observation confirms completion.
    Updating,
}

/// A "turn finished" notification from the host automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnSignal {
    /// Set when this turn is a re-entrant continuation of an update we
    /// requested ourselves.
    pub reentrant: bool,
    pub transcript_chars: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Emit exactly one update request.
    RequestUpdate,
    /// Expected steady-state suppression, not an error.
    Suppress,
    /// Below the transcript threshold; no transition happened.
    Ignore,
}

/// The auto-update loop guard: at most one outstanding update request per
/// completed unit of work. An explicit value rather than process state, so
/// the machine is testable and survives process restarts via the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateGate {
    phase: GatePhase,
}

impl UpdateGate {
    pub fn new(phase: GatePhase) -> Self {
        Self { phase }
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    pub fn on_turn_finished(&mut self, signal: TurnSignal) -> GateDecision {
        if signal.transcript_chars < MIN_TRANSCRIPT_CHARS {
            return GateDecision::Ignore;
        }

        if signal.reentrant {
            self.phase = GatePhase::Idle;
            return GateDecision::Suppress;
        }

        match self.phase {
            GatePhase::Idle => {
                self.phase = GatePhase::Updating;
                GateDecision::RequestUpdate
            }
            GatePhase::Updating => {
                self.phase = GatePhase::Idle;
                GateDecision::Suppress
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct GateRecord {
    phase: GatePhase,
}

/// Loads the persisted gate. Tolerant: a missing or unreadable sidecar means
/// `Idle`, since the trigger path must never fail hard.
pub fn load_gate(path: &Path) -> UpdateGate {
    let Ok(raw) = fs::read_to_string(path) else {
        return UpdateGate::default();
    };
    match serde_json::from_str::<GateRecord>(&raw) {
        Ok(record) => UpdateGate::new(record.phase),
        Err(_) => UpdateGate::default(),
    }
}

pub fn save_gate(
    path: &Path,
    gate: UpdateGate,
    durability: WriteDurability,
) -> Result<(), StoreError> {
    let record = GateRecord { phase: gate.phase() };
    let raw = serde_json::to_string_pretty(&record).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, format!("{raw}\n").as_bytes(), durability)
}

#[cfg(test)]
mod tests {
    use super::{
        load_gate, save_gate, GateDecision, GatePhase, TurnSignal, UpdateGate,
        MIN_TRANSCRIPT_CHARS,
    };
    use crate::store::WriteDurability;

    fn meaningful() -> TurnSignal {
        TurnSignal {
            reentrant: false,
            transcript_chars: MIN_TRANSCRIPT_CHARS,
        }
    }

    #[test]
    fn alternating_signals_request_at_most_every_other_time() {
        let mut gate = UpdateGate::default();
        let decisions = (0..6)
            .map(|_| gate.on_turn_finished(meaningful()))
            .collect::<Vec<_>>();
        assert_eq!(
            decisions,
            vec![
                GateDecision::RequestUpdate,
                GateDecision::Suppress,
                GateDecision::RequestUpdate,
                GateDecision::Suppress,
                GateDecision::RequestUpdate,
                GateDecision::Suppress,
            ]
        );
    }

    #[test]
    fn reentrant_signals_always_suppress_and_reset() {
        let mut gate = UpdateGate::default();
        assert_eq!(gate.on_turn_finished(meaningful()), GateDecision::RequestUpdate);
        assert_eq!(gate.phase(), GatePhase::Updating);

        let reentrant = TurnSignal {
            reentrant: true,
            transcript_chars: MIN_TRANSCRIPT_CHARS,
        };
        assert_eq!(gate.on_turn_finished(reentrant), GateDecision::Suppress);
        assert_eq!(gate.phase(), GatePhase::Idle);

        // From Idle a reentrant signal still never requests.
        assert_eq!(gate.on_turn_finished(reentrant), GateDecision::Suppress);
        assert_eq!(gate.phase(), GatePhase::Idle);
    }

    #[test]
    fn short_transcripts_leave_the_gate_untouched() {
        let mut gate = UpdateGate::new(GatePhase::Updating);
        let short = TurnSignal {
            reentrant: false,
            transcript_chars: MIN_TRANSCRIPT_CHARS - 1,
        };
        assert_eq!(gate.on_turn_finished(short), GateDecision::Ignore);
        assert_eq!(gate.phase(), GatePhase::Updating);
    }

    #[test]
    fn gate_round_trips_through_the_sidecar() {
        let dir = std::env::temp_dir().join(format!(
            "trailmap-gate-{}-{:?}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        let path = dir.join("trajectory.state.json");

        // Missing and corrupt sidecars both mean Idle.
        assert_eq!(load_gate(&path).phase(), GatePhase::Idle);

        save_gate(&path, UpdateGate::new(GatePhase::Updating), WriteDurability::BestEffort)
            .expect("save gate");
        assert_eq!(load_gate(&path).phase(), GatePhase::Updating);

        std::fs::write(&path, "{ not json").expect("write corrupt sidecar");
        assert_eq!(load_gate(&path).phase(), GatePhase::Idle);

        let _ = std::fs::remove_dir_all(dir);
    }
}
