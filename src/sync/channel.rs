// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::format::parser::parse_document;
use crate::model::NodeId;
use crate::ops;
use crate::store::{StoreError, TrajectoryFile};

/// Bursts of file events or viewer edits inside this window coalesce into a
/// single re-read or commit.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Channel → viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerUpdate {
    Load { text: String },
    Update { text: String },
}

impl ViewerUpdate {
    pub fn text(&self) -> &str {
        match self {
            Self::Load { text } | Self::Update { text } => text,
        }
    }
}

/// Viewer → channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerMessage {
    Edited { text: String },
    NodeSelected { node_id: NodeId },
    OpenSearch,
}

/// What the host shell should do in response to a viewer message the channel
/// itself does not fully absorb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerAction {
    Focus { node_id: NodeId },
    OpenSearch,
}

pub trait ViewerSink {
    fn send(&mut self, update: ViewerUpdate);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ViewerId(u64);

#[derive(Debug)]
struct PendingEdit {
    origin: ViewerId,
    text: String,
    due: Instant,
}

/// Keeps one canonical text consistent across the on-disk file and N
/// attached viewers.
///
/// Single-threaded: the host event loop feeds in file events and viewer
/// messages and calls [`SyncChannel::poll`] with the current time; nothing
/// here blocks or spawns. Propagation is last-write-wins; the file system
/// serializes concurrent writers, not this channel.
pub struct SyncChannel {
    file: TrajectoryFile,
    text: Option<String>,
    viewers: BTreeMap<ViewerId, Box<dyn ViewerSink>>,
    next_viewer_id: u64,
    reload_due: Option<Instant>,
    pending_edit: Option<PendingEdit>,
}

impl SyncChannel {
    pub fn new(file: TrajectoryFile) -> Self {
        let text = file.load_document().ok().flatten();
        Self {
            file,
            text,
            viewers: BTreeMap::new(),
            next_viewer_id: 0,
            reload_due: None,
            pending_edit: None,
        }
    }

    pub fn file(&self) -> &TrajectoryFile {
        &self.file
    }

    pub fn current_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Attaches a viewer and delivers the initial `load`. A missing canonical
    /// file delivers nothing; the viewer stays blank until a write happens.
    pub fn attach(&mut self, mut sink: Box<dyn ViewerSink>) -> ViewerId {
        let viewer_id = ViewerId(self.next_viewer_id);
        self.next_viewer_id += 1;

        if let Some(text) = &self.text {
            sink.send(ViewerUpdate::Load { text: text.clone() });
        }
        self.viewers.insert(viewer_id, sink);
        viewer_id
    }

    pub fn detach(&mut self, viewer_id: ViewerId) {
        self.viewers.remove(&viewer_id);
    }

    /// Records a file-change notification. Notifications arriving faster
    /// than the debounce window collapse into the one pending re-read.
    pub fn note_file_event(&mut self, now: Instant) {
        if self.reload_due.is_none() {
            self.reload_due = Some(now + DEBOUNCE_WINDOW);
        }
    }

    pub fn on_viewer_message(
        &mut self,
        viewer_id: ViewerId,
        message: ViewerMessage,
        now: Instant,
    ) -> Option<ViewerAction> {
        match message {
            ViewerMessage::Edited { text } => {
                // Last edit wins within the window; the deadline slides while
                // the user keeps typing.
                self.pending_edit = Some(PendingEdit {
                    origin: viewer_id,
                    text,
                    due: now + DEBOUNCE_WINDOW,
                });
                None
            }
            ViewerMessage::NodeSelected { node_id } => {
                let base = self
                    .pending_edit
                    .as_ref()
                    .map(|pending| pending.text.as_str())
                    .or(self.text.as_deref())?;
                if !parse_document(base).document().contains_node(&node_id) {
                    return None;
                }
                let updated = ops::set_last_active(base, &node_id);
                self.pending_edit = Some(PendingEdit {
                    origin: viewer_id,
                    text: updated,
                    due: now + DEBOUNCE_WINDOW,
                });
                Some(ViewerAction::Focus { node_id })
            }
            ViewerMessage::OpenSearch => Some(ViewerAction::OpenSearch),
        }
    }

    /// Drives the debounce timers. Call on every host tick with the current
    /// time; commits and re-reads happen only once their window has passed.
    pub fn poll(&mut self, now: Instant) -> Result<(), StoreError> {
        if self
            .pending_edit
            .as_ref()
            .is_some_and(|pending| now >= pending.due)
        {
            let pending = self.pending_edit.take().expect("pending edit checked above");
            self.commit_edit(pending)?;
        }

        if self.reload_due.is_some_and(|due| now >= due) {
            self.reload_due = None;
            self.reload()?;
        }

        Ok(())
    }

    fn commit_edit(&mut self, pending: PendingEdit) -> Result<(), StoreError> {
        if self.text.as_deref() == Some(pending.text.as_str()) {
            return Ok(());
        }

        self.file.save_document(&pending.text)?;
        self.text = Some(pending.text.clone());

        for (viewer_id, sink) in &mut self.viewers {
            if *viewer_id == pending.origin {
                continue;
            }
            sink.send(ViewerUpdate::Update {
                text: pending.text.clone(),
            });
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<(), StoreError> {
        match self.file.load_document()? {
            // The file went away: nothing to do, viewers keep what they have.
            None => {
                self.text = None;
                Ok(())
            }
            Some(new_text) => {
                // An unchanged read (including our own write echoing back as
                // a change notification) must not fan out again.
                if self.text.as_deref() == Some(new_text.as_str()) {
                    return Ok(());
                }
                self.text = Some(new_text.clone());
                for sink in self.viewers.values_mut() {
                    sink.send(ViewerUpdate::Update {
                        text: new_text.clone(),
                    });
                }
                Ok(())
            }
        }
    }
}
