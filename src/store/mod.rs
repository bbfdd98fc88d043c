// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Canonical file persistence.
//!
//! The trajectory file is the single source of truth. Every write replaces
//! the whole file atomically (temp file + rename), so readers never observe
//! a half-written document.

use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::format::writer::seed_document;

pub const TRAJECTORY_FILENAME: &str = "trajectory.mmd";
pub const STATE_FILENAME: &str = "trajectory.state.json";
pub const HOOKS_FILENAME: &str = "trailmap.hooks.json";

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    SymlinkRefused {
        path: PathBuf,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::SymlinkRefused { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to stable
    /// storage where possible. Exact guarantees are platform/filesystem-dependent.
    Durable,
}

/// Atomic whole-file replace. The temp file lives next to the target so the
/// rename stays on one filesystem.
pub fn write_atomic(
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };
    fs::create_dir_all(parent).map_err(|source| StoreError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let tmp_path = parent.join(format!(".{file_name}.tmp-{}-{nanos}", std::process::id()));

    let result = (|| -> Result<(), StoreError> {
        let mut tmp = fs::File::create(&tmp_path).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        tmp.write_all(contents).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        if durability == WriteDurability::Durable {
            tmp.sync_all().map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        }
        drop(tmp);

        fs::rename(&tmp_path, path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if durability == WriteDurability::Durable {
            // Flushing the directory entry is best-effort and platform-dependent.
            if let Ok(dir) = fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Automation hook configuration written by `init` and removed by
/// `uninstall`. Consumed by the host automation, not by trailmap itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HooksConfig {
    pub version: u32,
    pub on_turn_finished: String,
    pub min_transcript_chars: u64,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            version: 1,
            on_turn_finished: "trailmap --mcp".to_owned(),
            min_transcript_chars: crate::sync::MIN_TRANSCRIPT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitReport {
    pub created_document: bool,
    pub created_hooks: bool,
}

/// One project's trajectory on disk: the document, the sync-state sidecar,
/// and the hook config, all inside a single directory.
#[derive(Debug, Clone)]
pub struct TrajectoryFile {
    dir: PathBuf,
    durability: WriteDurability,
}

impl TrajectoryFile {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            durability: WriteDurability::default(),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn document_path(&self) -> PathBuf {
        self.dir.join(TRAJECTORY_FILENAME)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILENAME)
    }

    pub fn hooks_path(&self) -> PathBuf {
        self.dir.join(HOOKS_FILENAME)
    }

    /// Reads the canonical text. A missing file is "nothing to do", not an
    /// error.
    pub fn load_document(&self) -> Result<Option<String>, StoreError> {
        let path = self.document_path();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    pub fn save_document(&self, text: &str) -> Result<(), StoreError> {
        write_atomic(&self.document_path(), text.as_bytes(), self.durability)
    }

    pub fn document_modified(&self) -> Option<SystemTime> {
        fs::metadata(self.document_path())
            .and_then(|md| md.modified())
            .ok()
    }

    pub fn load_hooks(&self) -> Result<Option<HooksConfig>, StoreError> {
        let path = self.hooks_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let config =
            serde_json::from_str(&raw).map_err(|source| StoreError::Json { path, source })?;
        Ok(Some(config))
    }

    /// Scaffolds the seed document and hook config. Existing files are left
    /// untouched, so `init` is safe to re-run.
    pub fn init(&self) -> Result<InitReport, StoreError> {
        let mut report = InitReport::default();

        if self.load_document()?.is_none() {
            self.save_document(&seed_document())?;
            report.created_document = true;
        }

        if self.load_hooks()?.is_none() {
            let path = self.hooks_path();
            let config = HooksConfig::default();
            let raw = serde_json::to_string_pretty(&config).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;
            write_atomic(&path, format!("{raw}\n").as_bytes(), self.durability)?;
            report.created_hooks = true;
        }

        Ok(report)
    }

    /// Removes the hook config and nothing else; the trajectory is a
    /// user-owned artifact. Returns whether a config was actually removed.
    pub fn uninstall(&self) -> Result<bool, StoreError> {
        let path = self.hooks_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{TrajectoryFile, WriteDurability};

    fn temp_project_dir(tag: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "trailmap-store-{tag}-{}-{nanos}",
            std::process::id()
        ))
    }

    #[test]
    fn missing_document_loads_as_none() {
        let file = TrajectoryFile::new(temp_project_dir("missing"));
        assert_eq!(file.load_document().expect("load"), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = temp_project_dir("roundtrip");
        let file = TrajectoryFile::new(&dir);
        file.save_document("flowchart TD\na[One]\n").expect("save");
        assert_eq!(
            file.load_document().expect("load").as_deref(),
            Some("flowchart TD\na[One]\n")
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn durable_save_round_trips_too() {
        let dir = temp_project_dir("durable");
        let file = TrajectoryFile::new(&dir).with_durability(WriteDurability::Durable);
        file.save_document("flowchart TD\n").expect("save");
        assert_eq!(
            file.load_document().expect("load").as_deref(),
            Some("flowchart TD\n")
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn init_scaffolds_once_and_is_idempotent() {
        let dir = temp_project_dir("init");
        let file = TrajectoryFile::new(&dir);

        let first = file.init().expect("first init");
        assert!(first.created_document);
        assert!(first.created_hooks);

        // A second run must not clobber user edits.
        file.save_document("flowchart TD\nedited[By hand]\n")
            .expect("save");
        let second = file.init().expect("second init");
        assert!(!second.created_document);
        assert!(!second.created_hooks);
        assert_eq!(
            file.load_document().expect("load").as_deref(),
            Some("flowchart TD\nedited[By hand]\n")
        );

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn uninstall_removes_hooks_but_keeps_the_document() {
        let dir = temp_project_dir("uninstall");
        let file = TrajectoryFile::new(&dir);
        file.init().expect("init");

        assert!(file.uninstall().expect("uninstall"));
        assert!(file.load_hooks().expect("load hooks").is_none());
        assert!(file.load_document().expect("load document").is_some());

        // Removing again is a clean no-op.
        assert!(!file.uninstall().expect("second uninstall"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[cfg(unix)]
    #[test]
    fn write_refuses_symlinked_documents() {
        let dir = temp_project_dir("symlink");
        std::fs::create_dir_all(&dir).expect("create dir");
        let target = dir.join("elsewhere.mmd");
        std::fs::write(&target, "flowchart TD\n").expect("write target");
        let file = TrajectoryFile::new(&dir);
        std::os::unix::fs::symlink(&target, file.document_path()).expect("symlink");

        let err = file.save_document("flowchart LR\n").unwrap_err();
        assert!(matches!(err, super::StoreError::SymlinkRefused { .. }));

        let _ = std::fs::remove_dir_all(dir);
    }
}
