//! Bookmark store
//!
//! Holds the state document for a run. A file-backed store rewrites its file
//! whenever a bookmark changes, through a temp file and a rename so a reader
//! never sees half a document.

use super::types::{State, StreamBookmark};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Where the state document lives between runs
#[derive(Debug, Clone, PartialEq, Eq)]
enum Backing {
    Memory,
    File(PathBuf),
}

/// Shared handle on the run's state document
///
/// Clones share one document. With a file backing, every bookmark change is
/// on disk before `set_bookmark` returns.
#[derive(Debug, Clone)]
pub struct StateManager {
    doc: Arc<RwLock<State>>,
    backing: Backing,
}

impl StateManager {
    /// Empty document, never written anywhere
    pub fn in_memory() -> Self {
        Self::over(State::new(), Backing::Memory)
    }

    /// Load `path` if it exists; bookmark changes are written back to it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = match std::fs::read_to_string(&path) {
            Ok(text) => parse_state(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::new(),
            Err(e) => {
                return Err(Error::state(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        Ok(Self::over(doc, Backing::File(path)))
    }

    /// Document given inline, e.g. from `--state-json`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::over(parse_state(json)?, Backing::Memory))
    }

    /// Keep the loaded document but write it to `path` from now on
    #[must_use]
    pub fn persist_to(self, path: impl AsRef<Path>) -> Self {
        Self {
            backing: Backing::File(path.as_ref().to_path_buf()),
            ..self
        }
    }

    fn over(doc: State, backing: Backing) -> Self {
        Self {
            doc: Arc::new(RwLock::new(doc)),
            backing,
        }
    }

    /// State file, if any
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File(path) => Some(path),
            Backing::Memory => None,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.backing == Backing::Memory
    }

    /// Stored bookmark of `stream`
    pub async fn get_bookmark(&self, stream: &str) -> Option<StreamBookmark> {
        self.doc.read().await.get_bookmark(stream).cloned()
    }

    /// Replace the bookmark of `stream` and write through to the file
    pub async fn set_bookmark(&self, stream: &str, bookmark: StreamBookmark) -> Result<()> {
        self.doc.write().await.set_bookmark(stream, bookmark);
        self.save().await
    }

    /// Copy of the whole document
    pub async fn snapshot(&self) -> State {
        self.doc.read().await.clone()
    }

    /// Write the document to its file; nothing to do in memory
    pub async fn save(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };

        let text = serde_json::to_string_pretty(&*self.doc.read().await)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, text)
            .await
            .map_err(|e| Error::state(format!("Failed to write {}: {e}", staging.display())))?;
        tokio::fs::rename(&staging, path)
            .await
            .map_err(|e| Error::state(format!("Failed to replace {}: {e}", path.display())))
    }
}

fn parse_state(text: &str) -> Result<State> {
    serde_json::from_str(text).map_err(|e| Error::state(format!("Invalid state document: {e}")))
}
