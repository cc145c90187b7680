//! Per-operation temp file management
//!
//! Every pipeline flow works through a [`WorkspaceScope`]: file names are
//! qualified by the operation id, so concurrent flows sharing the process-wide
//! temp root never collide, and `release()` deletes everything the scope
//! created regardless of how the flow ended. Deletion failures are logged and
//! never override the flow's real result.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Process-wide temp root; hands out per-operation scopes
#[derive(Debug, Clone)]
pub struct TempWorkspace {
    root: PathBuf,
}

impl TempWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a scope for one operation, creating the temp root lazily
    pub async fn scope(&self, op_id: Uuid) -> io::Result<WorkspaceScope> {
        fs::create_dir_all(&self.root).await?;
        Ok(WorkspaceScope {
            root: self.root.clone(),
            op_id,
            files: Vec::new(),
            released: false,
        })
    }
}

/// The set of temp files belonging to one flow invocation
///
/// Files are created at flow start, written once, read at most once
/// downstream, and deleted at flow end. A scope that is dropped without
/// `release()` (panic path) still removes its files via `Drop`.
#[derive(Debug)]
pub struct WorkspaceScope {
    root: PathBuf,
    op_id: Uuid,
    files: Vec<PathBuf>,
    released: bool,
}

impl WorkspaceScope {
    /// Mint a uniquely named path for `role` (e.g. "in.mp3") and register
    /// it for deletion. The file itself is created by whoever writes it.
    pub fn create(&mut self, role: &str) -> PathBuf {
        let path = self.root.join(format!("{}_{}", self.op_id, role));
        self.files.push(path.clone());
        path
    }

    /// Create a `role` file and write `bytes` into it
    pub async fn write(&mut self, role: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.create(role);
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub fn op_id(&self) -> Uuid {
        self.op_id
    }

    /// Delete every file this scope created. Best-effort: missing files are
    /// fine (a failed flow may never have written them), real failures are
    /// logged at warn and swallowed.
    pub async fn release(mut self) {
        for path in std::mem::take(&mut self.files) {
            match fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed temp file"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!(
                    path = %path.display(),
                    error = %err,
                    "Failed to remove temp file"
                ),
            }
        }
        self.released = true;
    }
}

impl Drop for WorkspaceScope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Panic-path backstop; the normal path goes through release()
        for path in &self.files {
            if let Err(err) = std::fs::remove_file(path) {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "Failed to remove temp file on drop"
                    );
                }
            }
        }
    }
}
