//! Workspace directory allocation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::fs;
use tracing::debug;

use crate::deploy::error::DeployError;
use crate::deploy::locator::RepoCoordinates;

/// Branch whose workspace is named after the repository alone
pub const DEFAULT_BRANCH: &str = "main";

type Reservations = Arc<Mutex<HashSet<PathBuf>>>;

/// Resolves and reserves workspace directories.
///
/// A workspace is only handed out if nothing exists at its path on disk and no
/// other run in this process holds it. No directory is created here; the
/// clone creates it.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    reserved: Reservations,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reserved: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Resolve the workspace path without touching the filesystem.
    ///
    /// An explicit directory is used verbatim relative to the root. Otherwise
    /// the repository name is used, suffixed with the branch unless it is `main`.
    pub fn resolve(
        &self,
        coords: &RepoCoordinates,
        branch: &str,
        explicit_dir: Option<&str>,
    ) -> PathBuf {
        match explicit_dir {
            Some(dir) => self.root.join(dir),
            None => self.root.join(derive_dir_name(coords, branch)),
        }
    }

    /// Resolve the workspace path and claim it for one run
    pub async fn allocate(
        &self,
        coords: &RepoCoordinates,
        branch: &str,
        explicit_dir: Option<&str>,
    ) -> Result<Workspace, DeployError> {
        let path = self.resolve(coords, branch, explicit_dir);

        let lease = WorkspaceLease::acquire(&self.reserved, &path)
            .ok_or_else(|| DeployError::WorkspaceConflict(path.clone()))?;

        // An unreadable path is treated as taken
        if !matches!(fs::try_exists(&path).await, Ok(false)) {
            return Err(DeployError::WorkspaceConflict(path));
        }

        debug!("Allocated workspace {}", path.display());
        Ok(Workspace {
            path,
            _lease: lease,
        })
    }
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Directory name for a repository and branch
pub fn derive_dir_name(coords: &RepoCoordinates, branch: &str) -> String {
    if branch == DEFAULT_BRANCH {
        coords.name.clone()
    } else {
        // `feature/x` must not turn into a nested directory
        format!("{}-{}", coords.name, branch.replace('/', "-"))
    }
}

/// A workspace path reserved for the lifetime of one run
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    _lease: WorkspaceLease,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Releases the in-process reservation on drop
#[derive(Debug)]
struct WorkspaceLease {
    reserved: Reservations,
    path: PathBuf,
}

impl WorkspaceLease {
    fn acquire(reserved: &Reservations, path: &Path) -> Option<Self> {
        let inserted = reserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf());

        inserted.then(|| Self {
            reserved: reserved.clone(),
            path: path.to_path_buf(),
        })
    }
}

impl Drop for WorkspaceLease {
    fn drop(&mut self) {
        self.reserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}
