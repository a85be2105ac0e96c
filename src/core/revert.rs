use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;
use tokio::process::Command;

use crate::core::engine::traits::WorkspaceReverter;
use crate::types::config::RevertStrategy;
use crate::types::{ContentHash, HashError, RevertError};

async fn run_in(directory: &Path, program: &str, args: &[&str]) -> Result<(), RevertError> {
    let command = format!("{program} {}", args.join(" "));
    let output = Command::new(program)
        .args(args)
        .current_dir(directory)
        .output()
        .await
        .map_err(|source| RevertError::Spawn {
            command: command.clone(),
            directory: directory.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(RevertError::Command {
            command,
            directory: directory.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Paths from `keep` that lie below `directory`, relative to it.
fn kept_below<'a>(
    keep: &'a [PathBuf],
    directory: &'a Path,
) -> impl Iterator<Item = &'a Path> {
    keep.iter()
        .filter_map(move |path| path.strip_prefix(directory).ok())
        .filter(|relative| !relative.as_os_str().is_empty())
}

/// Restores tracked files and deletes everything untracked or ignored,
/// except the paths it was told to keep.
#[derive(Debug, Default)]
pub struct GitReverter {
    keep: Vec<PathBuf>,
}

impl GitReverter {
    pub fn keeping(keep: Vec<PathBuf>) -> Self {
        Self { keep }
    }
}

impl WorkspaceReverter for GitReverter {
    async fn revert(&self, directory: &Path) -> Result<(), RevertError> {
        debug!("Reverting changes in {}", directory.display());
        run_in(directory, "git", &["checkout", "--", "."]).await?;

        let excludes: Vec<String> = kept_below(&self.keep, directory)
            .map(|relative| format!(":(exclude){}", relative.to_string_lossy()))
            .collect();
        let mut args = vec!["clean", "-fdx", "--", "."];
        args.extend(excludes.iter().map(String::as_str));
        run_in(directory, "git", &args).await
    }
}

pub struct SvnReverter;

impl WorkspaceReverter for SvnReverter {
    async fn revert(&self, directory: &Path) -> Result<(), RevertError> {
        debug!("Reverting changes in {}", directory.display());
        run_in(directory, "svn", &["revert", "--recursive", "."]).await?;
        run_in(
            directory,
            "svn",
            &["cleanup", "--remove-unversioned", "--remove-ignored", "."],
        )
        .await
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    files: BTreeMap<PathBuf, ContentHash>,
    dirs: BTreeSet<PathBuf>,
}

/// Keeps a content-addressed copy of each project directory taken before its
/// baseline build, for trees that are not under version control.
pub struct SnapshotReverter {
    store: PathBuf,
    keep: Vec<PathBuf>,
    snapshots: Mutex<HashMap<PathBuf, Snapshot>>,
}

impl SnapshotReverter {
    pub fn new(store: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
            keep: Vec::new(),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Paths that are neither captured nor touched on revert.
    pub fn keeping(mut self, keep: Vec<PathBuf>) -> Self {
        self.keep = keep;
        self
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.store.join(hash.to_hex())
    }

    fn capture(&self, directory: &Path) -> Result<Snapshot, RevertError> {
        fs::create_dir_all(&self.store).map_err(|source| io_err(&self.store, source))?;

        let mut snapshot = Snapshot::default();
        let (files, dirs) = self.walk(directory)?;
        for relative in files {
            let path = directory.join(&relative);
            let bytes = fs::read(&path).map_err(|source| io_err(&path, source))?;
            let hash = ContentHash::digest(&bytes);
            let blob = self.blob_path(&hash);
            if !blob.exists() {
                fs::write(&blob, &bytes).map_err(|source| io_err(&blob, source))?;
            }
            snapshot.files.insert(relative, hash);
        }
        snapshot.dirs = dirs.into_iter().collect();
        Ok(snapshot)
    }

    fn restore(&self, directory: &Path, snapshot: &Snapshot) -> Result<(), RevertError> {
        let (files, dirs) = self.walk(directory)?;

        for relative in &files {
            if !snapshot.files.contains_key(relative) {
                let path = directory.join(relative);
                fs::remove_file(&path).map_err(|source| io_err(&path, source))?;
            }
        }

        // Deepest first so parents are empty by the time they are visited.
        for relative in dirs.iter().rev() {
            if !snapshot.dirs.contains(relative) {
                let path = directory.join(relative);
                fs::remove_dir_all(&path).map_err(|source| io_err(&path, source))?;
            }
        }

        for (relative, hash) in &snapshot.files {
            let path = directory.join(relative);
            let current = fs::read(&path).ok().map(|bytes| ContentHash::digest(&bytes));
            if current.as_ref() == Some(hash) {
                continue;
            }

            let blob = self.blob_path(hash);
            let bytes = fs::read(&blob).map_err(|source| io_err(&blob, source))?;
            let found = ContentHash::digest(&bytes);
            if found != *hash {
                return Err(RevertError::Corrupt {
                    path: blob,
                    source: HashError::Mismatch {
                        expected: *hash,
                        found,
                    },
                });
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| io_err(parent, source))?;
            }
            debug!("Restoring {}", path.display());
            fs::write(&path, bytes).map_err(|source| io_err(&path, source))?;
        }

        Ok(())
    }

    /// Relative paths of every file and directory below `root`, sorted.
    fn walk(&self, root: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), RevertError> {
        let mut files = Vec::new();
        let mut dirs = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir).map_err(|source| io_err(&dir, source))? {
                let path = entry.map_err(|source| io_err(&dir, source))?.path();
                let kept = self.keep.iter().any(|k| path.starts_with(k));
                if kept || path.starts_with(&self.store) {
                    continue;
                }
                let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                let metadata =
                    fs::symlink_metadata(&path).map_err(|source| io_err(&path, source))?;
                if metadata.is_dir() {
                    dirs.push(relative);
                    pending.push(path);
                } else {
                    files.push(relative);
                }
            }
        }

        files.sort();
        dirs.sort();
        Ok((files, dirs))
    }
}

impl WorkspaceReverter for SnapshotReverter {
    async fn prepare(&self, directory: &Path) -> Result<(), RevertError> {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        if snapshots.contains_key(directory) {
            return Ok(());
        }
        debug!("Taking snapshot of {}", directory.display());
        let snapshot = self.capture(directory)?;
        snapshots.insert(directory.to_path_buf(), snapshot);
        Ok(())
    }

    async fn revert(&self, directory: &Path) -> Result<(), RevertError> {
        debug!("Reverting changes in {}", directory.display());
        let snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = snapshots
            .get(directory)
            .ok_or_else(|| RevertError::MissingSnapshot(directory.to_path_buf()))?;
        self.restore(directory, snapshot)
    }
}

fn io_err(path: &Path, source: io::Error) -> RevertError {
    RevertError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// The reverter picked by configuration.
pub enum Reverter {
    Git(GitReverter),
    Svn(SvnReverter),
    Snapshot(SnapshotReverter),
}

impl Reverter {
    /// `keep` lists paths (the results directory) that must survive a revert
    /// even when they sit inside a project directory. svn cannot exclude
    /// paths from a cleanup, so callers must keep them out of svn projects.
    pub fn from_strategy(
        strategy: RevertStrategy,
        snapshot_store: PathBuf,
        keep: Vec<PathBuf>,
    ) -> Self {
        match strategy {
            RevertStrategy::Git => Reverter::Git(GitReverter::keeping(keep)),
            RevertStrategy::Svn => Reverter::Svn(SvnReverter),
            RevertStrategy::Snapshot => {
                Reverter::Snapshot(SnapshotReverter::new(snapshot_store).keeping(keep))
            }
        }
    }
}

impl WorkspaceReverter for Reverter {
    async fn prepare(&self, directory: &Path) -> Result<(), RevertError> {
        match self {
            Reverter::Git(r) => r.prepare(directory).await,
            Reverter::Svn(r) => r.prepare(directory).await,
            Reverter::Snapshot(r) => r.prepare(directory).await,
        }
    }

    async fn revert(&self, directory: &Path) -> Result<(), RevertError> {
        match self {
            Reverter::Git(r) => r.revert(directory).await,
            Reverter::Svn(r) => r.revert(directory).await,
            Reverter::Snapshot(r) => r.revert(directory).await,
        }
    }
}
