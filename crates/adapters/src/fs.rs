//! Local filesystem adapters: file reader and directory walker.

use bundle_sync_ports::{BoxFuture, FileReaderPort};
use bundle_sync_shared::{ErrorEnvelope, RequestContext, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Bounded capacity of the walker's path channel.
pub const WALKER_CHANNEL_CAPACITY: usize = 256;

const SKIPPED_DIRECTORIES: &[&str] = &[".git"];

/// Local file reader using async IO.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileReader;

impl LocalFileReader {
    /// Build a file reader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileReaderPort for LocalFileReader {
    fn file_size(&self, _ctx: &RequestContext, path: PathBuf) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let metadata = tokio::fs::metadata(&path).await.map_err(|error| {
                ErrorEnvelope::from(error).with_metadata("path", path.to_string_lossy())
            })?;
            Ok(metadata.len())
        })
    }

    fn read_file(&self, _ctx: &RequestContext, path: PathBuf) -> BoxFuture<'_, Result<Vec<u8>>> {
        Box::pin(async move {
            tokio::fs::read(&path).await.map_err(|error| {
                ErrorEnvelope::from(error).with_metadata("path", path.to_string_lossy())
            })
        })
    }
}

/// Handle to a running directory walk.
#[derive(Debug)]
pub struct DirectoryWalk {
    /// Absolute file paths in breadth-first, name-sorted order.
    pub paths: mpsc::Receiver<PathBuf>,
    /// Background walker task; finishes once the tree is exhausted or the receiver is dropped.
    pub task: JoinHandle<()>,
}

/// Walk `root` breadth-first on a background task, streaming regular files.
///
/// Entries of each directory are visited in byte order of their names.
/// `.git` directories and symlinks are skipped. Unreadable directories are
/// logged and skipped. The channel closes when the walk is done.
#[must_use]
pub fn spawn_directory_walker(root: PathBuf) -> DirectoryWalk {
    let (sender, paths) = mpsc::channel(WALKER_CHANNEL_CAPACITY);
    let task = tokio::spawn(async move {
        walk_breadth_first(&root, &sender).await;
    });
    DirectoryWalk { paths, task }
}

async fn walk_breadth_first(root: &Path, sender: &mpsc::Sender<PathBuf>) {
    let mut pending = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = pending.pop_front() {
        let entries = match read_sorted_entries(&dir).await {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(dir = %dir.display(), %error, "skipping unreadable directory");
                continue;
            },
        };

        for (path, file_type) in entries {
            if file_type.is_dir() {
                let skipped = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name));
                if !skipped {
                    pending.push_back(path);
                }
            } else if file_type.is_file() && sender.send(path).await.is_err() {
                tracing::debug!("path receiver dropped; stopping walk");
                return;
            }
        }
    }
}

async fn read_sorted_entries(dir: &Path) -> std::io::Result<Vec<(PathBuf, std::fs::FileType)>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_symlink() {
            continue;
        }
        entries.push((entry.path(), file_type));
    }
    entries.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(entries)
}
