//! Asynchronous directory walking.
//! A [`Walk`] yields every entry below a root lazily, depth-first, with each directory
//! yielded before anything inside it. The walk can be restarted by calling
//! [`Walk::entries`] again.

use futures_util::stream::{self, Stream, TryStreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, ReadDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    /// Path relative to the walk root
    pub relative: PathBuf,
    pub kind: EntryKind,
}

impl WalkEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    /// Relative path with `/` separators, as used in archives and skip prefixes.
    pub fn relative_name(&self) -> String {
        relative_name(&self.relative)
    }
}

/// A directory tree to walk. Holds only the root, so every call to
/// [`Walk::entries`] sees the tree as it is at that time.
#[derive(Debug, Clone)]
pub struct Walk {
    root: PathBuf,
}

struct WalkState {
    root: PathBuf,
    started: bool,
    stack: Vec<ReadDir>,
}

impl Walk {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A fresh lazy stream over every entry below the root. The root itself is not yielded.
    ///
    /// # Returns
    /// * A stream of `io::Result<WalkEntry>`; it ends after the first error, such as a
    ///   missing root or an unreadable directory
    pub fn entries(&self) -> impl Stream<Item = io::Result<WalkEntry>> + Send + 'static {
        let state = WalkState { root: self.root.clone(), started: false, stack: Vec::new() };

        stream::try_unfold(state, |mut state| async move {
            if !state.started {
                state.stack.push(fs::read_dir(&state.root).await?);
                state.started = true;
            }

            while let Some(dir) = state.stack.last_mut() {
                let Some(entry) = dir.next_entry().await? else {
                    state.stack.pop();
                    continue;
                };

                let path = entry.path();
                let kind = if entry.file_type().await?.is_dir() {
                    state.stack.push(fs::read_dir(&path).await?);
                    EntryKind::Dir
                } else {
                    EntryKind::File
                };

                let relative = path.strip_prefix(&state.root).unwrap_or(&path).to_path_buf();
                return Ok(Some((WalkEntry { path, relative, kind }, state)));
            }

            Ok::<_, io::Error>(None)
        })
    }

    /// Reads the whole walk into memory, in walk order.
    pub async fn collect(&self) -> io::Result<Vec<WalkEntry>> {
        self.entries().try_collect().await
    }
}

/// Joins the components of `relative` with `/`.
pub fn relative_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directories_precede_their_contents() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("a/b")).unwrap();
        std::fs::write(root.path().join("a/b/file.txt"), "x").unwrap();
        std::fs::write(root.path().join("top.txt"), "y").unwrap();

        let entries = Walk::new(root.path()).collect().await.unwrap();
        let names: Vec<String> = entries.iter().map(WalkEntry::relative_name).collect();
        let position = |name: &str| names.iter().position(|n| n == name).unwrap();

        assert_eq!(names.len(), 4);
        assert!(position("a") < position("a/b"));
        assert!(position("a/b") < position("a/b/file.txt"));
        assert!(entries[position("a/b")].is_dir());
        assert!(!entries[position("top.txt")].is_dir());
    }

    #[tokio::test]
    async fn test_walk_is_restartable() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("one"), "1").unwrap();

        let walk = Walk::new(root.path());
        assert_eq!(walk.collect().await.unwrap().len(), 1);
        std::fs::write(root.path().join("two"), "2").unwrap();
        assert_eq!(walk.collect().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        assert!(Walk::new(root.path().join("missing")).collect().await.is_err());
    }
}
