// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Content addressed directory tree

use std::collections::VecDeque;
use std::{io, mem, path::PathBuf};

use fs_err as fs;
use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::{self, Digest};
use crate::path;

pub mod builder;
pub mod diff;
mod wire;

/// A node of the tree: either a regular file or a directory owning its children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "wire::Wire", from = "wire::Wire")]
pub enum Entry {
    File(File),
    Directory(Directory),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    path: String,
    hash: Digest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    path: String,
    hash: Digest,
    children: Vec<Entry>,
}

/// How [`Entry::transfer`] relocates content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Rename into place, leaving nothing behind
    Move,
    /// Duplicate into place, overwriting existing files
    Copy,
}

impl Entry {
    pub fn path(&self) -> &str {
        match self {
            Entry::File(file) => &file.path,
            Entry::Directory(dir) => &dir.path,
        }
    }

    pub fn hash(&self) -> &Digest {
        match self {
            Entry::File(file) => &file.hash,
            Entry::Directory(dir) => &dir.hash,
        }
    }

    pub fn file_name(&self) -> &str {
        path::file_name(self.path())
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Entry::Directory(dir) => Some(dir),
            Entry::File(_) => None,
        }
    }

    pub fn into_directory(self) -> Option<Directory> {
        match self {
            Entry::Directory(dir) => Some(dir),
            Entry::File(_) => None,
        }
    }

    /// Breadth first traversal, starting with (and including) this entry
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            queue: VecDeque::from([self]),
        }
    }

    /// Delete the entry from disk. Directories are emptied first and only
    /// removed themselves if `remove_self` is set.
    pub fn remove(&self, remove_self: bool) -> Result<(), Error> {
        match self {
            Entry::File(file) => {
                trace!("remove {}", file.path);
                fs::remove_file(&file.path)?;
            }
            Entry::Directory(dir) => {
                for child in &dir.children {
                    child.remove(true)?;
                }
                if remove_self {
                    trace!("remove {}", dir.path);
                    fs::remove_dir(&dir.path)?;
                }
            }
        }
        Ok(())
    }

    /// Relocate this entry into the `target` directory as `target/<name>`
    pub fn transfer(&mut self, target: &str, mode: Transfer) -> Result<(), Error> {
        match self {
            Entry::File(file) => file.transfer(target, mode),
            Entry::Directory(dir) => dir.transfer(target, mode, true),
        }
    }

    /// Rewrite every path so that this entry lives at `root`
    pub fn rebase(&mut self, root: &str) {
        let old = self.path().to_owned();
        reroot(self, &old, root);
    }
}

fn reroot(entry: &mut Entry, old: &str, new: &str) {
    match entry {
        Entry::File(file) => {
            if let Some(relative) = path::relative_to(&file.path, old) {
                file.path = path::join(new, relative);
            }
        }
        Entry::Directory(dir) => {
            if let Some(relative) = path::relative_to(&dir.path, old) {
                dir.path = path::join(new, relative);
            }
            for child in &mut dir.children {
                reroot(child, old, new);
            }
            dir.rehash();
        }
    }
}

impl From<File> for Entry {
    fn from(file: File) -> Self {
        Entry::File(file)
    }
}

impl From<Directory> for Entry {
    fn from(dir: Directory) -> Self {
        Entry::Directory(dir)
    }
}

impl File {
    /// Trust an existing digest, i.e. one received in a manifest
    pub fn new(path: impl Into<String>, hash: impl Into<Digest>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
        }
    }

    /// Hash the file found at `path`
    pub fn open(path: impl Into<String>) -> Result<Self, Error> {
        let path = path.into();
        let hash = hash::file(&path)?;
        Ok(Self { path, hash })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn hash(&self) -> &Digest {
        &self.hash
    }

    pub fn file_name(&self) -> &str {
        path::file_name(&self.path)
    }

    fn transfer(&mut self, target: &str, mode: Transfer) -> Result<(), Error> {
        let destination = path::join(target, self.file_name());
        trace!("{mode:?} {} -> {destination}", self.path);

        match mode {
            Transfer::Copy => {
                fs::copy(&self.path, &destination)?;
            }
            Transfer::Move => {
                // Fall back to a copy when crossing filesystems
                if fs::rename(&self.path, &destination).is_err() {
                    fs::copy(&self.path, &destination)?;
                    fs::remove_file(&self.path)?;
                }
            }
        }

        self.path = destination;
        Ok(())
    }
}

impl Directory {
    /// Construct a directory, computing its digest from `children`
    pub fn new(path: impl Into<String>, children: Vec<Entry>) -> Self {
        let path = path.into();
        let hash = hash::directory(&path, children.iter().map(Entry::hash));
        Self { path, hash, children }
    }

    /// Trust an existing digest, i.e. one received in a manifest
    pub fn with_hash(path: impl Into<String>, hash: impl Into<Digest>, children: Vec<Entry>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
            children,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn hash(&self) -> &Digest {
        &self.hash
    }

    pub fn file_name(&self) -> &str {
        path::file_name(&self.path)
    }

    pub fn children(&self) -> &[Entry] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Child directory with the given basename
    pub fn directory(&self, name: &str) -> Option<&Directory> {
        self.children
            .iter()
            .filter_map(Entry::as_directory)
            .find(|dir| dir.file_name() == name)
    }

    /// Returns true if any direct child carries `digest`
    pub fn contains_digest(&self, digest: &Digest) -> bool {
        self.children.iter().any(|child| child.hash() == digest)
    }

    /// Recompute the digest from the current children
    pub fn rehash(&mut self) {
        self.hash = hash::directory(&self.path, self.children.iter().map(Entry::hash));
    }

    /// Relocate the directory into `target`. With `include_self` unset the
    /// contents are merged straight into `target` instead of `target/<name>`.
    pub fn transfer(&mut self, target: &str, mode: Transfer, include_self: bool) -> Result<(), Error> {
        let destination = if include_self {
            path::join(target, self.file_name())
        } else {
            target.to_owned()
        };
        fs::create_dir_all(&destination)?;

        for child in &mut self.children {
            child.transfer(&destination, mode)?;
        }

        // Untracked (ignored) content keeps the directory alive
        if mode == Transfer::Move && is_empty_dir(&self.path)? {
            fs::remove_dir(&self.path)?;
        }

        self.path = destination;
        self.rehash();
        Ok(())
    }

    fn take_children(&mut self) -> Vec<Entry> {
        mem::take(&mut self.children)
    }
}

pub(crate) fn is_empty_dir(path: &str) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Breadth first iterator over a tree, see [`Entry::walk`]
pub struct Walk<'a> {
    queue: VecDeque<&'a Entry>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.queue.pop_front()?;
        if let Entry::Directory(dir) = entry {
            self.queue.extend(dir.children.iter());
        }
        Some(entry)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),

    #[error("path is not valid utf-8: {0:?}")]
    NonUtf8Path(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> Entry {
        File::new(path, hash::bytes(path, content.as_bytes())).into()
    }

    #[test]
    fn test_walk_breadth_first() {
        let tree = Entry::from(Directory::new(
            ".",
            vec![
                Directory::new("./lib", vec![file("./lib/b.py", "b")]).into(),
                file("./a.txt", "a"),
            ],
        ));

        let paths = tree.walk().map(Entry::path).collect::<Vec<_>>();
        assert_eq!(paths, vec![".", "./lib", "./a.txt", "./lib/b.py"]);

        // Fresh traversal per call
        assert_eq!(tree.walk().count(), 4);
    }

    #[test]
    fn test_rebase() {
        let mut tree = Entry::from(Directory::new(
            "/srv/firmware/1_1_5_14",
            vec![Directory::new("/srv/firmware/1_1_5_14/lib", vec![file("/srv/firmware/1_1_5_14/lib/b.py", "b")]).into()],
        ));
        let child_hash = tree.as_directory().unwrap().children()[0].hash().clone();

        tree.rebase(".");

        let paths = tree.walk().map(Entry::path).collect::<Vec<_>>();
        assert_eq!(paths, vec![".", "./lib", "./lib/b.py"]);
        assert_eq!(tree.as_directory().unwrap().children()[0].hash(), &child_hash);
    }

    #[test]
    fn test_transfer_and_remove() {
        let scratch = tempfile::tempdir().unwrap();
        let root = scratch.path().to_str().unwrap();
        let source = path::join(root, "source");
        let target = path::join(root, "target");

        std::fs::create_dir_all(path::join(&source, "lib")).unwrap();
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(path::join(&source, "lib/a.py"), "a").unwrap();

        let mut dir = builder::Builder::new(&source).directory().unwrap();
        let before = dir.children()[0].hash().clone();

        dir.transfer(&target, Transfer::Copy, false).unwrap();
        assert!(std::path::Path::new(&path::join(&source, "lib/a.py")).exists());
        assert_eq!(std::fs::read_to_string(path::join(&target, "lib/a.py")).unwrap(), "a");
        assert_eq!(dir.children()[0].hash(), &before);

        Entry::from(dir).remove(false).unwrap();
        assert!(std::path::Path::new(&target).exists());
        assert!(is_empty_dir(&target).unwrap());
    }
}
