// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Encapsulation of a device root filesystem

use std::path::{Path, PathBuf};

use dirtree::path;
use fs_err as fs;
use log::trace;
use nix::unistd::{access, AccessFlags, Uid};
use thiserror::Error;

use crate::environment;

mod lockfile;

/// System mutability - do we have readwrite?
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Mutability {
    /// We only have readonly access
    ReadOnly,
    /// We have read-write access
    ReadWrite,
}

/// Encapsulate details for a device root filesystem
#[derive(Debug, Clone)]
pub struct Installation {
    /// Fully qualified root filesystem path
    pub root: PathBuf,

    /// Filesystem mutability: can we install or roll back?
    pub mutability: Mutability,

    /// `root` as a slash separated tree path
    tree_root: String,

    /// Held while the installation is open for mutable operations
    _lock: Option<lockfile::Lock>,
}

impl Installation {
    /// Open a device root, determining mutability per the current user
    /// identity and ACL permissions. Mutable roots are locked exclusively.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root: PathBuf = root.into();

        if !root.is_dir() {
            return Err(Error::RootInvalid(root));
        }

        let tree_root = root.to_str().ok_or_else(|| Error::NonUtf8Root(root.clone()))?.to_owned();

        // Silently fails on a read-only root, reflected by mutability below
        let _ = fs::create_dir_all(root.join(environment::STATE_DIR));

        let mutability = if Self::writable(&root) {
            Mutability::ReadWrite
        } else {
            Mutability::ReadOnly
        };

        trace!("Mutability: {mutability}");
        trace!("Root dir: {root:?}");

        let _lock = if matches!(mutability, Mutability::ReadWrite) {
            Some(lockfile::Lock::acquire(&root.join(environment::STATE_DIR).join(".lock"))?)
        } else {
            None
        };

        Ok(Self {
            root,
            mutability,
            tree_root,
            _lock,
        })
    }

    /// Open a device root for inspection only
    ///
    /// Takes no lock, so it never waits on a running install, and is always
    /// [`Mutability::ReadOnly`] so no update can be applied through it.
    pub fn inspect(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root: PathBuf = root.into();

        if !root.is_dir() {
            return Err(Error::RootInvalid(root));
        }

        let tree_root = root.to_str().ok_or_else(|| Error::NonUtf8Root(root.clone()))?.to_owned();

        Ok(Self {
            root,
            mutability: Mutability::ReadOnly,
            tree_root,
            _lock: None,
        })
    }

    /// Whether the current user could update `root`
    pub fn writable(root: &Path) -> bool {
        Uid::effective().is_root() || access(root, AccessFlags::W_OK).is_ok()
    }

    /// Return true if we lack write access
    pub fn read_only(&self) -> bool {
        matches!(self.mutability, Mutability::ReadOnly)
    }

    /// The root as used for tree paths
    pub fn tree_root(&self) -> &str {
        &self.tree_root
    }

    /// Build a path relative to the state directory
    pub fn state_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.state_dir().join(path)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(environment::STATE_DIR)
    }

    /// Staging area for everything an update replaces
    pub fn backup_dir(&self) -> String {
        path::join(&path::join(&self.tree_root, environment::STATE_DIR), "backup")
    }

    /// Whitespace separated paths excluded from updates
    pub fn ignore_path(&self) -> PathBuf {
        self.state_path(".ignore")
    }

    /// Manifest of the update in flight
    pub fn journal_path(&self) -> PathBuf {
        self.state_path("journal.json")
    }
}

/// Errors specific to a device root filesystem
#[derive(Debug, Error)]
pub enum Error {
    #[error("root is invalid: {0:?}")]
    RootInvalid(PathBuf),
    #[error("root is not valid utf-8: {0:?}")]
    NonUtf8Root(PathBuf),
    #[error("acquiring lockfile")]
    Lockfile(#[from] lockfile::Error),
}
