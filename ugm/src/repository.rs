// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Firmware repository: the server side of an update
//!
//! A firmware directory holds one folder per release, named
//! `{model}_{major}_{minor}_{patch}`, each containing a complete device tree.

use std::{io, path::PathBuf};

use dirtree::{path, Builder, Entry};
use fs_err as fs;
use log::debug;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::Release;

#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

/// Contents of a release file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    /// Lower case hex SHA-256 of `bytes`
    pub sha256: String,
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// All releases published for `model`, oldest first
    pub fn versions(&self, model: u32) -> Result<Vec<Release>, Error> {
        let mut releases = vec![];

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let name = entry.file_name();
            match name.to_str().map(str::parse::<Release>) {
                Some(Ok(release)) if release.model == model => releases.push(release),
                Some(Ok(_)) => {}
                _ => debug!("skipping non-release folder {name:?}"),
            }
        }

        releases.sort_by_key(|release| release.version);

        Ok(releases)
    }

    /// Newest release for `model`, compared numerically
    pub fn latest(&self, model: u32) -> Result<Option<Release>, Error> {
        Ok(self.versions(model)?.pop())
    }

    /// Manifest of a release folder, rooted at `.`
    pub fn manifest(&self, folder: &str) -> Result<Entry, Error> {
        let dir = self.folder(folder)?;
        let dir = dir.to_str().ok_or_else(|| Error::InvalidPath(folder.to_owned()))?;

        let mut tree = Entry::from(Builder::new(dir).directory()?);
        tree.rebase(".");

        Ok(tree)
    }

    /// Read a file from a release folder
    pub fn read(&self, folder: &str, file: &str) -> Result<Payload, Error> {
        let file = file.strip_prefix("./").unwrap_or(file);
        if file.is_empty() || path::escapes(file) {
            return Err(Error::InvalidPath(file.to_owned()));
        }

        let bytes = fs::read(self.folder(folder)?.join(file))?;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        Ok(Payload { bytes, sha256 })
    }

    fn folder(&self, folder: &str) -> Result<PathBuf, Error> {
        if folder.is_empty() || folder.contains('/') || folder == ".." || folder == "." {
            return Err(Error::InvalidPath(folder.to_owned()));
        }
        Ok(self.root.join(folder))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),
    #[error("tree")]
    Tree(#[from] dirtree::Error),
    #[error("invalid path {0:?}")]
    InvalidPath(String),
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn repository() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        for folder in ["1_1_5_9", "1_1_5_10", "2_9_9_9", "drafts"] {
            fs::create_dir_all(dir.path().join(folder).join("lib")).unwrap();
            fs::write(dir.path().join(folder).join("lib/a.py"), folder).unwrap();
        }
        fs::write(dir.path().join("1_9_9_9"), "not a folder").unwrap();
        let repository = Repository::new(dir.path());
        (dir, repository)
    }

    #[test]
    fn test_latest_is_numeric() {
        let (_dir, repository) = repository();

        let versions = repository
            .versions(1)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        assert_eq!(versions, vec!["1_1_5_9", "1_1_5_10"]);
        assert_eq!(repository.latest(1).unwrap().unwrap().to_string(), "1_1_5_10");
        assert_eq!(repository.latest(3).unwrap(), None);
    }

    #[test]
    fn test_manifest_is_rooted() {
        let (_dir, repository) = repository();

        let manifest = repository.manifest("1_1_5_10").unwrap();
        let paths = manifest.walk().map(Entry::path).collect::<Vec<_>>();

        assert_eq!(paths, vec![".", "./lib", "./lib/a.py"]);
        assert_eq!(
            manifest.walk().last().unwrap().hash(),
            &dirtree::hash::bytes("a.py", b"1_1_5_10")
        );
    }

    #[test]
    fn test_read() {
        let (_dir, repository) = repository();

        let payload = repository.read("1_1_5_9", "./lib/a.py").unwrap();

        assert_eq!(payload.bytes, b"1_1_5_9");
        assert_eq!(payload.sha256, hex::encode(Sha256::digest(b"1_1_5_9")));
    }

    #[test]
    fn test_read_rejects_traversal() {
        let (_dir, repository) = repository();

        for (folder, file) in [
            ("1_1_5_9", "../1_1_5_10/lib/a.py"),
            ("1_1_5_9", "/etc/passwd"),
            ("..", "1_1_5_9/lib/a.py"),
            ("1_1_5_9/lib", "a.py"),
        ] {
            assert!(
                matches!(repository.read(folder, file), Err(Error::InvalidPath(_))),
                "{folder} {file}"
            );
        }
    }
}
