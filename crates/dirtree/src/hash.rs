// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Content hashing for tree entries
//!
//! A file digest covers its basename followed by its bytes, a directory digest
//! covers its basename followed by the digests of its children in sorted order.
//! MD5 keeps the digests compatible with manifests produced by the firmware
//! server (32 hex characters); it is used for change detection only.

use std::io::{self, Read};
use std::path::Path;

use derive_more::{Display, From, Into};
use fs_err as fs;
use itertools::Itertools;
use md5::{Digest as _, Md5};
use serde::{Deserialize, Deserializer, Serialize};

use crate::path;

/// Files are streamed through the hasher in chunks of this size
pub const CHUNK_SIZE: usize = 4 * 1024;

/// Hex encoded content digest, lower case once decoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize)]
#[serde(transparent)]
pub struct Digest(String);

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|hex| Self(hex.to_ascii_lowercase()))
    }
}

impl Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Digest {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Incremental hasher shared by files and directories
pub struct Hasher(Md5);

impl Hasher {
    /// Start a digest for the entry at `path`, folding its basename
    pub fn new(path: &str) -> Self {
        let mut md5 = Md5::new();
        md5.update(path::file_name(path).as_bytes());
        Self(md5)
    }

    pub fn update(&mut self, bytes: impl AsRef<[u8]>) {
        self.0.update(bytes);
    }

    pub fn finish(self) -> Digest {
        Digest(hex::encode(self.0.finalize()))
    }
}

/// Digest the file at `path` without loading it whole
pub fn file(path: &str) -> io::Result<Digest> {
    let mut hasher = Hasher::new(path);
    let mut file = fs::File::open(Path::new(path))?;
    let mut chunk = [0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }

    Ok(hasher.finish())
}

/// Digest in-memory content as if it were a file at `path`
pub fn bytes(path: &str, content: &[u8]) -> Digest {
    let mut hasher = Hasher::new(path);
    for chunk in content.chunks(CHUNK_SIZE) {
        hasher.update(chunk);
    }
    hasher.finish()
}

/// Digest a directory from its children's digests, in any order
pub fn directory<'a>(path: &str, children: impl IntoIterator<Item = &'a Digest>) -> Digest {
    let mut hasher = Hasher::new(path);
    for digest in children.into_iter().sorted() {
        hasher.update(digest.as_str());
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, vec![7u8; CHUNK_SIZE * 3 + 11]).unwrap();

        let path = path.to_str().unwrap();
        let streamed = file(path).unwrap();

        assert_eq!(streamed, file(path).unwrap());
        assert_eq!(streamed, bytes("./a.txt", &vec![7u8; CHUNK_SIZE * 3 + 11]));
        assert_eq!(streamed.as_str().len(), 32);
    }

    #[test]
    fn test_name_and_content_sensitivity() {
        let base = bytes("a.txt", b"v1");

        assert_ne!(base, bytes("b.txt", b"v1"));
        assert_ne!(base, bytes("a.txt", b"v2"));
        assert_eq!(base, bytes("lib/a.txt", b"v1"));
    }

    #[test]
    fn test_known_digest() {
        // md5("a.txt" + "v1"), as produced by the firmware server
        assert_eq!(bytes("./a.txt", b"v1").as_str(), "61d1d8a7b79838025efbe82983bb316a");
    }

    #[test]
    fn test_directory_order_invariant() {
        let a = bytes("a", b"1");
        let b = bytes("b", b"2");

        assert_eq!(directory("dir", [&a, &b]), directory("dir", [&b, &a]));
        assert_ne!(directory("dir", [&a, &b]), directory("dir", [&a]));
        assert_ne!(directory("dir", [&a, &b]), directory("other", [&a, &b]));
    }
}
