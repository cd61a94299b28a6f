// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Paths excluded from tree comparison
//!
//! Ignore lists hold paths relative to a tree root, so the same list applies
//! to a local root (`/`, `.`) and to a manifest rooted elsewhere.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use fs_err as fs;

use crate::path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ignore {
    paths: BTreeSet<String>,
}

impl Ignore {
    /// Parse a whitespace separated list of relative paths
    pub fn parse(text: &str) -> Self {
        text.split_whitespace().collect()
    }

    /// Load an ignore list from disk
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        fs::read_to_string(path.as_ref()).map(|text| Self::parse(&text))
    }

    pub fn insert(&mut self, path: &str) {
        let normalized = path::normalize(path);
        if !normalized.is_empty() {
            self.paths.insert(normalized);
        }
    }

    /// Returns true if the relative path is listed
    pub fn contains(&self, relative: &str) -> bool {
        self.paths.contains(&path::normalize(relative))
    }

    /// Returns true if `path`, taken relative to `root`, is listed
    pub fn matches(&self, root: &str, path: &str) -> bool {
        path::relative_to(path, root).is_some_and(|relative| self.contains(relative))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for Ignore {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut ignore = Self::default();
        for path in iter {
            ignore.insert(path);
        }
        ignore
    }
}
