// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Content based differences between two trees
//!
//! Files are matched by digest amongst their siblings, directories by
//! basename. A renamed but identical file is therefore "already present",
//! while a changed file at the same path is new.

use std::ops::Sub;

use fs_err as fs;
use log::trace;

use crate::ignore::Ignore;
use crate::path;

use super::{is_empty_dir, Directory, Entry, Error, Transfer};

impl Directory {
    /// Everything in `self` that is not already present in `other`
    pub fn subtract(&self, other: &Directory) -> Directory {
        let children = self
            .children
            .iter()
            .filter_map(|child| match child {
                Entry::File(file) => (!other.contains_digest(&file.hash)).then(|| child.clone()),
                Entry::Directory(dir) => match other.directory(dir.file_name()) {
                    None => Some(child.clone()),
                    Some(counterpart) if counterpart.hash == dir.hash => None,
                    Some(counterpart) => {
                        let partial = dir.subtract(counterpart);
                        // An empty directory must survive so it gets created
                        (!partial.is_empty() || dir.is_empty()).then(|| partial.into())
                    }
                },
            })
            .collect();

        Directory::new(self.path.clone(), children)
    }

    /// Physically move everything in `self` that is not present in `other`
    /// into `target`, leaving matching content in place.
    ///
    /// With `move_self` set the moved content lands in `target/<name>`,
    /// otherwise it is merged straight into `target`. Afterwards `self`
    /// describes the moved subset at its new location.
    ///
    /// A directory is removed from its original location only when nothing,
    /// tracked or not, remains in it. The return value reports whether that
    /// happened for `self`.
    pub fn move_diff(&mut self, other: &Directory, target: &str, move_self: bool) -> Result<bool, Error> {
        let destination = if move_self {
            path::join(target, self.file_name())
        } else {
            target.to_owned()
        };
        fs::create_dir_all(&destination)?;

        let mut moved = vec![];

        for mut child in self.take_children() {
            let keep = match &mut child {
                Entry::File(file) => {
                    if other.contains_digest(&file.hash) {
                        false
                    } else {
                        file.transfer(&destination, Transfer::Move)?;
                        true
                    }
                }
                Entry::Directory(dir) => match other.directory(dir.file_name()) {
                    None => {
                        dir.transfer(&destination, Transfer::Move, true)?;
                        true
                    }
                    Some(counterpart) if counterpart.hash == dir.hash => false,
                    Some(counterpart) => {
                        dir.move_diff(counterpart, &destination, true)?;
                        !dir.is_empty()
                    }
                },
            };

            if keep {
                moved.push(child);
            }
        }

        let removed = move_self && is_empty_dir(&self.path)?;
        if removed {
            trace!("remove emptied {}", self.path);
            fs::remove_dir(&self.path)?;
        }

        self.path = destination;
        self.children = moved;
        self.rehash();

        Ok(removed)
    }

    /// Drop every entry matched by `ignore`, at any depth, relative to
    /// this directory
    pub fn prune(&mut self, ignore: &Ignore) {
        let root = self.path.clone();
        self.prune_under(&root, ignore);
    }

    fn prune_under(&mut self, root: &str, ignore: &Ignore) {
        self.children.retain(|child| !ignore.matches(root, child.path()));

        for child in &mut self.children {
            if let Entry::Directory(dir) = child {
                dir.prune_under(root, ignore);
            }
        }

        self.rehash();
    }
}

impl Sub for &Directory {
    type Output = Directory;

    fn sub(self, rhs: &Directory) -> Directory {
        self.subtract(rhs)
    }
}
