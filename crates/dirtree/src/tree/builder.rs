// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Build a tree from a live filesystem
use std::path::Path;

use fs_err as fs;
use log::{debug, warn};

use crate::ignore::Ignore;
use crate::path;

use super::{Directory, Entry, Error, File};

/// Builder used to scan a directory into a hashed tree
pub struct Builder<'a> {
    root: String,
    ignore: Option<&'a Ignore>,
}

impl<'a> Builder<'a> {
    pub fn new(root: impl Into<String>) -> Self {
        Builder {
            root: root.into(),
            ignore: None,
        }
    }

    /// Skip every path matched by `ignore`, relative to the builder root
    pub fn ignore(self, ignore: &'a Ignore) -> Self {
        Self {
            ignore: Some(ignore),
            ..self
        }
    }

    /// Scan the root, hashing bottom-up
    pub fn build(&self) -> Result<Entry, Error> {
        let metadata = fs::metadata(&self.root)?;

        if metadata.is_dir() {
            self.scan(&self.root).map(Entry::Directory)
        } else {
            File::open(self.root.clone()).map(Entry::File)
        }
    }

    /// Scan the root, which must be a directory
    pub fn directory(&self) -> Result<Directory, Error> {
        self.build()?
            .into_directory()
            .ok_or_else(|| Error::NotADirectory(self.root.clone()))
    }

    fn scan(&self, dir: &str) -> Result<Directory, Error> {
        let mut children = vec![];

        for item in fs::read_dir(dir)? {
            let item = item?;
            let name = item.file_name();
            let name = name
                .to_str()
                .ok_or_else(|| Error::NonUtf8Path(Path::new(dir).join(&name)))?;
            let path = path::join(dir, name);

            if self.is_ignored(&path) {
                debug!("ignoring {path}");
                continue;
            }

            let kind = item.file_type()?;
            if kind.is_dir() {
                children.push(Entry::Directory(self.scan(&path)?));
            } else if kind.is_file() {
                children.push(Entry::File(File::open(path)?));
            } else {
                warn!("skipping unsupported file type at {path}");
            }
        }

        Ok(Directory::new(dir, children))
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignore.is_some_and(|ignore| ignore.matches(&self.root, path))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::hash;

    fn populate(root: &Path, files: &[(&str, &str)]) {
        for (relative, content) in files {
            let path = root.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }

    #[test]
    fn test_listing_order_does_not_matter() {
        let scratch = tempfile::tempdir().unwrap();
        let one = scratch.path().join("one").join("root");
        let two = scratch.path().join("two").join("root");

        populate(&one, &[("a.txt", "a"), ("lib/b.py", "b"), ("lib/c.py", "c")]);
        // Created in a different order
        populate(&two, &[("lib/c.py", "c"), ("lib/b.py", "b"), ("a.txt", "a")]);

        let one = Builder::new(one.to_str().unwrap()).build().unwrap();
        let two = Builder::new(two.to_str().unwrap()).build().unwrap();

        assert_eq!(one.hash(), two.hash());
    }

    #[test]
    fn test_any_change_changes_root() {
        let scratch = tempfile::tempdir().unwrap();
        let root = scratch.path().join("root");
        populate(&root, &[("a.txt", "a"), ("lib/deep/b.py", "b")]);
        let root = root.to_str().unwrap();

        let before = Builder::new(root).build().unwrap();

        fs::write(path::join(root, "lib/deep/b.py"), "B").unwrap();
        let modified = Builder::new(root).build().unwrap();
        assert_ne!(before.hash(), modified.hash());

        fs::write(path::join(root, "lib/deep/new.py"), "n").unwrap();
        let added = Builder::new(root).build().unwrap();
        assert_ne!(modified.hash(), added.hash());

        fs::remove_file(path::join(root, "a.txt")).unwrap();
        let removed = Builder::new(root).build().unwrap();
        assert_ne!(added.hash(), removed.hash());
    }

    #[test]
    fn test_file_hash_matches_content() {
        let scratch = tempfile::tempdir().unwrap();
        populate(scratch.path(), &[("a.txt", "v1")]);
        let root = scratch.path().to_str().unwrap();

        let tree = Builder::new(root).directory().unwrap();
        assert_eq!(tree.children()[0].hash(), &hash::bytes("a.txt", b"v1"));
    }

    #[test]
    fn test_ignored_paths_are_skipped() {
        let scratch = tempfile::tempdir().unwrap();
        populate(
            scratch.path(),
            &[("a.txt", "a"), ("settings.toml", "s"), ("certs/root.pem", "c"), ("lib/settings.toml", "l")],
        );
        let root = scratch.path().to_str().unwrap();
        let ignore = Ignore::parse("settings.toml\ncerts/");

        let tree = Builder::new(root).ignore(&ignore).directory().unwrap();
        let paths = Entry::from(tree)
            .walk()
            .map(|e| path::relative_to(e.path(), root).unwrap().to_owned())
            .collect::<Vec<_>>();

        assert!(paths.contains(&"a.txt".to_owned()));
        assert!(paths.contains(&"lib/settings.toml".to_owned()));
        assert!(!paths.contains(&"settings.toml".to_owned()));
        assert!(!paths.iter().any(|p| p.starts_with("certs")));
    }

    #[test]
    fn test_missing_root() {
        let scratch = tempfile::tempdir().unwrap();
        let missing = scratch.path().join("missing");

        let result = Builder::new(missing.to_str().unwrap()).build();
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
