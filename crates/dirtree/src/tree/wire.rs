// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Manifest (wire) representation of a tree
//!
//! `{path, content_hash}` for files, `{path, content_hash, children}` for
//! directories. Older firmware servers emit `md5_checksum` and `childs`.
//! The presence of `children` makes a directory, even when it is `null`.

use serde::{Deserialize, Deserializer, Serialize};

use super::{Directory, Entry, File};
use crate::hash::Digest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct Wire {
    path: String,
    #[serde(alias = "md5_checksum")]
    content_hash: Digest,
    #[serde(
        default,
        alias = "childs",
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    children: Option<Option<Vec<Wire>>>,
}

/// Distinguish a `null` value from a missing key
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl From<Entry> for Wire {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::File(File { path, hash }) => Wire {
                path,
                content_hash: hash,
                children: None,
            },
            Entry::Directory(Directory { path, hash, children }) => Wire {
                path,
                content_hash: hash,
                children: Some(Some(children.into_iter().map(Wire::from).collect())),
            },
        }
    }
}

impl From<Wire> for Entry {
    fn from(wire: Wire) -> Self {
        match wire.children {
            Some(children) => Entry::Directory(Directory::with_hash(
                wire.path,
                wire.content_hash,
                children.unwrap_or_default().into_iter().map(Entry::from).collect(),
            )),
            None => Entry::File(File::new(wire.path, wire.content_hash)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::hash;

    #[test]
    fn test_serialize_shape() {
        let tree = Entry::from(Directory::new(
            ".",
            vec![
                File::new("./b.txt", hash::bytes("b.txt", b"b")).into(),
                Directory::new("./lib", vec![]).into(),
                File::new("./a.txt", hash::bytes("a.txt", b"a")).into(),
            ],
        ));

        let value = serde_json::to_value(&tree).unwrap();
        let children = value["children"].as_array().unwrap();

        assert_eq!(value["path"], ".");
        assert_eq!(value["content_hash"], tree.hash().as_str());
        // Insertion order, not digest order
        assert_eq!(children[0]["path"], "./b.txt");
        assert_eq!(children[2]["path"], "./a.txt");
        assert!(children[0].get("children").is_none());
        assert_eq!(children[1]["children"], json!([]));
    }

    #[test]
    fn test_directory_iff_children() {
        let value = json!({
            "path": ".",
            "content_hash": "00",
            "children": [
                { "path": "./empty", "content_hash": "11", "children": [] },
                { "path": "./a.txt", "content_hash": "22" }
            ]
        });

        let tree: Entry = serde_json::from_value(value).unwrap();
        let root = tree.as_directory().unwrap();

        // Digests are trusted as received
        assert_eq!(root.hash().as_str(), "00");
        assert!(root.children()[0].is_directory());
        assert!(!root.children()[1].is_directory());
    }

    #[test]
    fn test_null_children_is_directory() {
        let value = json!({
            "path": ".",
            "content_hash": "00",
            "children": [
                { "path": "./empty", "content_hash": "11", "children": null },
                { "path": "./a.txt", "content_hash": "22" }
            ]
        });

        let tree: Entry = serde_json::from_value(value).unwrap();
        let root = tree.as_directory().unwrap();

        assert!(root.children()[0].as_directory().is_some_and(Directory::is_empty));
        assert!(!root.children()[1].is_directory());
    }

    #[test]
    fn test_digest_case_is_normalized() {
        let name = "a.txt";
        let upper = hash::bytes(name, b"a").as_str().to_ascii_uppercase();
        let value = json!({ "path": "./a.txt", "content_hash": upper });

        let entry: Entry = serde_json::from_value(value).unwrap();

        assert_eq!(entry.hash(), &hash::bytes(name, b"a"));
    }

    #[test]
    fn test_legacy_keys() {
        let value = json!({
            "path": ".",
            "md5_checksum": "00",
            "childs": [{ "path": "./a.txt", "md5_checksum": "22" }]
        });

        let tree: Entry = serde_json::from_value(value).unwrap();
        let root = tree.as_directory().unwrap();

        assert_eq!(root.children()[0].hash().as_str(), "22");
    }

    #[test]
    fn test_round_trip_preserves_tree() {
        let tree = Entry::from(Directory::new(
            ".",
            vec![Directory::new("./lib", vec![File::new("./lib/x.py", hash::bytes("x.py", b"x")).into()]).into()],
        ));

        let text = serde_json::to_string(&tree).unwrap();
        let decoded: Entry = serde_json::from_str(&text).unwrap();

        assert_eq!(decoded, tree);
    }
}
