// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Access to published firmware releases

use std::{io, path::Path};

use dirtree::Entry;
use thiserror::Error;
use url::Url;

use crate::repository;

pub use self::http::Http;
pub use self::local::Local;

mod http;
mod local;

/// Source of releases, manifests and file contents
pub trait Transport {
    /// Name of the newest release folder for `model`
    fn latest_version(&self, model: u32) -> Result<String, Error>;

    /// Manifest of a release folder
    fn manifest(&self, folder: &str) -> Result<Entry, Error>;

    /// Contents of `path`, relative to the release folder
    fn download(&self, folder: &str, path: &str) -> Result<Download, Error>;
}

/// A downloaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub bytes: Vec<u8>,
    /// SHA-256 reported by the server, if any
    pub sha256: Option<String>,
}

/// Select a transport for `server`: `file://` URLs are served from a local
/// firmware directory, anything else over HTTP(S)
pub fn for_server(server: &Url, certificate: Option<&Path>) -> Result<Box<dyn Transport>, Error> {
    if server.scheme() == "file" {
        let path = server
            .to_file_path()
            .map_err(|()| Error::InvalidServer(server.clone()))?;
        Ok(Box::new(Local::new(path)))
    } else {
        Ok(Box::new(Http::new(server.clone(), certificate)?))
    }
}

/// Strip the pair of delimiters (usually quotes) wrapping a plain text
/// response
pub(crate) fn strip_delimiters(text: &str) -> &str {
    let text = text.trim();
    let mut chars = text.chars();

    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if !first.is_alphanumeric() && !last.is_alphanumeric() => {
            &text[first.len_utf8()..text.len() - last.len_utf8()]
        }
        _ => text,
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("request")]
    Request(#[from] reqwest::Error),
    #[error("{url} returned {status}")]
    Status { url: Url, status: reqwest::StatusCode },
    #[error("decode manifest")]
    Manifest(#[from] serde_json::Error),
    #[error("invalid server url {0}")]
    InvalidServer(Url),
    #[error("no release published for model {0}")]
    NoRelease(u32),
    #[error("read certificate")]
    Certificate(#[source] io::Error),
    #[error("create runtime")]
    Runtime(#[source] io::Error),
    #[error("repository")]
    Repository(#[from] repository::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_delimiters() {
        assert_eq!(strip_delimiters("\"1_1_5_14\""), "1_1_5_14");
        assert_eq!(strip_delimiters("'1_1_5_14'\n"), "1_1_5_14");
        assert_eq!(strip_delimiters("1_1_5_14"), "1_1_5_14");
        assert_eq!(strip_delimiters("\""), "\"");
        assert_eq!(strip_delimiters(""), "");
    }

    #[test]
    fn test_for_server() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("1_1_5_14")).unwrap();
        let url = Url::from_directory_path(dir.path()).unwrap();

        let transport = for_server(&url, None).unwrap();

        assert_eq!(transport.latest_version(1).unwrap(), "1_1_5_14");
    }
}
