// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use dirtree::{path, Entry};
use fs_err as fs;
use futures_util::StreamExt;
use log::debug;
use url::Url;

use super::{strip_delimiters, Download, Error, Transport};
use crate::{environment, runtime::Runtime};

/// Update server reached over HTTP(S)
///
/// - `GET {server}/latest_version/{model}`
/// - `GET {server}/file_list/{folder}`
/// - `GET {server}/download?filename={folder}/{path}`
#[derive(Debug)]
pub struct Http {
    server: Url,
    client: reqwest::Client,
    runtime: Runtime,
}

impl Http {
    /// `certificate` is an additional PEM encoded root to trust
    pub fn new(server: Url, certificate: Option<&Path>) -> Result<Self, Error> {
        let mut builder = reqwest::ClientBuilder::new()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(environment::CONNECT_TIMEOUT)
            .timeout(environment::REQUEST_TIMEOUT);

        if let Some(path) = certificate {
            let pem = fs::read(path).map_err(Error::Certificate)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
            runtime: Runtime::new().map_err(Error::Runtime)?,
            server,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.server.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidServer(self.server.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url) -> Result<Download, Error> {
        debug!("GET {url}");
        self.runtime.block_on(self.fetch(url))
    }

    async fn fetch(&self, url: Url) -> Result<Download, Error> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { url, status });
        }

        let sha256 = response
            .headers()
            .get(environment::CHECKSUM_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let mut bytes = vec![];
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk?);
        }

        Ok(Download { bytes, sha256 })
    }
}

impl Transport for Http {
    fn latest_version(&self, model: u32) -> Result<String, Error> {
        let url = self.endpoint(&["latest_version", &model.to_string()])?;
        let Download { bytes, .. } = self.get(url)?;

        Ok(strip_delimiters(&String::from_utf8_lossy(&bytes)).to_owned())
    }

    fn manifest(&self, folder: &str) -> Result<Entry, Error> {
        let url = self.endpoint(&["file_list", folder])?;
        let Download { bytes, .. } = self.get(url)?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn download(&self, folder: &str, path: &str) -> Result<Download, Error> {
        let mut url = self.endpoint(&["download"])?;
        url.query_pairs_mut().append_pair("filename", &path::join(folder, path));

        self.get(url)
    }
}
