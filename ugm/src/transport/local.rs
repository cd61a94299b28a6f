// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use dirtree::Entry;

use super::{Download, Error, Transport};
use crate::repository::{Payload, Repository};

/// Serve releases straight from a firmware directory, i.e. a mounted
/// update medium
#[derive(Debug, Clone)]
pub struct Local {
    repository: Repository,
}

impl Local {
    pub fn new(firmware: impl Into<PathBuf>) -> Self {
        Self {
            repository: Repository::new(firmware),
        }
    }
}

impl Transport for Local {
    fn latest_version(&self, model: u32) -> Result<String, Error> {
        self.repository
            .latest(model)?
            .map(|release| release.to_string())
            .ok_or(Error::NoRelease(model))
    }

    fn manifest(&self, folder: &str) -> Result<Entry, Error> {
        Ok(self.repository.manifest(folder)?)
    }

    fn download(&self, folder: &str, path: &str) -> Result<Download, Error> {
        let Payload { bytes, sha256 } = self.repository.read(folder, path)?;

        Ok(Download {
            bytes,
            sha256: Some(sha256),
        })
    }
}
