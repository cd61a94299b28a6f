// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Manifest of the update in flight
//!
//! Written before the rollback flag is raised so a rollback knows which
//! files and directories the interrupted install may have created.

use std::{
    io::{self, Write},
    path::Path,
};

use dirtree::Entry;
use fs_err::{self as fs, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    /// Everything the install downloads, rooted at `.`
    pub update: Entry,
    /// Directories absent from the device before the install, relative to
    /// the root and parents first
    pub created: Vec<String>,
}

pub fn save(path: &Path, journal: &Journal) -> Result<(), Error> {
    let staging = path.with_extension("json.tmp");

    let mut file = File::create(&staging)?;
    serde_json::to_writer(&mut file, journal)?;
    file.flush()?;
    file.sync_all()?;

    fs::rename(&staging, path)?;

    Ok(())
}

pub fn load(path: &Path) -> Result<Option<Journal>, Error> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn clear(path: &Path) -> Result<(), Error> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),
    #[error("json")]
    Json(#[from] serde_json::Error),
}
