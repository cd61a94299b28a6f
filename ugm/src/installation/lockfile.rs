// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{io, os::fd::AsRawFd, path::Path, sync::Arc};

use fs_err::{self as fs, File};
use log::{debug, warn};
use nix::{
    errno::Errno,
    fcntl::{flock, FlockArg},
};
use thiserror::Error;

/// Exclusive `flock` on a device root
///
/// Released once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct Lock {
    _file: Arc<File>,
}

impl Lock {
    /// Lock `path`, waiting for the current holder to finish if there is one
    pub fn acquire(path: &Path) -> Result<Self, Error> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
            Ok(()) => {}
            Err(Errno::EWOULDBLOCK) => {
                warn!("Waiting for another process updating this device to finish");
                flock(file.as_raw_fd(), FlockArg::LockExclusive)?;
            }
            Err(e) => return Err(e.into()),
        }
        debug!("Locked {}", path.display());

        Ok(Self { _file: Arc::new(file) })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),
    #[error("obtaining exclusive file lock")]
    Flock(#[from] Errno),
}
