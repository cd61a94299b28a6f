// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Update state machine
//!
//! An install moves everything it is about to replace into the backup
//! directory, then downloads the files the device lacks. The rollback flag is
//! raised durably before the first destructive write and cleared after the
//! last one, so an interrupted install is always detected (and rolled back)
//! on the next boot.

use std::{io, path::Path};

use dirtree::{hash, path, Builder, Directory, Entry, Ignore, Transfer};
use fs_err as fs;
use log::{debug, error, info, warn};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use crate::{
    environment,
    journal::{self, Journal},
    settings,
    settings::{State, Store},
    sources,
    transport::{self, Download, Transport},
    Installation, Release,
};

/// Where the manager is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Phase {
    Idle,
    Checking,
    DownloadingManifest,
    ComputingDiff,
    BackingUp,
    Installing,
    Complete,
    RollingBack,
    Failed,
}

/// Reason an install was refused before touching the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Abort {
    #[display("a rollback is pending")]
    RollbackPending,
    #[display("the device root is read-only")]
    ReadOnly,
    #[display("the release folder is not valid for this device")]
    Folder,
    #[display("the update state is unavailable")]
    State,
    #[display("the ignore list is unavailable")]
    IgnoreList,
    #[display("the manifest is unavailable or invalid")]
    Manifest,
    #[display("the local tree could not be scanned")]
    LocalTree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed { release: Release, files: usize },
    Aborted(Abort),
}

/// Result of the boot time check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boot {
    Normal,
    RolledBack,
}

/// Progress reported while installing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    Phase(Phase),
    /// About to fetch file `index` of `total`
    Install { path: &'a str, index: usize, total: usize },
}

pub struct Manager {
    installation: Installation,
    transport: Box<dyn Transport>,
    store: Box<dyn Store>,
    model: u32,
    phase: Phase,
}

/// Everything an install needs once the device has been inspected
struct Plan {
    release: Release,
    local: Directory,
    remote: Directory,
    update: Entry,
    state: State,
}

impl Manager {
    pub fn new(installation: Installation, transport: Box<dyn Transport>, store: Box<dyn Store>, model: u32) -> Self {
        Self {
            installation,
            transport,
            store,
            model,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn installation(&self) -> &Installation {
        &self.installation
    }

    pub fn model(&self) -> u32 {
        self.model
    }

    pub fn state(&self) -> Result<State, Error> {
        Ok(self.store.load()?)
    }

    /// Name of a newer release folder for this device, if any
    ///
    /// Never fails: transport errors and malformed versions are logged and
    /// reported as "no upgrade".
    pub fn check_if_upgrade_available(&mut self) -> Option<String> {
        self.enter(Phase::Checking, &mut no_progress);
        let upgrade = self.newer_release();
        self.enter(Phase::Idle, &mut no_progress);

        upgrade.map(|release| release.to_string())
    }

    fn newer_release(&self) -> Option<Release> {
        let latest = self
            .transport
            .latest_version(self.model)
            .inspect_err(|e| warn!("Failed to fetch latest version: {}", sources(e).join(": ")))
            .ok()?;

        let release = latest
            .parse::<Release>()
            .inspect_err(|e| warn!("Malformed version: {}", sources(e).join(": ")))
            .ok()?;

        if release.model != self.model {
            warn!("Ignoring release {release} published for another model");
            return None;
        }

        let current = self
            .store
            .load()
            .inspect_err(|e| warn!("Failed to load update state: {}", sources(e).join(": ")))
            .ok()?
            .version;

        match current {
            Some(current) if release.version <= current => {
                info!("Firmware {current} is up to date");
                None
            }
            _ => {
                info!("Upgrade available: {release}");
                Some(release)
            }
        }
    }

    pub fn install_update(&mut self, folder: &str) -> Result<Outcome, Error> {
        self.install_update_with(folder, no_progress)
    }

    /// Install the release `folder`, reporting progress to `on_progress`
    ///
    /// Problems found before the rollback flag is raised leave the device
    /// untouched and yield [`Outcome::Aborted`]. Any later failure is
    /// returned as an error with the flag still set.
    pub fn install_update_with(
        &mut self,
        folder: &str,
        mut on_progress: impl FnMut(Event<'_>),
    ) -> Result<Outcome, Error> {
        let plan = match self.prepare(folder, &mut on_progress) {
            Ok(plan) => plan,
            Err(abort) => {
                warn!("Install of {folder} aborted: {abort}");
                self.enter(Phase::Idle, &mut on_progress);
                return Ok(Outcome::Aborted(abort));
            }
        };
        let release = plan.release;

        match self.apply(folder, plan, &mut on_progress) {
            Ok(files) => {
                info!("Installed {release} ({files} files)");
                self.enter(Phase::Complete, &mut on_progress);
                Ok(Outcome::Installed { release, files })
            }
            Err(e) => {
                error!("Install of {release} failed: {}", sources(&e).join(": "));
                self.enter(Phase::Failed, &mut on_progress);
                Err(e)
            }
        }
    }

    /// Inspect the device and the release without side effects
    fn prepare(&mut self, folder: &str, on_progress: &mut impl FnMut(Event<'_>)) -> Result<Plan, Abort> {
        let release = folder
            .parse::<Release>()
            .inspect_err(|e| warn!("{}", sources(e).join(": ")))
            .map_err(|_| Abort::Folder)?;
        if release.model != self.model {
            return Err(Abort::Folder);
        }

        let state = self.store.load().map_err(|e| {
            error!("Failed to load update state: {}", sources(&e).join(": "));
            Abort::State
        })?;
        if state.rollback {
            return Err(Abort::RollbackPending);
        }
        if self.installation.read_only() {
            return Err(Abort::ReadOnly);
        }

        let mut ignore = Ignore::load(self.installation.ignore_path()).map_err(|e| {
            error!("Failed to read ignore list: {e}");
            Abort::IgnoreList
        })?;
        ignore.insert(environment::STATE_DIR);

        self.enter(Phase::DownloadingManifest, on_progress);
        let mut remote = self
            .transport
            .manifest(folder)
            .map_err(|e| {
                warn!("Failed to fetch manifest for {folder}: {}", sources(&e).join(": "));
                Abort::Manifest
            })?
            .into_directory()
            .ok_or(Abort::Manifest)?;
        remote.prune(&ignore);

        self.enter(Phase::ComputingDiff, on_progress);
        let local = Builder::new(self.installation.tree_root())
            .ignore(&ignore)
            .directory()
            .map_err(|e| {
                error!("Failed to scan {}: {}", self.installation.tree_root(), sources(&e).join(": "));
                Abort::LocalTree
            })?;

        let update = Entry::from(&remote - &local);
        if let Some(entry) = update.walk().skip(1).find(|entry| {
            path::relative_to(entry.path(), update.path()).map_or(true, path::escapes)
        }) {
            warn!("Manifest for {folder} contains unsafe path {}", entry.path());
            return Err(Abort::Manifest);
        }

        Ok(Plan {
            release,
            local,
            remote,
            update,
            state,
        })
    }

    /// The destructive part of an install, returns the number of files written
    fn apply(&mut self, folder: &str, plan: Plan, on_progress: &mut impl FnMut(Event<'_>)) -> Result<usize, Error> {
        let Plan {
            release,
            mut local,
            remote,
            update,
            mut state,
        } = plan;
        let backup = self.installation.backup_dir();
        let journal_path = self.installation.journal_path();

        self.enter(Phase::BackingUp, on_progress);
        self.stage(&update, &mut state)?;

        local.move_diff(&remote, &backup, false)?;

        self.enter(Phase::Installing, on_progress);
        let total = update.walk().filter(|entry| !entry.is_directory()).count();
        let mut index = 0;

        for entry in update.walk().skip(1) {
            let relative = path::relative_to(entry.path(), update.path())
                .ok_or_else(|| Error::UnsafePath(entry.path().to_owned()))?;
            let target = path::join(self.installation.tree_root(), relative);

            match entry {
                Entry::Directory(_) => fs::create_dir_all(&target)?,
                Entry::File(file) => {
                    index += 1;
                    on_progress(Event::Install {
                        path: relative,
                        index,
                        total,
                    });

                    let download = self.transport.download(folder, relative)?;
                    verify(relative, file.hash(), &download)?;
                    fs::write(&target, &download.bytes)?;
                }
            }
        }

        // One save, the new version is never recorded with the flag raised
        state.version = Some(release.version);
        state.rollback = false;
        self.store.save(&state)?;

        if let Err(e) = journal::clear(&journal_path) {
            warn!("Failed to clear journal: {}", sources(&e).join(": "));
        }

        Ok(total)
    }

    /// Empty the backup and journal `update`, then durably raise the rollback
    /// flag. Nothing on the device has been touched when this returns.
    fn stage(&mut self, update: &Entry, state: &mut State) -> Result<(), Error> {
        let root = self.installation.tree_root();

        clear_backup(&self.installation.backup_dir())?;

        let created = update
            .walk()
            .skip(1)
            .filter(|entry| entry.is_directory())
            .filter_map(|entry| path::relative_to(entry.path(), update.path()))
            .filter(|relative| !Path::new(root).join(relative).is_dir())
            .map(ToOwned::to_owned)
            .collect();
        let journal = Journal {
            update: update.clone(),
            created,
        };
        journal::save(&self.installation.journal_path(), &journal)?;

        state.rollback = true;
        self.store.save(state)?;

        Ok(())
    }

    /// Restore the device from the backup and clear the rollback flag
    ///
    /// Does nothing unless an install was interrupted: once an install
    /// completes the backup no longer describes a consistent release.
    pub fn rollback(&mut self) -> Result<(), Error> {
        if !self.store.load()?.rollback {
            info!("No interrupted install, nothing to roll back");
            return Ok(());
        }

        self.enter(Phase::RollingBack, &mut no_progress);

        match self.restore() {
            Ok(()) => {
                info!("Rollback complete");
                self.enter(Phase::Complete, &mut no_progress);
                Ok(())
            }
            Err(e) => {
                error!("Rollback failed, manual recovery required: {}", sources(&e).join(": "));
                self.enter(Phase::Failed, &mut no_progress);
                Err(e)
            }
        }
    }

    fn restore(&mut self) -> Result<(), Error> {
        let root = self.installation.tree_root();
        let backup_dir = self.installation.backup_dir();
        let journal_path = self.installation.journal_path();

        if !Path::new(&backup_dir).is_dir() {
            return Err(Error::MissingBackup(backup_dir));
        }

        if let Some(journal) = journal::load(&journal_path)? {
            purge(&journal, root)?;
        }

        let mut backup = Builder::new(&backup_dir).directory()?;
        backup.transfer(root, Transfer::Copy, false)?;

        let mut state = self.store.load()?;
        state.rollback = false;
        self.store.save(&state)?;

        journal::clear(&journal_path)?;

        Ok(())
    }

    /// Roll back an interrupted install, if there was one
    pub fn boot(&mut self) -> Result<Boot, Error> {
        if self.store.load()?.rollback {
            warn!("Interrupted update detected, rolling back");
            self.rollback()?;
            Ok(Boot::RolledBack)
        } else {
            Ok(Boot::Normal)
        }
    }

    fn enter(&mut self, phase: Phase, on_progress: &mut impl FnMut(Event<'_>)) {
        debug!("{} -> {phase}", self.phase);
        self.phase = phase;
        on_progress(Event::Phase(phase));
    }
}

fn no_progress(_: Event<'_>) {}

fn clear_backup(backup: &str) -> Result<(), Error> {
    fs::create_dir_all(backup)?;
    Entry::from(Builder::new(backup).directory()?).remove(false)?;
    Ok(())
}

/// Check downloaded bytes against the manifest digest and the server checksum
fn verify(path: &str, expected: &hash::Digest, download: &Download) -> Result<(), Error> {
    let actual = hash::bytes(path, &download.bytes);
    if &actual != expected {
        return Err(Error::Integrity {
            path: path.to_owned(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    if let Some(expected) = &download.sha256 {
        let actual = hex::encode(Sha256::digest(&download.bytes));
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(Error::Integrity {
                path: path.to_owned(),
                expected: expected.clone(),
                actual,
            });
        }
    }

    Ok(())
}

/// Remove what an interrupted install added
///
/// A file is only removed when its digest matches the journal, proving the
/// install wrote it. Directories are only removed when the install created
/// them and they are empty.
fn purge(journal: &Journal, root: &str) -> Result<(), Error> {
    let update = &journal.update;

    for entry in update.walk().skip(1) {
        let Entry::File(file) = entry else {
            continue;
        };
        let Some(relative) = path::relative_to(file.path(), update.path()).filter(|r| !path::escapes(r)) else {
            continue;
        };
        let live = path::join(root, relative);

        if Path::new(&live).is_file() && hash::file(&live)? == *file.hash() {
            debug!("Removing {relative}");
            fs::remove_file(&live)?;
        }
    }

    // Deepest first
    for relative in journal.created.iter().rev().filter(|r| !path::escapes(r)) {
        let live = Path::new(root).join(relative);

        if live.is_dir() && fs::read_dir(&live)?.next().is_none() {
            debug!("Removing directory {relative}");
            fs::remove_dir(&live)?;
        }
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("tree")]
    Tree(#[from] dirtree::Error),
    #[error("io")]
    Io(#[from] io::Error),
    #[error("update state")]
    Store(#[from] settings::Error),
    #[error("transport")]
    Transport(#[from] transport::Error),
    #[error("journal")]
    Journal(#[from] journal::Error),
    #[error("integrity check failed for {path}: expected {expected}, got {actual}")]
    Integrity {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("backup directory {0} is missing")]
    MissingBackup(String),
    #[error("unsafe path {0}")]
    UnsafePath(String),
}
