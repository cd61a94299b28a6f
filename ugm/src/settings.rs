// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Device configuration and durable update state

use std::path::{Path, PathBuf};

use config::Config;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{environment, Installation, Version};

/// Static description of the device, merged from `usr/share/ugm/device.yaml`
/// and `etc/ugm/device.yaml` (plus `device.d/` drop-ins)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub model: Option<u32>,
    #[serde(default)]
    pub update_server: Option<Url>,
    #[serde(default)]
    pub test_update_server: Option<Url>,
    /// Use `test_update_server` instead of `update_server`
    #[serde(default)]
    pub test_mode: Option<bool>,
    /// Extra PEM root certificate, relative to the device root
    #[serde(default)]
    pub certificate: Option<PathBuf>,
    /// Version shipped with the image, until an update records its own
    #[serde(default)]
    pub firmware: Option<Version>,
}

impl Device {
    pub fn load(root: &Path) -> Self {
        config::Manager::system(root, environment::NAME)
            .load()
            .unwrap_or_default()
    }

    /// Update server selected by the test mode switch
    pub fn server(&self) -> Option<&Url> {
        if self.test_mode.unwrap_or_default() {
            self.test_update_server.as_ref()
        } else {
            self.update_server.as_ref()
        }
    }
}

impl Config for Device {
    fn domain() -> String {
        "device".into()
    }

    fn merge(self, other: Self) -> Self {
        Self {
            model: other.model.or(self.model),
            update_server: other.update_server.or(self.update_server),
            test_update_server: other.test_update_server.or(self.test_update_server),
            test_mode: other.test_mode.or(self.test_mode),
            certificate: other.certificate.or(self.certificate),
            firmware: other.firmware.or(self.firmware),
        }
    }
}

/// Update bookkeeping that must survive a reboot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// A destructive install is in progress and must be rolled back
    #[serde(default)]
    pub rollback: bool,
    /// Currently installed firmware version
    #[serde(default)]
    pub version: Option<Version>,
}

impl Config for State {
    fn domain() -> String {
        "state".into()
    }

    fn merge(self, other: Self) -> Self {
        Self {
            rollback: other.rollback,
            version: other.version.or(self.version),
        }
    }
}

/// Durable storage for [`State`]
///
/// A completed `save` must be visible after a power loss, and a single save
/// must never be observed half written.
pub trait Store {
    fn load(&self) -> Result<State, Error>;

    fn save(&mut self, state: &State) -> Result<(), Error>;
}

/// [`State`] kept in `ugm/state.d/current.yaml`
#[derive(Debug, Clone)]
pub struct Durable {
    manager: config::Manager,
    fallback: Option<Version>,
}

impl Durable {
    const NAME: &'static str = "current";

    /// `fallback` is reported as the version until one has been saved
    pub fn new(installation: &Installation, fallback: Option<Version>) -> Self {
        Self {
            manager: config::Manager::custom(installation.state_dir()),
            fallback,
        }
    }
}

impl Store for Durable {
    fn load(&self) -> Result<State, Error> {
        // An unreadable state may hide a raised rollback flag, never default it
        let state = self.manager.read::<State>(Self::NAME)?.unwrap_or_default();

        Ok(State {
            version: state.version.or(self.fallback),
            ..state
        })
    }

    fn save(&mut self, state: &State) -> Result<(), Error> {
        Ok(self.manager.save(Self::NAME, state)?)
    }
}

/// Volatile store, for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct Memory(pub State);

impl Store for Memory {
    fn load(&self) -> Result<State, Error> {
        Ok(self.0)
    }

    fn save(&mut self, state: &State) -> Result<(), Error> {
        self.0 = *state;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("load state")]
    Load(#[from] config::LoadError),
    #[error("save state")]
    Save(#[from] config::SaveError),
}
