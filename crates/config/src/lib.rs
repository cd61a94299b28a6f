// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use fs_err::{self as fs, File};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

const EXTENSION: &str = "yaml";

pub trait Config: DeserializeOwned {
    fn domain() -> String;

    fn merge(self, other: Self) -> Self;
}

#[derive(Debug, Clone)]
pub struct Manager {
    scope: Scope,
}

impl Manager {
    /// Config is loaded / merged from `usr/share` & `etc` relative to `root`
    /// and saved to `etc/{program}/{domain}.d/{name}.yaml
    pub fn system(root: impl Into<PathBuf>, program: impl ToString) -> Self {
        Self {
            scope: Scope::System {
                root: root.into(),
                program: program.to_string(),
            },
        }
    }

    /// Config is loaded from `path` and saved to
    /// `path`/{domain}.d/{name}.yaml
    pub fn custom(path: impl Into<PathBuf>) -> Self {
        Self {
            scope: Scope::Custom(path.into()),
        }
    }

    /// Load and merge every readable config for the domain, vendor before
    /// admin and base file before drop-ins
    pub fn load<T: Config>(&self) -> Option<T> {
        let domain = T::domain();

        self.scope
            .search_dirs()
            .iter()
            .flat_map(|dir| enumerate_paths(dir, &domain))
            .filter_map(read_config)
            .reduce(T::merge)
    }

    /// Durably replace `{domain}.d/{name}.yaml`
    ///
    /// The file is written next to its destination, synced, then renamed into
    /// place so a crash leaves either the old or the new contents.
    pub fn save<T: Config + Serialize>(&self, name: impl fmt::Display, config: &T) -> Result<(), SaveError> {
        let domain = T::domain();

        let dir = self.scope.save_dir(&domain);

        fs::create_dir_all(&dir).map_err(|io| SaveError::CreateDir(dir.clone(), io))?;

        let path = dir.join(format!("{name}.{EXTENSION}"));
        let staging = dir.join(format!(".{name}.{EXTENSION}.tmp"));

        let serialized = serde_yaml::to_string(config)?;

        write_synced(&staging, serialized.as_bytes()).map_err(|io| SaveError::Write(staging.clone(), io))?;
        fs::rename(&staging, &path).map_err(|io| SaveError::Write(path.clone(), io))?;
        File::open(&dir)
            .and_then(|dir| dir.sync_all())
            .map_err(|io| SaveError::Sync(dir, io))?;

        Ok(())
    }

    /// Read `{domain}.d/{name}.yaml` as saved by [`Manager::save`]
    ///
    /// Unlike [`Manager::load`] a file that exists but can't be read or
    /// parsed is an error. Only a missing file yields `None`.
    pub fn read<T: Config>(&self, name: impl fmt::Display) -> Result<Option<T>, LoadError> {
        let domain = T::domain();

        let path = self.scope.save_dir(&domain).join(format!("{name}.{EXTENSION}"));

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LoadError::Read(path, e)),
        };

        serde_yaml::from_slice(&bytes)
            .map(Some)
            .map_err(|e| LoadError::Yaml(path, e))
    }

    pub fn delete<T: Config>(&self, name: impl fmt::Display) -> Result<(), io::Error> {
        let domain = T::domain();

        let dir = self.scope.save_dir(&domain);
        let path = dir.join(format!("{name}.{EXTENSION}"));

        fs::remove_file(path)?;

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read config file {0:?}")]
    Read(PathBuf, #[source] io::Error),
    #[error("parse config file {0:?}")]
    Yaml(PathBuf, #[source] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("create config dir {0:?}")]
    CreateDir(PathBuf, #[source] io::Error),
    #[error("serialize config")]
    Yaml(#[from] serde_yaml::Error),
    #[error("write config file {0:?}")]
    Write(PathBuf, #[source] io::Error),
    #[error("sync config dir {0:?}")]
    Sync(PathBuf, #[source] io::Error),
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), io::Error> {
    use std::io::Write;

    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// `{domain}.yaml` followed by the drop-ins of `{domain}.d/` in name order
fn enumerate_paths(dir: &Path, domain: &str) -> Vec<PathBuf> {
    let base = dir.join(format!("{domain}.{EXTENSION}"));

    let mut drop_ins = fs::read_dir(dir.join(format!("{domain}.d")))
        .map(|read_dir| {
            read_dir
                .filter_map(|entry| {
                    let path = entry.ok()?.path();
                    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();

                    (path.is_file() && extension == EXTENSION).then_some(path)
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    drop_ins.sort();

    base.is_file().then_some(base).into_iter().chain(drop_ins).collect()
}

fn read_config<T: Config>(path: PathBuf) -> Option<T> {
    let bytes = fs::read(path).ok()?;
    serde_yaml::from_slice(&bytes).ok()
}

/// Vendor defaults, merged first
const VENDOR: &str = "usr/share";
/// Administrator overrides, and where system configs are saved
const ADMIN: &str = "etc";

#[derive(Debug, Clone)]
enum Scope {
    System { root: PathBuf, program: String },
    Custom(PathBuf),
}

impl Scope {
    /// Config directories in merge order
    fn search_dirs(&self) -> Vec<PathBuf> {
        match self {
            Scope::System { root, program } => [VENDOR, ADMIN]
                .into_iter()
                .map(|base| root.join(base).join(program))
                .collect(),
            Scope::Custom(dir) => vec![dir.clone()],
        }
    }

    fn save_dir(&self, domain: &str) -> PathBuf {
        let dir = match self {
            Scope::System { root, program } => root.join(ADMIN).join(program),
            Scope::Custom(dir) => dir.clone(),
        };
        dir.join(format!("{domain}.d"))
    }
}
