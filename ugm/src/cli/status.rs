// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use clap::{ArgMatches, Command};
use thiserror::Error;
use tui::Stylize;
use ugm::{
    installation,
    settings::{self, Device, Durable, Store},
    Installation,
};

pub fn command() -> Command {
    Command::new("status").about("Show the firmware state of the device")
}

/// Handle execution of `ugm status`
pub fn handle(_args: &ArgMatches, root: &Path) -> Result<(), Error> {
    // Never wait on an install in progress
    let installation = Installation::inspect(root)?;
    let device = Device::load(&installation.root);
    let state = Durable::new(&installation, device.firmware).load()?;
    let backup = PathBuf::from(installation.backup_dir()).is_dir();

    let field = |name: &str| format!("{name:>10}").bold();
    let unknown = || "unknown".dim().to_string();

    println!("{} {}", field("Root"), installation.root.display());
    println!(
        "{} {}",
        field("Access"),
        if Installation::writable(root) { "read-write" } else { "read-only" }
    );
    println!(
        "{} {}",
        field("Model"),
        device.model.map(|model| model.to_string()).unwrap_or_else(unknown)
    );
    println!(
        "{} {}",
        field("Server"),
        device.server().map(ToString::to_string).unwrap_or_else(unknown)
    );
    println!(
        "{} {}",
        field("Firmware"),
        state.version.map(|version| version.to_string()).unwrap_or_else(unknown)
    );
    println!(
        "{} {}",
        field("Rollback"),
        if state.rollback { "pending".red() } else { "none".green() }
    );
    println!(
        "{} {}",
        field("Backup"),
        if backup { "present" } else { "absent" }
    );

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("installation")]
    Installation(#[from] installation::Error),

    #[error("state")]
    State(#[from] settings::Error),
}
