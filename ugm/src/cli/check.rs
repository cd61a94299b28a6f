// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{ArgMatches, Command};
use thiserror::Error;
use tui::Stylize;
use ugm::Manager;

pub fn command() -> Command {
    Command::new("check")
        .about("Check for a newer firmware release")
        .long_about("Ask the update server whether a release newer than the installed firmware exists")
}

/// Handle execution of `ugm check`
pub fn handle(_args: &ArgMatches, mut manager: Manager) -> Result<(), Error> {
    let current = manager.state()?.version;

    match manager.check_if_upgrade_available() {
        Some(folder) => println!("{} {}", "Available".green(), folder.bold()),
        None => match current {
            Some(version) => println!("Firmware {version} is up to date"),
            None => println!("No update available"),
        },
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("manager")]
    Manager(#[from] ugm::manager::Error),
}
