// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{arg, ArgMatches, Command};
use log::info;
use thiserror::Error;
use tui::Stylize;
use ugm::{Abort, Boot, Manager, Outcome};

use super::install;

pub fn command() -> Command {
    Command::new("boot")
        .about("Run the boot time update sequence")
        .long_about(
            "Roll back an interrupted install if one is detected, then install the latest release when one is available",
        )
        .arg(arg!(--offline "Only roll back, never contact the update server"))
}

/// Handle execution of `ugm boot`
pub fn handle(args: &ArgMatches, mut manager: Manager) -> Result<(), Error> {
    if manager.boot()? == Boot::RolledBack {
        println!("{} interrupted update", "Rolled back".yellow());
        // Do not retry straight away, the next boot will
        return Ok(());
    }

    if args.get_flag("offline") {
        return Ok(());
    }

    let Some(folder) = manager.check_if_upgrade_available() else {
        info!("No update available");
        return Ok(());
    };

    match install::install(&mut manager, &folder)? {
        Outcome::Installed { release, files } => {
            println!("{} {} ({files} files)", "Installed".green(), release.to_string().bold());
            Ok(())
        }
        Outcome::Aborted(abort) => Err(Error::Aborted(abort)),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("install refused: {0}")]
    Aborted(Abort),

    #[error("manager")]
    Manager(#[from] ugm::manager::Error),
}
