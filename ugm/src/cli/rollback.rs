// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{arg, ArgMatches, Command};
use thiserror::Error;
use tui::{
    dialoguer::{theme::ColorfulTheme, Confirm},
    Stylize,
};
use ugm::Manager;

pub fn command() -> Command {
    Command::new("rollback")
        .about("Restore the firmware backup")
        .long_about("Restore the files saved by an interrupted install and clear the rollback flag")
        .arg(arg!(-y --yes "Assume yes for all questions"))
}

/// Handle execution of `ugm rollback`
pub fn handle(args: &ArgMatches, mut manager: Manager) -> Result<(), Error> {
    let yes = args.get_flag("yes");

    if !manager.state()?.rollback {
        println!("No interrupted install, nothing to roll back");
        return Ok(());
    }

    let result = if yes {
        true
    } else {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(" Do you wish to continue? ")
            .default(false)
            .interact()?
    };
    if !result {
        return Err(Error::Cancelled);
    }

    let spinner = tui::spinner("Rolling back");
    let rollback = manager.rollback();
    spinner.finish_and_clear();
    rollback?;

    println!("{} from backup", "Restored".green());

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cancelled")]
    Cancelled,

    #[error("manager")]
    Manager(#[from] ugm::manager::Error),

    #[error("string processing")]
    Dialog(#[from] tui::dialoguer::Error),
}
