// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{arg, ArgMatches, Command};
use thiserror::Error;
use tui::{
    dialoguer::{theme::ColorfulTheme, Confirm},
    ProgressBar, Stylize,
};
use ugm::{Abort, Event, Manager, Outcome, Phase};

pub fn command() -> Command {
    Command::new("install")
        .about("Install a firmware release")
        .long_about("Install the named release folder, or the latest release when none is given")
        .arg(arg!([FOLDER] "release folder, such as 1_1_5_14").value_parser(clap::value_parser!(String)))
        .arg(arg!(-y --yes "Assume yes for all questions"))
}

/// Handle execution of `ugm install`
pub fn handle(args: &ArgMatches, mut manager: Manager) -> Result<(), Error> {
    let yes = args.get_flag("yes");

    let folder = match args.get_one::<String>("FOLDER") {
        Some(folder) => folder.clone(),
        None => match manager.check_if_upgrade_available() {
            Some(folder) => folder,
            None => {
                println!("Firmware is up to date");
                return Ok(());
            }
        },
    };

    println!("Firmware {} will be installed", folder.as_str().bold());
    println!();

    if !(yes || confirm()?) {
        return Err(Error::Cancelled);
    }

    match install(&mut manager, &folder)? {
        Outcome::Installed { release, files } => {
            println!("{} {} ({files} files)", "Installed".green(), release.to_string().bold());
            Ok(())
        }
        Outcome::Aborted(abort) => Err(Error::Aborted(abort)),
    }
}

fn confirm() -> Result<bool, Error> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(" Do you wish to continue? ")
        .default(false)
        .interact()?)
}

/// Install `folder`, rendering manager progress to the terminal
pub fn install(manager: &mut Manager, folder: &str) -> Result<Outcome, ugm::manager::Error> {
    let mut spinner: Option<ProgressBar> = None;
    let mut counter: Option<ProgressBar> = None;

    let result = manager.install_update_with(folder, |event| match event {
        Event::Phase(phase) => {
            if let Some(spinner) = spinner.take() {
                spinner.finish_and_clear();
            }
            if let Some(message) = describe(phase) {
                spinner = Some(tui::spinner(message));
            }
        }
        Event::Install { path, index, total } => {
            let counter = counter.get_or_insert_with(|| tui::counter(total as u64));
            counter.set_position(index as u64);
            counter.set_message(path.to_owned());
        }
    });

    if let Some(counter) = counter {
        counter.finish_and_clear();
    }
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    result
}

fn describe(phase: Phase) -> Option<&'static str> {
    match phase {
        Phase::DownloadingManifest => Some("Downloading manifest"),
        Phase::ComputingDiff => Some("Comparing with the device"),
        Phase::BackingUp => Some("Backing up replaced files"),
        Phase::RollingBack => Some("Rolling back"),
        Phase::Idle | Phase::Checking | Phase::Installing | Phase::Complete | Phase::Failed => None,
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cancelled")]
    Cancelled,

    #[error("install refused: {0}")]
    Aborted(Abort),

    #[error("manager")]
    Manager(#[from] ugm::manager::Error),

    #[error("string processing")]
    Dialog(#[from] tui::dialoguer::Error),
}
