// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{arg, value_parser, ArgMatches, Command};
use thiserror::Error;
use ugm::{repository, Repository};

pub fn command() -> Command {
    Command::new("latest")
        .about("Print the latest release in a firmware repository")
        .arg(arg!(<DIR> "firmware repository").value_parser(value_parser!(PathBuf)))
        .arg(arg!(--all "List every release for the model, oldest first"))
}

/// Handle execution of `ugm latest`
pub fn handle(args: &ArgMatches, model: Option<u32>) -> Result<(), Error> {
    let model = model.ok_or(Error::MissingModel)?;
    let repository = Repository::new(args.get_one::<PathBuf>("DIR").cloned().unwrap_or_default());

    if args.get_flag("all") {
        for release in repository.versions(model)? {
            println!("{release}");
        }
    } else {
        let release = repository.latest(model)?.ok_or(Error::NoRelease(model))?;
        println!("{release}");
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("--model is required")]
    MissingModel,

    #[error("no release for model {0}")]
    NoRelease(u32),

    #[error("repository")]
    Repository(#[from] repository::Error),
}
