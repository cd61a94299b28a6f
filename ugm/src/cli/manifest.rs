// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{arg, value_parser, ArgMatches, Command};
use thiserror::Error;
use ugm::{repository, Repository};

pub fn command() -> Command {
    Command::new("manifest")
        .about("Print the manifest of a release folder")
        .long_about("Hash a release folder of a local firmware repository and print its manifest as served to devices")
        .arg(arg!(<DIR> "firmware repository").value_parser(value_parser!(PathBuf)))
        .arg(arg!(<FOLDER> "release folder, such as 1_1_5_14").value_parser(value_parser!(String)))
}

/// Handle execution of `ugm manifest`
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let dir = args.get_one::<PathBuf>("DIR").cloned().unwrap_or_default();
    let folder = args.get_one::<String>("FOLDER").map(String::as_str).unwrap_or_default();

    let manifest = Repository::new(dir).manifest(folder)?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("repository")]
    Repository(#[from] repository::Error),

    #[error("serialize manifest")]
    Json(#[from] serde_json::Error),
}
