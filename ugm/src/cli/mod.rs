// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use thiserror::Error;
use ugm::{
    installation,
    settings::{Device, Durable},
    transport, Installation, Manager,
};
use url::Url;

mod boot;
mod check;
mod install;
mod latest;
mod manifest;
mod rollback;
mod status;
mod version;

/// Generate the CLI command structure
fn command() -> Command {
    Command::new("ugm")
        .about("Firmware update and generation manager")
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::SetTrue)
                .help("Print version and exit"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug output"),
        )
        .arg(
            Arg::new("root")
                .short('D')
                .long("directory")
                .global(true)
                .help("Root directory of the device")
                .action(ArgAction::Set)
                .default_value("/")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("server")
                .long("server")
                .global(true)
                .help("Update server, overrides the device configuration")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Url)),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .global(true)
                .help("Device model, overrides the device configuration")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u32)),
        )
        .arg_required_else_help(true)
        .subcommand(boot::command())
        .subcommand(check::command())
        .subcommand(install::command())
        .subcommand(latest::command())
        .subcommand(manifest::command())
        .subcommand(rollback::command())
        .subcommand(status::command())
        .subcommand(version::command())
}

/// Process all CLI arguments
pub fn process() -> Result<(), Error> {
    let matches = command().get_matches();

    env_logger::builder()
        .format_timestamp(None)
        .filter_level(if matches.get_flag("verbose") {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    if matches.get_flag("version") {
        version::print();
        return Ok(());
    }

    match matches.subcommand() {
        Some(("boot", args)) => boot::handle(args, open(&matches)?).map_err(Error::Boot),
        Some(("check", args)) => check::handle(args, open(&matches)?).map_err(Error::Check),
        Some(("install", args)) => install::handle(args, open(&matches)?).map_err(Error::Install),
        Some(("latest", args)) => latest::handle(args, model(&matches)).map_err(Error::Latest),
        Some(("manifest", args)) => manifest::handle(args).map_err(Error::Manifest),
        Some(("rollback", args)) => rollback::handle(args, open(&matches)?).map_err(Error::Rollback),
        Some(("status", args)) => status::handle(args, &root(&matches)).map_err(Error::Status),
        Some(("version", _)) => {
            version::print();
            Ok(())
        }
        _ => unreachable!(),
    }
}

fn root(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("root")
        .cloned()
        .unwrap_or_else(|| "/".into())
}

fn model(matches: &ArgMatches) -> Option<u32> {
    matches.get_one::<u32>("model").copied()
}

/// Open the device root and wire up a [`Manager`] from its configuration,
/// overridden by the global flags
fn open(matches: &ArgMatches) -> Result<Manager, Error> {
    let installation = Installation::open(root(matches))?;
    let device = Device::load(&installation.root);

    let model = model(matches).or(device.model).ok_or(Error::MissingModel)?;
    let server = matches
        .get_one::<Url>("server")
        .or(device.server())
        .ok_or(Error::MissingServer)?;
    let certificate = device.certificate.as_ref().map(|path| installation.root.join(path));

    let transport = transport::for_server(server, certificate.as_deref())?;
    let store = Durable::new(&installation, device.firmware);

    Ok(Manager::new(installation, transport, Box::new(store), model))
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("installation")]
    Installation(#[from] installation::Error),

    #[error("transport")]
    Transport(#[from] transport::Error),

    #[error("no device model configured, use --model")]
    MissingModel,

    #[error("no update server configured, use --server")]
    MissingServer,

    #[error("boot")]
    Boot(#[source] boot::Error),

    #[error("check")]
    Check(#[source] check::Error),

    #[error("install")]
    Install(#[source] install::Error),

    #[error("latest")]
    Latest(#[source] latest::Error),

    #[error("manifest")]
    Manifest(#[source] manifest::Error),

    #[error("rollback")]
    Rollback(#[source] rollback::Error),

    #[error("status")]
    Status(#[source] status::Error),
}
