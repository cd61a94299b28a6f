// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use tui::Stylize;

mod cli;

/// Main entry point
fn main() {
    if let Err(error) = cli::process() {
        report_error(error);
        std::process::exit(1);
    }
}

fn report_error(error: cli::Error) {
    let error = ugm::sources(&error).join(": ");
    eprintln!("{}: {error}", "Error".red());
}
