// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

pub use self::reexport::*;

/// Bar tracking a count of items, such as files installed
pub fn counter(len: u64) -> ProgressBar {
    ProgressBar::new(len).with_style(
        ProgressStyle::with_template("\n|{bar:20.cyan/blue}| {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("■≡=- "),
    )
}

/// Spinner for work of unknown length, such as fetching a manifest
pub fn spinner(message: impl Into<std::borrow::Cow<'static, str>>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template(" {spinner} {wide_msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(150));
    spinner
}

/// Provide a standard approach to terminal output in ugm
mod reexport {
    pub use crossterm::style::Stylize;
    pub use dialoguer;
    pub use indicatif::*;
}
