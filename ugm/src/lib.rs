// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Firmware update and generation manager
//!
//! Replaces the contents of a device root with a newer firmware release,
//! keeping a backup of everything it replaces so that an interrupted update
//! can always be rolled back.

use std::error::Error;

pub use self::installation::Installation;
pub use self::manager::{Abort, Boot, Event, Manager, Outcome, Phase};
pub use self::repository::Repository;
pub use self::transport::Transport;
pub use self::version::{Release, Version};

pub mod environment;
pub mod installation;
mod journal;
pub mod manager;
pub mod repository;
mod runtime;
pub mod settings;
pub mod transport;
pub mod version;

/// An error followed by each of its sources, outermost first
pub fn sources(error: &dyn Error) -> Vec<String> {
    let mut sources = vec![error.to_string()];
    let mut source = error.source();
    while let Some(error) = source.take() {
        sources.push(error.to_string());
        source = error.source();
    }
    sources
}
