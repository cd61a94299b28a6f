// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{future::Future, io};

use tokio::runtime;

/// Current thread runtime owned by a blocking caller
///
/// Each owner drives its own futures, so no process wide runtime needs to
/// be set up before use.
#[derive(Debug)]
pub struct Runtime(runtime::Runtime);

impl Runtime {
    pub fn new() -> io::Result<Self> {
        Ok(Self(runtime::Builder::new_current_thread().enable_all().build()?))
    }

    /// Run the provided future to completion on this runtime
    pub fn block_on<F: Future>(&self, task: F) -> F::Output {
        self.0.block_on(task)
    }
}
