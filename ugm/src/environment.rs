// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// State directory relative to the device root, never part of a diff
pub const STATE_DIR: &str = "ugm";
/// Header carrying the SHA-256 of a downloaded file
pub const CHECKSUM_HEADER: &str = "sha256_checksum";
/// Time allowed to establish a connection to the update server
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Time allowed for a whole request, body included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
