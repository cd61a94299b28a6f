// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Content addressed directory trees for firmware updates
//!
//! Trees are scanned from disk or decoded from a manifest, compared by
//! content, and physically moved or copied between roots.
pub use self::ignore::Ignore;
pub use self::tree::{builder::Builder, Directory, Entry, Error, File, Transfer};

pub mod hash;
pub mod ignore;
pub mod path;
pub mod tree;
