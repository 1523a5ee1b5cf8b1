/*
 * Copyright 2025 the ExFS2 developers
 *
 * This file is part of ExFS2.
 *
 * ExFS2 is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * ExFS2 is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * ExFS2. If not, see <https://www.gnu.org/licenses/>.
 */

//! ExFS2 is a user-space archival filesystem.
//!
//! An archive is a directory of fixed-size segment files holding a
//! hierarchical namespace of files and directories. Host files are added
//! into the archive, extracted back byte-exact, removed, and inspected
//! through the [`Fs`] context.
//!
//! The archive is single-user and single-process: it is opened, mutated and
//! closed by one invocation at a time. Concurrent mutation is undefined.

pub mod error;
pub mod fs;

pub use error::{Error, Result};
pub use fs::Fs;
