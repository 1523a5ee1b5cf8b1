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

//! Error types shared by every archive operation.

use std::io;
use thiserror::Error;

/// Result alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised by an archive operation.
#[derive(Debug, Error)]
pub enum Error {
	/// The path does not name an existing file or directory.
	#[error("'{0}': no such file or directory")]
	NotFound(String),
	/// A path component names something that is not a directory.
	#[error("'{0}': not a directory")]
	NotADirectory(String),
	/// The path names something that is not a regular file.
	#[error("'{0}': not a regular file")]
	NotAFile(String),
	/// The destination name is already taken in its directory.
	#[error("'{0}': already exists")]
	AlreadyExists(String),
	/// The path has no filename component after the last `/`.
	#[error("invalid path '{0}': missing filename")]
	MissingFileName(String),
	/// A filename exceeds the on-disk limit.
	#[error("name too long: {0} bytes")]
	NameTooLong(usize),
	/// The path has too many components.
	#[error("path too deep: {0} components")]
	PathTooDeep(usize),
	/// The directory's entry block has no room for another record.
	#[error("directory is full")]
	DirectoryFull,
	/// The file would require triple indirection.
	#[error("file too large: triple indirect blocks are not supported")]
	FileTooLarge,
	/// The maximum number of segment files has been reached.
	#[error("segment limit reached")]
	SegmentLimit,
	/// A block or inode number addresses a segment that is not open.
	#[error("addressing violation: {0} segment {1} is not open")]
	InvalidAddress(&'static str, usize),
	/// An I/O error from the host filesystem.
	#[error(transparent)]
	Io(#[from] io::Error),
}

impl Error {
	/// Tells whether the error is a lookup- or usage-class failure that the
	/// CLI reports without failing the process.
	///
	/// Capacity, addressing and I/O errors are fatal and return `false`.
	pub fn is_recoverable(&self) -> bool {
		!matches!(
			self,
			Self::FileTooLarge | Self::SegmentLimit | Self::InvalidAddress(..) | Self::Io(_)
		)
	}
}
