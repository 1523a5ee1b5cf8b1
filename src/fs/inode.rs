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

//! An inode is a fixed-size record describing a file or directory.
//!
//! The record occupies a whole block inside an inode segment. The name of the
//! file is not part of the inode; it lives in the directory entry pointing at
//! it.

use crate::{
	error::{Error, Result},
	fs::{indirect::PTRS_PER_BLOCK, segment::BLOCK_SIZE},
};
use byteorder::{ByteOrder, LittleEndian};

/// The number of direct block pointers in an inode.
pub const DIRECT_BLOCKS: usize = 12;

/// The inode of the root directory.
pub const ROOT_INODE: u32 = 0;

/// Raw type tag: free record.
const KIND_FREE: u16 = 0;
/// Raw type tag: regular file.
const KIND_FILE: u16 = 1;
/// Raw type tag: directory.
const KIND_DIRECTORY: u16 = 2;

/// The type of the file described by an inode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum InodeKind {
	/// The record does not describe any file.
	#[default]
	Free,
	/// Regular file.
	File,
	/// Directory.
	Directory,
}

impl InodeKind {
	fn from_raw(raw: u16) -> Self {
		match raw {
			KIND_FILE => Self::File,
			KIND_DIRECTORY => Self::Directory,
			_ => Self::Free,
		}
	}

	fn to_raw(self) -> u16 {
		match self {
			Self::Free => KIND_FREE,
			Self::File => KIND_FILE,
			Self::Directory => KIND_DIRECTORY,
		}
	}
}

/// An on-disk inode record.
///
/// A free record is entirely zero. The padding up to [`BLOCK_SIZE`] is zero
/// on disk and not represented here.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Inode {
	/// File size in bytes. Zero for directories.
	pub size: u32,
	/// The type of the file.
	pub kind: InodeKind,
	/// Direct block pointers (global block numbers, zero when unset).
	pub direct: [u32; DIRECT_BLOCKS],
	/// Block number of the single-indirect block, or zero.
	pub indirect_single: u32,
	/// Block number of the double-indirect block, or zero.
	pub indirect_double: u32,
}

impl Inode {
	/// Decodes the record stored at the beginning of `buf`.
	pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Self {
		let size = LittleEndian::read_u32(&buf[0..4]);
		let kind = InodeKind::from_raw(LittleEndian::read_u16(&buf[4..6]));
		let mut direct = [0u32; DIRECT_BLOCKS];
		LittleEndian::read_u32_into(&buf[6..6 + 4 * DIRECT_BLOCKS], &mut direct);
		let indirect_single = LittleEndian::read_u32(&buf[54..58]);
		let indirect_double = LittleEndian::read_u32(&buf[58..62]);
		Self {
			size,
			kind,
			direct,
			indirect_single,
			indirect_double,
		}
	}

	/// Encodes the record into `buf`, zeroing the padding.
	pub fn encode(&self, buf: &mut [u8; BLOCK_SIZE]) {
		buf.fill(0);
		LittleEndian::write_u32(&mut buf[0..4], self.size);
		LittleEndian::write_u16(&mut buf[4..6], self.kind.to_raw());
		LittleEndian::write_u32_into(&self.direct, &mut buf[6..6 + 4 * DIRECT_BLOCKS]);
		LittleEndian::write_u32(&mut buf[54..58], self.indirect_single);
		LittleEndian::write_u32(&mut buf[58..62], self.indirect_double);
	}
}

/// Staged block numbers for a file under construction.
///
/// `add` records each data block at the next logical position; the direct
/// pointers go straight into the inode while the indirect levels are kept in
/// memory until the file content has been fully written, then flushed to
/// freshly allocated pointer blocks.
#[derive(Default)]
pub struct BlockMap {
	/// Direct block pointers.
	pub direct: [u32; DIRECT_BLOCKS],
	/// Pointers stored in the single-indirect block.
	pub single: Vec<u32>,
	/// Rows of the double-indirect tree, by outer slot.
	pub double: Vec<Vec<u32>>,
	/// Number of staged blocks.
	count: u64,
}

/// First logical block served by the single-indirect level.
const SINGLE_START: u64 = DIRECT_BLOCKS as u64;
/// First logical block served by the double-indirect level.
const DOUBLE_START: u64 = SINGLE_START + PTRS_PER_BLOCK as u64;
/// First logical block beyond the addressable range.
const DOUBLE_END: u64 = DOUBLE_START + (PTRS_PER_BLOCK * PTRS_PER_BLOCK) as u64;

impl BlockMap {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the number of staged blocks.
	pub fn len(&self) -> u64 {
		self.count
	}

	/// Records `blk` at the next logical position.
	///
	/// Positions beyond the double-indirect range return
	/// [`Error::FileTooLarge`].
	pub fn push(&mut self, blk: u32) -> Result<()> {
		let pos = self.count;
		if pos < SINGLE_START {
			self.direct[pos as usize] = blk;
		} else if pos < DOUBLE_START {
			self.single.push(blk);
		} else if pos < DOUBLE_END {
			let row = ((pos - DOUBLE_START) / PTRS_PER_BLOCK as u64) as usize;
			if row == self.double.len() {
				self.double.push(Vec::new());
			}
			self.double[row].push(blk);
		} else {
			return Err(Error::FileTooLarge);
		}
		self.count += 1;
		Ok(())
	}
}
