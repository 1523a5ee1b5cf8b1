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

//! An indirect block is a data block holding an array of block pointers.
//!
//! Single-indirect blocks list data blocks; double-indirect blocks list
//! single-indirect blocks. The first zero entry terminates the list and
//! callers never dereference past it.

use crate::{
	error::Result,
	fs::segment::{SegmentStore, BLOCK_SIZE},
};
use byteorder::{ByteOrder, LittleEndian};

/// The number of block pointers stored in one indirect block.
pub const PTRS_PER_BLOCK: usize = BLOCK_SIZE / 4;

/// Reads the block `blk` as an array of little-endian block pointers.
pub fn read_ptrs(store: &SegmentStore, blk: u32) -> Result<[u32; PTRS_PER_BLOCK]> {
	let buf = store.read_block(blk)?;
	let mut ptrs = [0u32; PTRS_PER_BLOCK];
	LittleEndian::read_u32_into(&buf, &mut ptrs);
	Ok(ptrs)
}

/// Writes `ptrs` to the block `blk`, zero-filling the remaining entries.
pub fn write_ptrs(store: &mut SegmentStore, blk: u32, ptrs: &[u32]) -> Result<()> {
	debug_assert!(ptrs.len() <= PTRS_PER_BLOCK);
	let mut buf = [0u8; BLOCK_SIZE];
	LittleEndian::write_u32_into(ptrs, &mut buf[..4 * ptrs.len()]);
	store.write_block(blk, &buf)
}
