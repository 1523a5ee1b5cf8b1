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

//! Discovery of free inode slots and free data blocks.
//!
//! The on-disk format has no free-space bitmap. An inode slot is free when
//! its persisted type is zero. A data block is used when a live inode
//! references it through a direct pointer, or when it contains any non-zero
//! byte; the content rule is what protects indirect blocks, which the
//! reachability scan does not traverse. Block 0 of every data segment is
//! reserved and never handed out.

use crate::{
	error::Result,
	fs::{
		inode::InodeKind,
		segment::{global_block, global_inode, BLOCKS_PER_SEGMENT, INODES_PER_SEGMENT},
		Fs,
	},
};
use log::debug;
use std::collections::HashSet;

impl Fs {
	/// Returns the global number of a free inode slot, scanning segments in
	/// order and creating a new inode segment when every slot is taken.
	pub(super) fn find_free_inode(&mut self) -> Result<u32> {
		for seg in 0..self.store.inode_segment_count() {
			for slot in 0..INODES_PER_SEGMENT {
				let inode_num = global_inode(seg, slot);
				if self.store.read_inode(inode_num)?.kind == InodeKind::Free {
					return Ok(inode_num);
				}
			}
		}
		let seg = self.store.new_inode_segment()?;
		Ok(global_inode(seg, 0))
	}

	/// Returns the global number of a free data block, scanning segments in
	/// order and creating a new data segment when no block is free.
	///
	/// The scan restarts from `alloc_cursor`: blocks below it were found used
	/// earlier in the process and are only released by `remove`, which resets
	/// the cursor.
	pub(super) fn find_free_block(&mut self) -> Result<u32> {
		let used = self.direct_block_refs()?;
		let total = global_block(self.store.data_segment_count(), 0);
		let mut blk = self.alloc_cursor.max(1);
		while blk < total {
			// Block 0 of each data segment stays reserved
			if blk as usize % BLOCKS_PER_SEGMENT == 0 {
				blk += 1;
				continue;
			}
			if !used.contains(&blk) && self.store.read_block(blk)?.iter().all(|b| *b == 0) {
				self.alloc_cursor = blk + 1;
				return Ok(blk);
			}
			blk += 1;
		}
		let seg = self.store.new_data_segment()?;
		let blk = global_block(seg, 1);
		debug!("no free block, extended to data segment {seg}");
		self.alloc_cursor = blk + 1;
		Ok(blk)
	}

	/// Collects the global numbers of every block referenced by a direct
	/// pointer of a live inode.
	fn direct_block_refs(&self) -> Result<HashSet<u32>> {
		let mut used = HashSet::new();
		for seg in 0..self.store.inode_segment_count() {
			for slot in 0..INODES_PER_SEGMENT {
				let inode = self.store.read_inode(global_inode(seg, slot))?;
				if inode.kind == InodeKind::Free {
					continue;
				}
				used.extend(inode.direct.iter().copied().filter(|blk| *blk != 0));
			}
		}
		Ok(used)
	}
}

#[cfg(test)]
mod test {
	use crate::fs::{
		inode::{Inode, InodeKind},
		segment::{BLOCK_SIZE, BLOCKS_PER_SEGMENT},
		Fs,
	};

	#[test]
	fn first_free_inode_skips_root() {
		let dir = tempfile::tempdir().unwrap();
		let mut fs = Fs::open(dir.path()).unwrap();
		assert_eq!(fs.find_free_inode().unwrap(), 1);
	}

	#[test]
	fn free_inode_skips_live_records() {
		let dir = tempfile::tempdir().unwrap();
		let mut fs = Fs::open(dir.path()).unwrap();
		let file = Inode {
			kind: InodeKind::File,
			..Default::default()
		};
		fs.store.write_inode(1, &file).unwrap();
		fs.store.write_inode(2, &file).unwrap();
		assert_eq!(fs.find_free_inode().unwrap(), 3);
		// Freeing a slot makes it the first candidate again
		fs.store.write_inode(1, &Inode::default()).unwrap();
		assert_eq!(fs.find_free_inode().unwrap(), 1);
	}

	#[test]
	fn first_free_block_is_one() {
		let dir = tempfile::tempdir().unwrap();
		let mut fs = Fs::open(dir.path()).unwrap();
		assert_eq!(fs.find_free_block().unwrap(), 1);
	}

	#[test]
	fn direct_references_mark_blocks_used() {
		let dir = tempfile::tempdir().unwrap();
		let mut fs = Fs::open(dir.path()).unwrap();
		let mut inode = Inode {
			kind: InodeKind::File,
			..Default::default()
		};
		inode.direct[0] = 1;
		inode.direct[1] = 2;
		fs.store.write_inode(1, &inode).unwrap();
		assert_eq!(fs.find_free_block().unwrap(), 3);
	}

	#[test]
	fn non_zero_content_marks_blocks_used() {
		let dir = tempfile::tempdir().unwrap();
		let mut fs = Fs::open(dir.path()).unwrap();
		let mut buf = [0u8; BLOCK_SIZE];
		buf[100] = 1;
		fs.store.write_block(1, &buf).unwrap();
		// Block 1 is referenced by no inode, yet its content protects it
		assert_eq!(fs.find_free_block().unwrap(), 2);
	}

	#[test]
	fn exhausted_segment_extends_family() {
		let dir = tempfile::tempdir().unwrap();
		let mut fs = Fs::open(dir.path()).unwrap();
		let buf = [0xffu8; BLOCK_SIZE];
		for blk in 1..BLOCKS_PER_SEGMENT as u32 {
			fs.store.write_block(blk, &buf).unwrap();
		}
		// Block 0 of the new segment stays reserved
		assert_eq!(fs.find_free_block().unwrap(), BLOCKS_PER_SEGMENT as u32 + 1);
		assert_eq!(fs.store.data_segment_count(), 2);
	}
}
