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

//! The segment store owns the archive's backing files.
//!
//! Storage is split into two disjoint families of fixed-size segment files,
//! living side by side in the archive directory:
//! - `inode_segment_<n>.seg`: inode records, one block each
//! - `data_segment_<n>.seg`: data blocks
//!
//! Segment indices are contiguous, starting at zero. New segments are created
//! on demand and never shrunk. Block 0 of data segment 0 holds the root
//! directory's entry list.

use crate::{
	error::{Error, Result},
	fs::inode::{Inode, InodeKind},
};
use log::{debug, info};
use std::{
	fs::{File, OpenOptions},
	io,
	os::unix::fs::FileExt,
	path::{Path, PathBuf},
};

/// The size of a block in bytes.
pub const BLOCK_SIZE: usize = 4096;
/// The size of a segment file in bytes.
pub const SEGMENT_SIZE: u64 = 1024 * 1024;
/// The maximum number of segments in each family.
pub const MAX_SEGMENTS: usize = 1024;
/// The number of inode records held by an inode segment.
pub const INODES_PER_SEGMENT: usize = 256;
/// The number of blocks held by a data segment.
pub const BLOCKS_PER_SEGMENT: usize = 256;

/// Splits the global block number `blk` into a (segment index, block offset)
/// pair.
pub fn block_location(blk: u32) -> (usize, usize) {
	(
		blk as usize / BLOCKS_PER_SEGMENT,
		blk as usize % BLOCKS_PER_SEGMENT,
	)
}

/// Splits the global inode number `inode` into a (segment index, record
/// offset) pair.
pub fn inode_location(inode: u32) -> (usize, usize) {
	(
		inode as usize / INODES_PER_SEGMENT,
		inode as usize % INODES_PER_SEGMENT,
	)
}

/// Returns the global block number for the block `blk` of data segment `seg`.
pub fn global_block(seg: usize, blk: usize) -> u32 {
	(seg * BLOCKS_PER_SEGMENT + blk) as u32
}

/// Returns the global inode number for the slot `slot` of inode segment
/// `seg`.
pub fn global_inode(seg: usize, slot: usize) -> u32 {
	(seg * INODES_PER_SEGMENT + slot) as u32
}

/// Returns the path of the segment file `index` of the family `prefix` under
/// `dir`.
fn segment_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
	dir.join(format!("{prefix}_segment_{index}.seg"))
}

/// Opens every existing segment file of the family `prefix`, scanning indices
/// upward until a file is missing.
fn open_family(dir: &Path, prefix: &str) -> Result<Vec<File>> {
	let mut files = Vec::new();
	for index in 0..MAX_SEGMENTS {
		let path = segment_path(dir, prefix, index);
		match OpenOptions::new().read(true).write(true).open(&path) {
			Ok(file) => files.push(file),
			Err(e) if e.kind() == io::ErrorKind::NotFound => break,
			Err(e) => return Err(e.into()),
		}
	}
	Ok(files)
}

/// Creates the segment file `index` of the family `prefix`, sized to
/// [`SEGMENT_SIZE`].
fn create_segment(dir: &Path, prefix: &str, index: usize) -> Result<File> {
	if index >= MAX_SEGMENTS {
		return Err(Error::SegmentLimit);
	}
	let path = segment_path(dir, prefix, index);
	let file = OpenOptions::new()
		.read(true)
		.write(true)
		.create_new(true)
		.open(&path)?;
	file.set_len(SEGMENT_SIZE)?;
	info!("created segment {}", path.display());
	Ok(file)
}

/// The set of open segment files backing an archive.
pub struct SegmentStore {
	/// The directory containing the segment files.
	dir: PathBuf,
	/// Open inode segments, by segment index.
	inode_segments: Vec<File>,
	/// Open data segments, by segment index.
	data_segments: Vec<File>,
}

impl SegmentStore {
	/// Opens the segment families under `dir`, creating and formatting index
	/// 0 of each family if the archive is empty.
	///
	/// The root inode (inode 0 of segment 0) is written if its persisted type
	/// is not a directory.
	pub fn open(dir: &Path) -> Result<Self> {
		let mut inode_segments = open_family(dir, "inode")?;
		if inode_segments.is_empty() {
			inode_segments.push(create_segment(dir, "inode", 0)?);
		}
		let mut data_segments = open_family(dir, "data")?;
		if data_segments.is_empty() {
			let file = create_segment(dir, "data", 0)?;
			// Root directory entry block
			file.write_all_at(&[0u8; BLOCK_SIZE], 0)?;
			data_segments.push(file);
		}
		let mut store = Self {
			dir: dir.to_path_buf(),
			inode_segments,
			data_segments,
		};
		let root = store.read_inode(0)?;
		if root.kind != InodeKind::Directory {
			let root = Inode {
				kind: InodeKind::Directory,
				..Default::default()
			};
			store.write_inode(0, &root)?;
			info!("created root inode");
		}
		debug!(
			"opened archive with {} inode segment(s), {} data segment(s)",
			store.inode_segments.len(),
			store.data_segments.len()
		);
		Ok(store)
	}

	/// Returns the number of open inode segments.
	pub fn inode_segment_count(&self) -> usize {
		self.inode_segments.len()
	}

	/// Returns the number of open data segments.
	pub fn data_segment_count(&self) -> usize {
		self.data_segments.len()
	}

	/// Returns the data segment `seg`.
	///
	/// Addressing a segment beyond the open range is a fatal violation and
	/// returns [`Error::InvalidAddress`].
	fn data_segment(&self, seg: usize) -> Result<&File> {
		self.data_segments
			.get(seg)
			.ok_or(Error::InvalidAddress("data", seg))
	}

	/// Returns the inode segment `seg`.
	///
	/// Addressing a segment beyond the open range is a fatal violation and
	/// returns [`Error::InvalidAddress`].
	fn inode_segment(&self, seg: usize) -> Result<&File> {
		self.inode_segments
			.get(seg)
			.ok_or(Error::InvalidAddress("inode", seg))
	}

	/// Reads the block with the global number `blk`.
	pub fn read_block(&self, blk: u32) -> Result<[u8; BLOCK_SIZE]> {
		let (seg, off) = block_location(blk);
		let mut buf = [0u8; BLOCK_SIZE];
		self.data_segment(seg)?
			.read_exact_at(&mut buf, (off * BLOCK_SIZE) as u64)?;
		Ok(buf)
	}

	/// Writes `buf` to the block with the global number `blk`.
	pub fn write_block(&mut self, blk: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
		let (seg, off) = block_location(blk);
		self.data_segment(seg)?
			.write_all_at(buf, (off * BLOCK_SIZE) as u64)?;
		Ok(())
	}

	/// Reads the inode record with the global number `inode`.
	pub fn read_inode(&self, inode: u32) -> Result<Inode> {
		let (seg, off) = inode_location(inode);
		let mut buf = [0u8; BLOCK_SIZE];
		self.inode_segment(seg)?
			.read_exact_at(&mut buf, (off * BLOCK_SIZE) as u64)?;
		Ok(Inode::decode(&buf))
	}

	/// Writes the record `inode` at the global inode number `inode_num`.
	pub fn write_inode(&mut self, inode_num: u32, inode: &Inode) -> Result<()> {
		let (seg, off) = inode_location(inode_num);
		let mut buf = [0u8; BLOCK_SIZE];
		inode.encode(&mut buf);
		self.inode_segment(seg)?
			.write_all_at(&buf, (off * BLOCK_SIZE) as u64)?;
		Ok(())
	}

	/// Creates the next inode segment and returns its index.
	pub fn new_inode_segment(&mut self) -> Result<usize> {
		let index = self.inode_segments.len();
		self.inode_segments
			.push(create_segment(&self.dir, "inode", index)?);
		Ok(index)
	}

	/// Creates the next data segment and returns its index.
	pub fn new_data_segment(&mut self) -> Result<usize> {
		let index = self.data_segments.len();
		self.data_segments
			.push(create_segment(&self.dir, "data", index)?);
		Ok(index)
	}
}
