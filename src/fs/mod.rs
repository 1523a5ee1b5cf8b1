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

//! The ExFS2 storage engine.
//!
//! The archive stores a hierarchical namespace of files and directories
//! inside two families of fixed-size segment files (see [`segment`]).
//!
//! The access to a file's content is divided into several parts, each
//! overflowing on the next when full:
//! - Direct block pointers: each inode has 12 of them
//! - Single indirect block pointer: a block dedicated to storing a list of
//!   more blocks holding the file's content
//! - Double indirect block pointer: a block storing pointers to single
//!   indirect blocks
//!
//! Triple indirection does not exist; files needing it are rejected.
//!
//! There is no free-space bitmap: the allocator infers that a block is
//! unused from the live inodes' direct pointers and from the block content
//! itself, and `remove` restores both properties by zeroing everything a
//! file referenced.

mod alloc;

pub mod dirent;
pub mod indirect;
pub mod inode;
pub mod path;
pub mod segment;

use crate::error::{Error, Result};
use dirent::DirentIterator;
use inode::{BlockMap, Inode, InodeKind, ROOT_INODE};
use log::{debug, info, warn};
use segment::{SegmentStore, BLOCK_SIZE};
use std::{
	collections::HashSet,
	fs::File,
	io::{Read, Write},
	path::Path,
};

/// Reads up to one block worth of bytes from `src`, returning the number of
/// bytes read. A short count is only returned at end of file.
fn read_chunk(src: &mut impl Read, buf: &mut [u8; BLOCK_SIZE]) -> Result<usize> {
	let mut count = 0;
	while count < buf.len() {
		match src.read(&mut buf[count..])? {
			0 => break,
			n => count += n,
		}
	}
	Ok(count)
}

/// An open archive.
///
/// The context owns the segment files and every operation goes through it;
/// it is constructed at startup and released on exit.
pub struct Fs {
	/// The backing segment files.
	store: SegmentStore,
	/// Starting candidate for the allocator's block scan (see `alloc`).
	alloc_cursor: u32,
}

impl Fs {
	/// Opens the archive stored in `dir`, creating it if empty.
	pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
		Ok(Self {
			store: SegmentStore::open(dir.as_ref())?,
			alloc_cursor: 0,
		})
	}

	/// Adds the host file at `host_path` into the archive at `path`,
	/// creating missing intermediate directories.
	pub fn add(&mut self, path: &str, host_path: &Path) -> Result<()> {
		info!("adding '{}' into '{path}'", host_path.display());
		let (_, name) = path::split_parent(path)?;
		if name.len() > dirent::MAX_NAME_LEN {
			return Err(Error::NameTooLong(name.len()));
		}
		let parent_num = self.resolve_or_create_parents(path)?;
		let parent = self.store.read_inode(parent_num)?;
		if parent.kind != InodeKind::Directory {
			return Err(Error::NotADirectory(path.to_string()));
		}
		let mut dir_block = self.store.read_block(parent.direct[0])?;
		if dirent::find_entry(&dir_block, name.as_bytes()).is_some() {
			return Err(Error::AlreadyExists(path.to_string()));
		}
		let mut src = File::open(host_path)?;
		let total = src.metadata()?.len();
		// Stream the content, one fresh block per chunk
		let mut map = BlockMap::new();
		let mut inode = Inode {
			kind: InodeKind::File,
			..Default::default()
		};
		let mut written: u64 = 0;
		let mut last_percent = u64::MAX;
		loop {
			let mut buf = [0u8; BLOCK_SIZE];
			let count = read_chunk(&mut src, &mut buf)?;
			if count == 0 {
				break;
			}
			let blk = self.find_free_block()?;
			self.store.write_block(blk, &buf)?;
			map.push(blk)?;
			inode.size += count as u32;
			written += count as u64;
			if total > 0 {
				let percent = written * 100 / total;
				if percent != last_percent {
					debug!("progress: {percent:3}%");
					last_percent = percent;
				}
			}
		}
		// Flush the staged indirect levels
		if !map.single.is_empty() {
			let blk = self.find_free_block()?;
			indirect::write_ptrs(&mut self.store, blk, &map.single)?;
			inode.indirect_single = blk;
		}
		if !map.double.is_empty() {
			let mut outer = Vec::with_capacity(map.double.len());
			for row in &map.double {
				let blk = self.find_free_block()?;
				indirect::write_ptrs(&mut self.store, blk, row)?;
				outer.push(blk);
			}
			let blk = self.find_free_block()?;
			indirect::write_ptrs(&mut self.store, blk, &outer)?;
			inode.indirect_double = blk;
		}
		inode.direct = map.direct;
		let inode_num = self.find_free_inode()?;
		self.store.write_inode(inode_num, &inode)?;
		dirent::append_entry(&mut dir_block, inode_num, name.as_bytes())?;
		self.store.write_block(parent.direct[0], &dir_block)?;
		info!(
			"added '{name}' at inode {inode_num}, {} block(s), {} bytes",
			map.len(),
			inode.size
		);
		Ok(())
	}

	/// Writes the content of the file at `path` to `out`.
	///
	/// If the pointer graph ends before `size` bytes have been produced, a
	/// warning is emitted and the operation still succeeds.
	pub fn extract(&self, path: &str, out: &mut impl Write) -> Result<()> {
		info!("extracting '{path}'");
		let (inode_num, inode) = self.lookup_leaf(path)?;
		if inode.kind != InodeKind::File {
			return Err(Error::NotAFile(path.to_string()));
		}
		let mut remaining = inode.size;
		for blk in inode.direct {
			if remaining == 0 || blk == 0 {
				break;
			}
			remaining = self.copy_block(blk, remaining, out)?;
		}
		if remaining > 0 && inode.indirect_single != 0 {
			remaining = self.copy_indirect(inode.indirect_single, remaining, out)?;
		}
		if remaining > 0 && inode.indirect_double != 0 {
			for ptr in indirect::read_ptrs(&self.store, inode.indirect_double)? {
				if remaining == 0 || ptr == 0 {
					break;
				}
				remaining = self.copy_indirect(ptr, remaining, out)?;
			}
		}
		if remaining > 0 {
			warn!("extraction of inode {inode_num} incomplete: {remaining} bytes missing");
		} else {
			debug!("extraction complete");
		}
		Ok(())
	}

	/// Removes the file at `path`: its directory entry is compacted away,
	/// then every block it references and its inode are zeroed.
	pub fn remove(&mut self, path: &str) -> Result<()> {
		info!("removing '{path}'");
		let (parent_path, name) = path::split_parent(path)?;
		let (_, parent) = self.resolve(parent_path)?;
		if parent.kind != InodeKind::Directory {
			return Err(Error::NotADirectory(parent_path.to_string()));
		}
		let mut dir_block = self.store.read_block(parent.direct[0])?;
		let Some(inode_num) = dirent::remove_entry(&mut dir_block, name.as_bytes()) else {
			return Err(Error::NotFound(path.to_string()));
		};
		self.store.write_block(parent.direct[0], &dir_block)?;
		let inode = self.store.read_inode(inode_num)?;
		// Clear leaves before the pointer blocks that reference them
		for blk in inode.direct {
			if blk != 0 {
				self.zero_block(blk)?;
			}
		}
		if inode.indirect_single != 0 {
			self.zero_indirect(inode.indirect_single)?;
		}
		if inode.indirect_double != 0 {
			for ptr in indirect::read_ptrs(&self.store, inode.indirect_double)? {
				if ptr == 0 {
					break;
				}
				self.zero_indirect(ptr)?;
			}
			self.zero_block(inode.indirect_double)?;
		}
		self.store.write_inode(inode_num, &Inode::default())?;
		self.alloc_cursor = 0;
		info!("removed '{name}' (inode {inode_num})");
		Ok(())
	}

	/// Prints the archive tree to `out`, one `|- <name>` line per entry,
	/// indented by depth.
	pub fn list(&self, out: &mut impl Write) -> Result<()> {
		info!("listing archive contents");
		let mut visited = HashSet::new();
		self.list_dir(ROOT_INODE, 0, &mut visited, out)
	}

	/// Prints the inode dump for `path` to `out`. Never mutates the archive.
	pub fn debug_dump(&self, path: &str, out: &mut impl Write) -> Result<()> {
		info!("debugging '{path}'");
		let (inode_num, inode) = self.resolve(path)?;
		writeln!(out, "Inode {inode_num} Info:")?;
		let kind = match inode.kind {
			InodeKind::Directory => "Directory",
			InodeKind::File => "File",
			InodeKind::Free => "Unknown",
		};
		writeln!(out, "  Type : {kind}")?;
		writeln!(out, "  Size : {} bytes", inode.size)?;
		writeln!(out, "  Direct blocks:")?;
		for (i, blk) in inode.direct.iter().enumerate() {
			if *blk != 0 {
				writeln!(out, "    [{i}] -> Block {blk}")?;
			}
		}
		if inode.indirect_single != 0 {
			writeln!(out, "  Single Indirect Block: {}", inode.indirect_single)?;
			for ptr in indirect::read_ptrs(&self.store, inode.indirect_single)? {
				if ptr == 0 {
					break;
				}
				writeln!(out, "    -> {ptr}")?;
			}
		}
		if inode.indirect_double != 0 {
			writeln!(out, "  Double Indirect Block: {}", inode.indirect_double)?;
			for outer in indirect::read_ptrs(&self.store, inode.indirect_double)? {
				if outer == 0 {
					break;
				}
				writeln!(out, "    -> Indirect Block {outer}")?;
				for ptr in indirect::read_ptrs(&self.store, outer)? {
					if ptr == 0 {
						break;
					}
					writeln!(out, "        -> {ptr}")?;
				}
			}
		}
		if inode.kind == InodeKind::Directory {
			writeln!(out, "Directory Entries:")?;
			let block = self.store.read_block(inode.direct[0])?;
			for (_, ent) in DirentIterator::new(&block) {
				writeln!(
					out,
					"  - '{}' (inode {})",
					String::from_utf8_lossy(ent.name),
					ent.inode
				)?;
			}
		}
		Ok(())
	}

	/// Looks up the final component of `path` in its parent directory.
	fn lookup_leaf(&self, path: &str) -> Result<(u32, Inode)> {
		let (parent_path, name) = path::split_parent(path)?;
		let (_, parent) = self.resolve(parent_path)?;
		if parent.kind != InodeKind::Directory {
			return Err(Error::NotADirectory(parent_path.to_string()));
		}
		let dir_block = self.store.read_block(parent.direct[0])?;
		let Some(inode_num) = dirent::find_entry(&dir_block, name.as_bytes()) else {
			return Err(Error::NotFound(path.to_string()));
		};
		Ok((inode_num, self.store.read_inode(inode_num)?))
	}

	/// Copies one data block to `out`, truncated to `remaining` bytes, and
	/// returns the updated remaining count.
	fn copy_block(&self, blk: u32, remaining: u32, out: &mut impl Write) -> Result<u32> {
		let buf = self.store.read_block(blk)?;
		let count = remaining.min(BLOCK_SIZE as u32);
		out.write_all(&buf[..count as usize])?;
		Ok(remaining - count)
	}

	/// Streams every data block listed in the single-indirect block `blk` to
	/// `out` and returns the updated remaining count.
	fn copy_indirect(&self, blk: u32, mut remaining: u32, out: &mut impl Write) -> Result<u32> {
		for ptr in indirect::read_ptrs(&self.store, blk)? {
			if remaining == 0 || ptr == 0 {
				break;
			}
			remaining = self.copy_block(ptr, remaining, out)?;
		}
		Ok(remaining)
	}

	/// Zeroes the block `blk`.
	fn zero_block(&mut self, blk: u32) -> Result<()> {
		self.store.write_block(blk, &[0u8; BLOCK_SIZE])
	}

	/// Zeroes every block listed in the single-indirect block `blk`, then
	/// the block itself.
	fn zero_indirect(&mut self, blk: u32) -> Result<()> {
		for ptr in indirect::read_ptrs(&self.store, blk)? {
			if ptr == 0 {
				break;
			}
			self.zero_block(ptr)?;
		}
		self.zero_block(blk)
	}

	/// Prints the entries of the directory `inode_num` and recurses into
	/// subdirectories. `visited` guards against cycles on corrupted archives.
	fn list_dir(
		&self,
		inode_num: u32,
		depth: usize,
		visited: &mut HashSet<u32>,
		out: &mut impl Write,
	) -> Result<()> {
		if !visited.insert(inode_num) {
			return Ok(());
		}
		let inode = self.store.read_inode(inode_num)?;
		if inode.kind != InodeKind::Directory {
			return Ok(());
		}
		let block = self.store.read_block(inode.direct[0])?;
		for (_, ent) in DirentIterator::new(&block) {
			writeln!(
				out,
				"{}|- {}",
				"  ".repeat(depth),
				String::from_utf8_lossy(ent.name)
			)?;
			self.list_dir(ent.inode, depth + 1, visited, out)?;
		}
		Ok(())
	}
}
