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

//! Resolution of slash-separated archive paths.

use crate::{
	error::{Error, Result},
	fs::{
		dirent,
		inode::{Inode, InodeKind, ROOT_INODE},
		Fs,
	},
};
use log::info;

/// The maximum number of components in a path.
pub const MAX_PATH_DEPTH: usize = 64;

/// Splits `path` into its components, discarding empty ones.
///
/// Paths with [`MAX_PATH_DEPTH`] components or more are rejected.
pub fn components(path: &str) -> Result<Vec<&str>> {
	let comps: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
	if comps.len() >= MAX_PATH_DEPTH {
		return Err(Error::PathTooDeep(comps.len()));
	}
	Ok(comps)
}

/// Splits `path` into its parent path and its final component.
///
/// The final component must be non-empty; the parent of a file at the root is
/// `/`.
pub fn split_parent(path: &str) -> Result<(&str, &str)> {
	let Some((parent, name)) = path.rsplit_once('/') else {
		return Err(Error::MissingFileName(path.to_string()));
	};
	if name.is_empty() {
		return Err(Error::MissingFileName(path.to_string()));
	}
	let parent = if parent.is_empty() { "/" } else { parent };
	Ok((parent, name))
}

impl Fs {
	/// Resolves `path` to its global inode number and record, walking from
	/// the root directory.
	pub fn resolve(&self, path: &str) -> Result<(u32, Inode)> {
		let mut inode_num = ROOT_INODE;
		let mut inode = self.store.read_inode(inode_num)?;
		for comp in components(path)? {
			if inode.kind != InodeKind::Directory {
				return Err(Error::NotADirectory(comp.to_string()));
			}
			let block = self.store.read_block(inode.direct[0])?;
			let Some(child) = dirent::find_entry(&block, comp.as_bytes()) else {
				return Err(Error::NotFound(path.to_string()));
			};
			inode_num = child;
			inode = self.store.read_inode(child)?;
		}
		Ok((inode_num, inode))
	}

	/// Resolves the directory that will contain the final component of
	/// `path`, creating missing intermediate directories, and returns its
	/// global inode number.
	pub(super) fn resolve_or_create_parents(&mut self, path: &str) -> Result<u32> {
		let comps = components(path)?;
		let Some((_, parents)) = comps.split_last() else {
			return Ok(ROOT_INODE);
		};
		let mut inode_num = ROOT_INODE;
		for comp in parents {
			let inode = self.store.read_inode(inode_num)?;
			if inode.kind != InodeKind::Directory {
				return Err(Error::NotADirectory(comp.to_string()));
			}
			let mut block = self.store.read_block(inode.direct[0])?;
			if let Some(child) = dirent::find_entry(&block, comp.as_bytes()) {
				inode_num = child;
				continue;
			}
			// Create the missing directory
			let new_inode_num = self.find_free_inode()?;
			let new_block = self.find_free_block()?;
			let mut direct = [0u32; super::inode::DIRECT_BLOCKS];
			direct[0] = new_block;
			let dir = Inode {
				kind: InodeKind::Directory,
				direct,
				..Default::default()
			};
			self.store.write_inode(new_inode_num, &dir)?;
			dirent::append_entry(&mut block, new_inode_num, comp.as_bytes())?;
			self.store.write_block(inode.direct[0], &block)?;
			info!("created directory '{comp}' at inode {new_inode_num}, block {new_block}");
			inode_num = new_inode_num;
		}
		Ok(inode_num)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn components_discard_empty_tokens() {
		assert_eq!(components("/a/b/c").unwrap(), vec!["a", "b", "c"]);
		assert_eq!(components("//a///b/").unwrap(), vec!["a", "b"]);
		assert_eq!(components("/").unwrap(), Vec::<&str>::new());
	}

	#[test]
	fn components_depth_limit() {
		let depth63 = "/c".repeat(MAX_PATH_DEPTH - 1);
		assert_eq!(components(&depth63).unwrap().len(), MAX_PATH_DEPTH - 1);
		let depth64 = "/c".repeat(MAX_PATH_DEPTH);
		assert!(matches!(
			components(&depth64),
			Err(Error::PathTooDeep(MAX_PATH_DEPTH))
		));
	}

	#[test]
	fn split_parent_cases() {
		assert_eq!(split_parent("/a").unwrap(), ("/", "a"));
		assert_eq!(split_parent("/a/b/c.bin").unwrap(), ("/a/b", "c.bin"));
		assert!(split_parent("/a/").is_err());
		assert!(split_parent("/").is_err());
		assert!(split_parent("name-without-slash").is_err());
	}
}
