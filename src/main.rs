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

//! The ExFS2 command-line interface.
//!
//! The archive lives in the current working directory. Diagnostics go to
//! standard error; the only bytes written to standard output are file
//! payloads (`-e`) and the listings of `-l` and `-D`.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use exfs2::Fs;
use log::error;
use std::{io, path::PathBuf};

#[derive(Parser)]
#[command(version, about = "Archive host files inside fixed-size segment files")]
#[command(group = ArgGroup::new("command").required(true))]
struct Args {
	/// Add the host file given with `-f` at this archive path
	#[arg(short = 'a', value_name = "EXFS_PATH", group = "command", requires = "file")]
	add: Option<String>,
	/// Host file to read when adding
	#[arg(short = 'f', value_name = "HOST_PATH")]
	file: Option<PathBuf>,
	/// Write the file at this archive path to standard output
	#[arg(short = 'e', value_name = "EXFS_PATH", group = "command")]
	extract: Option<String>,
	/// Remove the file at this archive path
	#[arg(short = 'r', value_name = "EXFS_PATH", group = "command")]
	remove: Option<String>,
	/// Print the archive tree
	#[arg(short = 'l', group = "command")]
	list: bool,
	/// Print the inode dump for this archive path
	#[arg(short = 'D', value_name = "EXFS_PATH", group = "command")]
	debug: Option<String>,
}

fn run(args: &Args, fs: &mut Fs) -> exfs2::Result<()> {
	let stdout = io::stdout();
	if let (Some(path), Some(host)) = (&args.add, &args.file) {
		fs.add(path, host)
	} else if let Some(path) = &args.extract {
		fs.extract(path, &mut stdout.lock())
	} else if let Some(path) = &args.remove {
		fs.remove(path)
	} else if args.list {
		fs.list(&mut stdout.lock())
	} else if let Some(path) = &args.debug {
		fs.debug_dump(path, &mut stdout.lock())
	} else {
		// The argument group guarantees exactly one command
		unreachable!();
	}
}

fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
		.format_timestamp(None)
		.init();
	let args = Args::parse();
	let mut fs = Fs::open(".").context("cannot open archive")?;
	match run(&args, &mut fs) {
		Ok(()) => Ok(()),
		// Lookup failures are reported without failing the process
		Err(e) if e.is_recoverable() => {
			error!("{e}");
			Ok(())
		}
		Err(e) => Err(e).context("operation failed"),
	}
}
