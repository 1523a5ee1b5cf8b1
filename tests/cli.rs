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

//! End-to-end tests of the command-line interface.
//!
//! Each test runs the binary inside a scratch directory holding the archive.

use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

/// Returns a command running the binary inside `dir`.
fn exfs2(dir: &TempDir) -> Command {
	let mut cmd = Command::cargo_bin("exfs2").unwrap();
	cmd.current_dir(dir.path()).env("RUST_LOG", "info");
	cmd
}

/// Runs the binary with `args` inside `dir` and returns its standard output.
fn stdout_of(dir: &TempDir, args: &[&str]) -> Vec<u8> {
	let mut cmd = exfs2(dir);
	cmd.args(args);
	cmd.assert().success().get_output().stdout.clone()
}

#[test]
fn add_list_extract_debug() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("hello.txt"), b"hi\n").unwrap();
	exfs2(&dir)
		.args(["-a", "/hello.txt", "-f", "hello.txt"])
		.assert()
		.success();
	// The tree shows the file
	let listing = String::from_utf8(stdout_of(&dir, &["-l"])).unwrap();
	assert!(listing.contains("|- hello.txt"));
	// The payload comes back byte-exact, alone on standard output
	exfs2(&dir)
		.args(["-e", "/hello.txt"])
		.assert()
		.success()
		.stdout(&b"hi\n"[..]);
	// The inode dump reports the size and a single direct block
	let dump = String::from_utf8(stdout_of(&dir, &["-D", "/hello.txt"])).unwrap();
	assert!(dump.contains("Size : 3 bytes"));
	assert_eq!(dump.matches("] -> Block").count(), 1);
}

#[test]
fn nested_path() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("payload"), [0xff; 10]).unwrap();
	exfs2(&dir)
		.args(["-a", "/a/b/c.bin", "-f", "payload"])
		.assert()
		.success();
	exfs2(&dir)
		.arg("-l")
		.assert()
		.success()
		.stdout("|- a\n  |- b\n    |- c.bin\n");
	exfs2(&dir)
		.args(["-e", "/a/b/c.bin"])
		.assert()
		.success()
		.stdout(vec![0xff; 10]);
}

#[test]
fn large_file_uses_single_indirection() {
	let dir = tempfile::tempdir().unwrap();
	let data: Vec<u8> = (0..12 * 4096 + 1).map(|i| (i % 256) as u8).collect();
	fs::write(dir.path().join("big"), &data).unwrap();
	exfs2(&dir)
		.args(["-a", "/big", "-f", "big"])
		.assert()
		.success();
	exfs2(&dir)
		.args(["-e", "/big"])
		.assert()
		.success()
		.stdout(data);
	let dump = String::from_utf8(stdout_of(&dir, &["-D", "/big"])).unwrap();
	assert!(dump.contains("Single Indirect Block:"));
	assert!(!dump.contains("Double Indirect Block:"));
}

#[test]
fn duplicate_add_is_a_reported_noop() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("f1"), b"one").unwrap();
	fs::write(dir.path().join("f2"), b"two").unwrap();
	exfs2(&dir)
		.args(["-a", "/x", "-f", "f1"])
		.assert()
		.success();
	let output = exfs2(&dir)
		.args(["-a", "/x", "-f", "f2"])
		.assert()
		.success()
		.get_output()
		.clone();
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("already exists"), "stderr: {stderr}");
	// The original content is untouched
	exfs2(&dir)
		.args(["-e", "/x"])
		.assert()
		.success()
		.stdout(&b"one"[..]);
}

#[test]
fn remove_reuses_slots() {
	let dir = tempfile::tempdir().unwrap();
	for name in ["a", "b", "c"] {
		fs::write(dir.path().join(name), name).unwrap();
		exfs2(&dir)
			.args(["-a", &format!("/{name}"), "-f", name])
			.assert()
			.success();
	}
	let dump_b = String::from_utf8(stdout_of(&dir, &["-D", "/b"])).unwrap();
	exfs2(&dir).args(["-r", "/b"]).assert().success();
	fs::write(dir.path().join("d"), "d").unwrap();
	exfs2(&dir)
		.args(["-a", "/d", "-f", "d"])
		.assert()
		.success();
	// `b` is compacted out of the directory; `d` appends after the survivors
	exfs2(&dir)
		.arg("-l")
		.assert()
		.success()
		.stdout("|- a\n|- c\n|- d\n");
	// `d` reuses the inode freed by `b`
	let dump_d = String::from_utf8(stdout_of(&dir, &["-D", "/d"])).unwrap();
	let inode_line = |dump: &str| dump.lines().next().unwrap_or_default().to_owned();
	assert_eq!(inode_line(&dump_b), inode_line(&dump_d));
}

#[test]
fn extract_missing_path_exits_zero() {
	let dir = tempfile::tempdir().unwrap();
	let output = exfs2(&dir)
		.args(["-e", "/nope"])
		.assert()
		.success()
		.get_output()
		.clone();
	assert!(output.stdout.is_empty());
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(
		stderr.contains("no such file or directory"),
		"stderr: {stderr}"
	);
}

#[test]
fn list_is_stable() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("f"), b"f").unwrap();
	exfs2(&dir)
		.args(["-a", "/dir/f", "-f", "f"])
		.assert()
		.success();
	assert_eq!(stdout_of(&dir, &["-l"]), stdout_of(&dir, &["-l"]));
}

#[test]
fn usage_errors_exit_non_zero() {
	let dir = tempfile::tempdir().unwrap();
	// No command
	exfs2(&dir).assert().failure();
	// `-a` without `-f`
	exfs2(&dir).args(["-a", "/x"]).assert().failure();
	// Two commands at once
	exfs2(&dir).args(["-l", "-r", "/x"]).assert().failure();
	// A usage error must not create archive files
	assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}
