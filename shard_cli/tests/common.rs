#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use assert_cmd::Command;

pub const CARD_OUTPUT: &str = "<main><div class=\"card\">Hello</div></main>\n";

pub fn shard_cmd() -> Command {
	let mut cmd = Command::cargo_bin("shard").unwrap_or_else(|e| panic!("shard binary: {e}"));
	cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
	cmd
}

pub fn write(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write: {e}"));
}

pub fn read(root: &Path, relative: &str) -> String {
	std::fs::read_to_string(root.join(relative)).unwrap_or_else(|e| panic!("read: {e}"))
}

pub fn set_mtime(root: &Path, relative: &str, seconds: u64) {
	let time: SystemTime = UNIX_EPOCH + Duration::from_secs(1_700_000_000 + seconds);
	std::fs::File::options()
		.write(true)
		.open(root.join(relative))
		.and_then(|file| file.set_modified(time))
		.unwrap_or_else(|e| panic!("set_modified: {e}"));
}

/// A project in the default layout with one `card` shard and one template
/// using it.
pub fn card_project(root: &Path) {
	write(
		root,
		"templates/shards/card.html",
		"<shard name=\"card\"><div class=\"card\">{content}</div></shard>\n",
	);
	write(
		root,
		"templates/templates/index.html",
		"<main><card>Hello</card></main>\n",
	);
	std::fs::create_dir_all(root.join("templates/rendered"))
		.unwrap_or_else(|e| panic!("create_dir_all: {e}"));
}
